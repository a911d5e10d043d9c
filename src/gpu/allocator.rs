//! Allocation and release primitives for device memory.
//!
//! Device deallocation routines are not null-safe (`cudaFree(nullptr)` is
//! not a no-op on every driver), so the release side only ever receives a
//! [`NonNull`] address.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::DeviceResult;

/// Returns device memory to the allocator it came from.
pub trait Deallocator {
    /// Release the allocation starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by the matching allocator, must not have
    /// been released already, and must not be used after this call.
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> DeviceResult<()>;
}

/// Hands out device memory that its own [`Deallocator`] impl can release.
pub trait DeviceAllocator: Deallocator {
    /// Allocate `bytes` bytes of device memory.
    fn allocate(&self, bytes: usize) -> DeviceResult<NonNull<u8>>;
}

impl<D: Deallocator + ?Sized> Deallocator for Arc<D> {
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> DeviceResult<()> {
        (**self).deallocate(ptr)
    }
}

impl<D: DeviceAllocator + ?Sized> DeviceAllocator for Arc<D> {
    fn allocate(&self, bytes: usize) -> DeviceResult<NonNull<u8>> {
        (**self).allocate(bytes)
    }
}

/// Release policy backed by a closure.
///
/// The closure is treated as infallible. Useful for memory owned by a foreign
/// runtime that exposes its own free routine, and for observing releases.
#[derive(Clone, Copy)]
pub struct ReleaseFn<F>(pub F);

impl<F> Deallocator for ReleaseFn<F>
where
    F: Fn(NonNull<u8>),
{
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> DeviceResult<()> {
        (self.0)(ptr);
        Ok(())
    }
}

impl<F> fmt::Debug for ReleaseFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReleaseFn(..)")
    }
}

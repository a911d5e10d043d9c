//! Single-owner handles over device memory.
//!
//! [`UniqueDevPtr`] releases its address through a [`Deallocator`] exactly
//! once, when it is dropped, reset or cleared. A null address is never passed
//! to the deallocator. Handles built with [`Ownership::Fake`] alias memory
//! owned elsewhere and never release anything.

use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use tracing::{debug, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::gpu::{Deallocator, DefaultDeallocator, DeviceAllocator};

/// Whether a handle releases its address when it goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    /// Release on drop, reset and clear.
    #[default]
    Owned,
    /// Never release; the address is managed elsewhere.
    Fake,
}

/// Owning pointer to an array of `T` in device memory.
///
/// Not `Clone`: ownership moves with the value, or explicitly via
/// [`take`](UniqueDevPtr::take).
pub struct UniqueDevPtr<T, D: Deallocator = DefaultDeallocator> {
    ptr: *mut T,
    ownership: Ownership,
    dealloc: D,
}

/// Ordered group of device buffers, e.g. one per device or per kernel argument.
///
/// Dropping the vector releases the buffers in index order.
pub type UniqueDevPtrs<T, D = DefaultDeallocator> = Vec<UniqueDevPtr<T, D>>;

impl<T, D: Deallocator + Default> UniqueDevPtr<T, D> {
    /// Null owning handle with the default release policy.
    pub fn new() -> Self {
        Self::null_in(D::default())
    }

    /// Take ownership of `ptr`, releasing it with the default deallocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or an allocation of `D` that nothing else releases.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::from_raw_in(ptr, Ownership::Owned, D::default())
    }

    /// Non-owning alias of `ptr`.
    pub fn fake(ptr: *mut T) -> Self {
        Self::fake_in(ptr, D::default())
    }
}

impl<T, D: Deallocator + Default> Default for UniqueDevPtr<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D: Deallocator> UniqueDevPtr<T, D> {
    /// Null owning handle bound to `dealloc`.
    pub fn null_in(dealloc: D) -> Self {
        Self {
            ptr: ptr::null_mut(),
            ownership: Ownership::Owned,
            dealloc,
        }
    }

    /// Wrap `ptr` with an explicit ownership mode and release policy.
    ///
    /// # Safety
    ///
    /// With [`Ownership::Owned`], `ptr` must be null or an allocation that
    /// `dealloc` can release and that nothing else releases.
    pub unsafe fn from_raw_in(ptr: *mut T, ownership: Ownership, dealloc: D) -> Self {
        Self {
            ptr,
            ownership,
            dealloc,
        }
    }

    /// Non-owning alias of `ptr`; dropping it never calls `dealloc`.
    pub fn fake_in(ptr: *mut T, dealloc: D) -> Self {
        Self {
            ptr,
            ownership: Ownership::Fake,
            dealloc,
        }
    }

    /// Borrow the raw device address. Ownership does not change.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    pub fn deallocator(&self) -> &D {
        &self.dealloc
    }

    /// Release the current address and bind `ptr` in its place.
    ///
    /// The ownership mode is kept. Resetting to the address already held is a
    /// no-op.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw_in`](UniqueDevPtr::from_raw_in) for `ptr`
    /// under this handle's ownership mode.
    pub unsafe fn reset(&mut self, ptr: *mut T) {
        if ptr == self.ptr {
            return;
        }
        let old = mem::replace(&mut self.ptr, ptr);
        self.release(old);
    }

    /// Release the current address and become null.
    pub fn clear(&mut self) {
        let old = mem::replace(&mut self.ptr, ptr::null_mut());
        self.release(old);
    }

    /// Give up the address without releasing it.
    pub fn into_raw(mut self) -> *mut T {
        mem::replace(&mut self.ptr, ptr::null_mut())
    }

    fn release(&self, ptr: *mut T) {
        if self.ownership == Ownership::Fake {
            return;
        }
        let Some(addr) = NonNull::new(ptr.cast::<u8>()) else {
            return;
        };
        // SAFETY: owned addresses are only bound through the unsafe
        // constructors, `reset` or `alloc_in`, and have just been unbound.
        if let Err(err) = unsafe { self.dealloc.deallocate(addr) } {
            warn!(addr = ?addr, error = %err, "Device memory release failed");
        }
    }
}

impl<T, D: Deallocator + Clone> UniqueDevPtr<T, D> {
    /// Move ownership out, leaving this handle null and non-owning.
    pub fn take(&mut self) -> Self {
        let taken = Self {
            ptr: mem::replace(&mut self.ptr, ptr::null_mut()),
            ownership: self.ownership,
            dealloc: self.dealloc.clone(),
        };
        self.ownership = Ownership::Fake;
        taken
    }
}

impl<T, A: DeviceAllocator> UniqueDevPtr<T, A> {
    /// Allocate room for `len` elements through `allocator`.
    ///
    /// Zero-byte requests return a null handle without touching the allocator.
    pub fn alloc_in(len: usize, allocator: A) -> DeviceResult<Self> {
        let elem_size = mem::size_of::<T>();
        let bytes = len
            .checked_mul(elem_size)
            .ok_or(DeviceError::SizeOverflow { len, elem_size })?;
        if bytes == 0 {
            return Ok(Self::null_in(allocator));
        }

        let addr = allocator.allocate(bytes)?;
        debug!(addr = ?addr, bytes, "Bound device buffer");
        Ok(Self {
            ptr: addr.as_ptr().cast(),
            ownership: Ownership::Owned,
            dealloc: allocator,
        })
    }
}

impl<T, A: DeviceAllocator + Default> UniqueDevPtr<T, A> {
    /// Allocate room for `len` elements with the default allocator.
    pub fn alloc(len: usize) -> DeviceResult<Self> {
        Self::alloc_in(len, A::default())
    }
}

impl<T, D: Deallocator> Drop for UniqueDevPtr<T, D> {
    fn drop(&mut self) {
        let ptr = mem::replace(&mut self.ptr, ptr::null_mut());
        self.release(ptr);
    }
}

impl<T, D: Deallocator> fmt::Debug for UniqueDevPtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueDevPtr")
            .field("ptr", &self.ptr)
            .field("ownership", &self.ownership)
            .finish()
    }
}

// SAFETY: the handle is a unique owner of its address; sharing or sending it
// is as safe as sharing or sending the `T`s and the deallocator behind it.
unsafe impl<T: Send, D: Deallocator + Send> Send for UniqueDevPtr<T, D> {}
unsafe impl<T: Sync, D: Deallocator + Sync> Sync for UniqueDevPtr<T, D> {}

/// Borrowing helpers for groups of handles.
pub trait DevPtrSliceExt<T> {
    /// Raw addresses of every handle, in order.
    fn raw_ptrs(&self) -> Vec<*mut T>;
}

impl<T, D: Deallocator> DevPtrSliceExt<T> for [UniqueDevPtr<T, D>] {
    fn raw_ptrs(&self) -> Vec<*mut T> {
        self.iter().map(UniqueDevPtr::as_ptr).collect()
    }
}

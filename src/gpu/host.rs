//! Device memory simulated in host RAM.
//!
//! Used when the crate is compiled without the `cuda` feature, and by tests.
//! Allocations are aligned like `cudaMalloc` (256 bytes) and carry a small
//! header recording their size and the device that produced them. Any
//! [`HostDevice`] can release any address; the bytes are always returned to
//! the allocating device's counters.

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DeviceError, DeviceResult};
use crate::gpu::allocator::{Deallocator, DeviceAllocator};

/// Alignment guaranteed by the CUDA runtime for `cudaMalloc`.
pub const DEVICE_ALIGN: usize = 256;

/// Bytes reserved in front of every allocation for the [`Header`].
const HEADER: usize = DEVICE_ALIGN;

#[derive(Debug, Default)]
struct Counters {
    allocations: AtomicU64,
    releases: AtomicU64,
    live_bytes: AtomicUsize,
}

/// Written at the start of every block, HEADER bytes before the user pointer.
#[repr(C)]
struct Header {
    bytes: usize,

    /// Strong reference to the allocating device's counters, from `Arc::into_raw`.
    counters: *const Counters,
}

/// Point-in-time view of a [`HostDevice`]'s counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    /// Successful allocations.
    pub allocations: u64,

    /// Releases of blocks this device allocated.
    pub releases: u64,

    /// Bytes currently allocated and not yet released.
    pub live_bytes: usize,
}

/// Host-RAM stand-in for a GPU device.
///
/// Clones share their counters and capacity.
#[derive(Debug, Clone, Default)]
pub struct HostDevice {
    counters: Arc<Counters>,

    /// Upper bound on live bytes (None = unbounded).
    capacity: Option<usize>,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses allocations once `capacity` bytes are live.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counters: Arc::default(),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            allocations: self.counters.allocations.load(Ordering::Acquire),
            releases: self.counters.releases.load(Ordering::Acquire),
            live_bytes: self.counters.live_bytes.load(Ordering::Acquire),
        }
    }

    fn reserve(&self, bytes: usize) -> DeviceResult<()> {
        self.counters
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                let next = live.checked_add(bytes)?;
                match self.capacity {
                    Some(cap) if next > cap => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|_| DeviceError::OutOfMemory { requested: bytes })
    }

    fn unreserve(&self, bytes: usize) {
        self.counters.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
    }
}

impl DeviceAllocator for HostDevice {
    fn allocate(&self, bytes: usize) -> DeviceResult<NonNull<u8>> {
        let total = bytes
            .checked_add(HEADER)
            .ok_or(DeviceError::OutOfMemory { requested: bytes })?;
        let layout = Layout::from_size_align(total, DEVICE_ALIGN)
            .map_err(|e| DeviceError::InvalidLayout(e.to_string()))?;

        self.reserve(bytes)?;

        // SAFETY: `layout` is at least HEADER bytes, never zero-sized.
        let base = unsafe { alloc::alloc(layout) };
        let Some(base) = NonNull::new(base) else {
            self.unreserve(bytes);
            return Err(DeviceError::OutOfMemory { requested: bytes });
        };

        let header = Header {
            bytes,
            counters: Arc::into_raw(self.counters.clone()),
        };
        // SAFETY: the block is HEADER + bytes long and DEVICE_ALIGN aligned,
        // so the header write is in bounds and aligned, and the user pointer
        // stays inside the block.
        let ptr = unsafe {
            base.as_ptr().cast::<Header>().write(header);
            NonNull::new_unchecked(base.as_ptr().add(HEADER))
        };

        self.counters.allocations.fetch_add(1, Ordering::AcqRel);
        debug!(addr = ?ptr, bytes, "Allocated host-simulated device block");
        Ok(ptr)
    }
}

impl Deallocator for HostDevice {
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> DeviceResult<()> {
        // SAFETY: the caller guarantees `ptr` came from `HostDevice::allocate`,
        // so a header sits HEADER bytes before it and owns one counters reference.
        let base = ptr.as_ptr().sub(HEADER);
        let Header { bytes, counters } = base.cast::<Header>().read();
        let layout = Layout::from_size_align_unchecked(bytes + HEADER, DEVICE_ALIGN);
        alloc::dealloc(base, layout);

        let owner = HostDevice {
            counters: Arc::from_raw(counters),
            capacity: None,
        };
        owner.unreserve(bytes);
        owner.counters.releases.fetch_add(1, Ordering::AcqRel);
        debug!(addr = ?ptr, bytes, "Released host-simulated device block");
        Ok(())
    }
}

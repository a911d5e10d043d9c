//! Device memory backends.
//!
//! - [`allocator`]: the allocate/deallocate seam and closure-backed release policies
//! - [`host`]: device memory simulated in host RAM (CPU-only builds and tests)
//! - [`cuda`]: CUDA driver backend via cudarc (feature `cuda`)

pub mod allocator;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod host;

pub use allocator::{Deallocator, DeviceAllocator, ReleaseFn};

/// Deallocator bound to handles that do not name one.
#[cfg(feature = "cuda")]
pub type DefaultDeallocator = cuda::CudaDevice;

/// Deallocator bound to handles that do not name one.
#[cfg(not(feature = "cuda"))]
pub type DefaultDeallocator = host::HostDevice;

//! CUDA driver backend.
//!
//! [`CudaDevice`] allocates and frees in whatever CUDA context is current on
//! the calling thread, the same contract as `cudaMalloc`/`cudaFree`. Use
//! [`bind_device`] to create a context and make it current.

use std::ptr::NonNull;
use std::sync::Arc;

use cudarc::driver::{result, sys, CudaContext};
use tracing::{debug, info};

use crate::error::{DeviceError, DeviceResult};
use crate::gpu::allocator::{Deallocator, DeviceAllocator};

/// Release policy calling `cuMemFree` in the current context.
#[derive(Debug, Clone, Copy, Default)]
pub struct CudaDevice;

/// Create a context on device `ordinal` and bind it to the calling thread.
pub fn bind_device(ordinal: usize) -> DeviceResult<Arc<CudaContext>> {
    let ctx = CudaContext::new(ordinal).map_err(|_| DeviceError::DeviceNotAvailable(ordinal))?;
    ctx.bind_to_thread()?;
    info!(ordinal, "Bound CUDA context");
    Ok(ctx)
}

impl DeviceAllocator for CudaDevice {
    fn allocate(&self, bytes: usize) -> DeviceResult<NonNull<u8>> {
        // SAFETY: plain driver allocation; the result is only handed out as an address.
        let dptr = unsafe { result::malloc_sync(bytes) }?;
        let ptr = NonNull::new(dptr as usize as *mut u8)
            .ok_or(DeviceError::OutOfMemory { requested: bytes })?;
        debug!(addr = ?ptr, bytes, "Allocated CUDA device memory");
        Ok(ptr)
    }
}

impl Deallocator for CudaDevice {
    unsafe fn deallocate(&self, ptr: NonNull<u8>) -> DeviceResult<()> {
        result::free_sync(ptr.as_ptr() as usize as sys::CUdeviceptr)?;
        debug!(addr = ?ptr, "Released CUDA device memory");
        Ok(())
    }
}

//! Error types shared by the device backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Out of device memory: requested {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("Allocation size overflows: {len} elements of {elem_size} bytes")]
    SizeOverflow { len: usize, elem_size: usize },

    #[error("GPU device {0} not available")]
    DeviceNotAvailable(usize),

    #[error("Invalid allocation layout: {0}")]
    InvalidLayout(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(feature = "cuda")]
impl From<cudarc::driver::DriverError> for DeviceError {
    fn from(err: cudarc::driver::DriverError) -> Self {
        DeviceError::Driver(err.to_string())
    }
}

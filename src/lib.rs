//! unique-devptr: single-owner handles for GPU device memory.
//!
//! A [`UniqueDevPtr`] wraps one device allocation and releases it exactly
//! once when it goes out of scope, never passing a null address to the
//! device's free routine. Handles can also be built as non-owning aliases
//! of memory managed elsewhere. [`UniqueDevPtrs`] groups handles in order.
//!
//! Backends live under [`gpu`]: a host-RAM simulation that is always
//! available, and a CUDA backend behind the `cuda` feature.

pub mod config;
pub mod devptr;
pub mod error;
pub mod gpu;

pub use devptr::{DevPtrSliceExt, Ownership, UniqueDevPtr, UniqueDevPtrs};
pub use error::{DeviceError, DeviceResult};
pub use gpu::{Deallocator, DefaultDeallocator, DeviceAllocator, ReleaseFn};

//! Build script for unique-devptr.
//!
//! The CUDA backend loads the driver through cudarc, so nothing is compiled
//! or linked here. With the `cuda` feature enabled we only remind the builder
//! that a driver has to be present at run time.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(feature = "cuda")]
    {
        println!("cargo:warning=CUDA feature enabled, a CUDA driver must be present at run time");
    }
}

//! Error types for the OpenCL backend, plus the status translator every
//! driver call is routed through.

use snafu::Snafu;
use umbra_dtype::ScalarDType;

use crate::cl::CL_SUCCESS;

/// Result type for backend operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while talking to the OpenCL driver.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The driver returned a non-success status code.
    #[snafu(display("OpenCL error {code}"))]
    Driver { code: i32 },

    /// Kernel build failed; carries the decoded build log.
    #[snafu(display("OpenCL compile error\n\n{log}"))]
    Compile { log: String },

    /// The compile pipeline was invoked before any device existed.
    #[snafu(display("a device must be initialized before compiling"))]
    CompilerContextMissing,

    /// No OpenCL platform was reported by the driver.
    #[snafu(display("no OpenCL platform available"))]
    NoPlatform,

    /// Invalid device selection string or out-of-range device index.
    #[snafu(display("invalid device: {device}"))]
    InvalidDevice { device: String },

    /// Image allocation with an element width no image format covers.
    #[snafu(display("unsupported image element width: {bytes} bytes ({dtype:?})"))]
    UnsupportedImageFormat { dtype: ScalarDType, bytes: usize },

    /// Image dtypes must describe a `[height, width]` layout.
    #[snafu(display("image shape must be 2D, got {shape:?}"))]
    InvalidImageShape { shape: Vec<usize> },

    /// Kernel dispatches are 1 to 3 dimensional.
    #[snafu(display("dispatch rank must be between 1 and 3, got {rank}"))]
    InvalidDispatchRank { rank: usize },

    /// `local_size` must have the same rank as `global_size`.
    #[snafu(display("dispatch rank mismatch: global is {global}D, local is {local}D"))]
    DispatchRankMismatch { global: usize, local: usize },
}

/// Translate a raw driver status into a failure.
pub fn check(status: i32) -> Result<()> {
    snafu::ensure!(status == CL_SUCCESS, DriverSnafu { code: status });
    Ok(())
}

/// Translate a `(value, status)` pair from a fallible driver call, passing the
/// value through unchanged on success.
pub fn checked<T>((value, status): (T, i32)) -> Result<T> {
    check(status)?;
    Ok(value)
}

//! OpenCL compute-device backend.
//!
//! Exposes a uniform interface for compiling kernel source into a portable
//! device binary, allocating and moving device memory, and dispatching and
//! profiling kernel execution on a single accelerator, on top of a C driver
//! API with explicit contexts, command queues, and reference-counted handles.
//!
//! # Architecture
//!
//! - [`cl::Driver`] is the seam to the C ABI. The real FFI implementation
//!   ([`opencl::OpenClDriver`]) is behind the `opencl` feature; the test
//!   suite runs against an in-memory fake.
//! - [`ClRuntime`] owns the process-wide pieces: one-time device discovery,
//!   the shared compiler context (the first device opened), and the
//!   source-keyed compile cache.
//! - [`ClDevice`] composes a context, a profiling command queue, an
//!   [`ClAllocator`], and program construction into the consumed interface.
//!
//! # Example
//!
//! ```ignore
//! let runtime = ClRuntime::new(Arc::new(OpenClDriver));
//! let device = runtime.open("GPU:0")?;
//! let binary = device.compile(KERNEL_SOURCE)?;
//! let program = device.program("add", &binary)?;
//! let buf = device.allocator().alloc(1024, &f32::DTYPE)?;
//! let elapsed = program.call(&[Arg::Mem(buf)], &[256], Some(&[4]), true)?;
//! ```

pub mod allocator;
pub mod cl;
pub mod compiler;
pub mod device;
pub mod error;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod program;

#[cfg(test)]
pub mod test;

pub use allocator::ClAllocator;
pub use cl::{
    CL_SUCCESS, ContextId, DeviceId, Driver, EventId, ImageFormat, KernelId, MemId, PlatformId,
    ProfilingCounter, ProgramId, QueueId,
};
pub use device::{ClDevice, ClRuntime, PendingCopies};
pub use error::{Error, Result, check, checked};
pub use program::{Arg, ClProgram, PROFILE_TIMING_RATIO};

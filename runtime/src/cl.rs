//! The driver boundary: opaque handle types and the [`Driver`] trait that
//! mirrors the OpenCL C ABI surface this backend uses.
//!
//! Driver methods deliberately keep the C calling convention's shape: each
//! returns its produced value(s) alongside the raw status code, and status
//! translation happens at the call site via [`crate::error::check`] /
//! [`crate::error::checked`]. Queries that the C API exposes as a size query
//! followed by a fetch (build logs, program binaries) keep that two-step
//! protocol here; it is an external contract, not a design choice.

/// The driver's success status.
pub const CL_SUCCESS: i32 = 0;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);
    };
}

handle!(
    /// An OpenCL platform (`cl_platform_id`).
    PlatformId
);
handle!(
    /// A physical device reported by the platform (`cl_device_id`).
    DeviceId
);
handle!(
    /// An allocation/execution domain bound to one device (`cl_context`).
    ContextId
);
handle!(
    /// An ordered submission channel for one device (`cl_command_queue`).
    QueueId
);
handle!(
    /// A driver-side program object (`cl_program`).
    ProgramId
);
handle!(
    /// A resolved kernel entry point (`cl_kernel`).
    KernelId
);
handle!(
    /// A device memory object, linear or image-shaped (`cl_mem`).
    MemId
);
handle!(
    /// A profiling/completion event (`cl_event`).
    EventId
);

/// Texel format of a 2D image allocation. Always four channels; the channel
/// width follows the element type the image was allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    RgbaHalf,
    RgbaFloat,
}

/// Device timestamp counters readable from a profiling event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingCounter {
    CommandStart,
    CommandEnd,
}

/// The versioned C ABI this backend drives.
///
/// Implementations: [`crate::opencl::OpenClDriver`] (real FFI, behind the
/// `opencl` feature) and the in-memory fake used by the test suite.
pub trait Driver: Send + Sync + 'static {
    // Platform/device enumeration (clGetPlatformIDs / clGetDeviceIDs).

    fn platform_count(&self) -> (u32, i32);
    fn platform_ids(&self, count: u32) -> (Vec<PlatformId>, i32);
    /// Number of default-type devices on `platform`.
    fn device_count(&self, platform: PlatformId) -> (u32, i32);
    fn device_ids(&self, platform: PlatformId, count: u32) -> (Vec<DeviceId>, i32);

    // Context and queue lifecycle (clCreateContext / clCreateCommandQueue).

    fn create_context(&self, device: DeviceId) -> (ContextId, i32);
    fn create_queue(&self, context: ContextId, device: DeviceId, profiling: bool) -> (QueueId, i32);
    fn release_queue(&self, queue: QueueId) -> i32;
    fn release_context(&self, context: ContextId) -> i32;

    // Program lifecycle and the size-then-fetch info queries.

    fn create_program_with_source(&self, context: ContextId, source: &str) -> (ProgramId, i32);
    /// Load a prebuilt binary. Returns the program handle plus two independent
    /// statuses: the per-binary load status and the overall creation status.
    fn create_program_with_binary(
        &self,
        context: ContextId,
        device: DeviceId,
        binary: &[u8],
    ) -> (ProgramId, i32, i32);
    fn build_program(&self, program: ProgramId, device: DeviceId) -> i32;
    fn build_log_size(&self, program: ProgramId, device: DeviceId) -> (usize, i32);
    fn build_log(&self, program: ProgramId, device: DeviceId, size: usize) -> (Vec<u8>, i32);
    fn binary_size(&self, program: ProgramId) -> (usize, i32);
    fn binary(&self, program: ProgramId, size: usize) -> (Vec<u8>, i32);
    fn create_kernel(&self, program: ProgramId, name: &str) -> (KernelId, i32);
    fn release_kernel(&self, kernel: KernelId) -> i32;
    fn release_program(&self, program: ProgramId) -> i32;

    // Memory objects (clCreateBuffer / clCreateImage2D).

    fn create_buffer(&self, context: ContextId, size: usize) -> (MemId, i32);
    fn create_image2d(
        &self,
        context: ContextId,
        format: ImageFormat,
        width: usize,
        height: usize,
    ) -> (MemId, i32);
    fn release_mem(&self, mem: MemId) -> i32;

    // Kernel dispatch and profiling.

    fn set_kernel_arg_mem(&self, kernel: KernelId, index: u32, mem: MemId) -> i32;
    /// Scalar arguments are always bound as 4-byte integers.
    fn set_kernel_arg_i32(&self, kernel: KernelId, index: u32, value: i32) -> i32;
    fn enqueue_kernel(
        &self,
        queue: QueueId,
        kernel: KernelId,
        global_size: &[usize],
        local_size: Option<&[usize]>,
    ) -> i32;
    /// Like [`Driver::enqueue_kernel`] but also creates a profiling event.
    fn enqueue_kernel_timed(
        &self,
        queue: QueueId,
        kernel: KernelId,
        global_size: &[usize],
        local_size: Option<&[usize]>,
    ) -> (EventId, i32);
    fn wait_for_event(&self, event: EventId) -> i32;
    /// Device timestamp in nanoseconds for one profiling counter.
    fn event_profiling_ns(&self, event: EventId, counter: ProfilingCounter) -> (u64, i32);
    fn release_event(&self, event: EventId) -> i32;

    // Asynchronous memory transfer (clEnqueueWriteBuffer / clEnqueueReadBuffer).

    /// Enqueue a non-blocking host-to-device write of `len` bytes from `src`.
    ///
    /// # Safety
    ///
    /// The driver may read from `src` any time until the queue is drained via
    /// [`Driver::finish`]; the caller must keep the source allocation alive
    /// and unmodified until then.
    unsafe fn enqueue_write_buffer(&self, queue: QueueId, dst: MemId, src: *const u8, len: usize) -> i32;

    /// Enqueue a non-blocking device-to-host read of `len` bytes into `dst`.
    ///
    /// # Safety
    ///
    /// The driver may write to `dst` any time until the queue is drained via
    /// [`Driver::finish`]; the caller must keep the destination allocation
    /// alive and untouched until then.
    unsafe fn enqueue_read_buffer(&self, queue: QueueId, src: MemId, dst: *mut u8, len: usize) -> i32;

    /// Block until every operation enqueued on `queue` has completed.
    fn finish(&self, queue: QueueId) -> i32;
}

//! Real [`Driver`] implementation over the system OpenCL ICD loader.
//!
//! Thin pass-through: every method is one C entry point with the handle and
//! status plumbing this crate's seam expects. No status is interpreted here;
//! translation happens at the call sites via `check`/`checked`.

use std::ffi::CString;
use std::os::raw::{c_char, c_void};
use std::ptr;

use cl_sys::{
    CL_DEVICE_TYPE_DEFAULT, CL_FALSE, CL_FLOAT, CL_HALF_FLOAT, CL_INVALID_VALUE, CL_MEM_READ_WRITE,
    CL_PROFILING_COMMAND_END, CL_PROFILING_COMMAND_START, CL_PROGRAM_BINARIES, CL_PROGRAM_BINARY_SIZES,
    CL_PROGRAM_BUILD_LOG, CL_QUEUE_PROFILING_ENABLE, CL_RGBA, cl_command_queue, cl_context, cl_device_id,
    cl_event, cl_image_format, cl_kernel, cl_mem, cl_platform_id, cl_program, cl_uint, cl_ulong,
    clBuildProgram, clCreateBuffer, clCreateCommandQueue, clCreateContext, clCreateImage2D, clCreateKernel,
    clCreateProgramWithBinary, clCreateProgramWithSource, clEnqueueNDRangeKernel, clEnqueueReadBuffer,
    clEnqueueWriteBuffer, clFinish, clGetDeviceIDs, clGetEventProfilingInfo, clGetPlatformIDs,
    clGetProgramBuildInfo, clGetProgramInfo, clReleaseCommandQueue, clReleaseContext, clReleaseEvent,
    clReleaseKernel, clReleaseMemObject, clReleaseProgram, clSetKernelArg, clWaitForEvents,
};

use crate::cl::{
    ContextId, DeviceId, Driver, EventId, ImageFormat, KernelId, MemId, PlatformId, ProfilingCounter,
    ProgramId, QueueId,
};

/// Driver backed by the platform's OpenCL installation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClDriver;

impl Driver for OpenClDriver {
    fn platform_count(&self) -> (u32, i32) {
        let mut count: cl_uint = 0;
        let status = unsafe { clGetPlatformIDs(0, ptr::null_mut(), &mut count) };
        (count, status)
    }

    fn platform_ids(&self, count: u32) -> (Vec<PlatformId>, i32) {
        let mut ids: Vec<cl_platform_id> = vec![ptr::null_mut(); count as usize];
        let status = unsafe { clGetPlatformIDs(count, ids.as_mut_ptr(), ptr::null_mut()) };
        (ids.into_iter().map(|id| PlatformId(id as u64)).collect(), status)
    }

    fn device_count(&self, platform: PlatformId) -> (u32, i32) {
        let mut count: cl_uint = 0;
        let status = unsafe {
            clGetDeviceIDs(platform.0 as cl_platform_id, CL_DEVICE_TYPE_DEFAULT, 0, ptr::null_mut(), &mut count)
        };
        (count, status)
    }

    fn device_ids(&self, platform: PlatformId, count: u32) -> (Vec<DeviceId>, i32) {
        let mut ids: Vec<cl_device_id> = vec![ptr::null_mut(); count as usize];
        let status = unsafe {
            clGetDeviceIDs(
                platform.0 as cl_platform_id,
                CL_DEVICE_TYPE_DEFAULT,
                count,
                ids.as_mut_ptr(),
                ptr::null_mut(),
            )
        };
        (ids.into_iter().map(|id| DeviceId(id as u64)).collect(), status)
    }

    fn create_context(&self, device: DeviceId) -> (ContextId, i32) {
        let device = device.0 as cl_device_id;
        let mut status = 0;
        let context =
            unsafe { clCreateContext(ptr::null(), 1, &device, None, ptr::null_mut(), &mut status) };
        (ContextId(context as u64), status)
    }

    fn create_queue(&self, context: ContextId, device: DeviceId, profiling: bool) -> (QueueId, i32) {
        let properties = if profiling { CL_QUEUE_PROFILING_ENABLE } else { 0 };
        let mut status = 0;
        let queue = unsafe {
            clCreateCommandQueue(context.0 as cl_context, device.0 as cl_device_id, properties, &mut status)
        };
        (QueueId(queue as u64), status)
    }

    fn release_queue(&self, queue: QueueId) -> i32 {
        unsafe { clReleaseCommandQueue(queue.0 as cl_command_queue) }
    }

    fn release_context(&self, context: ContextId) -> i32 {
        unsafe { clReleaseContext(context.0 as cl_context) }
    }

    fn create_program_with_source(&self, context: ContextId, source: &str) -> (ProgramId, i32) {
        let text = source.as_ptr() as *const c_char;
        let len = source.len();
        let mut status = 0;
        let program =
            unsafe { clCreateProgramWithSource(context.0 as cl_context, 1, &text, &len, &mut status) };
        (ProgramId(program as u64), status)
    }

    fn create_program_with_binary(
        &self,
        context: ContextId,
        device: DeviceId,
        binary: &[u8],
    ) -> (ProgramId, i32, i32) {
        let device = device.0 as cl_device_id;
        let len = binary.len();
        let bytes = binary.as_ptr();
        let mut binary_status = 0;
        let mut status = 0;
        let program = unsafe {
            clCreateProgramWithBinary(
                context.0 as cl_context,
                1,
                &device,
                &len,
                &bytes,
                &mut binary_status,
                &mut status,
            )
        };
        (ProgramId(program as u64), binary_status, status)
    }

    fn build_program(&self, program: ProgramId, device: DeviceId) -> i32 {
        let device = device.0 as cl_device_id;
        unsafe {
            clBuildProgram(program.0 as cl_program, 1, &device, ptr::null(), None, ptr::null_mut())
        }
    }

    fn build_log_size(&self, program: ProgramId, device: DeviceId) -> (usize, i32) {
        let mut size: usize = 0;
        let status = unsafe {
            clGetProgramBuildInfo(
                program.0 as cl_program,
                device.0 as cl_device_id,
                CL_PROGRAM_BUILD_LOG,
                0,
                ptr::null_mut(),
                &mut size,
            )
        };
        (size, status)
    }

    fn build_log(&self, program: ProgramId, device: DeviceId, size: usize) -> (Vec<u8>, i32) {
        let mut log = vec![0u8; size];
        let status = unsafe {
            clGetProgramBuildInfo(
                program.0 as cl_program,
                device.0 as cl_device_id,
                CL_PROGRAM_BUILD_LOG,
                size,
                log.as_mut_ptr() as *mut c_void,
                ptr::null_mut(),
            )
        };
        (log, status)
    }

    fn binary_size(&self, program: ProgramId) -> (usize, i32) {
        // One target device, so the size array has a single entry.
        let mut size: usize = 0;
        let status = unsafe {
            clGetProgramInfo(
                program.0 as cl_program,
                CL_PROGRAM_BINARY_SIZES,
                size_of::<usize>(),
                &mut size as *mut usize as *mut c_void,
                ptr::null_mut(),
            )
        };
        (size, status)
    }

    fn binary(&self, program: ProgramId, size: usize) -> (Vec<u8>, i32) {
        let mut bytes = vec![0u8; size];
        let mut pointers = [bytes.as_mut_ptr()];
        let status = unsafe {
            clGetProgramInfo(
                program.0 as cl_program,
                CL_PROGRAM_BINARIES,
                size_of::<*mut u8>(),
                pointers.as_mut_ptr() as *mut c_void,
                ptr::null_mut(),
            )
        };
        (bytes, status)
    }

    fn create_kernel(&self, program: ProgramId, name: &str) -> (KernelId, i32) {
        let Ok(name) = CString::new(name) else {
            return (KernelId(0), CL_INVALID_VALUE);
        };
        let mut status = 0;
        let kernel = unsafe { clCreateKernel(program.0 as cl_program, name.as_ptr(), &mut status) };
        (KernelId(kernel as u64), status)
    }

    fn release_kernel(&self, kernel: KernelId) -> i32 {
        unsafe { clReleaseKernel(kernel.0 as cl_kernel) }
    }

    fn release_program(&self, program: ProgramId) -> i32 {
        unsafe { clReleaseProgram(program.0 as cl_program) }
    }

    fn create_buffer(&self, context: ContextId, size: usize) -> (MemId, i32) {
        let mut status = 0;
        let mem = unsafe {
            clCreateBuffer(context.0 as cl_context, CL_MEM_READ_WRITE, size, ptr::null_mut(), &mut status)
        };
        (MemId(mem as u64), status)
    }

    fn create_image2d(
        &self,
        context: ContextId,
        format: ImageFormat,
        width: usize,
        height: usize,
    ) -> (MemId, i32) {
        let mut format = cl_image_format {
            image_channel_order: CL_RGBA,
            image_channel_data_type: match format {
                ImageFormat::RgbaHalf => CL_HALF_FLOAT,
                ImageFormat::RgbaFloat => CL_FLOAT,
            },
        };
        let mut status = 0;
        let mem = unsafe {
            clCreateImage2D(
                context.0 as cl_context,
                CL_MEM_READ_WRITE,
                &mut format,
                width,
                height,
                0,
                ptr::null_mut(),
                &mut status,
            )
        };
        (MemId(mem as u64), status)
    }

    fn release_mem(&self, mem: MemId) -> i32 {
        unsafe { clReleaseMemObject(mem.0 as cl_mem) }
    }

    fn set_kernel_arg_mem(&self, kernel: KernelId, index: u32, mem: MemId) -> i32 {
        let mem = mem.0 as cl_mem;
        unsafe {
            clSetKernelArg(
                kernel.0 as cl_kernel,
                index,
                size_of::<cl_mem>(),
                &mem as *const cl_mem as *const c_void,
            )
        }
    }

    fn set_kernel_arg_i32(&self, kernel: KernelId, index: u32, value: i32) -> i32 {
        unsafe {
            clSetKernelArg(
                kernel.0 as cl_kernel,
                index,
                size_of::<i32>(),
                &value as *const i32 as *const c_void,
            )
        }
    }

    fn enqueue_kernel(
        &self,
        queue: QueueId,
        kernel: KernelId,
        global_size: &[usize],
        local_size: Option<&[usize]>,
    ) -> i32 {
        unsafe {
            clEnqueueNDRangeKernel(
                queue.0 as cl_command_queue,
                kernel.0 as cl_kernel,
                global_size.len() as cl_uint,
                ptr::null(),
                global_size.as_ptr(),
                local_size.map_or(ptr::null(), <[usize]>::as_ptr),
                0,
                ptr::null(),
                ptr::null_mut(),
            )
        }
    }

    fn enqueue_kernel_timed(
        &self,
        queue: QueueId,
        kernel: KernelId,
        global_size: &[usize],
        local_size: Option<&[usize]>,
    ) -> (EventId, i32) {
        let mut event: cl_event = ptr::null_mut();
        let status = unsafe {
            clEnqueueNDRangeKernel(
                queue.0 as cl_command_queue,
                kernel.0 as cl_kernel,
                global_size.len() as cl_uint,
                ptr::null(),
                global_size.as_ptr(),
                local_size.map_or(ptr::null(), <[usize]>::as_ptr),
                0,
                ptr::null(),
                &mut event,
            )
        };
        (EventId(event as u64), status)
    }

    fn wait_for_event(&self, event: EventId) -> i32 {
        let event = event.0 as cl_event;
        unsafe { clWaitForEvents(1, &event) }
    }

    fn event_profiling_ns(&self, event: EventId, counter: ProfilingCounter) -> (u64, i32) {
        let param = match counter {
            ProfilingCounter::CommandStart => CL_PROFILING_COMMAND_START,
            ProfilingCounter::CommandEnd => CL_PROFILING_COMMAND_END,
        };
        let mut value: cl_ulong = 0;
        let status = unsafe {
            clGetEventProfilingInfo(
                event.0 as cl_event,
                param,
                size_of::<cl_ulong>(),
                &mut value as *mut cl_ulong as *mut c_void,
                ptr::null_mut(),
            )
        };
        (value, status)
    }

    fn release_event(&self, event: EventId) -> i32 {
        unsafe { clReleaseEvent(event.0 as cl_event) }
    }

    unsafe fn enqueue_write_buffer(&self, queue: QueueId, dst: MemId, src: *const u8, len: usize) -> i32 {
        unsafe {
            clEnqueueWriteBuffer(
                queue.0 as cl_command_queue,
                dst.0 as cl_mem,
                CL_FALSE,
                0,
                len,
                src as *const c_void,
                0,
                ptr::null(),
                ptr::null_mut(),
            )
        }
    }

    unsafe fn enqueue_read_buffer(&self, queue: QueueId, src: MemId, dst: *mut u8, len: usize) -> i32 {
        unsafe {
            clEnqueueReadBuffer(
                queue.0 as cl_command_queue,
                src.0 as cl_mem,
                CL_FALSE,
                0,
                len,
                dst as *mut c_void,
                0,
                ptr::null(),
                ptr::null_mut(),
            )
        }
    }

    fn finish(&self, queue: QueueId) -> i32 {
        unsafe { clFinish(queue.0 as cl_command_queue) }
    }
}

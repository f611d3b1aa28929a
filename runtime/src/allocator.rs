//! Device memory: linear and image-shaped allocation plus host transfers.
//!
//! Transfers are asymmetric on purpose. Copy-in only enqueues: the source is
//! caller-owned and merely has to outlive the transfer, which the device
//! enforces by pinning a reference in its pending list until a synchronize
//! confirms completion. Copy-out must block before returning because the
//! caller consumes the destination immediately and no equivalent
//! lifetime-extension mechanism exists for it.

use std::sync::Arc;

use umbra_dtype::DType;

use crate::cl::{ImageFormat, MemId};
use crate::device::DeviceState;
use crate::error::{InvalidImageShapeSnafu, Result, UnsupportedImageFormatSnafu, check, checked};

/// Allocator bound to one device's context and queue. Reuse bookkeeping (LRU
/// caching of freed buffers) lives in the caller's generic allocator layer;
/// this type supplies the raw primitives it delegates to.
pub struct ClAllocator {
    state: Arc<DeviceState>,
}

impl ClAllocator {
    pub(crate) fn new(state: Arc<DeviceState>) -> Self {
        Self { state }
    }

    /// Allocate device memory for `size` elements of `dtype`.
    ///
    /// Image dtypes get a 2D read/write image sized from their declared
    /// `[height, width]` layout, with the texel format chosen by element
    /// width: 2 bytes maps to 4-channel half, 4 bytes to 4-channel float, and
    /// anything else is unsupported. Other dtypes get a linear read/write
    /// buffer of `size * dtype.bytes()` bytes.
    pub fn alloc(&self, size: usize, dtype: &DType) -> Result<MemId> {
        match dtype {
            DType::Image { base, shape } => {
                let format = match base.bytes() {
                    2 => ImageFormat::RgbaHalf,
                    4 => ImageFormat::RgbaFloat,
                    bytes => return UnsupportedImageFormatSnafu { dtype: *base, bytes }.fail(),
                };
                let [height, width] = shape[..] else {
                    return InvalidImageShapeSnafu { shape: shape.clone() }.fail();
                };
                checked(self.state.driver.create_image2d(self.state.context, format, width, height))
            }
            _ => checked(self.state.driver.create_buffer(self.state.context, size * dtype.bytes())),
        }
    }

    /// Release a device buffer. Failures surface; they are never swallowed.
    pub fn free(&self, mem: MemId) -> Result<()> {
        check(self.state.driver.release_mem(mem))
    }

    /// Enqueue a non-blocking host-to-device write of the whole source span.
    ///
    /// Returns before the transfer necessarily completes. The span is
    /// registered in the device's pending list so its backing storage stays
    /// alive until a `synchronize` confirms the device is done reading it;
    /// the caller may drop its own reference immediately.
    pub fn copy_in(&self, dst: MemId, src: Arc<[u8]>) -> Result<()> {
        // SAFETY: `src` is registered in the pending-copy-in list below and is
        // only released by `synchronize` after the queue has drained, so the
        // pointer stays valid for as long as the driver may read through it.
        check(unsafe {
            self.state.driver.enqueue_write_buffer(self.state.queue, dst, src.as_ptr(), src.len())
        })?;
        self.state.pending_copyin.register(src);
        Ok(())
    }

    /// Device-to-host read of exactly `dst.len()` bytes. Enqueues without
    /// blocking, then synchronizes the device, so the destination is fully
    /// populated when this returns.
    pub fn copy_out(&self, dst: &mut [u8], src: MemId) -> Result<()> {
        // SAFETY: the mutable borrow of `dst` is held across the synchronize
        // below, which blocks until the queue (including this read) drains.
        check(unsafe {
            self.state.driver.enqueue_read_buffer(self.state.queue, src, dst.as_mut_ptr(), dst.len())
        })?;
        self.state.synchronize()
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use test_case::test_case;
use umbra_dtype::ext::HasDType;
use umbra_dtype::{DType, ScalarDType};

use crate::cl::ImageFormat;
use crate::test::fake::FakeDriver;
use crate::test::fixture;
use crate::{ClDevice, Error};

fn device() -> (Arc<FakeDriver>, ClDevice) {
    let (driver, runtime) = fixture(FakeDriver::new());
    let device = runtime.open("GPU").unwrap();
    (driver, device)
}

#[test]
fn linear_buffers_are_sized_in_bytes() {
    let (driver, device) = device();
    let mem = device.allocator().alloc(10, &f32::DTYPE).unwrap();
    assert_eq!(driver.buffer(mem).len(), 40);

    let mem = device.allocator().alloc(7, &u8::DTYPE).unwrap();
    assert_eq!(driver.buffer(mem).len(), 7);
}

#[test_case(ScalarDType::Float16 => ImageFormat::RgbaHalf; "half elements")]
#[test_case(ScalarDType::BFloat16 => ImageFormat::RgbaHalf; "bf16 elements")]
#[test_case(ScalarDType::Float32 => ImageFormat::RgbaFloat; "float elements")]
fn image_format_follows_element_width(base: ScalarDType) -> ImageFormat {
    let (driver, device) = device();
    let mem = device.allocator().alloc(0, &DType::image(base, 4, 8)).unwrap();
    let (format, width, height) = driver.image(mem);
    assert_eq!((width, height), (8, 4), "shape is [height, width]");
    format
}

#[test_case(ScalarDType::Float64, 8)]
#[test_case(ScalarDType::UInt8, 1)]
fn unsupported_image_widths_fail(base: ScalarDType, bytes: usize) {
    let (_driver, device) = device();
    let err = device.allocator().alloc(0, &DType::image(base, 4, 8)).unwrap_err();
    match err {
        Error::UnsupportedImageFormat { bytes: got, .. } => assert_eq!(got, bytes),
        other => panic!("expected unsupported format, got {other:?}"),
    }
}

#[test]
fn image_shape_must_be_two_dimensional() {
    let (_driver, device) = device();
    let dtype = DType::Image { base: ScalarDType::Float32, shape: vec![8] };
    assert!(matches!(
        device.allocator().alloc(0, &dtype).unwrap_err(),
        Error::InvalidImageShape { .. }
    ));
}

#[test]
fn free_releases_the_buffer() {
    use crate::test::fake::Released;

    let (driver, device) = device();
    let mem = device.allocator().alloc(4, &u8::DTYPE).unwrap();
    device.allocator().free(mem).unwrap();
    assert_eq!(driver.releases(), vec![Released::Mem]);
}

#[test]
fn copy_in_defers_and_pins_the_source() {
    let (driver, device) = device();
    let mem = device.allocator().alloc(4, &u8::DTYPE).unwrap();

    let src: Arc<[u8]> = vec![1, 2, 3, 4].into();
    device.allocator().copy_in(mem, src.clone()).unwrap();

    // Nothing has landed yet, but the span is pinned by the device.
    assert_eq!(driver.buffer(mem), vec![0, 0, 0, 0]);
    assert_eq!(device.pending_copies(), 1);
    assert_eq!(Arc::strong_count(&src), 2);

    device.synchronize().unwrap();
    assert_eq!(driver.buffer(mem), vec![1, 2, 3, 4]);
    assert_eq!(device.pending_copies(), 0);
    assert_eq!(Arc::strong_count(&src), 1);
}

#[test]
fn copy_in_source_may_be_dropped_by_the_caller() {
    let (driver, device) = device();
    let mem = device.allocator().alloc(4, &u8::DTYPE).unwrap();

    let src: Arc<[u8]> = vec![9, 9, 9, 9].into();
    device.allocator().copy_in(mem, src.clone()).unwrap();
    drop(src);

    // The pending list kept the allocation alive through the transfer.
    device.synchronize().unwrap();
    assert_eq!(driver.buffer(mem), vec![9, 9, 9, 9]);
}

#[test]
fn copy_out_blocks_until_the_destination_is_populated() {
    let delay = Duration::from_millis(25);
    let (_driver, runtime) = fixture(FakeDriver::new().with_completion_delay(delay));
    let device = runtime.open("GPU").unwrap();
    let mem = device.allocator().alloc(4, &u8::DTYPE).unwrap();

    device.allocator().copy_in(mem, vec![5, 6, 7, 8].into()).unwrap();
    device.synchronize().unwrap();

    let mut dst = [0u8; 4];
    let begin = Instant::now();
    device.allocator().copy_out(&mut dst, mem).unwrap();
    assert!(begin.elapsed() >= delay, "copy_out must wait for queue completion");
    assert_eq!(dst, [5, 6, 7, 8]);
}

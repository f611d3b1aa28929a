use crate::Error;
use crate::cl::DeviceId;
use crate::test::fake::{FIRST_DEVICE_ID, FakeDriver, Released};
use crate::test::fixture;

#[test]
fn enumeration_runs_exactly_once() {
    let (driver, runtime) = fixture(FakeDriver::with_devices(2));
    runtime.open("GPU:0").unwrap();
    runtime.open("GPU:1").unwrap();
    runtime.open("GPU").unwrap();
    assert_eq!(driver.counters().platform_queries, 1);
}

#[test]
fn index_suffix_selects_the_device() {
    let (_driver, runtime) = fixture(FakeDriver::with_devices(2));
    let a = runtime.open("GPU:0").unwrap();
    let b = runtime.open("GPU:1").unwrap();
    assert_eq!(a.device_id(), DeviceId(FIRST_DEVICE_ID));
    assert_eq!(b.device_id(), DeviceId(FIRST_DEVICE_ID + 1));
    assert_ne!(a.device_id(), b.device_id());

    // No suffix means index 0.
    assert_eq!(runtime.open("GPU").unwrap().device_id(), a.device_id());
}

#[test]
fn first_opened_device_is_the_compiler_context() {
    let (_driver, runtime) = fixture(FakeDriver::with_devices(2));
    assert_eq!(runtime.compiler_device(), None);

    let first = runtime.open("GPU:1").unwrap();
    runtime.open("GPU:0").unwrap();
    assert_eq!(runtime.compiler_device(), Some(first.device_id()));

    // The election is permanent.
    drop(first);
    assert_eq!(runtime.compiler_device(), Some(DeviceId(FIRST_DEVICE_ID + 1)));
}

#[test]
fn invalid_selections_are_rejected() {
    let (_driver, runtime) = fixture(FakeDriver::with_devices(1));
    assert!(matches!(runtime.open("GPU:3").unwrap_err(), Error::InvalidDevice { .. }));
    assert!(matches!(runtime.open("GPU:x").unwrap_err(), Error::InvalidDevice { .. }));
}

#[test]
fn dropping_a_device_releases_queue_then_context() {
    let (driver, runtime) = fixture(FakeDriver::with_devices(2));
    let _compiler = runtime.open("GPU:0").unwrap();
    let second = runtime.open("GPU:1").unwrap();

    drop(second);
    assert_eq!(driver.releases(), vec![Released::Queue, Released::Context]);
}

#[test]
fn compiler_context_outlives_its_device_handle() {
    let (driver, runtime) = fixture(FakeDriver::new());
    let device = runtime.open("GPU").unwrap();
    drop(device);

    // The runtime still holds the elected compiler context, so nothing has
    // been released and compilation still works.
    assert!(driver.releases().is_empty());
    runtime.compile(crate::test::KERNEL_SRC).unwrap();
}

#[test]
fn device_debug_output_names_its_handles() {
    let (_driver, runtime) = fixture(FakeDriver::new());
    let device = runtime.open("GPU").unwrap();
    let rendered = format!("{device:?}");
    assert!(rendered.contains("ClDevice"), "{rendered}");
    assert!(rendered.contains(&FIRST_DEVICE_ID.to_string()), "{rendered}");
}

#[test]
fn synchronize_finishes_the_queue() {
    let (driver, runtime) = fixture(FakeDriver::new());
    let device = runtime.open("GPU").unwrap();
    device.synchronize().unwrap();
    assert_eq!(driver.counters().finishes, 1);
}

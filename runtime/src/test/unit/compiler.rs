use crate::Error;
use crate::test::fake::FakeDriver;
use crate::test::{KERNEL_SRC, fixture};

#[test]
fn compile_requires_an_initialized_device() {
    let (_driver, runtime) = fixture(FakeDriver::new());
    let err = runtime.compile(KERNEL_SRC).unwrap_err();
    assert!(matches!(err, Error::CompilerContextMissing));
    assert!(err.to_string().contains("device must be initialized before compiling"));
}

#[test]
fn compile_is_memoized_by_source_text() {
    let (driver, runtime) = fixture(FakeDriver::new());
    runtime.open("GPU").unwrap();

    let first = runtime.compile(KERNEL_SRC).unwrap();
    let second = runtime.compile(KERNEL_SRC).unwrap();
    assert_eq!(first, second);
    assert_eq!(driver.counters().builds, 1, "cache hit must not re-invoke the compiler");

    // Different source is a different cache entry.
    runtime.compile("__kernel void other() { }").unwrap();
    assert_eq!(driver.counters().builds, 2);
}

#[test]
fn compile_through_the_device_handle_shares_the_cache() {
    let (driver, runtime) = fixture(FakeDriver::with_devices(2));
    let a = runtime.open("GPU:0").unwrap();
    let b = runtime.open("GPU:1").unwrap();

    let first = a.compile(KERNEL_SRC).unwrap();
    let second = b.compile(KERNEL_SRC).unwrap();
    assert_eq!(first, second);
    assert_eq!(driver.counters().builds, 1);
}

#[test]
fn failed_build_surfaces_the_build_log() {
    let (_driver, runtime) = fixture(FakeDriver::new().with_build_failure("ERR123"));
    runtime.open("GPU").unwrap();

    let err = runtime.compile(KERNEL_SRC).unwrap_err();
    match &err {
        Error::Compile { log } => assert_eq!(log, "ERR123"),
        other => panic!("expected compile error, got {other:?}"),
    }
    assert!(err.to_string().contains("ERR123"));
}

#[test]
fn intermediate_program_is_released_on_both_paths() {
    use crate::test::fake::Released;

    let (driver, runtime) = fixture(FakeDriver::new());
    runtime.open("GPU").unwrap();
    runtime.compile(KERNEL_SRC).unwrap();
    assert_eq!(driver.releases(), vec![Released::Program]);

    let (driver, runtime) = fixture(FakeDriver::new().with_build_failure("boom"));
    runtime.open("GPU").unwrap();
    runtime.compile(KERNEL_SRC).unwrap_err();
    assert_eq!(driver.releases(), vec![Released::Program]);
}

#[test]
fn failed_build_is_not_cached() {
    let (driver, runtime) = fixture(FakeDriver::new().with_build_failure("boom"));
    runtime.open("GPU").unwrap();
    runtime.compile(KERNEL_SRC).unwrap_err();
    runtime.compile(KERNEL_SRC).unwrap_err();
    assert_eq!(driver.counters().builds, 2);
}

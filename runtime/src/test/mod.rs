use std::sync::Arc;

use crate::ClRuntime;
use self::fake::FakeDriver;

mod unit;

pub(crate) const KERNEL_SRC: &str =
    "__kernel void add(__global float* a, __global float* b, int n) { }";

pub(crate) fn fixture(driver: FakeDriver) -> (Arc<FakeDriver>, Arc<ClRuntime>) {
    let driver = Arc::new(driver);
    let runtime = ClRuntime::new(driver.clone());
    (driver, runtime)
}

//! Program objects: loading a compiled binary for one device and dispatching
//! its entry point.

use std::sync::Arc;

use smallvec::SmallVec;
use snafu::ensure;

use crate::cl::{KernelId, MemId, ProfilingCounter, ProgramId};
use crate::device::DeviceState;
use crate::error::{DispatchRankMismatchSnafu, InvalidDispatchRankSnafu, Result, check, checked};

/// GPU profiling counters on macOS tick at a different rate than wall-clock
/// nanoseconds; elapsed times are scaled by this ratio.
#[cfg(target_os = "macos")]
pub const PROFILE_TIMING_RATIO: f64 = 125.0 / 3.0;
#[cfg(not(target_os = "macos"))]
pub const PROFILE_TIMING_RATIO: f64 = 1.0;

/// One positional kernel argument: a device memory handle or a 4-byte scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    Mem(MemId),
    Int(i32),
}

/// A compiled binary loaded for one device, with its entry point resolved.
pub struct ClProgram {
    state: Arc<DeviceState>,
    program: ProgramId,
    kernel: KernelId,
    name: String,
}

impl ClProgram {
    /// Load `binary` for the device and resolve `name` as the kernel entry
    /// point. The driver reports two independent statuses for the load (the
    /// per-binary status and the overall creation status); either failing is
    /// fatal with its embedded code.
    pub(crate) fn new(state: Arc<DeviceState>, name: &str, binary: &[u8]) -> Result<Self> {
        let (program, binary_status, status) =
            state.driver.create_program_with_binary(state.context, state.device_id, binary);
        let program = checked((program, status))?;

        let init = (|| {
            check(binary_status)?;
            // Required even for prebuilt binaries: at least one platform
            // (macOS) refuses to create kernels from an unbuilt program.
            check(state.driver.build_program(program, state.device_id))?;
            checked(state.driver.create_kernel(program, name))
        })();

        match init {
            Ok(kernel) => {
                tracing::debug!(kernel.name = %name, binary.len = binary.len(), "program loaded");
                Ok(Self { state, program, kernel, name: name.to_string() })
            }
            Err(err) => {
                if let Err(release_err) = check(state.driver.release_program(program)) {
                    tracing::error!(%release_err, "failed to release program after load failure");
                }
                Err(err)
            }
        }
    }

    /// Dispatch the kernel.
    ///
    /// Arguments bind by position. `global_size` has 1 to 3 dimensions; when
    /// `local_size` is given it must match the rank, and the effective
    /// per-dimension dispatch becomes `global_size[i] * local_size[i]` — the
    /// caller supplies work-group counts, and `local_size` is both the group
    /// shape and the multiplier.
    ///
    /// With `wait` the call blocks on a profiling event and returns the
    /// elapsed device time in seconds; without it the kernel is enqueued
    /// asynchronously and no timing is available.
    pub fn call(
        &self,
        args: &[Arg],
        global_size: &[usize],
        local_size: Option<&[usize]>,
        wait: bool,
    ) -> Result<Option<f64>> {
        let rank = global_size.len();
        ensure!((1..=3).contains(&rank), InvalidDispatchRankSnafu { rank });

        for (index, arg) in args.iter().enumerate() {
            let index = index as u32;
            match *arg {
                Arg::Mem(mem) => check(self.state.driver.set_kernel_arg_mem(self.kernel, index, mem))?,
                Arg::Int(value) => check(self.state.driver.set_kernel_arg_i32(self.kernel, index, value))?,
            }
        }

        let dispatch: SmallVec<[usize; 3]> = match local_size {
            Some(local) => {
                ensure!(
                    local.len() == rank,
                    DispatchRankMismatchSnafu { global: rank, local: local.len() }
                );
                global_size.iter().zip(local).map(|(g, l)| g * l).collect()
            }
            None => SmallVec::from_slice(global_size),
        };

        if !wait {
            check(self.state.driver.enqueue_kernel(self.state.queue, self.kernel, &dispatch, local_size))?;
            return Ok(None);
        }

        let event =
            checked(self.state.driver.enqueue_kernel_timed(self.state.queue, self.kernel, &dispatch, local_size))?;
        check(self.state.driver.wait_for_event(event))?;
        let start = checked(self.state.driver.event_profiling_ns(event, ProfilingCounter::CommandStart))?;
        let end = checked(self.state.driver.event_profiling_ns(event, ProfilingCounter::CommandEnd))?;
        check(self.state.driver.release_event(event))?;
        Ok(Some((end - start) as f64 * PROFILE_TIMING_RATIO * 1e-9))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ClProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClProgram")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("kernel", &self.kernel)
            .finish_non_exhaustive()
    }
}

impl Drop for ClProgram {
    fn drop(&mut self) {
        // Kernel before program: release order mirrors creation in reverse.
        if let Err(err) = check(self.state.driver.release_kernel(self.kernel)) {
            tracing::error!(kernel.name = %self.name, %err, "failed to release kernel");
        }
        if let Err(err) = check(self.state.driver.release_program(self.program)) {
            tracing::error!(kernel.name = %self.name, %err, "failed to release program");
        }
    }
}

//! Device lifecycle: one-time enumeration, compiler-context election, and the
//! composed per-device interface.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use snafu::OptionExt;

use crate::allocator::ClAllocator;
use crate::cl::{ContextId, DeviceId, Driver, PlatformId, QueueId};
use crate::compiler::{self, CompileCache};
use crate::error::{
    CompilerContextMissingSnafu, InvalidDeviceSnafu, NoPlatformSnafu, Result, check, checked,
};
use crate::program::ClProgram;

/// Host spans whose device-bound transfer has been enqueued but not yet
/// confirmed complete.
///
/// `register` is append-only; the list is cleared only by `drain`, which the
/// device calls strictly after the queue has been confirmed empty. Freeing a
/// registered span before that confirmation would let the driver read from
/// reclaimed memory, so the device retains a reference instead of copying.
#[derive(Debug, Default)]
pub struct PendingCopies {
    spans: Mutex<Vec<Arc<[u8]>>>,
}

impl PendingCopies {
    pub(crate) fn register(&self, span: Arc<[u8]>) {
        self.spans.lock().push(span);
    }

    pub(crate) fn drain(&self) {
        self.spans.lock().clear();
    }

    /// Number of spans still awaiting transfer confirmation.
    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Driver resources shared between a device, its allocator, and the programs
/// built for it.
pub(crate) struct DeviceState {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) device_id: DeviceId,
    pub(crate) context: ContextId,
    pub(crate) queue: QueueId,
    pub(crate) pending_copyin: PendingCopies,
}

impl DeviceState {
    /// Block until the queue drains, then release the pending copy-in spans.
    /// The order is load-bearing: sources may only be reclaimed once the
    /// device has confirmed every enqueued transfer.
    pub(crate) fn synchronize(&self) -> Result<()> {
        check(self.driver.finish(self.queue))?;
        self.pending_copyin.drain();
        Ok(())
    }
}

impl Drop for DeviceState {
    fn drop(&mut self) {
        // Release order mirrors creation order in reverse: queue, then context.
        if let Err(err) = check(self.driver.release_queue(self.queue)) {
            tracing::error!(%err, "failed to release command queue");
        }
        if let Err(err) = check(self.driver.release_context(self.context)) {
            tracing::error!(%err, "failed to release context");
        }
    }
}

/// Process-wide OpenCL state: the write-once list of discovered devices, the
/// write-once compiler context, and the source-keyed compile cache.
///
/// Production code creates exactly one `ClRuntime` per process and opens
/// devices through it. Concurrent first-time opens are not guarded against;
/// device construction is assumed to happen from a single initialization path.
pub struct ClRuntime {
    driver: Arc<dyn Driver>,
    device_ids: OnceCell<Vec<DeviceId>>,
    compiler_context: OnceCell<Arc<DeviceState>>,
    compile_cache: CompileCache,
}

impl ClRuntime {
    pub fn new(driver: Arc<dyn Driver>) -> Arc<Self> {
        Arc::new(Self {
            driver,
            device_ids: OnceCell::new(),
            compiler_context: OnceCell::new(),
            compile_cache: CompileCache::new(),
        })
    }

    /// Open the device selected by `spec`, a name with an optional `:index`
    /// suffix (`"GPU"`, `"GPU:1"`). No suffix selects index 0.
    ///
    /// The first call ever enumerates the platform's default-type devices and
    /// caches the identifier list; later calls reuse it. The first device
    /// opened is elected compiler context for the rest of the process.
    pub fn open(self: &Arc<Self>, spec: &str) -> Result<ClDevice> {
        let ids = self.device_ids.get_or_try_init(|| self.enumerate())?;
        let index = parse_index(spec)?;
        let device_id = *ids.get(index).context(InvalidDeviceSnafu { device: spec })?;

        let context = checked(self.driver.create_context(device_id))?;
        let queue = match checked(self.driver.create_queue(context, device_id, true)) {
            Ok(queue) => queue,
            Err(err) => {
                if let Err(release_err) = check(self.driver.release_context(context)) {
                    tracing::error!(%release_err, "failed to release context after queue creation failure");
                }
                return Err(err);
            }
        };

        let state = Arc::new(DeviceState {
            driver: self.driver.clone(),
            device_id,
            context,
            queue,
            pending_copyin: PendingCopies::default(),
        });

        // All contexts are assumed interchangeable for compilation, so the
        // first one opened serves every compile request.
        self.compiler_context.get_or_init(|| state.clone());

        tracing::debug!(device = %spec, device.id = device_id.0, "opened OpenCL device");
        Ok(ClDevice { runtime: self.clone(), allocator: ClAllocator::new(state.clone()), state })
    }

    /// Compile kernel source to a device binary, memoized by exact source
    /// text. A cache hit returns the stored bytes without touching the driver.
    pub fn compile(&self, source: &str) -> Result<Arc<[u8]>> {
        self.compile_cache.get_or_compile(source, || {
            let compiler = self.compiler_context.get().context(CompilerContextMissingSnafu)?;
            compiler::compile(self.driver.as_ref(), compiler, source)
        })
    }

    /// Identifier of the elected compiler-context device, if any device has
    /// been opened yet.
    pub fn compiler_device(&self) -> Option<DeviceId> {
        self.compiler_context.get().map(|state| state.device_id)
    }

    fn enumerate(&self) -> Result<Vec<DeviceId>> {
        let platform_count = checked(self.driver.platform_count())?;
        let platforms = checked(self.driver.platform_ids(platform_count))?;
        let platform: PlatformId = *platforms.first().context(NoPlatformSnafu)?;
        let device_count = checked(self.driver.device_count(platform))?;
        let ids = checked(self.driver.device_ids(platform, device_count))?;
        tracing::debug!(devices = ids.len(), "enumerated OpenCL devices");
        Ok(ids)
    }
}

fn parse_index(spec: &str) -> Result<usize> {
    match spec.split_once(':') {
        None => Ok(0),
        Some((_, index)) => index.parse().ok().context(InvalidDeviceSnafu { device: spec }),
    }
}

/// One opened device: a driver context, a profiling command queue, and the
/// composed interface consumers use (allocator, compile, program, synchronize).
pub struct ClDevice {
    runtime: Arc<ClRuntime>,
    state: Arc<DeviceState>,
    allocator: ClAllocator,
}

impl ClDevice {
    pub fn allocator(&self) -> &ClAllocator {
        &self.allocator
    }

    /// Compile kernel source through the runtime's shared compiler context.
    pub fn compile(&self, source: &str) -> Result<Arc<[u8]>> {
        self.runtime.compile(source)
    }

    /// Load a compiled binary for this device and resolve `name` as its entry
    /// point.
    pub fn program(&self, name: &str, binary: &[u8]) -> Result<ClProgram> {
        ClProgram::new(self.state.clone(), name, binary)
    }

    /// Block until all enqueued work completes, then release the pending
    /// copy-in sources.
    pub fn synchronize(&self) -> Result<()> {
        self.state.synchronize()
    }

    /// Host spans still pinned for in-flight copy-in transfers.
    pub fn pending_copies(&self) -> usize {
        self.state.pending_copyin.len()
    }

    pub fn device_id(&self) -> DeviceId {
        self.state.device_id
    }
}

impl std::fmt::Debug for ClDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClDevice")
            .field("device_id", &self.state.device_id)
            .field("context", &self.state.context)
            .field("queue", &self.state.queue)
            .field("pending_copies", &self.state.pending_copyin.len())
            .finish_non_exhaustive()
    }
}

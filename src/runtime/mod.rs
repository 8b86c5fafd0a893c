//! Chunk runtime
//!
//! [`ChunkRuntime`] assembles one runtime instance from a [`RuntimeConfig`]
//! and the host's [`Capabilities`]: a shared chunk registry and module
//! registry, plus the load, hint, hot-update and deferred-execution
//! controllers operating on them.
//!
//! Batches reach the runtime through a [`PushQueue`] it has been installed on.
//! Installing a batch marks its chunks loaded, installs its modules, runs its
//! runtime addition, settles the loads it completes and then re-evaluates the
//! deferred entry list.

pub mod deferred;
pub mod hints;
pub mod load;
pub mod promise;
pub mod queue;

use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::chunk::{ChunkId, ChunkRegistry, ChunkStatus, SharedChunkRegistry};
use crate::config::{RuntimeConfig, RuntimeFeatures};
use crate::error::Result;
use crate::hmr::HotUpdateController;
use crate::modules::{Exports, ModuleRegistry};
use crate::platform::Capabilities;

pub use deferred::{DeferredEntry, DeferredExecutionScheduler, SchedulerPhase, StartupRoutine};
pub use hints::{HintKind, ResourceHintScheduler};
pub use load::LoadController;
pub use promise::{Promise, PromiseState, Resolver};
pub use queue::{ChunkBatch, CompletionHandler, PushQueue};

struct RuntimeInner {
    config: Rc<RuntimeConfig>,
    chunks: SharedChunkRegistry,
    modules: ModuleRegistry,
    loads: LoadController,
    hints: ResourceHintScheduler,
    deferred: DeferredExecutionScheduler,
    hot: Option<HotUpdateController>,
}

/// One runtime instance. Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct ChunkRuntime {
    inner: Rc<RuntimeInner>,
}

impl ChunkRuntime {
    pub fn new(config: RuntimeConfig, capabilities: Capabilities) -> Self {
        let chunks = ChunkRegistry::with_installed(config.installed_chunks.iter().cloned()).into_shared();
        let config = Rc::new(config);
        let modules = ModuleRegistry::new();

        let Capabilities {
            script_loader,
            hinter,
            fetcher,
        } = capabilities;

        let hot = config.features.contains(RuntimeFeatures::HMR).then(|| {
            HotUpdateController::new(
                Rc::clone(&chunks),
                modules.clone(),
                Rc::clone(&config),
                script_loader.clone(),
                fetcher,
            )
        });

        debug!(
            features = ?config.features,
            installed = config.installed_chunks.len(),
            "chunk runtime created"
        );

        Self {
            inner: Rc::new(RuntimeInner {
                loads: LoadController::new(Rc::clone(&chunks), Rc::clone(&config), script_loader),
                hints: ResourceHintScheduler::new(Rc::clone(&chunks), Rc::clone(&config), hinter),
                deferred: DeferredExecutionScheduler::new(Rc::clone(&chunks), modules.clone()),
                hot,
                config,
                chunks,
                modules,
            }),
        }
    }

    /// Register this runtime on a push channel, first installing every batch
    /// already pushed on it
    pub fn install(&self, queue: &PushQueue) -> Result<()> {
        queue.register(Rc::new(self.clone()))
    }

    /// Ensure a chunk is available. While an update is being collected this
    /// also fetches the chunk's pending hot update.
    #[track_caller]
    pub fn ensure_chunk(&self, id: &ChunkId) -> Result<Promise<()>> {
        let load = self.inner.loads.ensure_chunk(id)?;
        if let Some(hot) = &self.inner.hot {
            if let Some(update) = hot.ensure_hook(id)? {
                return Ok(Promise::all(vec![load, update]));
            }
        }
        Ok(load)
    }

    /// Ensure several chunks; settles once all are available
    #[track_caller]
    pub fn ensure_chunks(&self, ids: &[ChunkId]) -> Result<Promise<()>> {
        let mut loads = Vec::with_capacity(ids.len());
        for id in ids {
            loads.push(self.ensure_chunk(id)?);
        }
        Ok(Promise::all(loads))
    }

    pub fn preload(&self, id: &ChunkId) -> Result<bool> {
        self.inner.hints.preload(id)
    }

    pub fn prefetch(&self, id: &ChunkId) -> Result<bool> {
        self.inner.hints.prefetch(id)
    }

    pub fn register_startup(&self, routine: StartupRoutine) {
        self.inner.deferred.register_startup(routine);
    }

    /// Start the application: arms deferred evaluation and runs a pass.
    /// Without deferred execution the startup routines run directly.
    pub fn startup(&self) -> Result<Option<Exports>> {
        if !self.inner.config.features.contains(RuntimeFeatures::DEFER) {
            self.inner.deferred.fire_startup()?;
            return Ok(None);
        }
        self.inner.deferred.startup()
    }

    pub fn check_deferred_modules(&self) -> Result<Option<Exports>> {
        self.inner.deferred.check_deferred_modules()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.inner.modules
    }

    pub fn chunk_status(&self, id: &ChunkId) -> ChunkStatus {
        self.inner.chunks.borrow().status(id)
    }

    /// Hot-update controller, present when `HMR` is enabled
    pub fn hot(&self) -> Option<&HotUpdateController> {
        self.inner.hot.as_ref()
    }

    pub fn deferred(&self) -> &DeferredExecutionScheduler {
        &self.inner.deferred
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    fn handle_batch(&self, batch: &ChunkBatch) -> Result<Option<Exports>> {
        for (id, factory) in &batch.more_modules {
            self.inner.modules.install(id.clone(), Rc::clone(factory));
        }
        if let Some(runtime) = &batch.runtime {
            runtime(&self.inner.modules);
        }

        let completed = self.inner.loads.mark_loaded(&batch.chunk_ids);
        debug!(
            chunk_ids = ?batch.chunk_ids,
            modules = batch.more_modules.len(),
            completed = completed.len(),
            "installed chunk batch"
        );
        for pending in completed {
            pending.resolver.resolve(());
        }

        if batch.deferred_entries.is_empty() {
            return self.inner.deferred.check_deferred_modules();
        }
        if !self.inner.config.features.contains(RuntimeFeatures::DEFER) {
            warn!(
                entries = batch.deferred_entries.len(),
                "deferred execution disabled, ignoring entries"
            );
            return Ok(None);
        }
        self.inner
            .deferred
            .add_entries(batch.deferred_entries.iter().cloned());
        self.inner.deferred.check_deferred_modules()
    }
}

impl CompletionHandler for ChunkRuntime {
    fn on_batch(&self, batch: &ChunkBatch) -> Result<Option<Exports>> {
        self.handle_batch(batch)
    }
}

impl fmt::Debug for ChunkRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkRuntime")
            .field("features", &self.inner.config.features)
            .field("chunks", &self.inner.chunks.borrow().len())
            .field("modules", &self.inner.modules)
            .field("deferred", &self.inner.deferred)
            .field("hot", &self.inner.hot)
            .finish()
    }
}

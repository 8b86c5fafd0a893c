//! On-demand chunk loading
//!
//! `ensure_chunk` starts at most one script load per chunk; every caller that
//! arrives while it is in flight shares the same pending promise. The load is
//! completed by a batch arriving on the push channel and failed by the
//! script's completion callback if no batch arrived first.

use std::panic::Location;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::chunk::{ChunkId, ChunkState, ChunkStatus, PendingLoad, SharedChunkRegistry};
use crate::config::{RuntimeConfig, RuntimeFeatures};
use crate::error::{Capability, ChunkLoadKind, Error, FailureType, Result};
use crate::platform::{ScriptCallback, ScriptLoader, ScriptOutcome};
use crate::runtime::promise::Promise;

/// Classify a finished script that did not deliver its payload.
///
/// Returns the failure subtype and the address to report: the one named by
/// the event when present, otherwise the one requested.
pub(crate) fn classify_outcome(outcome: ScriptOutcome, requested: &str) -> (FailureType, String) {
    match outcome {
        ScriptOutcome::Loaded => (FailureType::Missing, requested.to_string()),
        ScriptOutcome::Failed(event) => (
            FailureType::classify(&event.event_type),
            event.src.unwrap_or_else(|| requested.to_string()),
        ),
    }
}

pub struct LoadController {
    chunks: SharedChunkRegistry,
    config: Rc<RuntimeConfig>,
    loader: Option<Rc<dyn ScriptLoader>>,
}

impl LoadController {
    pub fn new(
        chunks: SharedChunkRegistry,
        config: Rc<RuntimeConfig>,
        loader: Option<Rc<dyn ScriptLoader>>,
    ) -> Self {
        Self {
            chunks,
            config,
            loader,
        }
    }

    pub fn status(&self, id: &ChunkId) -> ChunkStatus {
        self.chunks.borrow().status(id)
    }

    /// Ensure a chunk is available.
    ///
    /// The returned promise settles once the chunk's batch has been
    /// installed, or rejects with [`Error::ChunkLoad`] if its script failed.
    /// A failure is attributed to the location of this call.
    #[track_caller]
    pub fn ensure_chunk(&self, id: &ChunkId) -> Result<Promise<()>> {
        let location = Location::caller();

        if !self.config.features.contains(RuntimeFeatures::LOADING) {
            trace!(chunk_id = %id, "on-demand loading disabled");
            return Ok(Promise::resolved(()));
        }

        {
            let mut chunks = self.chunks.borrow_mut();
            match chunks.get(id) {
                Some(ChunkState::Loaded) => return Ok(Promise::resolved(())),
                Some(ChunkState::Loading(pending)) => {
                    trace!(chunk_id = %id, attempt = pending.attempt, "joining in-flight load");
                    return Ok(pending.promise.clone());
                }
                _ => {}
            }

            if !self.config.js_chunks.matches(id) {
                trace!(chunk_id = %id, "chunk carries no script");
                chunks.mark_loaded(id.clone());
                return Ok(Promise::resolved(()));
            }
        }

        let loader = self
            .loader
            .clone()
            .ok_or(Error::MissingCapability(Capability::ScriptLoader))?;

        let url = self.config.chunk_url(id);
        let pending = self.chunks.borrow_mut().begin_loading(id.clone());
        let on_done = self.completion_callback(id.clone(), pending.attempt, url.clone(), location);

        debug!(chunk_id = %id, url = %url, attempt = pending.attempt, "loading chunk");
        loader.load_script(&url, on_done, &format!("chunk-{}", id), Some(id));
        Ok(pending.promise)
    }

    /// Mark chunks delivered by a batch as loaded. Returns the loads they
    /// complete, in batch order; the caller resolves them once the batch's
    /// modules are installed.
    pub fn mark_loaded(&self, ids: &[ChunkId]) -> Vec<PendingLoad> {
        let mut chunks = self.chunks.borrow_mut();
        ids.iter()
            .filter_map(|id| chunks.mark_loaded(id.clone()))
            .collect()
    }

    fn completion_callback(
        &self,
        id: ChunkId,
        attempt: u64,
        url: String,
        location: &'static Location<'static>,
    ) -> ScriptCallback {
        let chunks = Rc::clone(&self.chunks);
        Box::new(move |outcome| {
            let failed = chunks.borrow_mut().fail(&id, attempt);
            let Some(pending) = failed else {
                trace!(chunk_id = %id, attempt, "script finished after its load settled");
                return;
            };

            let (subtype, request) = classify_outcome(outcome, &url);
            warn!(chunk_id = %id, subtype = %subtype, request = %request, "chunk load failed");
            pending.resolver.reject(Error::chunk_load(
                ChunkLoadKind::Chunk,
                subtype,
                id,
                request,
                location,
            ));
        })
    }
}

//! Push/completion channel
//!
//! Loaded chunk scripts report their payload by pushing a [`ChunkBatch`].
//! The queue keeps every batch it has seen: a handler registered late first
//! receives the whole history, then every later push. Several runtime
//! instances can share one queue; pushes reach them in registration order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::chunk::ChunkId;
use crate::error::{Error, Result};
use crate::modules::{Exports, ModuleFactory, ModuleId, RuntimeAddition};
use crate::runtime::deferred::DeferredEntry;

/// Payload delivered by a loaded chunk
#[derive(Clone, Default)]
pub struct ChunkBatch {
    pub chunk_ids: Vec<ChunkId>,
    pub more_modules: Vec<(ModuleId, ModuleFactory)>,
    pub runtime: Option<RuntimeAddition>,
    pub deferred_entries: Vec<DeferredEntry>,
}

impl ChunkBatch {
    pub fn new(chunk_ids: impl IntoIterator<Item = ChunkId>) -> Self {
        Self {
            chunk_ids: chunk_ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_module(mut self, id: impl Into<ModuleId>, factory: ModuleFactory) -> Self {
        self.more_modules.push((id.into(), factory));
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeAddition) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_deferred(mut self, entry: DeferredEntry) -> Self {
        self.deferred_entries.push(entry);
        self
    }
}

impl fmt::Debug for ChunkBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkBatch")
            .field("chunk_ids", &self.chunk_ids)
            .field(
                "more_modules",
                &self.more_modules.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .field("runtime", &self.runtime.is_some())
            .field("deferred_entries", &self.deferred_entries)
            .finish()
    }
}

/// Receives batches pushed on a [`PushQueue`]
pub trait CompletionHandler {
    /// Handle one batch; may return the exports of an entry module it executed
    fn on_batch(&self, batch: &ChunkBatch) -> Result<Option<Exports>>;
}

#[derive(Default)]
struct QueueInner {
    batches: Vec<Rc<ChunkBatch>>,
    handlers: Vec<Rc<dyn CompletionHandler>>,
}

/// Shared push channel
#[derive(Clone, Default)]
pub struct PushQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl PushQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, first draining every batch pushed so far into it.
    /// The handler is registered even if a drained batch fails; the first
    /// such error is returned.
    pub fn register(&self, handler: Rc<dyn CompletionHandler>) -> Result<()> {
        let mut first_error: Option<Error> = None;
        let mut index = 0;
        loop {
            let batch = self.inner.borrow().batches.get(index).cloned();
            let Some(batch) = batch else {
                break;
            };
            if let Err(e) = handler.on_batch(&batch) {
                warn!(error = %e, chunk_ids = ?batch.chunk_ids, "drained batch failed");
                first_error.get_or_insert(e);
            }
            index += 1;
        }
        trace!(drained = index, "completion handler registered");
        self.inner.borrow_mut().handlers.push(handler);
        first_error.map_or(Ok(()), Err)
    }

    /// Deliver a batch to every registered handler, in registration order.
    /// Returns the last entry-module exports any handler produced, or the
    /// first handler error once every handler has seen the batch.
    pub fn push(&self, batch: ChunkBatch) -> Result<Option<Exports>> {
        let batch = Rc::new(batch);
        let handlers = {
            let mut inner = self.inner.borrow_mut();
            inner.batches.push(Rc::clone(&batch));
            inner.handlers.clone()
        };

        let mut result = None;
        let mut first_error: Option<Error> = None;
        for handler in handlers {
            match handler.on_batch(&batch) {
                Ok(Some(exports)) => result = Some(exports),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, chunk_ids = ?batch.chunk_ids, "completion handler failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    /// Number of batches pushed so far
    pub fn len(&self) -> usize {
        self.inner.borrow().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().batches.is_empty()
    }

    pub fn handler_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }
}

impl fmt::Debug for PushQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushQueue")
            .field("batches", &self.len())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

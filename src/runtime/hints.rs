//! Resource hints
//!
//! Preload and prefetch directives for chunks that have not been requested
//! yet. A hint places a soft reservation on the chunk so the same chunk is
//! never hinted twice, but it never blocks a later real load.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::chunk::{ChunkId, ChunkStatus, SharedChunkRegistry};
use crate::config::{RuntimeConfig, RuntimeFeatures};
use crate::error::{Capability, Error, Result};
use crate::platform::{ResourceHint, ResourceHinter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintKind {
    Preload,
    Prefetch,
}

impl fmt::Display for HintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HintKind::Preload => write!(f, "preload"),
            HintKind::Prefetch => write!(f, "prefetch"),
        }
    }
}

pub struct ResourceHintScheduler {
    chunks: SharedChunkRegistry,
    config: Rc<RuntimeConfig>,
    hinter: Option<Rc<dyn ResourceHinter>>,
}

impl ResourceHintScheduler {
    pub fn new(
        chunks: SharedChunkRegistry,
        config: Rc<RuntimeConfig>,
        hinter: Option<Rc<dyn ResourceHinter>>,
    ) -> Self {
        Self {
            chunks,
            config,
            hinter,
        }
    }

    /// Issue a hint for `id`. Returns whether one was emitted.
    pub fn hint(&self, id: &ChunkId, kind: HintKind) -> Result<bool> {
        let feature = match kind {
            HintKind::Preload => RuntimeFeatures::PRELOAD,
            HintKind::Prefetch => RuntimeFeatures::PREFETCH,
        };
        if !self.config.features.contains(feature) || !self.config.js_chunks.matches(id) {
            return Ok(false);
        }
        if self.chunks.borrow().status(id) != ChunkStatus::NotLoaded {
            return Ok(false);
        }

        let hinter = self
            .hinter
            .clone()
            .ok_or(Error::MissingCapability(Capability::ResourceHinter))?;

        if !self.chunks.borrow_mut().reserve(id.clone(), kind) {
            return Ok(false);
        }

        let hint = self.build_hint(id, kind);
        debug!(chunk_id = %id, kind = %kind, href = %hint.href, "emitting resource hint");
        hinter.emit(&hint);
        Ok(true)
    }

    pub fn preload(&self, id: &ChunkId) -> Result<bool> {
        self.hint(id, HintKind::Preload)
    }

    pub fn prefetch(&self, id: &ChunkId) -> Result<bool> {
        self.hint(id, HintKind::Prefetch)
    }

    fn build_hint(&self, id: &ChunkId, kind: HintKind) -> ResourceHint {
        let href = self.config.chunk_url(id);
        let nonce = self.config.nonce.clone();
        match kind {
            HintKind::Prefetch => ResourceHint {
                kind,
                destination: "script",
                content_type: None,
                charset: None,
                cross_origin: self.config.cross_origin_loading,
                nonce,
                href,
            },
            HintKind::Preload => {
                // same-origin preloads must not carry a cross-origin policy
                let cross_origin = self
                    .config
                    .cross_origin_loading
                    .filter(|_| !self.config.is_same_origin(&href));
                ResourceHint {
                    kind,
                    destination: "script",
                    content_type: self.config.script_type.clone(),
                    charset: Some("utf-8"),
                    cross_origin,
                    nonce,
                    href,
                }
            }
        }
    }
}

//! Chunk Registry
//!
//! Per-chunk load state. Entries are created on first reference and are
//! never removed, only transitioned:
//!
//! ```text
//! NotLoaded ──ensure──> Loading ──batch──> Loaded
//!     │                    │
//!     │                    └──failure──> NotLoaded   (retryable)
//!     └──hint──> Preloaded | Prefetched ──ensure──> Loading
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap as HashMap;

use crate::id::opaque_id;
use crate::runtime::hints::HintKind;
use crate::runtime::promise::{Promise, Resolver};

opaque_id!(
    /// Identifier of an independently loadable chunk, unique within a build
    ChunkId
);

/// The single in-flight load of a chunk
#[derive(Debug, Clone)]
pub struct PendingLoad {
    /// Distinguishes successive attempts on the same chunk
    pub attempt: u64,
    pub promise: Promise<()>,
    pub resolver: Resolver<()>,
}

/// Load state of one chunk
#[derive(Debug, Clone, Default)]
pub enum ChunkState {
    #[default]
    NotLoaded,
    Loading(PendingLoad),
    Loaded,
    Preloaded,
    Prefetched,
}

/// Payload-free view of a [`ChunkState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    NotLoaded,
    Loading,
    Loaded,
    Preloaded,
    Prefetched,
}

impl ChunkState {
    pub fn status(&self) -> ChunkStatus {
        match self {
            ChunkState::NotLoaded => ChunkStatus::NotLoaded,
            ChunkState::Loading(_) => ChunkStatus::Loading,
            ChunkState::Loaded => ChunkStatus::Loaded,
            ChunkState::Preloaded => ChunkStatus::Preloaded,
            ChunkState::Prefetched => ChunkStatus::Prefetched,
        }
    }
}

/// Chunk registry shared by the controllers of one runtime
pub type SharedChunkRegistry = Rc<RefCell<ChunkRegistry>>;

#[derive(Debug, Default)]
pub struct ChunkRegistry {
    chunks: HashMap<ChunkId, ChunkState>,
    next_attempt: u64,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where `ids` are already loaded
    pub fn with_installed(ids: impl IntoIterator<Item = ChunkId>) -> Self {
        let mut registry = Self::new();
        for id in ids {
            registry.chunks.insert(id, ChunkState::Loaded);
        }
        registry
    }

    pub fn into_shared(self) -> SharedChunkRegistry {
        Rc::new(RefCell::new(self))
    }

    pub fn get(&self, id: &ChunkId) -> Option<&ChunkState> {
        self.chunks.get(id)
    }

    /// Status of a chunk; unreferenced chunks are `NotLoaded`
    pub fn status(&self, id: &ChunkId) -> ChunkStatus {
        self.chunks
            .get(id)
            .map(ChunkState::status)
            .unwrap_or(ChunkStatus::NotLoaded)
    }

    pub fn is_loaded(&self, id: &ChunkId) -> bool {
        self.status(id) == ChunkStatus::Loaded
    }

    /// Whether the chunk has been referenced at all
    pub fn contains(&self, id: &ChunkId) -> bool {
        self.chunks.contains_key(id)
    }

    pub fn pending(&self, id: &ChunkId) -> Option<&PendingLoad> {
        match self.chunks.get(id) {
            Some(ChunkState::Loading(pending)) => Some(pending),
            _ => None,
        }
    }

    /// Start a new load attempt. The caller must have checked that the
    /// chunk is neither loaded nor loading.
    pub fn begin_loading(&mut self, id: ChunkId) -> PendingLoad {
        debug_assert!(!matches!(
            self.chunks.get(&id),
            Some(ChunkState::Loaded | ChunkState::Loading(_))
        ));
        self.next_attempt += 1;
        let (promise, resolver) = Promise::pending();
        let pending = PendingLoad {
            attempt: self.next_attempt,
            promise,
            resolver,
        };
        self.chunks.insert(id, ChunkState::Loading(pending.clone()));
        pending
    }

    /// Mark a chunk loaded, handing back the load it completes (if any)
    pub fn mark_loaded(&mut self, id: ChunkId) -> Option<PendingLoad> {
        match self.chunks.insert(id, ChunkState::Loaded) {
            Some(ChunkState::Loading(pending)) => Some(pending),
            _ => None,
        }
    }

    /// Revert a failed attempt to `NotLoaded`. Returns the failed load only
    /// if `attempt` is still the chunk's current load.
    pub fn fail(&mut self, id: &ChunkId, attempt: u64) -> Option<PendingLoad> {
        let current = matches!(
            self.chunks.get(id),
            Some(ChunkState::Loading(pending)) if pending.attempt == attempt
        );
        if !current {
            return None;
        }
        match self.chunks.insert(id.clone(), ChunkState::NotLoaded) {
            Some(ChunkState::Loading(pending)) => Some(pending),
            _ => None,
        }
    }

    /// Place a soft reservation for a hint. Only `NotLoaded` chunks accept one.
    pub fn reserve(&mut self, id: ChunkId, kind: HintKind) -> bool {
        if self.status(&id) != ChunkStatus::NotLoaded {
            return false;
        }
        let state = match kind {
            HintKind::Preload => ChunkState::Preloaded,
            HintKind::Prefetch => ChunkState::Prefetched,
        };
        self.chunks.insert(id, state);
        true
    }

    /// Record a reference without changing an existing state
    pub fn touch(&mut self, id: ChunkId) {
        self.chunks.entry(id).or_default();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ChunkId> {
        self.chunks.keys()
    }
}

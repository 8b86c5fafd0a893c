//! Prelude module for convenient imports
//!
//! ```no_run
//! use quickload::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let runtime = ChunkRuntime::new(RuntimeConfig::default(), Capabilities::new());
//!     runtime.startup()?;
//!     Ok(())
//! }
//! ```

// Runtime
pub use crate::runtime::{
    ChunkBatch, ChunkRuntime, CompletionHandler, DeferredEntry, HintKind, Promise, PromiseState,
    PushQueue, Resolver, StartupRoutine,
};

// Identifiers and state
pub use crate::chunk::{ChunkId, ChunkStatus};
pub use crate::modules::{factory, Exports, ModuleFactory, ModuleId, ModuleRegistry, RuntimeAddition};

// Error handling
pub use crate::error::{Capability, ChunkLoadKind, Error, FailureType, Result};

// Configuration
pub use crate::config::{CrossOriginLoading, JsChunkMatcher, RuntimeConfig, RuntimeFeatures};

// Host capabilities
pub use crate::platform::{
    Capabilities, FetchResponse, ManifestFetcher, ResourceHint, ResourceHinter, ScriptCallback,
    ScriptEvent, ScriptLoader, ScriptOutcome,
};

// Hot updates
pub use crate::hmr::{HotUpdateBatch, HotUpdateController, UpdateManifest, UpdateOutcome};

// Version constant
pub use crate::VERSION;

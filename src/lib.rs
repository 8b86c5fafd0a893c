//! Quickload: a chunk-loading and hot-update runtime written in Rust
//!
//! Quickload is the client half of a code-splitting build. Applications ask
//! for chunks on demand, the host environment fetches and executes them, and
//! each loaded chunk pushes a batch of module factories back into the
//! runtime. On top of that sit resource hints, hot-update delivery and
//! deferred entry execution.
//!
//! All I/O is injected through [`Capabilities`]. The runtime is
//! single-threaded: every pending operation is a shared [`Promise`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::rc::Rc;
//! use quickload::prelude::*;
//!
//! struct HostLoader;
//!
//! impl ScriptLoader for HostLoader {
//!     fn load_script(&self, url: &str, on_done: ScriptCallback, _key: &str, _chunk: Option<&ChunkId>) {
//!         println!("fetching {}", url);
//!         on_done(ScriptOutcome::Loaded);
//!     }
//! }
//!
//! fn main() -> quickload::Result<()> {
//!     let config = RuntimeConfig::default().with_public_path("/static/");
//!     let runtime = ChunkRuntime::new(config, Capabilities::new().with_script_loader(Rc::new(HostLoader)));
//!     let queue = PushQueue::new();
//!     runtime.install(&queue)?;
//!
//!     let load = runtime.ensure_chunk(&ChunkId::from("vendors"))?;
//!     println!("{:?}", load.state());
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **State** | [`chunk`], [`modules`] |
//! | **Runtime** | [`runtime`] (loading, hints, deferred execution, push channel, promises) |
//! | **Updates** | [`hmr`] |
//! | **Host** | [`platform`], [`config`] |
#![allow(clippy::type_complexity)]

pub mod chunk;
pub mod config;
pub mod hmr;
pub mod modules;
pub mod platform;
pub mod prelude;
pub mod runtime;

mod error;
mod id;

pub use error::{Capability, ChunkLoadKind, Error, FailureType, Result};
pub use runtime::{ChunkRuntime, Promise, PromiseState};
pub use platform::Capabilities;

/// Quickload version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

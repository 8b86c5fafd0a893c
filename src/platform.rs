//! Host Capabilities
//!
//! The runtime never performs I/O itself. The host supplies the primitives
//! below at construction time, bundled in [`Capabilities`]; any of them may
//! be absent, in which case the operations that need it fail synchronously
//! with [`Error::MissingCapability`](crate::Error::MissingCapability).

use std::fmt;
use std::rc::Rc;

use crate::chunk::ChunkId;
use crate::config::CrossOriginLoading;
use crate::runtime::hints::HintKind;
use crate::runtime::promise::Promise;

// ---------------------------------------------------------------------------
// Script loading
// ---------------------------------------------------------------------------

/// Event reported when a script element finishes without success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEvent {
    /// Event type as reported by the environment (`load`, `error`, `timeout`, ...)
    pub event_type: String,
    /// Address of the script the event originated from
    pub src: Option<String>,
}

impl ScriptEvent {
    pub fn new(event_type: impl Into<String>, src: Option<String>) -> Self {
        Self {
            event_type: event_type.into(),
            src,
        }
    }
}

/// How a script load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The script executed. Whether it delivered the expected payload is
    /// judged by the runtime.
    Loaded,
    Failed(ScriptEvent),
}

/// Completion callback handed to a [`ScriptLoader`]
pub type ScriptCallback = Box<dyn FnOnce(ScriptOutcome)>;

/// Fetches and executes a script.
///
/// Implementations must invoke `on_done` exactly once.
pub trait ScriptLoader {
    fn load_script(&self, url: &str, on_done: ScriptCallback, key: &str, chunk_id: Option<&ChunkId>);
}

// ---------------------------------------------------------------------------
// Resource hints
// ---------------------------------------------------------------------------

/// A preload/prefetch directive, fire-and-forget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHint {
    pub kind: HintKind,
    pub href: String,
    /// Destination (`as` attribute)
    pub destination: &'static str,
    pub content_type: Option<String>,
    pub charset: Option<&'static str>,
    pub cross_origin: Option<CrossOriginLoading>,
    pub nonce: Option<String>,
}

pub trait ResourceHinter {
    fn emit(&self, hint: &ResourceHint);
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// HTTP response as seen by the manifest fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = match status {
            200 => "OK",
            204 => "No Content",
            304 => "Not Modified",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
        .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests
pub trait ManifestFetcher {
    fn fetch(&self, url: &str) -> Promise<FetchResponse>;
}

// ---------------------------------------------------------------------------
// Capability bundle
// ---------------------------------------------------------------------------

/// Primitives injected into a runtime
#[derive(Clone, Default)]
pub struct Capabilities {
    pub script_loader: Option<Rc<dyn ScriptLoader>>,
    pub hinter: Option<Rc<dyn ResourceHinter>>,
    pub fetcher: Option<Rc<dyn ManifestFetcher>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_loader(mut self, loader: Rc<dyn ScriptLoader>) -> Self {
        self.script_loader = Some(loader);
        self
    }

    pub fn with_hinter(mut self, hinter: Rc<dyn ResourceHinter>) -> Self {
        self.hinter = Some(hinter);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Rc<dyn ManifestFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("script_loader", &self.script_loader.is_some())
            .field("hinter", &self.hinter.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

//! Error types for the Quickload runtime

use std::fmt;
use std::panic::Location;
use thiserror::Error;

use crate::chunk::ChunkId;
use crate::modules::ModuleId;

/// Which loading path produced a [`Error::ChunkLoad`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLoadKind {
    /// A regular on-demand chunk
    Chunk,
    /// A hot-update chunk
    HotUpdate,
}

impl fmt::Display for ChunkLoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkLoadKind::Chunk => write!(f, "chunk"),
            ChunkLoadKind::HotUpdate => write!(f, "hot update chunk"),
        }
    }
}

/// Classification of a failed script load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// The script finished without delivering its payload: the file is
    /// absent or not valid code.
    Missing,
    /// Event type reported verbatim by the environment (`error`, `timeout`, ...)
    Other(String),
}

impl FailureType {
    /// Classify an environment event type. A plain `load` event carries no
    /// detail and is reported as [`FailureType::Missing`].
    pub fn classify(event_type: &str) -> Self {
        if event_type == "load" {
            FailureType::Missing
        } else {
            FailureType::Other(event_type.to_string())
        }
    }

    /// Name as reported in error messages
    pub fn as_str(&self) -> &str {
        match self {
            FailureType::Missing => "missing",
            FailureType::Other(kind) => kind,
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Injected primitives the runtime can be built without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ScriptLoader,
    ResourceHinter,
    ManifestFetcher,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ScriptLoader => write!(f, "script loader"),
            Capability::ResourceHinter => write!(f, "resource hinter"),
            Capability::ManifestFetcher => write!(f, "manifest fetcher (fetch API)"),
        }
    }
}

/// Main error type for Quickload
///
/// Errors are `Clone`: a single load failure is handed to every waiter of
/// the shared pending load.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A chunk or hot-update chunk failed to load
    #[error("ChunkLoadError: Loading {kind} {chunk_id} failed.\n({subtype}: {request})")]
    ChunkLoad {
        kind: ChunkLoadKind,
        subtype: FailureType,
        chunk_id: ChunkId,
        /// Address that was requested (as reported by the environment when available)
        request: String,
        /// Call site that started the load
        location: &'static Location<'static>,
    },

    /// The hot-update manifest endpoint answered with a failure status other than 404
    #[error("ManifestFetchError: Failed to fetch update manifest {status} {status_text}")]
    ManifestFetch { status: u16, status_text: String },

    /// The manifest body could not be parsed
    #[error("ManifestParseError: {0}")]
    ManifestParse(String),

    /// A required primitive was never supplied
    #[error("MissingCapabilityError: missing implementation for {0}")]
    MissingCapability(Capability),

    /// `require` of a module without a registered factory
    #[error("ModuleError: cannot find module '{0}'")]
    ModuleNotFound(ModuleId),

    /// A module factory failed while executing
    #[error("ModuleError: executing module '{module_id}' failed: {message}")]
    ModuleExecution { module_id: ModuleId, message: String },

    /// Configuration could not be read or parsed
    #[error("ConfigError: {0}")]
    Config(String),

    /// The operation belongs to a runtime feature that is switched off
    #[error("FeatureDisabled: {0} is not enabled in this runtime")]
    FeatureDisabled(&'static str),
}

impl Error {
    /// Create a chunk load error for a failed script
    pub fn chunk_load(
        kind: ChunkLoadKind,
        subtype: FailureType,
        chunk_id: ChunkId,
        request: impl Into<String>,
        location: &'static Location<'static>,
    ) -> Self {
        Error::ChunkLoad {
            kind,
            subtype,
            chunk_id,
            request: request.into(),
            location,
        }
    }

    /// Create a module execution error
    pub fn module_execution(module_id: ModuleId, message: impl Into<String>) -> Self {
        Error::ModuleExecution {
            module_id,
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ChunkLoad { .. } | Error::ManifestFetch { .. })
    }
}

/// Result type alias for Quickload
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_generic_load_as_missing() {
        assert_eq!(FailureType::classify("load"), FailureType::Missing);
        assert_eq!(
            FailureType::classify("timeout"),
            FailureType::Other("timeout".to_string())
        );
        assert_eq!(FailureType::classify("error").as_str(), "error");
    }

    #[test]
    fn test_chunk_load_message() {
        let err = Error::chunk_load(
            ChunkLoadKind::Chunk,
            FailureType::Missing,
            ChunkId::from("vendors"),
            "/static/vendors.chunk.js",
            Location::caller(),
        );
        assert_eq!(
            err.to_string(),
            "ChunkLoadError: Loading chunk vendors failed.\n(missing: /static/vendors.chunk.js)"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_hot_update_message() {
        let err = Error::chunk_load(
            ChunkLoadKind::HotUpdate,
            FailureType::Other("error".to_string()),
            ChunkId::from(3u64),
            "3.abc.hot-update.js",
            Location::caller(),
        );
        assert!(err
            .to_string()
            .starts_with("ChunkLoadError: Loading hot update chunk 3 failed."));
    }

    #[test]
    fn test_missing_capability_is_not_retryable() {
        let err = Error::MissingCapability(Capability::ManifestFetcher);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("fetch API"));
    }
}

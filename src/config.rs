//! Runtime configuration
//!
//! Mirrors the output options a build emits alongside the runtime: where
//! chunks live, how their filenames are formed, which attributes resource
//! hints carry and which parts of the runtime are enabled. Read from JSON
//! (camelCase keys, every field optional).

use std::path::Path;

use bitflags::bitflags;
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};

use crate::chunk::ChunkId;
use crate::error::{Error, Result};

bitflags! {
    /// Parts of the runtime that are compiled in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RuntimeFeatures: u8 {
        /// On-demand chunk loading (`ensure_chunk`)
        const LOADING = 1 << 0;
        const PRELOAD = 1 << 1;
        const PREFETCH = 1 << 2;
        /// Hot-update chunk download and installation
        const HMR = 1 << 3;
        /// Hot-update manifest fetching
        const HMR_MANIFEST = 1 << 4;
        /// Deferred entry modules and startup sequencing
        const DEFER = 1 << 5;
    }
}

impl Default for RuntimeFeatures {
    fn default() -> Self {
        RuntimeFeatures::all()
    }
}

/// Cross-origin policy attached to fetched scripts and hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossOriginLoading {
    Anonymous,
    UseCredentials,
}

impl CrossOriginLoading {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossOriginLoading::Anonymous => "anonymous",
            CrossOriginLoading::UseCredentials => "use-credentials",
        }
    }
}

/// Which chunks carry JavaScript and therefore need a script load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum JsChunkMatcher {
    #[default]
    All,
    None,
    Only(HashSet<ChunkId>),
}

impl JsChunkMatcher {
    pub fn matches(&self, id: &ChunkId) -> bool {
        match self {
            JsChunkMatcher::All => true,
            JsChunkMatcher::None => false,
            JsChunkMatcher::Only(ids) => ids.contains(id),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Prefix prepended to every chunk address
    pub public_path: String,
    /// Chunk filename template, `[id]` is replaced by the chunk id
    pub chunk_filename: String,
    /// Hot-update chunk template (`[id]`, `[fullhash]`)
    pub hot_update_chunk_filename: String,
    /// Hot-update manifest template (`[fullhash]`)
    pub hot_update_main_filename: String,
    pub cross_origin_loading: Option<CrossOriginLoading>,
    /// Content type attached to preload hints
    pub script_type: Option<String>,
    /// Nonce attached to resource hints
    pub nonce: Option<String>,
    /// Page origin; preload hints under it are same-origin
    pub origin: Option<String>,
    pub js_chunks: JsChunkMatcher,
    /// Chunks shipped together with the runtime, loaded from the start
    pub installed_chunks: Vec<ChunkId>,
    pub features: RuntimeFeatures,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            public_path: String::new(),
            chunk_filename: "[id].chunk.js".to_string(),
            hot_update_chunk_filename: "[id].[fullhash].hot-update.js".to_string(),
            hot_update_main_filename: "[fullhash].hot-update.json".to_string(),
            cross_origin_loading: None,
            script_type: None,
            nonce: None,
            origin: None,
            js_chunks: JsChunkMatcher::All,
            installed_chunks: Vec::new(),
            features: RuntimeFeatures::all(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("failed to parse runtime config: {}", e)))
    }

    /// Read and parse a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = public_path.into();
        self
    }

    pub fn with_features(mut self, features: RuntimeFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_installed_chunks(mut self, ids: impl IntoIterator<Item = ChunkId>) -> Self {
        self.installed_chunks = ids.into_iter().collect();
        self
    }

    /// Address of a chunk's script
    pub fn chunk_url(&self, id: &ChunkId) -> String {
        format!(
            "{}{}",
            self.public_path,
            self.chunk_filename.replace("[id]", &id.to_string())
        )
    }

    /// Address of a chunk's hot-update script for the given build hash
    pub fn hot_update_chunk_url(&self, id: &ChunkId, hash: &str) -> String {
        let file = self
            .hot_update_chunk_filename
            .replace("[id]", &id.to_string())
            .replace("[fullhash]", hash);
        format!("{}{}", self.public_path, file)
    }

    /// Address of the hot-update manifest for the given build hash
    pub fn hot_update_manifest_url(&self, hash: &str) -> String {
        format!(
            "{}{}",
            self.public_path,
            self.hot_update_main_filename.replace("[fullhash]", hash)
        )
    }

    /// Whether `href` points under the configured page origin
    pub fn is_same_origin(&self, href: &str) -> bool {
        match &self.origin {
            Some(origin) => href.starts_with(&format!("{}/", origin)),
            None => !href.contains("://"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_enable_everything() {
        let config = RuntimeConfig::default();
        assert_eq!(config.features, RuntimeFeatures::all());
        assert!(config.js_chunks.matches(&ChunkId::from(1u64)));
    }

    #[test]
    fn test_urls() {
        let config = RuntimeConfig::default().with_public_path("/static/");
        assert_eq!(config.chunk_url(&ChunkId::from("home")), "/static/home.chunk.js");
        assert_eq!(
            config.hot_update_chunk_url(&ChunkId::from(4u64), "abc"),
            "/static/4.abc.hot-update.js"
        );
        assert_eq!(config.hot_update_manifest_url("abc"), "/static/abc.hot-update.json");
    }

    #[test]
    fn test_from_json() {
        let config = RuntimeConfig::from_json(
            r#"{
                "publicPath": "https://cdn.example.com/",
                "crossOriginLoading": "use-credentials",
                "jsChunks": { "only": [1, "vendors"] },
                "installedChunks": ["main"],
                "features": "LOADING | DEFER"
            }"#,
        )
        .unwrap();
        assert_eq!(config.public_path, "https://cdn.example.com/");
        assert_eq!(config.cross_origin_loading, Some(CrossOriginLoading::UseCredentials));
        assert!(config.js_chunks.matches(&ChunkId::from("vendors")));
        assert!(!config.js_chunks.matches(&ChunkId::from(2u64)));
        assert_eq!(config.installed_chunks, vec![ChunkId::from("main")]);
        assert_eq!(config.features, RuntimeFeatures::LOADING | RuntimeFeatures::DEFER);
        assert_eq!(config.chunk_filename, "[id].chunk.js");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = RuntimeConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.json");
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, r#"{{ "chunkFilename": "js/[id].js" }}"#).unwrap();
        }
        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.chunk_url(&ChunkId::from(7u64)), "js/7.js");

        let missing = RuntimeConfig::load(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }

    #[test]
    fn test_same_origin() {
        let mut config = RuntimeConfig::default();
        assert!(config.is_same_origin("/static/1.chunk.js"));
        assert!(!config.is_same_origin("https://cdn.example.com/1.chunk.js"));
        config.origin = Some("https://app.example.com".to_string());
        assert!(config.is_same_origin("https://app.example.com/1.chunk.js"));
        assert!(!config.is_same_origin("https://cdn.example.com/1.chunk.js"));
    }
}

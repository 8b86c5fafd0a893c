//! Hot Module Replacement
//!
//! Downloads hot-update chunks and buffers the module patches they deliver
//! until the caller installs them.
//!
//! # Flow
//! ```text
//! fetch_manifest()          -> { c: [updated chunks], r: [removed chunks], m: [removed modules] }
//! download_updates(&manifest) -> one load_update per updated chunk already in use
//!   <environment>           -> apply_update_batch(chunk patch), resolves that chunk's load_update
//! apply()                   -> installs the buffer into the live module registry
//! ```
//!
//! [`HotUpdateController::check`] runs the whole sequence.
//!
//! At most one update request is outstanding per chunk: a new `load_update`
//! for the same chunk silently supersedes the previous one.

use std::cell::RefCell;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;

use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::chunk::{ChunkId, ChunkStatus, SharedChunkRegistry};
use crate::config::{RuntimeConfig, RuntimeFeatures};
use crate::error::{Capability, ChunkLoadKind, Error, Result};
use crate::modules::{ModuleFactory, ModuleId, ModuleRegistry, RuntimeAddition};
use crate::platform::{FetchResponse, ManifestFetcher, ScriptCallback, ScriptLoader};
use crate::runtime::load::classify_outcome;
use crate::runtime::promise::{Promise, Resolver};

/// Descriptor served by the hot-update manifest endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateManifest {
    /// Chunks with an update available
    #[serde(rename = "c", default)]
    pub updated_chunks: Vec<ChunkId>,
    #[serde(rename = "r", default)]
    pub removed_chunks: Vec<ChunkId>,
    #[serde(rename = "m", default)]
    pub removed_modules: Vec<ModuleId>,
}

/// Patch delivered by a hot-update chunk
#[derive(Clone)]
pub struct HotUpdateBatch {
    pub chunk_id: ChunkId,
    pub more_modules: Vec<(ModuleId, ModuleFactory)>,
    pub runtime: Option<RuntimeAddition>,
}

impl HotUpdateBatch {
    pub fn new(chunk_id: impl Into<ChunkId>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            more_modules: Vec::new(),
            runtime: None,
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
}

impl fmt::Debug for HotUpdateBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotUpdateBatch")
            .field("chunk_id", &self.chunk_id)
            .field(
                "more_modules",
                &self.more_modules.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

/// What an [`HotUpdateController::apply`] call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub updated_modules: Vec<ModuleId>,
    pub removed_modules: Vec<ModuleId>,
    pub removed_chunks: Vec<ChunkId>,
}

impl UpdateOutcome {
    pub fn is_empty(&self) -> bool {
        self.updated_modules.is_empty() && self.removed_modules.is_empty()
    }
}

struct WaitingResolver {
    attempt: u64,
    resolver: Resolver<()>,
}

/// Buffered patch; `None` marks a module for removal
#[derive(Default)]
struct UpdateBuffer {
    modules: HashMap<ModuleId, Option<ModuleFactory>>,
    order: Vec<ModuleId>,
    runtime: Vec<RuntimeAddition>,
    removed_chunks: Vec<ChunkId>,
}

impl UpdateBuffer {
    fn set(&mut self, id: ModuleId, factory: Option<ModuleFactory>) {
        if self.modules.insert(id.clone(), factory).is_none() {
            self.order.push(id);
        }
    }
}

#[derive(Default)]
struct HotUpdateState {
    waiting: HashMap<ChunkId, WaitingResolver>,
    next_attempt: u64,
    buffer: UpdateBuffer,
    /// Chunks named by the update being collected, and whether their
    /// update chunk has been requested
    update_chunks: Option<HashMap<ChunkId, bool>>,
    hash: String,
}

#[derive(Clone)]
pub struct HotUpdateController {
    state: Rc<RefCell<HotUpdateState>>,
    chunks: SharedChunkRegistry,
    modules: ModuleRegistry,
    config: Rc<RuntimeConfig>,
    loader: Option<Rc<dyn ScriptLoader>>,
    fetcher: Option<Rc<dyn ManifestFetcher>>,
}

impl HotUpdateController {
    pub fn new(
        chunks: SharedChunkRegistry,
        modules: ModuleRegistry,
        config: Rc<RuntimeConfig>,
        loader: Option<Rc<dyn ScriptLoader>>,
        fetcher: Option<Rc<dyn ManifestFetcher>>,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(HotUpdateState::default())),
            chunks,
            modules,
            config,
            loader,
            fetcher,
        }
    }

    /// Current build hash, used to address update resources
    pub fn hash(&self) -> String {
        self.state.borrow().hash.clone()
    }

    pub fn set_hash(&self, hash: impl Into<String>) {
        self.state.borrow_mut().hash = hash.into();
    }

    /// Whether an update request for `id` is outstanding
    pub fn is_waiting(&self, id: &ChunkId) -> bool {
        self.state.borrow().waiting.contains_key(id)
    }

    /// Modules buffered for the next [`apply`](Self::apply), in arrival order
    pub fn buffered_modules(&self) -> Vec<ModuleId> {
        self.state.borrow().buffer.order.clone()
    }

    /// Request the hot-update chunk for `id`.
    ///
    /// Settles when a batch for `id` is applied, or rejects if the script
    /// finishes without delivering one.
    #[track_caller]
    pub fn load_update(&self, id: &ChunkId) -> Result<Promise<()>> {
        let location = Location::caller();
        let loader = self
            .loader
            .clone()
            .ok_or(Error::MissingCapability(Capability::ScriptLoader))?;

        let (promise, resolver) = Promise::pending();
        let (attempt, url) = {
            let mut state = self.state.borrow_mut();
            state.next_attempt += 1;
            let attempt = state.next_attempt;
            let previous = state
                .waiting
                .insert(id.clone(), WaitingResolver { attempt, resolver });
            if previous.is_some() {
                trace!(chunk_id = %id, "superseding outstanding update request");
            }
            if let Some(update_chunks) = state.update_chunks.as_mut() {
                update_chunks.insert(id.clone(), true);
            }
            (attempt, self.config.hot_update_chunk_url(id, &state.hash))
        };

        let on_done = self.completion_callback(id.clone(), attempt, url.clone(), location);
        debug!(chunk_id = %id, url = %url, "loading hot update chunk");
        loader.load_script(&url, on_done, &format!("hot-update-{}", id), None);
        Ok(promise)
    }

    fn completion_callback(
        &self,
        id: ChunkId,
        attempt: u64,
        url: String,
        location: &'static Location<'static>,
    ) -> ScriptCallback {
        let state = Rc::clone(&self.state);
        Box::new(move |outcome| {
            let waiting = {
                let mut state = state.borrow_mut();
                let current = matches!(state.waiting.get(&id), Some(w) if w.attempt == attempt);
                if current {
                    state.waiting.remove(&id)
                } else {
                    None
                }
            };
            let Some(waiting) = waiting else {
                return;
            };

            let (subtype, request) = classify_outcome(outcome, &url);
            warn!(chunk_id = %id, subtype = %subtype, request = %request, "hot update chunk load failed");
            waiting.resolver.reject(Error::chunk_load(
                ChunkLoadKind::HotUpdate,
                subtype,
                id,
                request,
                location,
            ));
        })
    }

    /// Merge a patch delivered by a hot-update chunk into the buffer and
    /// settle the request waiting on its chunk
    pub fn apply_update_batch(&self, batch: HotUpdateBatch) {
        let HotUpdateBatch {
            chunk_id,
            more_modules,
            runtime,
        } = batch;
        let modules = more_modules.len();

        let waiting = {
            let mut state = self.state.borrow_mut();
            for (id, factory) in more_modules {
                state.buffer.set(id, Some(factory));
            }
            if let Some(runtime) = runtime {
                state.buffer.runtime.push(runtime);
            }
            state.waiting.remove(&chunk_id)
        };

        debug!(chunk_id = %chunk_id, modules, "buffered hot update");
        if let Some(waiting) = waiting {
            waiting.resolver.resolve(());
        }
    }

    /// Fetch the update manifest. Settles with `None` when the endpoint
    /// reports that no update is available (404).
    pub fn fetch_manifest(&self) -> Result<Promise<Option<UpdateManifest>>> {
        if !self.config.features.contains(RuntimeFeatures::HMR_MANIFEST) {
            return Err(Error::FeatureDisabled("hot update manifest"));
        }
        let fetcher = self
            .fetcher
            .clone()
            .ok_or(Error::MissingCapability(Capability::ManifestFetcher))?;

        let url = self.config.hot_update_manifest_url(&self.hash());
        debug!(url = %url, "fetching update manifest");
        Ok(fetcher.fetch(&url).map(parse_manifest_response))
    }

    /// Start collecting an update: reset the buffer and request the update
    /// chunk of every updated chunk the application has referenced.
    /// Chunks not yet in use are fetched later through [`ensure_hook`](Self::ensure_hook).
    pub fn download_updates(&self, manifest: &UpdateManifest) -> Result<Vec<Promise<()>>> {
        {
            let mut state = self.state.borrow_mut();
            let mut buffer = UpdateBuffer {
                removed_chunks: manifest.removed_chunks.clone(),
                ..UpdateBuffer::default()
            };
            for id in &manifest.removed_modules {
                buffer.set(id.clone(), None);
            }
            state.buffer = buffer;
            state.update_chunks = Some(HashMap::default());
        }

        let mut promises = Vec::new();
        for id in &manifest.updated_chunks {
            let in_use = self.chunks.borrow().status(id) != ChunkStatus::NotLoaded;
            if in_use {
                promises.push(self.load_update(id)?);
            } else if let Some(update_chunks) = self.state.borrow_mut().update_chunks.as_mut() {
                update_chunks.insert(id.clone(), false);
            }
        }
        Ok(promises)
    }

    /// Called when a chunk is ensured while an update is being collected:
    /// if the update covers that chunk and its update chunk has not been
    /// requested yet, request it now.
    #[track_caller]
    pub fn ensure_hook(&self, id: &ChunkId) -> Result<Option<Promise<()>>> {
        let unfetched = self
            .state
            .borrow()
            .update_chunks
            .as_ref()
            .and_then(|chunks| chunks.get(id).copied())
            == Some(false);
        if !unfetched {
            return Ok(None);
        }
        self.load_update(id).map(Some)
    }

    /// Queue the current factory of `id` for re-installation, discarding its
    /// cached instance on the next apply
    pub fn invalidate_module(&self, id: &ModuleId) {
        let mut state = self.state.borrow_mut();
        if state.buffer.modules.contains_key(id) {
            return;
        }
        if let Some(factory) = self.modules.factory(id) {
            state.buffer.set(id.clone(), Some(factory));
        }
    }

    /// Fetch the manifest, download every update chunk it names and apply
    /// the result. Settles with `None` when no update is available.
    pub fn check(&self) -> Result<Promise<Option<UpdateOutcome>>> {
        let manifest = self.fetch_manifest()?;
        let (promise, resolver) = Promise::<Option<UpdateOutcome>>::pending();
        let controller = self.clone();
        manifest.on_settled(move |result| {
            let manifest = match result {
                Ok(Some(manifest)) => manifest,
                Ok(None) => {
                    debug!("no update available");
                    resolver.resolve(None);
                    return;
                }
                Err(e) => {
                    resolver.reject(e.clone());
                    return;
                }
            };
            let downloads = match controller.download_updates(manifest) {
                Ok(downloads) => downloads,
                Err(e) => {
                    controller.abandon();
                    resolver.reject(e);
                    return;
                }
            };
            let applier = controller.clone();
            Promise::all(downloads).on_settled(move |result| match result {
                Ok(()) => {
                    resolver.resolve(Some(applier.apply()));
                }
                Err(e) => {
                    applier.abandon();
                    resolver.reject(e.clone());
                }
            });
        });
        Ok(promise)
    }

    /// Drop the update being collected after one of its downloads failed
    fn abandon(&self) {
        let mut state = self.state.borrow_mut();
        state.update_chunks = None;
        state.buffer = UpdateBuffer::default();
        debug!("update abandoned");
    }

    /// Install the buffered update into the live module registry
    pub fn apply(&self) -> UpdateOutcome {
        let buffer = {
            let mut state = self.state.borrow_mut();
            state.update_chunks = None;
            std::mem::take(&mut state.buffer)
        };

        let UpdateBuffer {
            mut modules,
            order,
            runtime,
            removed_chunks,
        } = buffer;

        let mut outcome = UpdateOutcome {
            removed_chunks,
            ..UpdateOutcome::default()
        };
        for id in order {
            match modules.remove(&id).flatten() {
                Some(factory) => {
                    self.modules.install(id.clone(), factory);
                    self.modules.invalidate(&id);
                    outcome.updated_modules.push(id);
                }
                None => {
                    self.modules.remove(&id);
                    outcome.removed_modules.push(id);
                }
            }
        }
        for addition in runtime {
            addition(&self.modules);
        }

        debug!(
            updated = outcome.updated_modules.len(),
            removed = outcome.removed_modules.len(),
            "applied hot update"
        );
        outcome
    }
}

impl fmt::Debug for HotUpdateController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HotUpdateController")
            .field("hash", &state.hash)
            .field("waiting", &state.waiting.len())
            .field("buffered", &state.buffer.order.len())
            .finish()
    }
}

fn parse_manifest_response(response: FetchResponse) -> Result<Option<UpdateManifest>> {
    if response.status == 404 {
        return Ok(None);
    }
    if !response.ok() {
        return Err(Error::ManifestFetch {
            status: response.status,
            status_text: response.status_text,
        });
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| Error::ManifestParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkRegistry;
    use crate::modules::factory;
    use crate::platform::{ScriptEvent, ScriptOutcome};
    use crate::runtime::promise::PromiseState;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingLoader {
        urls: RefCell<Vec<String>>,
        callbacks: RefCell<Vec<ScriptCallback>>,
    }

    impl ScriptLoader for RecordingLoader {
        fn load_script(&self, url: &str, on_done: ScriptCallback, _key: &str, _chunk_id: Option<&ChunkId>) {
            self.urls.borrow_mut().push(url.to_string());
            self.callbacks.borrow_mut().push(on_done);
        }
    }

    struct StaticFetcher(FetchResponse);

    impl ManifestFetcher for StaticFetcher {
        fn fetch(&self, _url: &str) -> Promise<FetchResponse> {
            Promise::resolved(self.0.clone())
        }
    }

    fn controller(
        fetcher: Option<FetchResponse>,
    ) -> (HotUpdateController, Rc<RecordingLoader>, SharedChunkRegistry, ModuleRegistry) {
        let loader = Rc::new(RecordingLoader::default());
        let chunks = ChunkRegistry::new().into_shared();
        let modules = ModuleRegistry::new();
        let controller = HotUpdateController::new(
            Rc::clone(&chunks),
            modules.clone(),
            Rc::new(RuntimeConfig::default()),
            Some(loader.clone() as Rc<dyn ScriptLoader>),
            fetcher.map(|r| Rc::new(StaticFetcher(r)) as Rc<dyn ManifestFetcher>),
        );
        controller.set_hash("h1");
        (controller, loader, chunks, modules)
    }

    #[test]
    fn test_batch_resolves_only_its_chunk() {
        let (controller, loader, _, _) = controller(None);
        let x = controller.load_update(&ChunkId::from("x")).unwrap();
        assert_eq!(*loader.urls.borrow(), vec!["x.h1.hot-update.js".to_string()]);

        controller.apply_update_batch(HotUpdateBatch::new("y"));
        assert_eq!(x.state(), PromiseState::Pending);

        controller.apply_update_batch(HotUpdateBatch::new("x"));
        assert_eq!(x.state(), PromiseState::Fulfilled);
        assert!(!controller.is_waiting(&ChunkId::from("x")));
    }

    #[test]
    fn test_script_without_batch_rejects() {
        let (controller, loader, _, _) = controller(None);
        let x = controller.load_update(&ChunkId::from(1u64)).unwrap();
        let callback = loader.callbacks.borrow_mut().remove(0);
        callback(ScriptOutcome::Loaded);
        match x.result() {
            Some(Err(Error::ChunkLoad { kind, subtype, .. })) => {
                assert_eq!(kind, ChunkLoadKind::HotUpdate);
                assert_eq!(subtype.as_str(), "missing");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_superseded_request_ignores_stale_callback() {
        let (controller, loader, _, _) = controller(None);
        let first = controller.load_update(&ChunkId::from("x")).unwrap();
        let second = controller.load_update(&ChunkId::from("x")).unwrap();

        let stale = loader.callbacks.borrow_mut().remove(0);
        stale(ScriptOutcome::Loaded);
        assert_eq!(second.state(), PromiseState::Pending);
        assert_eq!(first.state(), PromiseState::Pending);

        controller.apply_update_batch(HotUpdateBatch::new("x"));
        assert_eq!(second.state(), PromiseState::Fulfilled);
    }

    #[test]
    fn test_manifest_outcomes() {
        let (none, _, _, _) = controller(Some(FetchResponse::new(404, "")));
        assert_eq!(none.fetch_manifest().unwrap().result().unwrap().unwrap(), None);

        let (failing, _, _, _) = controller(Some(FetchResponse::new(500, "")));
        match failing.fetch_manifest().unwrap().result() {
            Some(Err(Error::ManifestFetch { status, .. })) => assert_eq!(status, 500),
            other => panic!("unexpected result: {:?}", other),
        }

        let (found, _, _, _) = controller(Some(FetchResponse::new(200, r#"{"c":[1],"m":["old"]}"#)));
        let manifest = found.fetch_manifest().unwrap().result().unwrap().unwrap().unwrap();
        assert_eq!(manifest.updated_chunks, vec![ChunkId::from(1u64)]);
        assert!(manifest.removed_chunks.is_empty());
        assert_eq!(manifest.removed_modules, vec![ModuleId::from("old")]);

        let (garbled, _, _, _) = controller(Some(FetchResponse::new(200, "<html>")));
        assert!(matches!(
            garbled.fetch_manifest().unwrap().result(),
            Some(Err(Error::ManifestParse(_)))
        ));
    }

    #[test]
    fn test_missing_fetcher_is_immediate() {
        let (controller, _, _, _) = controller(None);
        assert!(matches!(
            controller.fetch_manifest(),
            Err(Error::MissingCapability(Capability::ManifestFetcher))
        ));
    }

    #[test]
    fn test_download_only_fetches_chunks_in_use() {
        let (controller, loader, chunks, _) = controller(None);
        chunks.borrow_mut().mark_loaded(ChunkId::from("main"));
        let manifest = UpdateManifest {
            updated_chunks: vec![ChunkId::from("main"), ChunkId::from("lazy")],
            ..UpdateManifest::default()
        };
        let promises = controller.download_updates(&manifest).unwrap();
        assert_eq!(promises.len(), 1);
        assert_eq!(loader.urls.borrow().len(), 1);

        let late = controller.ensure_hook(&ChunkId::from("lazy")).unwrap();
        assert!(late.is_some());
        assert!(controller.ensure_hook(&ChunkId::from("lazy")).unwrap().is_none());
        assert!(controller.ensure_hook(&ChunkId::from("other")).unwrap().is_none());
        assert_eq!(loader.urls.borrow().len(), 2);
    }

    #[test]
    fn test_apply_installs_buffer() {
        let (controller, _, chunks, modules) = controller(None);
        chunks.borrow_mut().mark_loaded(ChunkId::from("main"));
        modules.install(ModuleId::from("a"), factory(|_, _| Ok(json!("a1"))));
        modules.install(ModuleId::from("gone"), factory(|_, _| Ok(json!(null))));
        modules.require(&ModuleId::from("a")).unwrap();

        let manifest = UpdateManifest {
            updated_chunks: vec![ChunkId::from("main")],
            removed_modules: vec![ModuleId::from("gone")],
            ..UpdateManifest::default()
        };
        controller.download_updates(&manifest).unwrap();

        let runtime_runs = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&runtime_runs);
        controller.apply_update_batch(
            HotUpdateBatch::new("main")
                .with_module("a", factory(|_, _| Ok(json!("a2"))))
                .with_runtime(Rc::new(move |_: &ModuleRegistry| *counter.borrow_mut() += 1)),
        );
        assert_eq!(controller.buffered_modules().len(), 2);
        assert_eq!(modules.require(&ModuleId::from("a")).unwrap(), json!("a1"));

        let outcome = controller.apply();
        assert_eq!(outcome.updated_modules, vec![ModuleId::from("a")]);
        assert_eq!(outcome.removed_modules, vec![ModuleId::from("gone")]);
        assert_eq!(*runtime_runs.borrow(), 1);
        assert_eq!(modules.require(&ModuleId::from("a")).unwrap(), json!("a2"));
        assert!(!modules.has_factory(&ModuleId::from("gone")));
        assert!(controller.buffered_modules().is_empty());
    }

    #[test]
    fn test_check_without_update() {
        let (controller, loader, _, _) = controller(Some(FetchResponse::new(404, "")));
        let outcome = controller.check().unwrap();
        assert_eq!(outcome.result().unwrap().unwrap(), None);
        assert!(loader.urls.borrow().is_empty());
    }

    #[test]
    fn test_check_applies_after_downloads() {
        let (controller, loader, chunks, modules) =
            controller(Some(FetchResponse::new(200, r#"{"c":["main"]}"#)));
        chunks.borrow_mut().mark_loaded(ChunkId::from("main"));
        let outcome = controller.check().unwrap();
        assert!(outcome.is_pending());
        assert_eq!(*loader.urls.borrow(), vec!["main.h1.hot-update.js".to_string()]);

        controller.apply_update_batch(
            HotUpdateBatch::new("main").with_module("m", factory(|_, _| Ok(json!(2)))),
        );
        let outcome = outcome.result().unwrap().unwrap().unwrap();
        assert_eq!(outcome.updated_modules, vec![ModuleId::from("m")]);
        assert_eq!(modules.require(&ModuleId::from("m")).unwrap(), json!(2));
    }

    #[test]
    fn test_invalidate_reinstalls_current_factory() {
        let (controller, _, _, modules) = controller(None);
        let runs = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&runs);
        modules.install(
            ModuleId::from("m"),
            factory(move |_, _| {
                *counter.borrow_mut() += 1;
                Ok(json!(null))
            }),
        );
        modules.require(&ModuleId::from("m")).unwrap();
        controller.invalidate_module(&ModuleId::from("m"));
        let outcome = controller.apply();
        assert_eq!(outcome.updated_modules, vec![ModuleId::from("m")]);
        modules.require(&ModuleId::from("m")).unwrap();
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn test_failed_download_abandons_update() {
        let (controller, loader, chunks, modules) =
            controller(Some(FetchResponse::new(200, r#"{"c":["main","lazy"]}"#)));
        chunks.borrow_mut().mark_loaded(ChunkId::from("main"));
        modules.install(ModuleId::from("m"), factory(|_, _| Ok(json!(1))));
        let outcome = controller.check().unwrap();
        assert_eq!(*loader.urls.borrow(), vec!["main.h1.hot-update.js".to_string()]);
        controller.invalidate_module(&ModuleId::from("m"));

        let callback = loader.callbacks.borrow_mut().remove(0);
        callback(ScriptOutcome::Failed(ScriptEvent::new("error", None)));
        assert_eq!(outcome.state(), PromiseState::Rejected);

        assert!(controller.ensure_hook(&ChunkId::from("lazy")).unwrap().is_none());
        assert_eq!(loader.urls.borrow().len(), 1);
        assert!(controller.buffered_modules().is_empty());
        assert_eq!(modules.require(&ModuleId::from("m")).unwrap(), json!(1));
    }
}

//! Shared test helpers for integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use quickload::prelude::*;
use serde_json::json;

/// Install a fmt subscriber honouring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One recorded `load_script` call
pub struct ScriptRequest {
    pub url: String,
    pub key: String,
    pub chunk_id: Option<ChunkId>,
    pub on_done: Option<ScriptCallback>,
}

/// Script loader that records requests and lets the test finish them
#[derive(Default)]
pub struct FakeLoader {
    requests: RefCell<Vec<ScriptRequest>>,
}

impl FakeLoader {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.key.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Invoke the completion callback of request `index`
    pub fn finish(&self, index: usize, outcome: ScriptOutcome) {
        let callback = self.requests.borrow_mut()[index].on_done.take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }

    pub fn fail(&self, index: usize, event_type: &str) {
        let src = self.requests.borrow()[index].url.clone();
        self.finish(index, ScriptOutcome::Failed(ScriptEvent::new(event_type, Some(src))));
    }
}

impl ScriptLoader for FakeLoader {
    fn load_script(&self, url: &str, on_done: ScriptCallback, key: &str, chunk_id: Option<&ChunkId>) {
        self.requests.borrow_mut().push(ScriptRequest {
            url: url.to_string(),
            key: key.to_string(),
            chunk_id: chunk_id.cloned(),
            on_done: Some(on_done),
        });
    }
}

/// Hinter that records every emitted hint
#[derive(Default)]
pub struct FakeHinter {
    pub hints: RefCell<Vec<ResourceHint>>,
}

impl ResourceHinter for FakeHinter {
    fn emit(&self, hint: &ResourceHint) {
        self.hints.borrow_mut().push(hint.clone());
    }
}

/// Fetcher answering every request with a fixed response
pub struct FakeFetcher {
    response: RefCell<FetchResponse>,
    pub urls: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(status: u16, body: &str) -> Rc<Self> {
        Rc::new(Self {
            response: RefCell::new(FetchResponse::new(status, body)),
            urls: RefCell::new(Vec::new()),
        })
    }

    pub fn respond(&self, status: u16, body: &str) {
        *self.response.borrow_mut() = FetchResponse::new(status, body);
    }
}

impl ManifestFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Promise<FetchResponse> {
        self.urls.borrow_mut().push(url.to_string());
        Promise::resolved(self.response.borrow().clone())
    }
}

pub struct Harness {
    pub runtime: ChunkRuntime,
    pub queue: PushQueue,
    pub loader: Rc<FakeLoader>,
    pub hinter: Rc<FakeHinter>,
    pub fetcher: Rc<FakeFetcher>,
}

/// Runtime with every capability faked, installed on a fresh queue
pub fn harness(config: RuntimeConfig) -> Harness {
    init_tracing();
    let loader = FakeLoader::new();
    let hinter = Rc::new(FakeHinter::default());
    let fetcher = FakeFetcher::new(404, "");
    let runtime = ChunkRuntime::new(
        config,
        Capabilities::new()
            .with_script_loader(loader.clone())
            .with_hinter(hinter.clone())
            .with_fetcher(fetcher.clone()),
    );
    let queue = PushQueue::new();
    runtime.install(&queue).expect("install runtime");
    Harness {
        runtime,
        queue,
        loader,
        hinter,
        fetcher,
    }
}

/// Factory returning a constant value
pub fn constant(value: serde_json::Value) -> ModuleFactory {
    factory(move |_, _| Ok(value.clone()))
}

/// Factory that appends its module id to `log` each time it executes
pub fn logging(log: &Rc<RefCell<Vec<String>>>) -> ModuleFactory {
    let log = Rc::clone(log);
    factory(move |_, id| {
        log.borrow_mut().push(id.to_string());
        Ok(json!(id.to_string()))
    })
}

pub fn ids(names: &[&str]) -> Vec<ChunkId> {
    names.iter().map(|name| ChunkId::from(*name)).collect()
}

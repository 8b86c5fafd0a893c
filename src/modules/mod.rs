//! Module Registry
//!
//! The live module surface the runtime installs into: a factory map, an
//! instantiation cache (each module executes once until it is replaced) and
//! the active-entry slot set when a deferred entry module runs.
//!
//! Factories receive the registry itself so they can `require` their
//! dependencies. No borrow of the registry is held while a factory runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap as HashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::id::opaque_id;

opaque_id!(
    /// Identifier of a single module within a chunk
    ModuleId
);

/// Value produced by executing a module
pub type Exports = serde_json::Value;

/// Module implementation
pub type ModuleFactory = Rc<dyn Fn(&ModuleRegistry, &ModuleId) -> Result<Exports>>;

/// Code a batch ships to extend the runtime itself
pub type RuntimeAddition = Rc<dyn Fn(&ModuleRegistry)>;

/// Wrap a closure as a [`ModuleFactory`]
pub fn factory<F>(f: F) -> ModuleFactory
where
    F: Fn(&ModuleRegistry, &ModuleId) -> Result<Exports> + 'static,
{
    Rc::new(f)
}

#[derive(Default)]
struct RegistryInner {
    factories: HashMap<ModuleId, ModuleFactory>,
    cache: HashMap<ModuleId, Exports>,
    entry_module_id: Option<ModuleId>,
}

/// Shared module registry handle
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a factory; last write wins
    pub fn install(&self, id: ModuleId, factory: ModuleFactory) {
        self.inner.borrow_mut().factories.insert(id, factory);
    }

    /// Remove a module's factory and cached instance
    pub fn remove(&self, id: &ModuleId) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.cache.remove(id);
        inner.factories.remove(id).is_some()
    }

    /// Drop a cached instance so the next `require` runs the factory again
    pub fn invalidate(&self, id: &ModuleId) -> bool {
        self.inner.borrow_mut().cache.remove(id).is_some()
    }

    pub fn has_factory(&self, id: &ModuleId) -> bool {
        self.inner.borrow().factories.contains_key(id)
    }

    pub fn factory(&self, id: &ModuleId) -> Option<ModuleFactory> {
        self.inner.borrow().factories.get(id).cloned()
    }

    pub fn is_instantiated(&self, id: &ModuleId) -> bool {
        self.inner.borrow().cache.contains_key(id)
    }

    pub fn cached(&self, id: &ModuleId) -> Option<Exports> {
        self.inner.borrow().cache.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().factories.is_empty()
    }

    pub fn entry_module_id(&self) -> Option<ModuleId> {
        self.inner.borrow().entry_module_id.clone()
    }

    /// Instantiate a module, or return its cached exports.
    ///
    /// The cache slot is filled with `null` before the factory runs, so a
    /// circular `require` observes the partially initialized module instead
    /// of recursing.
    pub fn require(&self, id: &ModuleId) -> Result<Exports> {
        let factory = {
            let mut inner = self.inner.borrow_mut();
            if let Some(exports) = inner.cache.get(id) {
                return Ok(exports.clone());
            }
            let factory = inner
                .factories
                .get(id)
                .cloned()
                .ok_or_else(|| Error::ModuleNotFound(id.clone()))?;
            inner.cache.insert(id.clone(), Exports::Null);
            factory
        };

        trace!(module_id = %id, "executing module");
        match factory(self, id) {
            Ok(exports) => {
                self.inner
                    .borrow_mut()
                    .cache
                    .insert(id.clone(), exports.clone());
                Ok(exports)
            }
            Err(e) => {
                self.inner.borrow_mut().cache.remove(id);
                Err(e)
            }
        }
    }

    /// Execute `id` as the application's active entry module
    pub fn execute_entry(&self, id: &ModuleId) -> Result<Exports> {
        self.inner.borrow_mut().entry_module_id = Some(id.clone());
        self.require(id)
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ModuleRegistry")
            .field("factories", &inner.factories.len())
            .field("cached", &inner.cache.len())
            .field("entry_module_id", &inner.entry_module_id)
            .finish()
    }
}

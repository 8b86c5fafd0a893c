//! Deferred entry execution and startup sequencing
//!
//! Entry modules declared by a batch wait here until every chunk they depend
//! on is loaded. Once nothing is left waiting, the registered startup
//! routines run and evaluation stops until more startup code is registered.
//!
//! A pass visits entries in list order. A fulfilled entry is removed at the
//! moment it is visited and the pass continues with the entry that took its
//! place; fulfillment is judged against the chunk states at visit time, so an
//! entry whose dependency was loaded by an earlier entry of the same pass
//! (or appended during the pass) still runs in that pass.

use std::cell::RefCell;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::chunk::{ChunkId, SharedChunkRegistry};
use crate::error::{Error, Result};
use crate::modules::{Exports, ModuleId, ModuleRegistry};

/// An entry module gated on dependency chunks
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeferredEntry {
    pub entry_module_id: ModuleId,
    pub dependency_chunk_ids: Vec<ChunkId>,
}

impl DeferredEntry {
    pub fn new(entry_module_id: impl Into<ModuleId>, dependency_chunk_ids: Vec<ChunkId>) -> Self {
        Self {
            entry_module_id: entry_module_id.into(),
            dependency_chunk_ids,
        }
    }
}

/// Startup code contributed by one runtime build
pub type StartupRoutine = Box<dyn FnOnce(&ModuleRegistry) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Startup has not been requested yet; passes are no-ops
    Idle,
    /// Passes evaluate the deferred list
    Armed,
    /// Startup fired; passes are no-ops until more startup code is registered
    Settled,
}

struct SchedulerState {
    entries: Vec<DeferredEntry>,
    startup: Vec<StartupRoutine>,
    phase: SchedulerPhase,
}

pub struct DeferredExecutionScheduler {
    state: RefCell<SchedulerState>,
    chunks: SharedChunkRegistry,
    modules: ModuleRegistry,
}

impl DeferredExecutionScheduler {
    pub fn new(chunks: SharedChunkRegistry, modules: ModuleRegistry) -> Self {
        Self {
            state: RefCell::new(SchedulerState {
                entries: Vec::new(),
                startup: Vec::new(),
                phase: SchedulerPhase::Idle,
            }),
            chunks,
            modules,
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.state.borrow().phase
    }

    pub fn pending_entries(&self) -> Vec<DeferredEntry> {
        self.state.borrow().entries.clone()
    }

    pub fn add_entries(&self, entries: impl IntoIterator<Item = DeferredEntry>) {
        self.state.borrow_mut().entries.extend(entries);
    }

    /// Add startup code. Earlier contributions that have not run yet are
    /// kept and run first; if startup already fired, evaluation is re-armed.
    pub fn register_startup(&self, routine: StartupRoutine) {
        let mut state = self.state.borrow_mut();
        state.startup.push(routine);
        if state.phase == SchedulerPhase::Settled {
            trace!("startup code registered, re-arming deferred evaluation");
            state.phase = SchedulerPhase::Armed;
        }
    }

    /// Arm evaluation and run a pass
    pub fn startup(&self) -> Result<Option<Exports>> {
        self.state.borrow_mut().phase = SchedulerPhase::Armed;
        self.check_deferred_modules()
    }

    /// Run one evaluation pass. Returns the exports of the last entry
    /// executed in this pass.
    pub fn check_deferred_modules(&self) -> Result<Option<Exports>> {
        if self.phase() != SchedulerPhase::Armed {
            return Ok(None);
        }

        let mut result = None;
        let mut index = 0;
        loop {
            let entry = {
                let mut state = self.state.borrow_mut();
                let Some(entry) = state.entries.get(index) else {
                    break;
                };
                if !self.is_fulfilled(entry) {
                    index += 1;
                    continue;
                }
                state.entries.remove(index)
            };

            debug!(module_id = %entry.entry_module_id, "executing deferred entry module");
            result = Some(self.modules.execute_entry(&entry.entry_module_id)?);
        }

        if self.state.borrow().entries.is_empty() {
            self.fire_startup()?;
        }
        Ok(result)
    }

    /// Run every startup routine not yet run and settle the scheduler
    pub fn fire_startup(&self) -> Result<()> {
        let routines = {
            let mut state = self.state.borrow_mut();
            state.phase = SchedulerPhase::Settled;
            std::mem::take(&mut state.startup)
        };
        if !routines.is_empty() {
            debug!(routines = routines.len(), "running startup");
        }
        let mut first_error: Option<Error> = None;
        for routine in routines {
            if let Err(e) = routine(&self.modules) {
                warn!(error = %e, "startup routine failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_fulfilled(&self, entry: &DeferredEntry) -> bool {
        let chunks = self.chunks.borrow();
        entry
            .dependency_chunk_ids
            .iter()
            .all(|id| chunks.is_loaded(id))
    }
}

impl fmt::Debug for DeferredExecutionScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("DeferredExecutionScheduler")
            .field("entries", &state.entries)
            .field("startup", &state.startup.len())
            .field("phase", &state.phase)
            .finish()
    }
}

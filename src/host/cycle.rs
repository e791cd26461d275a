//! CycleLoop - a minimal phase-list host scheduler
//!
//! Phases run in a fixed order once per cycle; each phase runs its hooks in
//! insertion order. The phase list is host-defined data: callers only ever
//! go through [`PhaseScheduler::insert_hook`].

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

use super::{CycleHook, PhaseScheduler};

/// Default phase order
pub const STANDARD_PHASES: &[&str] = &[
    "Initialization",
    "EarlyUpdate",
    "FixedUpdate",
    "PreUpdate",
    "Update",
    "PreLateUpdate",
    "PostLateUpdate",
];

struct Phase {
    name: String,
    hooks: Vec<CycleHook>,
}

/// Sequential per-cycle scheduler
pub struct CycleLoop {
    phases: Mutex<Vec<Phase>>,
    cycles: AtomicU64,
}

impl CycleLoop {
    /// Loop with the [`STANDARD_PHASES`] list
    pub fn standard() -> Self {
        Self::with_phases(STANDARD_PHASES)
    }

    pub fn with_phases(names: &[&str]) -> Self {
        let phases = names
            .iter()
            .map(|name| Phase {
                name: name.to_string(),
                hooks: Vec::new(),
            })
            .collect();

        Self {
            phases: Mutex::new(phases),
            cycles: AtomicU64::new(0),
        }
    }

    /// Run every phase once
    ///
    /// Hooks are cloned out of the lock first so a hook may itself insert
    /// hooks (they take effect next cycle).
    pub fn run_cycle(&self) {
        let hooks: Vec<CycleHook> = {
            let phases = self.phases.lock();
            phases
                .iter()
                .flat_map(|phase| phase.hooks.iter().cloned())
                .collect()
        };

        for hook in &hooks {
            hook();
        }

        let n = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("Cycle {} complete ({} hooks)", n, hooks.len());
    }

    /// Completed cycles
    pub fn cycle_count(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Hooks currently installed in `phase` (0 for unknown phases)
    pub fn hook_count(&self, phase: &str) -> usize {
        self.phases
            .lock()
            .iter()
            .find(|p| p.name == phase)
            .map(|p| p.hooks.len())
            .unwrap_or(0)
    }
}

impl PhaseScheduler for CycleLoop {
    fn insert_hook(&self, phase: &str, hook: CycleHook) -> bool {
        let mut phases = self.phases.lock();
        match phases.iter_mut().find(|p| p.name == phase) {
            Some(p) => {
                p.hooks.push(hook);
                debug!("Hook inserted at end of phase '{}'", phase);
                true
            }
            None => false,
        }
    }
}

//! Before/after trigger registry.
//!
//! Each phase holds an ordered list of `(id, trigger)` entries. Registration
//! order is execution order; re-registering an id swaps the trigger in place.
//! Readers iterate an `Arc` snapshot, so registrations made while a phase is
//! running take effect from the next dispatch.

use super::invocation::Invocation;
use crate::error::{BoxError, TriggerError, panic_message};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

/// When a trigger runs relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Gates the handler: any `false` stops the invocation.
    Before,
    /// Observes the settled invocation.
    After,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            _ => Err(()),
        }
    }
}

/// Result of one trigger check.
pub type TriggerResult = Result<bool, BoxError>;

/// A hook consulted for every dispatched invocation.
pub trait Trigger: Send + Sync {
    fn check(&self, invocation: &Invocation) -> TriggerResult;
}

impl<F> Trigger for F
where
    F: Fn(&Invocation) -> TriggerResult + Send + Sync,
{
    fn check(&self, invocation: &Invocation) -> TriggerResult {
        self(invocation)
    }
}

/// A registered trigger.
#[derive(Clone)]
pub struct TriggerEntry {
    pub id: String,
    pub trigger: Arc<dyn Trigger>,
}

impl fmt::Debug for TriggerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerEntry").field("id", &self.id).finish()
    }
}

/// Outcome of running one phase.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Ids of triggers that returned `false` or faulted.
    pub denials: Vec<String>,
    /// Faults raised along the way.
    pub faults: Vec<TriggerError>,
}

impl Evaluation {
    pub fn passed(&self) -> bool {
        self.denials.is_empty()
    }
}

/// Ordered trigger sets for both phases.
#[derive(Default)]
pub struct TriggerRegistry {
    before: RwLock<Arc<Vec<TriggerEntry>>>,
    after: RwLock<Arc<Vec<TriggerEntry>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, phase: Phase) -> &RwLock<Arc<Vec<TriggerEntry>>> {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
        }
    }

    /// Add or replace the trigger `id` in `phase`. An empty id is ignored.
    ///
    /// Returns whether anything was registered.
    pub fn register(&self, phase: Phase, id: &str, trigger: impl Trigger + 'static) -> bool {
        self.register_arc(phase, id, Arc::new(trigger))
    }

    pub fn register_arc(&self, phase: Phase, id: &str, trigger: Arc<dyn Trigger>) -> bool {
        if id.is_empty() {
            return false;
        }

        let mut slot = self.slot(phase).write();
        let entries = Arc::make_mut(&mut *slot);
        match entries.iter_mut().find(|entry| entry.id == id) {
            Some(existing) => existing.trigger = trigger,
            None => entries.push(TriggerEntry {
                id: id.to_string(),
                trigger,
            }),
        }
        true
    }

    /// [`register`](Self::register) with the phase given by name.
    /// Names other than `before`/`after` are ignored.
    pub fn register_named(&self, phase: &str, id: &str, trigger: impl Trigger + 'static) -> bool {
        match phase.parse() {
            Ok(phase) => self.register(phase, id, trigger),
            Err(()) => false,
        }
    }

    /// Remove the trigger `id` from `phase`. Returns whether it existed.
    pub fn remove(&self, phase: Phase, id: &str) -> bool {
        let mut slot = self.slot(phase).write();
        if !slot.iter().any(|entry| entry.id == id) {
            return false;
        }
        Arc::make_mut(&mut *slot).retain(|entry| entry.id != id);
        true
    }

    pub fn contains(&self, phase: Phase, id: &str) -> bool {
        self.slot(phase).read().iter().any(|entry| entry.id == id)
    }

    /// The entries of `phase` in execution order.
    pub fn snapshot(&self, phase: Phase) -> Arc<Vec<TriggerEntry>> {
        Arc::clone(&self.slot(phase).read())
    }

    /// Visit the entries of `phase` in execution order.
    ///
    /// Iterates a snapshot: registrations made from `f` are not visited.
    pub fn for_each(&self, phase: Phase, mut f: impl FnMut(&TriggerEntry)) {
        for entry in self.snapshot(phase).iter() {
            f(entry);
        }
    }

    pub fn ids(&self, phase: Phase) -> Vec<String> {
        self.snapshot(phase)
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Run the triggers of `phase` against `invocation`, in order.
    ///
    /// Errors and panics count as denials and are reported in
    /// [`Evaluation::faults`]. The before phase stops at the first denial;
    /// every after trigger runs.
    pub fn evaluate(&self, phase: Phase, invocation: &Invocation) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for entry in self.snapshot(phase).iter() {
            if phase == Phase::Before && !evaluation.passed() {
                break;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| entry.trigger.check(invocation)));
            match outcome {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => evaluation.denials.push(entry.id.clone()),
                Ok(Err(e)) => {
                    evaluation.denials.push(entry.id.clone());
                    evaluation.faults.push(TriggerError::Failed {
                        id: entry.id.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(payload) => {
                    evaluation.denials.push(entry.id.clone());
                    evaluation.faults.push(TriggerError::Panicked {
                        id: entry.id.clone(),
                        reason: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        evaluation
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("before", &self.ids(Phase::Before))
            .field("after", &self.ids(Phase::After))
            .finish()
    }
}

//! Per-slot runtime state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strum::{AsRefStr, Display};

/// Lifecycle phase of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SlotPhase {
    /// The slot task has not started yet.
    #[default]
    Uninitialized,
    /// Waiting for the anchor element.
    Pending,
    /// The wrapper is in place; width negotiation may still be running.
    Injected,
    /// The pipeline finished for the current wrapper.
    Healthy,
    /// A rebuild holds the lock.
    Healing,
}

/// Mutable state of one slot, shared by its pipeline, mirrors and watcher.
#[derive(Debug)]
pub struct SlotRuntimeState {
    slot_type: String,
    rebuilding: AtomicBool,
    phase: Mutex<SlotPhase>,
    last_prices: Mutex<HashMap<String, String>>,
}

impl SlotRuntimeState {
    /// Creates the state of a slot.
    pub fn new(slot_type: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            slot_type: slot_type.into(),
            rebuilding: AtomicBool::new(false),
            phase: Mutex::new(SlotPhase::default()),
            last_prices: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the slot type.
    pub fn slot_type(&self) -> &str {
        &self.slot_type
    }

    /// Takes the rebuild lock, or returns `None` if a rebuild is in flight.
    ///
    /// The lock is released when the guard drops.
    pub fn try_lock(self: &Arc<Self>) -> Option<RebuildGuard> {
        self.rebuilding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RebuildGuard {
                state: Arc::clone(self),
            })
    }

    /// Returns whether the rebuild lock is held.
    pub fn is_locked(&self) -> bool {
        self.rebuilding.load(Ordering::Acquire)
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SlotPhase {
        *self.phase_guard()
    }

    pub(crate) fn set_phase(&self, phase: SlotPhase) {
        let mut current = self.phase_guard();
        let previous = *current;
        if previous != phase {
            tracing::trace!(
                target: crate::TRACING_TARGET_ORCHESTRATOR,
                slot = %self.slot_type,
                from = %previous,
                to = %phase,
                "Slot phase changed"
            );
            *current = phase;
        }
    }

    fn phase_guard(&self) -> MutexGuard<'_, SlotPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the last price written from `source`.
    pub fn last_price(&self, source: &str) -> Option<String> {
        self.prices().get(source).cloned()
    }

    /// Returns whether `price` is the last one written from `source`.
    pub(crate) fn is_current_price(&self, source: &str, price: &str) -> bool {
        self.prices().get(source).is_some_and(|last| last == price)
    }

    /// Records `price` as written from `source`.
    pub(crate) fn record_price(&self, source: &str, price: &str) {
        self.prices().insert(source.to_owned(), price.to_owned());
    }

    fn prices(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.last_prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a slot's rebuild lock until dropped.
#[derive(Debug)]
#[must_use = "the rebuild lock is released as soon as the guard is dropped"]
pub struct RebuildGuard {
    state: Arc<SlotRuntimeState>,
}

impl Drop for RebuildGuard {
    fn drop(&mut self) {
        self.state.rebuilding.store(false, Ordering::Release);
    }
}

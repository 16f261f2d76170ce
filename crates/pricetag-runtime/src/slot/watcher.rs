//! Rebuilding a slot when page scripts remove its wrapper.

use std::time::Duration;

use futures::StreamExt;
use pricetag_core::{VendorRuntimeHandle, debounce};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::pipeline::SlotPipeline;
use crate::TRACING_TARGET_WATCHER;

/// Result of one debounced health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealCheck {
    /// The vendor runtime is not ready; nothing to render into.
    VendorNotReady,
    /// The anchor is gone, so the slot is gone.
    AnchorMissing,
    /// Anchor and wrapper are both present.
    Healthy,
    /// Anchor present, wrapper missing: rebuild.
    Rebuild,
}

/// Watches document mutations and re-runs a slot's pipeline when needed.
pub struct SelfHealingWatcher {
    pipeline: SlotPipeline,
    vendor: VendorRuntimeHandle,
    window: Duration,
}

impl SelfHealingWatcher {
    /// Creates a watcher with the given debounce window.
    pub fn new(pipeline: SlotPipeline, vendor: VendorRuntimeHandle, window: Duration) -> Self {
        Self {
            pipeline,
            vendor,
            window,
        }
    }

    /// Decides whether the slot needs a rebuild.
    pub fn check(&self) -> HealCheck {
        if !self.vendor.is_ready() {
            return HealCheck::VendorNotReady;
        }

        let document = self.pipeline.document();
        let slot = self.pipeline.slot();
        if document.query_selector(slot.anchor_selector()).is_none() {
            return HealCheck::AnchorMissing;
        }
        if document.query_selector(&slot.wrapper_selector()).is_some() {
            return HealCheck::Healthy;
        }

        HealCheck::Rebuild
    }

    /// Processes debounced mutation batches until cancelled.
    ///
    /// Rebuilds are spawned on `tasks` so the watcher keeps observing while
    /// one runs; a trigger arriving while the slot is locked is dropped.
    #[tracing::instrument(
        skip_all,
        fields(slot = %self.pipeline.slot().slot_type),
        target = TRACING_TARGET_WATCHER,
        name = "self_healing_watcher"
    )]
    pub async fn run(self, cancel: CancellationToken, tasks: TaskTracker) {
        let mut batches = debounce(self.pipeline.document().observe_mutations(), self.window);
        tracing::debug!(target: TRACING_TARGET_WATCHER, "Watching for wrapper removal");

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!(target: TRACING_TARGET_WATCHER, "Watcher stopped");
                    break;
                }

                batch = batches.next() => {
                    let Some(batch) = batch else {
                        break;
                    };
                    tracing::trace!(
                        target: TRACING_TARGET_WATCHER,
                        records = batch.records,
                        "Mutation batch settled"
                    );
                    self.on_settled(&cancel, &tasks);
                }
            }
        }
    }

    fn on_settled(&self, cancel: &CancellationToken, tasks: &TaskTracker) {
        if self.check() != HealCheck::Rebuild {
            return;
        }

        if self.pipeline.state().is_locked() {
            tracing::debug!(
                target: TRACING_TARGET_WATCHER,
                "Rebuild already in flight, dropping trigger"
            );
            return;
        }

        tracing::info!(target: TRACING_TARGET_WATCHER, "Wrapper missing, rebuilding slot");

        let pipeline = self.pipeline.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                outcome = pipeline.run() => match outcome {
                    Ok(outcome) => tracing::debug!(
                        target: TRACING_TARGET_WATCHER,
                        outcome = ?outcome,
                        "Rebuild finished"
                    ),
                    Err(error) => tracing::warn!(
                        target: TRACING_TARGET_WATCHER,
                        error = %error,
                        "Rebuild failed"
                    ),
                },
            }
        });
    }
}

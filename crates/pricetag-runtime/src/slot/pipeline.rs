//! The per-slot pipeline: inject if missing, wait for the frame, size it.

use std::sync::Arc;

use pricetag_core::{Locale, PageDocument, Result, RuntimeConfig, SlotConfig, VendorRuntimeHandle};

use super::injector::FragmentInjector;
use super::state::{SlotPhase, SlotRuntimeState};
use super::width::{WidthNegotiator, WidthOutcome, WidthSettings};
use crate::TRACING_TARGET_ORCHESTRATOR;
use crate::wait::wait_for_element_unless;

/// How one pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineOutcome {
    /// The anchor is not in the document.
    AnchorMissing,
    /// Another run of the same slot holds the rebuild lock.
    Busy,
    /// The wrapper disappeared before the vendor frame rendered.
    FrameAbandoned { injected: bool },
    /// The frame rendered and width negotiation ran.
    Completed { injected: bool, width: WidthOutcome },
    /// The session shut down first.
    Cancelled,
}

impl PipelineOutcome {
    /// Returns whether the run reached width negotiation.
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

struct PipelineInner {
    slot: SlotConfig,
    locale: Locale,
    extra_width: f64,
    document: Arc<dyn PageDocument>,
    injector: FragmentInjector,
    negotiator: WidthNegotiator,
    state: Arc<SlotRuntimeState>,
}

/// Cloneable handle running one slot's pipeline.
#[derive(Clone)]
pub struct SlotPipeline {
    inner: Arc<PipelineInner>,
}

impl SlotPipeline {
    /// Creates the pipeline of `slot` with fresh runtime state.
    pub fn new(
        document: Arc<dyn PageDocument>,
        vendor: VendorRuntimeHandle,
        runtime: &RuntimeConfig,
        slot: SlotConfig,
        locale: Locale,
        extra_width: f64,
    ) -> Self {
        let state = SlotRuntimeState::new(slot.slot_type.clone());
        let injector = FragmentInjector::new(Arc::clone(&document), vendor);
        let negotiator = WidthNegotiator::new(Arc::clone(&document), WidthSettings::from(runtime));

        Self {
            inner: Arc::new(PipelineInner {
                slot,
                locale,
                extra_width,
                document,
                injector,
                negotiator,
                state,
            }),
        }
    }

    /// Returns the slot configuration.
    pub fn slot(&self) -> &SlotConfig {
        &self.inner.slot
    }

    /// Returns the slot's runtime state.
    pub fn state(&self) -> &Arc<SlotRuntimeState> {
        &self.inner.state
    }

    /// Returns the page document.
    pub fn document(&self) -> &Arc<dyn PageDocument> {
        &self.inner.document
    }

    /// Runs the pipeline once under the slot's rebuild lock.
    ///
    /// Injects the wrapper only when it is absent, then waits for the vendor
    /// frame and negotiates its width. The lock is released on every exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the wrapper cannot be inserted.
    #[tracing::instrument(
        skip_all,
        fields(slot = %self.inner.slot.slot_type),
        target = TRACING_TARGET_ORCHESTRATOR,
        name = "slot_pipeline"
    )]
    pub async fn run(&self) -> Result<PipelineOutcome> {
        let PipelineInner {
            slot,
            locale,
            extra_width,
            document,
            injector,
            negotiator,
            state,
        } = self.inner.as_ref();

        let Some(anchor) = document.query_selector(slot.anchor_selector()) else {
            state.set_phase(SlotPhase::Pending);
            return Ok(PipelineOutcome::AnchorMissing);
        };

        let Some(_guard) = state.try_lock() else {
            tracing::debug!(target: TRACING_TARGET_ORCHESTRATOR, "Rebuild already in flight");
            return Ok(PipelineOutcome::Busy);
        };

        if matches!(state.phase(), SlotPhase::Injected | SlotPhase::Healthy) {
            state.set_phase(SlotPhase::Healing);
        }

        let wrapper_selector = slot.wrapper_selector();
        let injected = document.query_selector(&wrapper_selector).is_none();
        if injected {
            injector
                .inject(anchor, slot, locale)
                .inspect_err(|_| state.set_phase(SlotPhase::Pending))?;
        }
        state.set_phase(SlotPhase::Injected);

        let frame = wait_for_element_unless(document.as_ref(), &slot.frame_selector(), || {
            document.query_selector(&wrapper_selector).is_none()
        })
        .await;

        let Some(frame) = frame else {
            tracing::debug!(
                target: TRACING_TARGET_ORCHESTRATOR,
                "Wrapper removed before the vendor frame rendered"
            );
            return Ok(PipelineOutcome::FrameAbandoned { injected });
        };

        let width = negotiator.adjust(frame, *extra_width).await;
        if width != WidthOutcome::Detached {
            state.set_phase(SlotPhase::Healthy);
        }

        tracing::debug!(
            target: TRACING_TARGET_ORCHESTRATOR,
            injected,
            adjusted = width.is_adjusted(),
            "Slot pipeline completed"
        );
        Ok(PipelineOutcome::Completed { injected, width })
    }
}

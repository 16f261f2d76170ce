//! Sizing the widget container to the vendor frame's rendered content.

use std::sync::Arc;
use std::time::Duration;

use pricetag_core::{
    Attempt, FrameAccessError, FrameProbe, NodeId, PageDocument, PollError, PollPolicy,
    RuntimeConfig,
};

use crate::TRACING_TARGET_WIDTH;

/// How a width negotiation ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthOutcome {
    /// The container width was set.
    Adjusted { width_px: f64 },
    /// The frame content belongs to another origin.
    CrossOrigin,
    /// No usable measurement within the retry budget.
    Exhausted { attempts: u32 },
    /// The frame or its container left the document.
    Detached,
}

impl WidthOutcome {
    /// Returns whether the width was adjusted.
    pub const fn is_adjusted(&self) -> bool {
        matches!(self, Self::Adjusted { .. })
    }
}

/// Retry and sizing parameters of the negotiator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthSettings {
    pub retries: u32,
    pub backoff: Duration,
    pub settle: Duration,
    pub margin_px: f64,
    pub min_width_px: f64,
}

impl From<&RuntimeConfig> for WidthSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            retries: config.width_retries,
            backoff: config.width_backoff(),
            settle: config.width_settle(),
            margin_px: config.width_margin_px,
            min_width_px: config.min_width_px,
        }
    }
}

impl Default for WidthSettings {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

/// Measures a vendor frame and writes the width of its containing element.
#[derive(Clone)]
pub struct WidthNegotiator {
    document: Arc<dyn PageDocument>,
    settings: WidthSettings,
}

impl WidthNegotiator {
    /// Creates a negotiator.
    pub fn new(document: Arc<dyn PageDocument>, settings: WidthSettings) -> Self {
        Self { document, settings }
    }

    /// Measures `frame` and sets the width of its parent element to the
    /// measured width plus the margin and `extra_width`.
    ///
    /// Waiting for the frame's load event shares the retry budget of the
    /// measurement and ends early when the frame is detached.
    pub async fn adjust(&self, frame: NodeId, extra_width: f64) -> WidthOutcome {
        let Some(container) = self.document.parent(frame) else {
            return WidthOutcome::Detached;
        };

        let policy = PollPolicy::bounded(self.settings.backoff, self.settings.retries);

        if !self.document.frame_is_complete(frame) {
            tracing::trace!(target: TRACING_TARGET_WIDTH, frame = %frame, "Waiting for frame load");
            // A detached frame never fires its load event.
            let detached = policy.poll(|| async {
                if self.document.is_connected(frame) {
                    Attempt::<_, ()>::Pending
                } else {
                    Attempt::Done(())
                }
            });

            tokio::select! {
                biased;

                () = self.document.frame_loaded(frame) => {}
                result = detached => {
                    if result.is_ok() {
                        tracing::debug!(
                            target: TRACING_TARGET_WIDTH,
                            frame = %frame,
                            "Frame left the document before loading"
                        );
                        return WidthOutcome::Detached;
                    }
                    tracing::debug!(
                        target: TRACING_TARGET_WIDTH,
                        frame = %frame,
                        "Frame load still pending, measuring anyway"
                    );
                }
            }
        }

        let measured = match policy.poll(|| async { self.measure(frame) }).await {
            Ok(width) => width,
            Err(PollError::Aborted(error)) => {
                tracing::warn!(
                    target: TRACING_TARGET_WIDTH,
                    frame = %frame,
                    error = %error,
                    "Cannot access frame content, leaving width unadjusted"
                );
                return WidthOutcome::CrossOrigin;
            }
            Err(PollError::Exhausted { attempts }) => {
                tracing::debug!(
                    target: TRACING_TARGET_WIDTH,
                    frame = %frame,
                    attempts,
                    "Frame never rendered a measurable container"
                );
                return WidthOutcome::Exhausted { attempts };
            }
        };

        tokio::time::sleep(self.settings.settle).await;
        let settled = match self.measure(frame) {
            Attempt::Done(width) => width,
            _ => measured,
        };

        let width_px = settled + self.settings.margin_px + extra_width;
        if let Err(error) = self
            .document
            .set_style_property(container, "width", &format!("{width_px}px"))
        {
            tracing::debug!(
                target: TRACING_TARGET_WIDTH,
                error = %error,
                "Frame container left the document before resizing"
            );
            return WidthOutcome::Detached;
        }

        tracing::debug!(target: TRACING_TARGET_WIDTH, frame = %frame, width_px, "Adjusted width");
        WidthOutcome::Adjusted { width_px }
    }

    fn measure(&self, frame: NodeId) -> Attempt<f64, FrameAccessError> {
        match self.document.probe_frame(frame) {
            Ok(FrameProbe::Width(width))
                if width.is_finite() && width >= self.settings.min_width_px =>
            {
                Attempt::Done(width)
            }
            Ok(_) => Attempt::Pending,
            Err(error) if error.is_permanent() => Attempt::Abort(error),
            Err(error) => {
                tracing::trace!(target: TRACING_TARGET_WIDTH, error = %error, "Frame probe failed");
                Attempt::Pending
            }
        }
    }
}

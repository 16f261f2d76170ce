//! Publishing the visible price into the hidden mirror node.

use std::sync::Arc;
use std::time::Duration;

use pricetag_core::{PageDocument, Result};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::state::SlotRuntimeState;
use crate::TRACING_TARGET_MIRROR;
use crate::wait::wait_for_element;

/// Extracts the numeric part of a displayed price.
///
/// Keeps ASCII digits and the `.`/`,` separators, then drops separators
/// left dangling at either end (the dot of `kr.`, for example). Returns
/// `None` when no digit remains.
pub fn extract_price(text: &str) -> Option<String> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == ',');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Result of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorUpdate {
    /// The mirror node is not in the document.
    MirrorMissing,
    /// The price element is missing or holds no number.
    NoPrice,
    /// The price equals the last value written.
    Unchanged,
    /// The mirror was rewritten and a change event dispatched.
    Updated(String),
}

/// Copies one price source into a slot's mirror node on a fixed period.
pub struct PriceMirror {
    document: Arc<dyn PageDocument>,
    state: Arc<SlotRuntimeState>,
    source: String,
    mirror: String,
    period: Duration,
}

impl PriceMirror {
    /// Creates a synchronizer from `source` into `mirror`.
    pub fn new(
        document: Arc<dyn PageDocument>,
        state: Arc<SlotRuntimeState>,
        source: impl Into<String>,
        mirror: impl Into<String>,
        period: Duration,
    ) -> Self {
        Self {
            document,
            state,
            source: source.into(),
            mirror: mirror.into(),
            period,
        }
    }

    /// Runs one synchronization pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror node is detached while being written.
    pub fn tick(&self) -> Result<MirrorUpdate> {
        let Some(mirror) = self.document.query_selector(&self.mirror) else {
            return Ok(MirrorUpdate::MirrorMissing);
        };

        let Some(price) = self
            .document
            .query_selector(&self.source)
            .and_then(|node| self.document.text_content(node))
            .and_then(|text| extract_price(&text))
        else {
            return Ok(MirrorUpdate::NoPrice);
        };

        if self.state.is_current_price(&self.source, &price) {
            return Ok(MirrorUpdate::Unchanged);
        }

        self.document.set_text_content(mirror, &price)?;
        self.document.dispatch_change(mirror)?;
        self.state.record_price(&self.source, &price);

        tracing::debug!(
            target: TRACING_TARGET_MIRROR,
            slot = %self.state.slot_type(),
            source = %self.source,
            price = %price,
            "Mirrored price"
        );
        Ok(MirrorUpdate::Updated(price))
    }

    /// Waits for the price element, then synchronizes until cancelled.
    #[tracing::instrument(
        skip_all,
        fields(slot = %self.state.slot_type(), source = %self.source),
        target = TRACING_TARGET_MIRROR,
        name = "price_mirror"
    )]
    pub async fn run(self, cancel: CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = wait_for_element(self.document.as_ref(), &self.source) => {}
        }

        tracing::debug!(target: TRACING_TARGET_MIRROR, "Price element found, mirroring");

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!(target: TRACING_TARGET_MIRROR, "Price mirror stopped");
                    break;
                }

                _ = ticker.tick() => {
                    if let Err(error) = self.tick() {
                        tracing::debug!(
                            target: TRACING_TARGET_MIRROR,
                            error = %error,
                            "Price mirror pass failed"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pricetag_core::ElementSpec;
    use pricetag_test::MemoryDocument;

    use super::*;

    const SOURCE: &str = ".product-price";
    const MIRROR: &str = "#vb-basket-hidden-price";

    fn page() -> (MemoryDocument, pricetag_core::NodeId) {
        let doc = MemoryDocument::new();
        let mirror = doc
            .append(doc.body(), &ElementSpec::new("div").with_id("vb-basket-hidden-price"))
            .unwrap();
        (doc, mirror)
    }

    fn mirror_of(doc: &MemoryDocument, state: &Arc<SlotRuntimeState>) -> PriceMirror {
        PriceMirror::new(
            Arc::new(doc.clone()),
            Arc::clone(state),
            SOURCE,
            MIRROR,
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn test_extract_price() {
        assert_eq!(extract_price("1.234,56 kr.").as_deref(), Some("1.234,56"));
        assert_eq!(extract_price("  DKK 499 ").as_deref(), Some("499"));
        assert_eq!(extract_price("€ 12,-").as_deref(), Some("12"));
        assert_eq!(extract_price("Sold out"), None);
        assert_eq!(extract_price("..."), None);
        assert_eq!(extract_price(""), None);
    }

    fn price_in(doc: &MemoryDocument, text: &str) -> pricetag_core::NodeId {
        doc.append_text(doc.body(), &ElementSpec::new("span").with_class("product-price"), text)
            .unwrap()
    }

    #[test]
    fn test_tick_writes_only_on_change() {
        let (doc, mirror) = page();
        let price = price_in(&doc, "1.234,56 kr.");
        let state = SlotRuntimeState::new("basket");
        let sync = mirror_of(&doc, &state);

        assert_eq!(sync.tick().unwrap(), MirrorUpdate::Updated("1.234,56".into()));
        assert_eq!(sync.tick().unwrap(), MirrorUpdate::Unchanged);
        assert_eq!(doc.text_content(mirror).as_deref(), Some("1.234,56"));
        assert_eq!(doc.change_events(mirror), 1);

        doc.set_text_content(price, "999 kr.").unwrap();
        assert_eq!(sync.tick().unwrap(), MirrorUpdate::Updated("999".into()));
        assert_eq!(doc.change_events(mirror), 2);
    }

    #[test]
    fn test_unparseable_price_keeps_previous_value() {
        let (doc, mirror) = page();
        let price = price_in(&doc, "100");
        let state = SlotRuntimeState::new("basket");
        let sync = mirror_of(&doc, &state);
        sync.tick().unwrap();

        doc.set_text_content(price, "Loading...").unwrap();
        assert_eq!(sync.tick().unwrap(), MirrorUpdate::NoPrice);
        assert_eq!(doc.text_content(mirror).as_deref(), Some("100"));
        assert_eq!(doc.change_events(mirror), 1);
    }

    #[test]
    fn test_missing_mirror_is_skipped() {
        let doc = MemoryDocument::new();
        price_in(&doc, "10");
        let state = SlotRuntimeState::new("basket");

        assert_eq!(mirror_of(&doc, &state).tick().unwrap(), MirrorUpdate::MirrorMissing);
        assert_eq!(state.last_price(SOURCE), None);
    }

    #[test]
    fn test_failed_write_is_retried() {
        let (doc, mirror) = page();
        price_in(&doc, "499 kr.");
        let state = SlotRuntimeState::new("basket");
        let sync = mirror_of(&doc, &state);

        doc.set_read_only(mirror, true);
        assert!(sync.tick().is_err());
        assert_eq!(state.last_price(SOURCE), None);

        doc.set_read_only(mirror, false);
        assert_eq!(sync.tick().unwrap(), MirrorUpdate::Updated("499".into()));
        assert_eq!(doc.text_content(mirror).as_deref(), Some("499"));
        assert_eq!(doc.change_events(mirror), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_for_price_then_polls() {
        let (doc, mirror) = page();
        let state = SlotRuntimeState::new("basket");
        let cancel = CancellationToken::new();
        let task = tokio::spawn(mirror_of(&doc, &state).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let price = price_in(&doc, "200");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(doc.text_content(mirror).as_deref(), Some("200"));

        doc.set_text_content(price, "250").unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(doc.text_content(mirror).as_deref(), Some("250"));
        assert_eq!(doc.change_events(mirror), 2);

        cancel.cancel();
        task.await.unwrap();
    }
}

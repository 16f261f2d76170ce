//! Waiting for elements to appear.

use futures::StreamExt;
use pricetag_core::{NodeId, PageDocument};

use crate::TRACING_TARGET_ORCHESTRATOR;

/// Resolves with the first connected element matching `selector`.
///
/// Subscribes to mutations before the first query so an element inserted
/// in between is not missed. Never resolves if the element never appears.
pub async fn wait_for_element(document: &dyn PageDocument, selector: &str) -> NodeId {
    match wait_for_element_unless(document, selector, || false).await {
        Some(node) => node,
        None => std::future::pending().await,
    }
}

/// Like [`wait_for_element`], but gives up with `None` once `abandon`
/// returns `true` after a mutation.
pub async fn wait_for_element_unless<F>(
    document: &dyn PageDocument,
    selector: &str,
    abandon: F,
) -> Option<NodeId>
where
    F: Fn() -> bool + Send,
{
    let mut mutations = document.observe_mutations();

    if let Some(node) = document.query_selector(selector) {
        return Some(node);
    }

    tracing::trace!(
        target: TRACING_TARGET_ORCHESTRATOR,
        selector,
        "Waiting for element"
    );

    while mutations.next().await.is_some() {
        if let Some(node) = document.query_selector(selector) {
            return Some(node);
        }
        if abandon() {
            tracing::trace!(
                target: TRACING_TARGET_ORCHESTRATOR,
                selector,
                "Stopped waiting for element"
            );
            return None;
        }
    }

    None
}

//! Mock vendor widget runtime.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use pricetag_core::{VendorRuntime, VendorRuntimeHandle};

use super::document::{FrameBehavior, MemoryDocument};

const MARKER_SELECTOR: &str = ".viabill-pricetag";

#[derive(Default)]
struct VendorState {
    ready: AtomicBool,
    rescans: AtomicU32,
    renderer: Mutex<Option<(MemoryDocument, FrameBehavior)>>,
}

/// Mock vendor runtime.
///
/// Once ready, and when rendering is enabled with [`MockVendor::render_into`],
/// every scan attaches a child frame to each marker that has none yet, the
/// way the real widget script renders its markers.
#[derive(Clone, Default)]
pub struct MockVendor {
    inner: Arc<VendorState>,
}

impl MockVendor {
    /// Creates a vendor runtime that is not ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vendor runtime that is already ready.
    pub fn ready() -> Self {
        let vendor = Self::new();
        vendor.inner.ready.store(true, Ordering::SeqCst);
        vendor
    }

    /// Renders markers of `document` as frames with the given behavior.
    pub fn render_into(&self, document: &MemoryDocument, frame: FrameBehavior) {
        *self
            .inner
            .renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((document.clone(), frame));
    }

    /// Flips the readiness flag; becoming ready scans the document once.
    pub fn set_ready(&self, ready: bool) {
        let was_ready = self.inner.ready.swap(ready, Ordering::SeqCst);
        if ready && !was_ready {
            self.render();
        }
    }

    /// Returns how many rescans were requested.
    pub fn rescans(&self) -> u32 {
        self.inner.rescans.load(Ordering::SeqCst)
    }

    /// Returns a runtime handle backed by this mock.
    pub fn handle(&self) -> VendorRuntimeHandle {
        VendorRuntimeHandle::new(self.clone())
    }

    fn render(&self) {
        let renderer = self
            .inner
            .renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some((document, frame)) = renderer else {
            return;
        };

        for marker in document.query_all(MARKER_SELECTOR) {
            let rendered = document
                .children(marker)
                .into_iter()
                .any(|child| document.tag(child).as_deref() == Some("iframe"));
            if !rendered {
                let _ = document.attach_frame(marker, frame.clone());
            }
        }
    }
}

impl VendorRuntime for MockVendor {
    fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    fn rescan(&self) {
        self.inner.rescans.fetch_add(1, Ordering::SeqCst);
        if self.is_ready() {
            self.render();
        }
    }
}

#[cfg(test)]
mod tests {
    use pricetag_core::PageDocument;
    use pricetag_core::page::ElementSpec;

    use super::*;

    #[tokio::test]
    async fn test_rescan_renders_unrendered_markers() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::ready();
        vendor.render_into(&doc, FrameBehavior::rendered(150.0));

        let marker = doc
            .append(doc.body(), &ElementSpec::new("div").with_class("viabill-pricetag"))
            .unwrap();

        assert!(vendor.handle().rescan());
        assert!(vendor.handle().rescan());

        assert_eq!(vendor.rescans(), 2);
        assert_eq!(doc.children(marker).len(), 1);
        assert!(doc.query_selector(".viabill-pricetag > iframe").is_some());
    }

    #[tokio::test]
    async fn test_becoming_ready_renders_existing_markers() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::new();
        vendor.render_into(&doc, FrameBehavior::rendered(150.0));
        doc.append(doc.body(), &ElementSpec::new("div").with_class("viabill-pricetag"))
            .unwrap();

        assert!(!vendor.handle().rescan());
        assert_eq!(doc.count("iframe"), 0);

        vendor.set_ready(true);
        assert_eq!(doc.count("iframe"), 1);
    }
}

//! Wrapper, marker and hidden mirror fragments.

use std::sync::Arc;

use pricetag_core::{
    ElementSpec, Locale, NodeId, PageDocument, Result, SlotConfig, VendorRuntimeHandle,
};

use crate::TRACING_TARGET_INJECTOR;

/// Id of the hidden container holding every slot's mirror node.
pub const HIDDEN_PRICES_ID: &str = "vb-hidden-prices";

/// Inline style of the hidden mirror container.
pub const HIDDEN_PRICES_STYLE: &str =
    "visibility:hidden;height:0;margin:0;padding:0;overflow:hidden;";

/// Class of the marker element the vendor runtime renders into.
pub const MARKER_CLASS: &str = "viabill-pricetag";

/// Builds the wrapper fragment of a slot: wrapper div holding the marker.
pub fn wrapper_fragment(slot: &SlotConfig, locale: &Locale) -> ElementSpec {
    let mirror = slot.mirror_selector();
    let marker = ElementSpec::new("div")
        .with_class(MARKER_CLASS)
        .with_attribute("data-view", slot.view())
        .with_attribute("data-dynamic-price", mirror.as_str())
        .with_attribute("data-dynamic-price-triggers", mirror.as_str())
        .with_attribute("data-language", locale.language.as_str())
        .with_attribute("data-currency", locale.currency.as_str())
        .with_attribute("data-country-code", locale.country_code.as_str());

    ElementSpec::new("div")
        .with_id(slot.wrapper_id())
        .with_style(slot.style())
        .with_child(marker)
}

/// Builds the hidden container with one empty mirror node per slot.
pub fn hidden_prices_fragment<'a>(slots: impl IntoIterator<Item = &'a SlotConfig>) -> ElementSpec {
    slots.into_iter().fold(
        ElementSpec::new("div")
            .with_id(HIDDEN_PRICES_ID)
            .with_style(HIDDEN_PRICES_STYLE),
        |container, slot| container.with_child(mirror_fragment(slot)),
    )
}

fn mirror_fragment(slot: &SlotConfig) -> ElementSpec {
    ElementSpec::new("div").with_id(slot.mirror_id())
}

/// Inserts slot fragments into the page.
#[derive(Clone)]
pub struct FragmentInjector {
    document: Arc<dyn PageDocument>,
    vendor: VendorRuntimeHandle,
}

impl FragmentInjector {
    /// Creates an injector.
    pub fn new(document: Arc<dyn PageDocument>, vendor: VendorRuntimeHandle) -> Self {
        Self { document, vendor }
    }

    /// Inserts the slot's wrapper right after `anchor` and asks the vendor
    /// runtime to render it.
    ///
    /// Does not check for an existing wrapper; callers do.
    ///
    /// # Errors
    ///
    /// Returns [`NodeDetached`] if the anchor left the document.
    ///
    /// [`NodeDetached`]: pricetag_core::ErrorKind::NodeDetached
    pub fn inject(&self, anchor: NodeId, slot: &SlotConfig, locale: &Locale) -> Result<NodeId> {
        let wrapper = self
            .document
            .insert_after(anchor, &wrapper_fragment(slot, locale))?;

        let rescanned = self.vendor.rescan();
        tracing::debug!(
            target: TRACING_TARGET_INJECTOR,
            slot = %slot.slot_type,
            wrapper = %wrapper,
            rescanned,
            "Injected wrapper"
        );

        Ok(wrapper)
    }

    /// Creates the hidden mirror container and any missing mirror nodes.
    ///
    /// Returns the number of mirror nodes created.
    ///
    /// # Errors
    ///
    /// Returns an error if the page rejects the insertion.
    pub fn ensure_hidden_prices(&self, slots: &[SlotConfig]) -> Result<usize> {
        let missing: Vec<&SlotConfig> = slots
            .iter()
            .filter(|slot| self.document.query_selector(&slot.mirror_selector()).is_none())
            .collect();

        if missing.is_empty() {
            return Ok(0);
        }

        let container = format!("#{HIDDEN_PRICES_ID}");
        match self.document.query_selector(&container) {
            Some(container) => {
                for slot in &missing {
                    self.document
                        .append_child(container, &mirror_fragment(slot))?;
                }
            }
            None => {
                self.document
                    .append_to_body(&hidden_prices_fragment(missing.iter().copied()))?;
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_INJECTOR,
            created = missing.len(),
            "Created hidden mirror nodes"
        );
        Ok(missing.len())
    }
}

#[cfg(test)]
mod tests {
    use pricetag_test::{FrameBehavior, MemoryDocument, MockVendor};

    use super::*;

    fn locale() -> Locale {
        Locale::default()
    }

    #[test]
    fn test_wrapper_fragment_markup() {
        let slot = SlotConfig::new("mini-basket", ".cart-total");

        let html = wrapper_fragment(&slot, &locale()).to_html();

        assert_eq!(
            html,
            concat!(
                r#"<div id="viabill-mini-basket-pricetag-wrapper" "#,
                r#"style="display:flex;justify-content:center;align-items:center;margin-top:5px;margin-bottom:5px;">"#,
                r#"<div class="viabill-pricetag" data-view="basket" "#,
                r##"data-dynamic-price="#vb-mini-basket-hidden-price" "##,
                r##"data-dynamic-price-triggers="#vb-mini-basket-hidden-price" "##,
                r#"data-language="da" data-currency="dkk" data-country-code="dk"></div></div>"#,
            )
        );
    }

    #[test]
    fn test_inject_places_wrapper_after_anchor() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::new();
        let anchor = doc
            .append(doc.body(), &ElementSpec::new("div").with_class("price-box"))
            .unwrap();
        let footer = doc.append(doc.body(), &ElementSpec::new("footer")).unwrap();
        let injector = FragmentInjector::new(Arc::new(doc.clone()), vendor.handle());
        let slot = SlotConfig::new("product", ".price-box");

        let wrapper = injector.inject(anchor, &slot, &locale()).unwrap();

        assert_eq!(doc.children(doc.body()), vec![anchor, wrapper, footer]);
        let marker = doc.query_selector("#viabill-product-pricetag-wrapper > .viabill-pricetag");
        let marker = marker.unwrap();
        assert_eq!(doc.attribute(marker, "data-view").as_deref(), Some("product"));
        // Vendor not ready: no rescan delivered.
        assert_eq!(vendor.rescans(), 0);
    }

    #[tokio::test]
    async fn test_inject_rescans_ready_vendor() {
        let doc = MemoryDocument::new();
        let vendor = MockVendor::ready();
        vendor.render_into(&doc, FrameBehavior::rendered(160.0));
        let anchor = doc
            .append(doc.body(), &ElementSpec::new("div").with_class("price-box"))
            .unwrap();
        let injector = FragmentInjector::new(Arc::new(doc.clone()), vendor.handle());

        injector
            .inject(anchor, &SlotConfig::new("product", ".price-box"), &locale())
            .unwrap();

        assert_eq!(vendor.rescans(), 1);
        assert!(
            doc.query_selector(&SlotConfig::new("product", ".price-box").frame_selector())
                .is_some()
        );
    }

    #[test]
    fn test_inject_on_detached_anchor_fails() {
        let doc = MemoryDocument::new();
        let anchor = doc.append(doc.body(), &ElementSpec::new("div")).unwrap();
        doc.remove(anchor);
        let injector = FragmentInjector::new(Arc::new(doc.clone()), MockVendor::new().handle());

        let error = injector
            .inject(anchor, &SlotConfig::new("product", "div"), &locale())
            .unwrap_err();

        assert_eq!(error.kind(), pricetag_core::ErrorKind::NodeDetached);
        assert_eq!(doc.count("#viabill-product-pricetag-wrapper"), 0);
    }

    #[test]
    fn test_hidden_prices_created_once() {
        let doc = MemoryDocument::new();
        let injector = FragmentInjector::new(Arc::new(doc.clone()), MockVendor::new().handle());
        let slots = vec![
            SlotConfig::new("product", ".price"),
            SlotConfig::new("basket", ".total"),
        ];

        assert_eq!(injector.ensure_hidden_prices(&slots).unwrap(), 2);
        assert_eq!(injector.ensure_hidden_prices(&slots).unwrap(), 0);

        let container = doc.query_selector("#vb-hidden-prices").unwrap();
        assert_eq!(doc.style_property(container, "visibility").as_deref(), Some("hidden"));
        assert_eq!(doc.count("#vb-hidden-prices > div"), 2);

        let more = vec![SlotConfig::new("checkout", ".sum")];
        assert_eq!(injector.ensure_hidden_prices(&more).unwrap(), 1);
        assert_eq!(doc.count("#vb-hidden-prices"), 1);
        assert!(doc.query_selector("#vb-hidden-prices > #vb-checkout-hidden-price").is_some());
    }
}

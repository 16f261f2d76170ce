//! Per-placement slot configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default inline style of the injected wrapper.
pub const DEFAULT_WRAPPER_STYLE: &str =
    "display:flex;justify-content:center;align-items:center;margin-top:5px;margin-bottom:5px;";

/// Data view used for every slot whose type mentions a basket.
const BASKET_VIEW: &str = "basket";

/// One widget placement: where to inject, and which prices to mirror.
///
/// The `type` is the slot's unique key; every id the helper creates for the
/// slot is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SlotConfig {
    /// Unique slot key, e.g. `product` or `mini-basket`.
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64), custom(function = "validate_slot_type"))]
    pub slot_type: String,

    /// Selector of the anchor element the wrapper is inserted after.
    #[serde(alias = "anchorSelector")]
    #[validate(length(min = 1))]
    pub price_container_selector: String,

    /// Selector of the visible price element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_price_selector: Option<String>,

    /// Selector of an alternative visible price element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_price_selector: Option<String>,

    /// Inline style of the wrapper; defaults to [`DEFAULT_WRAPPER_STYLE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Currency override for this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Country code override for this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// Language override for this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Slot types end up inside element ids and selectors.
fn validate_slot_type(slot_type: &str) -> Result<(), validator::ValidationError> {
    let valid = slot_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_slot_type"))
    }
}

impl SlotConfig {
    /// Creates a slot with the given type and anchor selector.
    pub fn new(slot_type: impl Into<String>, anchor_selector: impl Into<String>) -> Self {
        Self {
            slot_type: slot_type.into(),
            price_container_selector: anchor_selector.into(),
            primary_price_selector: None,
            secondary_price_selector: None,
            style: None,
            currency: None,
            country_code: None,
            language: None,
        }
    }

    /// Sets the primary price selector.
    pub fn with_primary_price(mut self, selector: impl Into<String>) -> Self {
        self.primary_price_selector = Some(selector.into());
        self
    }

    /// Sets the secondary price selector.
    pub fn with_secondary_price(mut self, selector: impl Into<String>) -> Self {
        self.secondary_price_selector = Some(selector.into());
        self
    }

    /// Sets the wrapper style.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Returns the anchor selector.
    pub fn anchor_selector(&self) -> &str {
        &self.price_container_selector
    }

    /// Returns the wrapper style, falling back to the default.
    pub fn style(&self) -> &str {
        self.style.as_deref().unwrap_or(DEFAULT_WRAPPER_STYLE)
    }

    /// Returns the data view: `basket` for any basket slot, else the type.
    pub fn view(&self) -> &str {
        if self.slot_type.contains(BASKET_VIEW) {
            BASKET_VIEW
        } else {
            &self.slot_type
        }
    }

    /// Id of the wrapper element, `viabill-<type>-pricetag-wrapper`.
    pub fn wrapper_id(&self) -> String {
        format!("viabill-{}-pricetag-wrapper", self.slot_type)
    }

    /// Selector matching the wrapper element.
    pub fn wrapper_selector(&self) -> String {
        format!("#{}", self.wrapper_id())
    }

    /// Id of the hidden mirror node, `vb-<type>-hidden-price`.
    pub fn mirror_id(&self) -> String {
        format!("vb-{}-hidden-price", self.slot_type)
    }

    /// Selector matching the hidden mirror node.
    pub fn mirror_selector(&self) -> String {
        format!("#{}", self.mirror_id())
    }

    /// Selector matching the vendor frame rendered inside the marker.
    pub fn frame_selector(&self) -> String {
        format!("{} > .viabill-pricetag > iframe", self.wrapper_selector())
    }

    /// Iterates over the configured price selectors, primary first.
    pub fn price_selectors(&self) -> impl Iterator<Item = &str> {
        self.primary_price_selector
            .as_deref()
            .into_iter()
            .chain(self.secondary_price_selector.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_ids() {
        let slot = SlotConfig::new("product", ".price-box");

        assert_eq!(slot.wrapper_id(), "viabill-product-pricetag-wrapper");
        assert_eq!(slot.mirror_selector(), "#vb-product-hidden-price");
        assert_eq!(
            slot.frame_selector(),
            "#viabill-product-pricetag-wrapper > .viabill-pricetag > iframe"
        );
    }

    #[test]
    fn test_basket_view() {
        assert_eq!(SlotConfig::new("basket", "#a").view(), "basket");
        assert_eq!(SlotConfig::new("mini-basket", "#a").view(), "basket");
        assert_eq!(SlotConfig::new("product", "#a").view(), "product");
    }

    #[test]
    fn test_price_selectors_order() {
        let slot = SlotConfig::new("product", "#a")
            .with_secondary_price(".sale")
            .with_primary_price(".regular");

        let selectors: Vec<_> = slot.price_selectors().collect();
        assert_eq!(selectors, vec![".regular", ".sale"]);
    }

    #[test]
    fn test_validate_rejects_unsafe_type() {
        assert!(SlotConfig::new("product", "#a").validate().is_ok());
        assert!(SlotConfig::new("pro duct", "#a").validate().is_err());
        assert!(SlotConfig::new("", "#a").validate().is_err());
        assert!(SlotConfig::new("product", "").validate().is_err());
    }

    #[test]
    fn test_anchor_selector_alias() {
        let slot: SlotConfig =
            serde_json::from_str(r#"{"type":"cart","anchorSelector":".total"}"#).unwrap();
        assert_eq!(slot.anchor_selector(), ".total");
        assert_eq!(slot.style(), DEFAULT_WRAPPER_STYLE);
    }
}

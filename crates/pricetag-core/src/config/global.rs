//! Page-wide helper configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::SlotConfig;
use crate::{CookiesEnabled, Error, Result};

/// Currency used when neither the slot nor the page sets one.
pub const DEFAULT_CURRENCY: &str = "dkk";

/// Country code used when neither the slot nor the page sets one.
pub const DEFAULT_COUNTRY_CODE: &str = "dk";

/// Language used when neither the slot nor the page sets one.
pub const DEFAULT_LANGUAGE: &str = "da";

/// Configuration object a merchant page hands to the helper.
///
/// Immutable once the orchestrator starts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Merchant code identifying the shop to the vendor script.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub code: String,

    /// Pixels added to every negotiated wrapper width.
    #[serde(default)]
    pub extra_width: f64,

    /// Widget placements, processed independently.
    #[serde(default)]
    #[validate(nested)]
    pub pricetag_configs: Vec<SlotConfig>,

    /// Consent to enqueue before the vendor script is loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies_enabled: Option<CookiesEnabled>,

    /// Page-wide currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Page-wide country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// Page-wide language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Locale attributes written onto a slot's marker element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    pub currency: String,
    pub country_code: String,
    pub language: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_owned(),
            country_code: DEFAULT_COUNTRY_CODE.to_owned(),
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }
}

impl GlobalConfig {
    /// Creates a configuration for the given merchant code.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// Parses a configuration from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adds a slot.
    pub fn with_slot(mut self, slot: SlotConfig) -> Self {
        self.pricetag_configs.push(slot);
        self
    }

    /// Sets the consent to enqueue before loading.
    pub fn with_cookies_enabled(mut self, value: impl Into<CookiesEnabled>) -> Self {
        self.cookies_enabled = Some(value.into());
        self
    }

    /// Sets the extra width.
    pub fn with_extra_width(mut self, extra_width: f64) -> Self {
        self.extra_width = extra_width;
        self
    }

    /// Validates field constraints and slot type uniqueness.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first violation.
    pub fn check(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(Error::configuration().with_message("merchant code is required"));
        }

        self.validate()?;

        let mut seen = HashSet::with_capacity(self.pricetag_configs.len());
        for slot in &self.pricetag_configs {
            if !seen.insert(slot.slot_type.as_str()) {
                return Err(Error::configuration()
                    .with_message(format!("duplicate slot type '{}'", slot.slot_type)));
            }
        }

        if !self.extra_width.is_finite() {
            return Err(Error::configuration().with_message("extra width must be a finite number"));
        }

        Ok(())
    }

    /// Resolves the locale of a slot: slot value, else page value, else default.
    pub fn locale_for(&self, slot: &SlotConfig) -> Locale {
        let defaults = Locale::default();
        let pick = |slot_value: &Option<String>, page_value: &Option<String>, fallback: String| {
            slot_value
                .clone()
                .or_else(|| page_value.clone())
                .unwrap_or(fallback)
        };

        Locale {
            currency: pick(&slot.currency, &self.currency, defaults.currency),
            country_code: pick(&slot.country_code, &self.country_code, defaults.country_code),
            language: pick(&slot.language, &self.language, defaults.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConsentCategory, ErrorKind};

    #[test]
    fn test_parse_camel_case_document() {
        let config = GlobalConfig::from_json(
            r#"{
                "code": "abc123",
                "extraWidth": 4,
                "cookiesEnabled": ["necessary", "marketing"],
                "currency": "eur",
                "pricetagConfigs": [
                    { "type": "product", "priceContainerSelector": ".price", "primaryPriceSelector": ".price .amount" },
                    { "type": "basket", "priceContainerSelector": ".cart-total" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.code, "abc123");
        assert_eq!(config.extra_width, 4.0);
        assert_eq!(config.pricetag_configs.len(), 2);
        assert_eq!(
            config.cookies_enabled,
            Some(CookiesEnabled::Categories(vec![
                ConsentCategory::Necessary,
                ConsentCategory::Marketing
            ]))
        );
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_missing_code_fails_fast() {
        let config = GlobalConfig::from_json(r#"{ "pricetagConfigs": [] }"#).unwrap();
        let error = config.check().unwrap_err();

        assert_eq!(error.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_duplicate_slot_types_rejected() {
        let config = GlobalConfig::new("abc")
            .with_slot(SlotConfig::new("product", "#a"))
            .with_slot(SlotConfig::new("product", "#b"));

        let error = config.check().unwrap_err();
        assert!(error.to_string().contains("duplicate slot type"));
    }

    #[test]
    fn test_invalid_slot_reported_as_configuration() {
        let config = GlobalConfig::new("abc").with_slot(SlotConfig::new("bad type", "#a"));

        assert_eq!(config.check().unwrap_err().kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_locale_resolution_order() {
        let mut config = GlobalConfig::new("abc");
        config.language = Some("en".into());

        let mut slot = SlotConfig::new("product", "#a");
        slot.currency = Some("sek".into());

        let locale = config.locale_for(&slot);
        assert_eq!(locale.currency, "sek");
        assert_eq!(locale.language, "en");
        assert_eq!(locale.country_code, DEFAULT_COUNTRY_CODE);
    }
}

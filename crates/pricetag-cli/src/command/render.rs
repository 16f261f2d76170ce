//! `pricetag render`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use pricetag_core::{ConsentEntry, GlobalConfig, RuntimeConfig};
use pricetag_runtime::{hidden_prices_fragment, wrapper_fragment};
use serde::Serialize;

use crate::TRACING_TARGET_COMMAND;
use crate::config::load_helper_config;

/// Arguments of `pricetag render`.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Path to the helper configuration JSON file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Everything `init` would put on the page for a configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub script_url: String,
    pub consent: Vec<ConsentEntry>,
    pub hidden_prices_html: String,
    pub slots: Vec<RenderedSlot>,
}

/// The DOM contract of one slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedSlot {
    #[serde(rename = "type")]
    pub slot_type: String,
    pub anchor_selector: String,
    pub view: String,
    pub wrapper_id: String,
    pub mirror_id: String,
    pub wrapper_html: String,
}

/// Renders the page contract of a validated configuration.
///
/// # Errors
///
/// Returns an error if the vendor script URL cannot be built.
pub fn render_page(config: &GlobalConfig, runtime: &RuntimeConfig) -> anyhow::Result<RenderedPage> {
    let script_url = runtime
        .script_url(&config.code)
        .context("failed to build vendor script url")?;

    let slots = config
        .pricetag_configs
        .iter()
        .map(|slot| RenderedSlot {
            slot_type: slot.slot_type.clone(),
            anchor_selector: slot.anchor_selector().to_owned(),
            view: slot.view().to_owned(),
            wrapper_id: slot.wrapper_id(),
            mirror_id: slot.mirror_id(),
            wrapper_html: wrapper_fragment(slot, &config.locale_for(slot)).to_html(),
        })
        .collect();

    Ok(RenderedPage {
        script_url: script_url.into(),
        consent: config
            .cookies_enabled
            .iter()
            .cloned()
            .map(ConsentEntry::new)
            .collect(),
        hidden_prices_html: hidden_prices_fragment(&config.pricetag_configs).to_html(),
        slots,
    })
}

impl RenderArgs {
    /// Prints the rendered page contract as JSON to stdout.
    pub fn run(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        let config = load_helper_config(&self.config)?;
        let page = render_page(&config, runtime)?;

        let json = if self.pretty {
            serde_json::to_string_pretty(&page)
        } else {
            serde_json::to_string(&page)
        }
        .context("failed to serialize rendered page")?;

        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            slots = page.slots.len(),
            "rendered page contract"
        );
        println!("{json}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pricetag_core::{ConsentCategory, CookiesEnabled, SlotConfig};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_render_page_contract() {
        let mut config = GlobalConfig::new("shop-1")
            .with_cookies_enabled(CookiesEnabled::categories([ConsentCategory::Statistical]))
            .with_slot(SlotConfig::new("mini-basket", ".cart .total"));
        config.language = Some("en".into());

        let page = render_page(&config, &RuntimeConfig::default()).unwrap();
        let value = serde_json::to_value(&page).unwrap();

        assert_eq!(value["scriptUrl"], "https://pricetag.viabill.com/script/shop-1");
        assert_eq!(
            value["consent"],
            json!([{ "pricetag.cookiesEnabled": ["necessary", "statistical"] }])
        );
        assert_eq!(value["slots"][0]["type"], "mini-basket");
        assert_eq!(value["slots"][0]["view"], "basket");
        assert_eq!(value["slots"][0]["wrapperId"], "viabill-mini-basket-pricetag-wrapper");
        assert_eq!(value["slots"][0]["mirrorId"], "vb-mini-basket-hidden-price");

        let wrapper_html = value["slots"][0]["wrapperHtml"].as_str().unwrap();
        assert!(wrapper_html.contains(r#"data-language="en""#));
        assert!(wrapper_html.contains(r#"data-currency="dkk""#));
        assert!(
            page.hidden_prices_html
                .starts_with(r#"<div id="vb-hidden-prices" "#)
        );
    }

    #[test]
    fn test_no_consent_without_cookies_enabled() {
        let config = GlobalConfig::new("shop-1");

        let page = render_page(&config, &RuntimeConfig::default()).unwrap();

        assert!(page.consent.is_empty());
        assert!(page.slots.is_empty());
    }

    #[test]
    fn test_vendor_host_override() {
        let runtime = RuntimeConfig::default().with_vendor_host("https://staging.example.com/");

        let page = render_page(&GlobalConfig::new("abc"), &runtime).unwrap();

        assert_eq!(page.script_url, "https://staging.example.com/script/abc");
    }
}

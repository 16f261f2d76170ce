#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the storefront consent adapter.
pub const TRACING_TARGET_SHOPIFY: &str = "pricetag_consent::shopify";

pub mod shopify;

pub use shopify::{BindOptions, ConsentMode, ShopifyConsent};

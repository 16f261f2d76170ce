//! Adapter for storefronts exposing a customer-privacy API.
//!
//! The adapter only ever calls the consent sink: it pushes the strict
//! default first, then the mapped visitor consent whenever it is known.

mod adapter;
mod mapping;

pub use adapter::{BindOptions, CONSENT_FEATURE_NAME, CONSENT_FEATURE_VERSION, ShopifyConsent};
pub use mapping::{ConsentMode, cookies_enabled_for};

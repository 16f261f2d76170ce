//! Storefront customer-privacy API port.
//!
//! Consent adapters read visitor consent through [`PrivacyPlatform`] and
//! translate it into a [`CookiesEnabled`] value.
//!
//! [`CookiesEnabled`]: crate::CookiesEnabled

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Stream of consent-collected events; `None` when the event carried no detail.
pub type ConsentEventStream = Pin<Box<dyn Stream<Item = Option<VisitorConsent>> + Send>>;

/// Processing purposes a visitor has allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorConsent {
    #[serde(default)]
    pub preferences_allowed: bool,
    #[serde(default)]
    pub analytics_allowed: bool,
    #[serde(default)]
    pub marketing_allowed: bool,
}

impl VisitorConsent {
    /// Returns whether any purpose is allowed.
    pub const fn any_allowed(&self) -> bool {
        self.preferences_allowed || self.analytics_allowed || self.marketing_allowed
    }
}

/// A platform feature to load on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub name: String,
    pub version: String,
}

impl FeatureRequest {
    /// Creates a feature request.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// The host platform's customer-privacy surface.
#[async_trait::async_trait]
pub trait PrivacyPlatform: Send + Sync {
    /// Returns whether the privacy API is present on the page.
    fn privacy_api_available(&self) -> bool;

    /// Reads the current consent state; `None` when the API is absent.
    fn read_consent(&self) -> Option<VisitorConsent>;

    /// Returns whether the platform exposes an on-demand feature loader.
    fn has_feature_loader(&self) -> bool;

    /// Loads platform features and resolves once the loader calls back.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, or [`ErrorKind::FeatureUnavailable`] when
    /// no loader exists.
    ///
    /// [`ErrorKind::FeatureUnavailable`]: crate::ErrorKind::FeatureUnavailable
    async fn load_features(&self, features: &[FeatureRequest]) -> Result<()>;

    /// Subscribes to consent-collected events.
    fn consent_collected(&self) -> ConsentEventStream;
}

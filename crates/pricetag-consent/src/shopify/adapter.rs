//! Binding a storefront's customer-privacy API to the consent queue.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use pricetag_core::{
    ConsentSink, CookiesEnabled, Error, FeatureRequest, PrivacyPlatform, Result, VisitorConsent,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::mapping::{ConsentMode, cookies_enabled_for};
use crate::TRACING_TARGET_SHOPIFY;

/// Name of the platform feature providing the privacy API.
pub const CONSENT_FEATURE_NAME: &str = "consent-tracking-api";

/// Version of the privacy API feature requested.
pub const CONSENT_FEATURE_VERSION: &str = "0.1";

/// Logs a diagnostic event at `debug` when enabled, `trace` otherwise.
macro_rules! diagnostic {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::debug!(target: TRACING_TARGET_SHOPIFY, $($arg)+);
        } else {
            tracing::trace!(target: TRACING_TARGET_SHOPIFY, $($arg)+);
        }
    };
}

/// Options of [`ShopifyConsent::bind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindOptions {
    /// Shape of the pushed consent values.
    #[serde(default)]
    pub mode: ConsentMode,
    /// Lifts diagnostic events from `trace` to `debug`.
    #[serde(default)]
    pub debug: bool,
}

impl BindOptions {
    /// Sets the consent mode.
    pub fn with_mode(mut self, mode: ConsentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables diagnostic logging at `debug`.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

struct Binding {
    platform: Arc<dyn PrivacyPlatform>,
    sink: Arc<dyn ConsentSink>,
    options: BindOptions,
    last_detail: Mutex<Option<VisitorConsent>>,
}

impl Binding {
    fn read_allowed(&self) -> Option<VisitorConsent> {
        let consent = self.platform.read_consent();
        match consent {
            Some(consent) => diagnostic!(
                self.options.debug,
                consent = ?consent,
                "Read consent from the privacy API"
            ),
            None => diagnostic!(self.options.debug, "Privacy API is missing"),
        }
        consent
    }

    fn apply(&self, detail: Option<VisitorConsent>) {
        *self
            .last_detail
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = detail;

        let Some(detail) = detail else {
            diagnostic!(self.options.debug, "No consent detail to apply");
            return;
        };

        let value = cookies_enabled_for(&detail, self.options.mode);
        diagnostic!(
            self.options.debug,
            mode = %self.options.mode,
            value = ?value,
            "Applying visitor consent"
        );
        self.sink.push_consent(value);
    }

    async fn ensure_api(&self) -> Result<()> {
        if self.platform.privacy_api_available() {
            diagnostic!(self.options.debug, "Privacy API already available");
            return Ok(());
        }

        if !self.platform.has_feature_loader() {
            return Err(Error::feature_unavailable()
                .with_message("Storefront feature loader is missing"));
        }

        diagnostic!(
            self.options.debug,
            feature = CONSENT_FEATURE_NAME,
            version = CONSENT_FEATURE_VERSION,
            "Loading privacy API feature"
        );
        self.platform
            .load_features(&[FeatureRequest::new(
                CONSENT_FEATURE_NAME,
                CONSENT_FEATURE_VERSION,
            )])
            .await?;

        if !self.platform.privacy_api_available() {
            return Err(Error::feature_unavailable()
                .with_message("Privacy API still missing after loading its feature"));
        }

        Ok(())
    }
}

/// Keeps the consent queue in line with a storefront's visitor consent.
///
/// Clones share the same binding.
#[derive(Clone)]
pub struct ShopifyConsent {
    binding: Arc<Binding>,
    cancel: CancellationToken,
}

impl ShopifyConsent {
    /// Pushes the strict default and starts listening for consent events.
    ///
    /// Events carrying no detail are resolved by reading the privacy API.
    /// The listener runs until [`unbind`] is called. Call [`apply_initial`]
    /// afterwards to apply the current consent state.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    ///
    /// [`unbind`]: Self::unbind
    /// [`apply_initial`]: Self::apply_initial
    pub fn bind(
        platform: Arc<dyn PrivacyPlatform>,
        sink: Arc<dyn ConsentSink>,
        options: BindOptions,
    ) -> Self {
        let binding = Arc::new(Binding {
            platform,
            sink,
            options,
            last_detail: Mutex::new(None),
        });

        diagnostic!(options.debug, mode = %options.mode, "Binding storefront consent");
        binding.sink.push_consent(CookiesEnabled::denied());

        let cancel = CancellationToken::new();
        let mut events = binding.platform.consent_collected();
        tokio::spawn({
            let binding = Arc::clone(&binding);
            let cancel = cancel.clone();
            async move {
                loop {
                    tokio::select! {
                        biased;

                        () = cancel.cancelled() => break,

                        event = events.next() => {
                            let Some(detail) = event else {
                                break;
                            };
                            diagnostic!(
                                binding.options.debug,
                                has_detail = detail.is_some(),
                                "Visitor consent collected"
                            );
                            let detail = detail.or_else(|| binding.read_allowed());
                            binding.apply(detail);
                        }
                    }
                }
            }
        });

        Self { binding, cancel }
    }

    /// Ensures the privacy API is present, then applies its current state.
    ///
    /// # Errors
    ///
    /// Returns a recoverable [`FeatureUnavailable`] error when the API cannot
    /// be made available; the strict default then stays in force.
    ///
    /// [`FeatureUnavailable`]: pricetag_core::ErrorKind::FeatureUnavailable
    pub async fn apply_initial(&self) -> Result<()> {
        if let Err(error) = self.binding.ensure_api().await {
            tracing::warn!(
                target: TRACING_TARGET_SHOPIFY,
                error = %error,
                "Privacy API unavailable, keeping strict consent"
            );
            return Err(error);
        }

        let initial = self.binding.read_allowed();
        diagnostic!(self.binding.options.debug, "Applying initial consent state");
        self.binding.apply(initial);
        Ok(())
    }

    /// Returns the options the binding was created with.
    pub fn options(&self) -> BindOptions {
        self.binding.options
    }

    /// Returns the last consent detail applied, if any.
    pub fn last_detail(&self) -> Option<VisitorConsent> {
        *self
            .binding
            .last_detail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops listening for consent events.
    pub fn unbind(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pricetag_core::{ConsentCategory, ConsentQueue, ErrorKind};
    use pricetag_test::{FeatureLoader, MockPrivacyPlatform};

    use super::*;

    fn allowed(preferences: bool, analytics: bool, marketing: bool) -> VisitorConsent {
        VisitorConsent {
            preferences_allowed: preferences,
            analytics_allowed: analytics,
            marketing_allowed: marketing,
        }
    }

    fn bind(
        platform: &MockPrivacyPlatform,
        queue: &ConsentQueue,
        options: BindOptions,
    ) -> ShopifyConsent {
        ShopifyConsent::bind(Arc::new(platform.clone()), Arc::new(queue.clone()), options)
    }

    async fn settle_events() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_api_applies_categories() {
        let platform = MockPrivacyPlatform::new().with_api(allowed(true, false, true));
        let queue = ConsentQueue::new();

        let consent = bind(&platform, &queue, BindOptions::default());
        consent.apply_initial().await.unwrap();

        let values: Vec<_> = queue.entries().into_iter().map(|e| e.cookies_enabled).collect();
        assert_eq!(
            values,
            vec![
                CookiesEnabled::Flag(false),
                CookiesEnabled::Categories(vec![
                    ConsentCategory::Necessary,
                    ConsentCategory::Functional,
                    ConsentCategory::Marketing,
                ]),
            ]
        );
        assert_eq!(consent.last_detail(), Some(allowed(true, false, true)));
        assert!(platform.feature_loads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_loader_keeps_strict_default() {
        let platform = MockPrivacyPlatform::new();
        let queue = ConsentQueue::new();

        let error = bind(&platform, &queue, BindOptions::default())
            .apply_initial()
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::FeatureUnavailable);
        assert!(error.is_recoverable());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.effective(), Some(CookiesEnabled::Flag(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_installs_api() {
        let platform = MockPrivacyPlatform::new()
            .with_loader(FeatureLoader::Installs(allowed(false, true, false)));
        let queue = ConsentQueue::new();

        bind(&platform, &queue, BindOptions::default())
            .apply_initial()
            .await
            .unwrap();

        assert_eq!(
            platform.feature_loads(),
            vec![vec![FeatureRequest::new("consent-tracking-api", "0.1")]]
        );
        assert_eq!(
            queue.effective(),
            Some(CookiesEnabled::Categories(vec![
                ConsentCategory::Necessary,
                ConsentCategory::Statistical,
            ]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_without_api_is_unavailable() {
        let platform = MockPrivacyPlatform::new().with_loader(FeatureLoader::Empty);
        let queue = ConsentQueue::new();

        let error = bind(&platform, &queue, BindOptions::default())
            .apply_initial()
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::FeatureUnavailable);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_error_is_returned() {
        let platform =
            MockPrivacyPlatform::new().with_loader(FeatureLoader::Fails("blocked".into()));
        let queue = ConsentQueue::new();

        let error = bind(&platform, &queue, BindOptions::default())
            .apply_initial()
            .await
            .unwrap_err();

        assert!(error.is_recoverable());
        assert_eq!(queue.effective(), Some(CookiesEnabled::Flag(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boolean_mode() {
        let platform = MockPrivacyPlatform::new().with_api(allowed(false, false, true));
        let queue = ConsentQueue::new();
        let options = BindOptions::default().with_mode(ConsentMode::Boolean);

        bind(&platform, &queue, options).apply_initial().await.unwrap();

        assert_eq!(queue.effective(), Some(CookiesEnabled::Flag(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_update_consent() {
        let platform = MockPrivacyPlatform::new().with_api(allowed(false, false, false));
        let queue = ConsentQueue::new();
        let consent = bind(&platform, &queue, BindOptions::default().with_debug(true));
        consent.apply_initial().await.unwrap();

        platform.emit(Some(allowed(false, false, true)));
        settle_events().await;
        assert_eq!(
            queue.effective(),
            Some(CookiesEnabled::Categories(vec![
                ConsentCategory::Necessary,
                ConsentCategory::Marketing,
            ]))
        );

        // Without a detail the current API state is read.
        platform.set_consent(allowed(true, true, true));
        platform.emit(None);
        settle_events().await;
        assert_eq!(consent.last_detail(), Some(allowed(true, true, true)));
        assert_eq!(queue.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_without_detail_or_api_is_ignored() {
        let platform = MockPrivacyPlatform::new();
        let queue = ConsentQueue::new();
        let consent = bind(&platform, &queue, BindOptions::default());

        platform.emit(None);
        settle_events().await;

        assert_eq!(queue.len(), 1);
        assert_eq!(consent.last_detail(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbind_stops_listening() {
        let platform = MockPrivacyPlatform::new();
        let queue = ConsentQueue::new();
        let consent = bind(&platform, &queue, BindOptions::default());

        consent.unbind();
        settle_events().await;
        platform.emit(Some(allowed(true, true, true)));
        settle_events().await;

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_options_deserialize() {
        let options: BindOptions =
            serde_json::from_str(r#"{"mode":"boolean","debug":true}"#).unwrap();

        assert_eq!(options.mode, ConsentMode::Boolean);
        assert!(options.debug);
        assert_eq!(
            serde_json::from_str::<BindOptions>("{}").unwrap(),
            BindOptions::default()
        );
    }
}

//! Mock storefront customer-privacy platform.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use pricetag_core::{
    ConsentEventStream, Error, FeatureRequest, PrivacyPlatform, Result, VisitorConsent,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const EVENT_CAPACITY: usize = 64;

/// What the platform's feature loader does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureLoader {
    /// The platform has no feature loader.
    Missing,
    /// Loading installs the privacy API with this consent state.
    Installs(VisitorConsent),
    /// Loading reports success but the API never appears.
    Empty,
    /// Loading reports an error.
    Fails(String),
}

struct PrivacyState {
    api: Option<VisitorConsent>,
    loader: FeatureLoader,
    loads: Vec<Vec<FeatureRequest>>,
}

/// In-memory [`PrivacyPlatform`].
#[derive(Clone)]
pub struct MockPrivacyPlatform {
    state: Arc<Mutex<PrivacyState>>,
    events: broadcast::Sender<Option<VisitorConsent>>,
}

impl MockPrivacyPlatform {
    /// A platform without the privacy API and without a feature loader.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(PrivacyState {
                api: None,
                loader: FeatureLoader::Missing,
                loads: Vec::new(),
            })),
            events,
        }
    }

    /// Makes the privacy API present with the given state.
    pub fn with_api(self, consent: VisitorConsent) -> Self {
        self.state().api = Some(consent);
        self
    }

    /// Sets the feature loader's behavior.
    pub fn with_loader(self, loader: FeatureLoader) -> Self {
        self.state().loader = loader;
        self
    }

    fn state(&self) -> MutexGuard<'_, PrivacyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Updates the consent state read through the privacy API.
    pub fn set_consent(&self, consent: VisitorConsent) {
        self.state().api = Some(consent);
    }

    /// Fires a consent-collected event.
    pub fn emit(&self, detail: Option<VisitorConsent>) {
        let _ = self.events.send(detail);
    }

    /// Returns every feature load request received.
    pub fn feature_loads(&self) -> Vec<Vec<FeatureRequest>> {
        self.state().loads.clone()
    }
}

impl Default for MockPrivacyPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PrivacyPlatform for MockPrivacyPlatform {
    fn privacy_api_available(&self) -> bool {
        self.state().api.is_some()
    }

    fn read_consent(&self) -> Option<VisitorConsent> {
        self.state().api
    }

    fn has_feature_loader(&self) -> bool {
        self.state().loader != FeatureLoader::Missing
    }

    async fn load_features(&self, features: &[FeatureRequest]) -> Result<()> {
        let mut state = self.state();
        state.loads.push(features.to_vec());

        match state.loader.clone() {
            FeatureLoader::Missing => {
                Err(Error::feature_unavailable().with_message("feature loader missing"))
            }
            FeatureLoader::Installs(consent) => {
                state.api = Some(consent);
                Ok(())
            }
            FeatureLoader::Empty => Ok(()),
            FeatureLoader::Fails(reason) => Err(Error::feature_unavailable().with_message(reason)),
        }
    }

    fn consent_collected(&self) -> ConsentEventStream {
        Box::pin(
            BroadcastStream::new(self.events.subscribe())
                .filter_map(|event| futures::future::ready(event.ok())),
        )
    }
}

//! Structured error handling for pricetag operations.

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while orchestrating pricetags.
///
/// Conditions the helper tolerates by design (an anchor that has not
/// rendered yet, a frame that never reaches a usable width, a cross-origin
/// frame) are not errors and have no kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Configuration is missing or malformed.
    Configuration,
    /// The vendor script failed to load.
    ScriptLoad,
    /// A page node was removed before it could be used.
    NodeDetached,
    /// A host platform feature the caller relies on is unavailable.
    FeatureUnavailable,
    /// Serialization/deserialization error.
    Serialization,
    /// Internal error.
    #[default]
    Internal,
}

impl ErrorKind {
    /// Check if the helper stays usable after this kind of failure.
    ///
    /// Recoverable failures leave the page in its strict default state and
    /// may succeed on a later attempt.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FeatureUnavailable | Self::ScriptLoad | Self::NodeDetached
        )
    }
}

/// Structured error type with classification and an optional source.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<String>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new script load error.
    pub fn script_load() -> Self {
        Self::new(ErrorKind::ScriptLoad)
    }

    /// Creates a new detached node error.
    pub fn node_detached() -> Self {
        Self::new(ErrorKind::NodeDetached)
    }

    /// Creates a new feature unavailable error.
    pub fn feature_unavailable() -> Self {
        Self::new(ErrorKind::FeatureUnavailable)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Check if this error is recoverable based on its kind.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(ErrorKind::Serialization, error).with_message("Invalid JSON document")
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(error: validator::ValidationErrors) -> Self {
        Self::from_source(ErrorKind::Configuration, error)
            .with_message("Configuration failed validation")
    }
}

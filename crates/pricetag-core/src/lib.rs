#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for consent queue operations.
pub const TRACING_TARGET_CONSENT: &str = "pricetag_core::consent";

/// Tracing target for polling and debouncing combinators.
pub const TRACING_TARGET_POLL: &str = "pricetag_core::poll";

mod consent;
mod error;
mod poll;
mod privacy;
mod vendor;

pub mod config;
pub mod page;

pub use config::{GlobalConfig, Locale, RuntimeConfig, SlotConfig};
pub use consent::{ConsentCategory, ConsentEntry, ConsentQueue, ConsentSink, CookiesEnabled};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use page::{
    ElementSpec, FrameAccessError, FrameProbe, MutationBatch, MutationStream, NodeId, PageDocument,
    debounce,
};
pub use poll::{Attempt, PollError, PollPolicy};
pub use privacy::{ConsentEventStream, FeatureRequest, PrivacyPlatform, VisitorConsent};
pub use vendor::{VendorRuntime, VendorRuntimeHandle};

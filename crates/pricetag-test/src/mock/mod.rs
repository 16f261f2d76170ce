//! Test doubles for the page, the vendor runtime and the privacy platform.
//!
//! These implement the capability traits defined in pricetag-core entirely
//! in memory, so runtime and adapter tests run without a browser.

mod document;
mod privacy;
mod selector;
mod vendor;

pub use document::{FrameBehavior, MemoryDocument, ScriptBehavior};
pub use privacy::{FeatureLoader, MockPrivacyPlatform};
pub use vendor::MockVendor;

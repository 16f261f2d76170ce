//! Configuration model.
//!
//! ```text
//! GlobalConfig
//! ├── code, extraWidth, cookiesEnabled
//! ├── currency, countryCode, language   # page-wide locale
//! └── pricetagConfigs: [SlotConfig]      # one per widget placement
//! RuntimeConfig                          # timing and vendor host tunables
//! ```
//!
//! [`GlobalConfig`] and [`SlotConfig`] arrive as the camelCase JSON object a
//! merchant page hands to the helper. [`RuntimeConfig`] holds the timings the
//! runtime components use; its defaults match the production values.

mod global;
mod runtime;
mod slot;

pub use global::{GlobalConfig, Locale};
pub use runtime::RuntimeConfig;
pub use slot::{DEFAULT_WRAPPER_STYLE, SlotConfig};

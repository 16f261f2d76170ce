//! Runtime timing and vendor endpoint configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Default host serving the vendor script.
pub const DEFAULT_VENDOR_HOST: &str = "https://pricetag.viabill.com";

/// Default wait before taking ownership of the vendor script load.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 200;

/// Default readiness poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default price mirror poll period.
pub const DEFAULT_PRICE_POLL_MS: u64 = 1000;

/// Default number of width measurement retries.
pub const DEFAULT_WIDTH_RETRIES: u32 = 20;

/// Default delay between width measurement attempts.
pub const DEFAULT_WIDTH_BACKOFF_MS: u64 = 300;

/// Default settle delay before the final width measurement.
pub const DEFAULT_WIDTH_SETTLE_MS: u64 = 200;

/// Default fixed margin added to measured widths.
pub const DEFAULT_WIDTH_MARGIN_PX: f64 = 5.0;

/// Default minimum width treated as rendered.
pub const DEFAULT_MIN_WIDTH_PX: f64 = 20.0;

/// Default debounce window of the self-healing watcher.
pub const DEFAULT_HEAL_DEBOUNCE_MS: u64 = 150;

/// Timings and endpoints used by the runtime components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Host serving the vendor script
    #[cfg_attr(
        feature = "config",
        arg(long = "vendor-host", env = "PRICETAG_VENDOR_HOST", default_value = DEFAULT_VENDOR_HOST)
    )]
    #[serde(default = "default_vendor_host")]
    pub vendor_host: String,

    /// Grace period before injecting the vendor script, in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "grace-period-ms",
            env = "PRICETAG_GRACE_PERIOD_MS",
            default_value_t = DEFAULT_GRACE_PERIOD_MS
        )
    )]
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Readiness poll interval, in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "poll-interval-ms",
            env = "PRICETAG_POLL_INTERVAL_MS",
            default_value_t = DEFAULT_POLL_INTERVAL_MS
        )
    )]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Price mirror poll period, in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "price-poll-ms",
            env = "PRICETAG_PRICE_POLL_MS",
            default_value_t = DEFAULT_PRICE_POLL_MS
        )
    )]
    #[serde(default = "default_price_poll_ms")]
    pub price_poll_ms: u64,

    /// Width measurement retries after the first attempt
    #[cfg_attr(
        feature = "config",
        arg(
            long = "width-retries",
            env = "PRICETAG_WIDTH_RETRIES",
            default_value_t = DEFAULT_WIDTH_RETRIES
        )
    )]
    #[serde(default = "default_width_retries")]
    pub width_retries: u32,

    /// Delay between width measurement attempts, in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "width-backoff-ms",
            env = "PRICETAG_WIDTH_BACKOFF_MS",
            default_value_t = DEFAULT_WIDTH_BACKOFF_MS
        )
    )]
    #[serde(default = "default_width_backoff_ms")]
    pub width_backoff_ms: u64,

    /// Settle delay before the final width measurement, in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "width-settle-ms",
            env = "PRICETAG_WIDTH_SETTLE_MS",
            default_value_t = DEFAULT_WIDTH_SETTLE_MS
        )
    )]
    #[serde(default = "default_width_settle_ms")]
    pub width_settle_ms: u64,

    /// Fixed margin added to measured widths, in pixels
    #[cfg_attr(
        feature = "config",
        arg(
            long = "width-margin-px",
            env = "PRICETAG_WIDTH_MARGIN_PX",
            default_value_t = DEFAULT_WIDTH_MARGIN_PX
        )
    )]
    #[serde(default = "default_width_margin_px")]
    pub width_margin_px: f64,

    /// Minimum measured width treated as rendered, in pixels
    #[cfg_attr(
        feature = "config",
        arg(
            long = "min-width-px",
            env = "PRICETAG_MIN_WIDTH_PX",
            default_value_t = DEFAULT_MIN_WIDTH_PX
        )
    )]
    #[serde(default = "default_min_width_px")]
    pub min_width_px: f64,

    /// Debounce window of the self-healing watcher, in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "heal-debounce-ms",
            env = "PRICETAG_HEAL_DEBOUNCE_MS",
            default_value_t = DEFAULT_HEAL_DEBOUNCE_MS
        )
    )]
    #[serde(default = "default_heal_debounce_ms")]
    pub heal_debounce_ms: u64,
}

fn default_vendor_host() -> String {
    DEFAULT_VENDOR_HOST.to_owned()
}

fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_price_poll_ms() -> u64 {
    DEFAULT_PRICE_POLL_MS
}

fn default_width_retries() -> u32 {
    DEFAULT_WIDTH_RETRIES
}

fn default_width_backoff_ms() -> u64 {
    DEFAULT_WIDTH_BACKOFF_MS
}

fn default_width_settle_ms() -> u64 {
    DEFAULT_WIDTH_SETTLE_MS
}

fn default_width_margin_px() -> f64 {
    DEFAULT_WIDTH_MARGIN_PX
}

fn default_min_width_px() -> f64 {
    DEFAULT_MIN_WIDTH_PX
}

fn default_heal_debounce_ms() -> u64 {
    DEFAULT_HEAL_DEBOUNCE_MS
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            vendor_host: default_vendor_host(),
            grace_period_ms: default_grace_period_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            price_poll_ms: default_price_poll_ms(),
            width_retries: default_width_retries(),
            width_backoff_ms: default_width_backoff_ms(),
            width_settle_ms: default_width_settle_ms(),
            width_margin_px: default_width_margin_px(),
            min_width_px: default_min_width_px(),
            heal_debounce_ms: default_heal_debounce_ms(),
        }
    }
}

impl RuntimeConfig {
    /// Builds the vendor script URL, `<vendor-host>/script/<merchant-code>`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the code is empty or the host is not
    /// a base URL.
    pub fn script_url(&self, code: &str) -> Result<Url> {
        if code.trim().is_empty() {
            return Err(Error::configuration().with_message("merchant code is required"));
        }

        let mut url = Url::parse(&self.vendor_host).map_err(|e| {
            Error::configuration()
                .with_message(format!("invalid vendor host '{}'", self.vendor_host))
                .with_source(e)
        })?;

        url.path_segments_mut()
            .map_err(|()| {
                Error::configuration()
                    .with_message(format!("vendor host '{}' cannot be a base", self.vendor_host))
            })?
            .pop_if_empty()
            .push("script")
            .push(code);

        Ok(url)
    }

    /// Sets the grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period_ms = grace_period.as_millis() as u64;
        self
    }

    /// Sets the vendor host.
    #[must_use]
    pub fn with_vendor_host(mut self, vendor_host: impl Into<String>) -> Self {
        self.vendor_host = vendor_host.into();
        self
    }

    /// Returns the grace period as a Duration.
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Returns the readiness poll interval, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Returns the price poll period, never zero.
    pub fn price_poll(&self) -> Duration {
        Duration::from_millis(self.price_poll_ms.max(1))
    }

    /// Returns the width measurement backoff.
    pub fn width_backoff(&self) -> Duration {
        Duration::from_millis(self.width_backoff_ms)
    }

    /// Returns the width settle delay.
    pub fn width_settle(&self) -> Duration {
        Duration::from_millis(self.width_settle_ms)
    }

    /// Returns the heal debounce window.
    pub fn heal_debounce(&self) -> Duration {
        Duration::from_millis(self.heal_debounce_ms)
    }

    /// Number of readiness polls that fit in the grace period.
    pub fn grace_polls(&self) -> u32 {
        let polls = self.grace_period_ms / self.poll_interval_ms.max(1);
        u32::try_from(polls).unwrap_or(u32::MAX)
    }
}

//! Translation of visitor consent into cookie consent values.

use pricetag_core::{ConsentCategory, CookiesEnabled, VisitorConsent};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Shape of the value pushed to the consent queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConsentMode {
    /// Ordered category list starting with `necessary`.
    #[default]
    Categories,
    /// `true` when any purpose is allowed, else `false`.
    Boolean,
}

/// Maps a visitor's allowed purposes to a cookie consent value.
///
/// Preferences map to `functional`, analytics to `statistical` and marketing
/// to `marketing`, after `necessary`.
pub fn cookies_enabled_for(consent: &VisitorConsent, mode: ConsentMode) -> CookiesEnabled {
    match mode {
        ConsentMode::Boolean => CookiesEnabled::Flag(consent.any_allowed()),
        ConsentMode::Categories => {
            let allowed = [
                (consent.preferences_allowed, ConsentCategory::Functional),
                (consent.analytics_allowed, ConsentCategory::Statistical),
                (consent.marketing_allowed, ConsentCategory::Marketing),
            ];

            CookiesEnabled::categories(
                allowed
                    .into_iter()
                    .filter_map(|(allowed, category)| allowed.then_some(category)),
            )
        }
    }
}

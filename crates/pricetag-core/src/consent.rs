//! Consent values and the append-only queue read by the vendor script.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::TRACING_TARGET_CONSENT;

/// Cookie categories understood by the vendor script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConsentCategory {
    Necessary,
    Functional,
    Statistical,
    Marketing,
}

/// Tri-state cookie consent: denied, granted, or granted per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CookiesEnabled {
    /// All cookies denied (`false`) or granted (`true`).
    Flag(bool),
    /// Only the listed categories are granted, in order.
    Categories(Vec<ConsentCategory>),
}

impl CookiesEnabled {
    /// Strictest value, used until real consent is observed.
    pub const fn denied() -> Self {
        Self::Flag(false)
    }

    /// Builds a category list that always starts with `necessary`.
    ///
    /// Duplicates are dropped while keeping first-seen order.
    pub fn categories(categories: impl IntoIterator<Item = ConsentCategory>) -> Self {
        let mut ordered = vec![ConsentCategory::Necessary];
        for category in categories {
            if !ordered.contains(&category) {
                ordered.push(category);
            }
        }
        Self::Categories(ordered)
    }

    /// Returns whether the given category is granted by this value.
    pub fn allows(&self, category: ConsentCategory) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Categories(categories) => categories.contains(&category),
        }
    }
}

impl Default for CookiesEnabled {
    fn default() -> Self {
        Self::denied()
    }
}

impl From<bool> for CookiesEnabled {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<Vec<ConsentCategory>> for CookiesEnabled {
    fn from(categories: Vec<ConsentCategory>) -> Self {
        Self::Categories(categories)
    }
}

/// One entry of the consent queue, shaped as the vendor script expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentEntry {
    #[serde(rename = "pricetag.cookiesEnabled")]
    pub cookies_enabled: CookiesEnabled,
}

impl ConsentEntry {
    /// Creates a new queue entry.
    pub fn new(cookies_enabled: CookiesEnabled) -> Self {
        Self { cookies_enabled }
    }
}

/// Destination for consent updates.
///
/// Implementations must append: entries are never mutated or removed, and
/// the vendor script applies them in order.
pub trait ConsentSink: Send + Sync {
    /// Appends a consent value.
    fn push_consent(&self, value: CookiesEnabled);
}

/// Process-wide append-only consent queue.
///
/// Entries pushed before the vendor script loads are honored once it loads;
/// later entries override the effective consent in push order.
#[derive(Clone, Default)]
pub struct ConsentQueue {
    entries: Arc<Mutex<Vec<ConsentEntry>>>,
}

impl fmt::Debug for ConsentQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConsentQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all entries in push order.
    pub fn entries(&self) -> Vec<ConsentEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of entries pushed so far.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the consent currently in effect (the last entry).
    pub fn effective(&self) -> Option<CookiesEnabled> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|entry| entry.cookies_enabled.clone())
    }
}

impl ConsentSink for ConsentQueue {
    fn push_consent(&self, value: CookiesEnabled) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            target: TRACING_TARGET_CONSENT,
            position = entries.len(),
            value = ?value,
            "Queued consent entry"
        );
        entries.push(ConsentEntry::new(value));
    }
}

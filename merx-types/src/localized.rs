//! Localized string values.
//!
//! A `LocalizedString` maps locale tags ("en", "de-DE", …) to text. It
//! serializes as a plain JSON object, matching the platform wire format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A locale-keyed text value.
///
/// Uses a `BTreeMap` so serialization order is stable, which keeps
/// value-equality and JSON-equality aligned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedString(BTreeMap<String, String>);

impl LocalizedString {
    /// Creates an empty localized string.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Creates a localized string with a single locale entry.
    #[must_use]
    pub fn of(locale: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(locale.into(), value.into());
        Self(map)
    }

    /// Adds or replaces the value for a locale, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, locale: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(locale.into(), value.into());
        self
    }

    /// Returns the value for a locale, if present.
    #[must_use]
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// Returns true if no locale has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Any value, preferring "en"; used when an error message needs to
    /// name a resource that has no key yet.
    #[must_use]
    pub fn any_value(&self) -> Option<&str> {
        self.get("en")
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    /// Iterates over `(locale, value)` pairs in locale order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedString {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl std::fmt::Display for LocalizedString {
    /// Renders as `LocalizedString(en -> "Shoes", de -> "Schuhe")`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalizedString(")?;
        for (i, (locale, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{locale} -> \"{value}\"")?;
        }
        write!(f, ")")
    }
}

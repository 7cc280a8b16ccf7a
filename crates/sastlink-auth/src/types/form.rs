//! Form-encoded request parameters.
//!
//! `FormValues` is the snapshot that travels through the session while the
//! user is away at the login page. It keeps every value of a repeated key
//! and preserves insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Multi-valued, ordered form parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(IndexMap<String, Vec<String>>);

impl FormValues {
    /// Creates an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string (a query string
    /// or a request body).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut values = Self::new();
        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            values.append(key.into_owned(), value.into_owned());
        }
        values
    }

    /// Returns the first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the first non-blank value for `key`.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Adds a value to `key`, keeping existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Returns `true` if no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merges `restored` on top of `self`.
    ///
    /// Keys present in `restored` replace the current values entirely; keys
    /// only present in `self` are kept.
    pub fn merge_from(&mut self, restored: FormValues) {
        for (key, values) in restored.0 {
            self.0.insert(key, values);
        }
    }

    /// Iterates over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.append(key, value);
        }
        values
    }
}

//! Shared types used across the Scribe application.
//!
//! This module defines the item identity newtype and the normalized item
//! record produced by discovery.

use crate::error::ScribeError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Stable item identifier, taken from a path segment of the item URL.
///
/// Ids are non-empty and limited to ASCII alphanumerics, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Create a new `ItemId` from a string.
    ///
    /// # Errors
    /// Returns error if the id is empty or contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, ScribeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Parse the id that follows `prefix` in an item link.
    ///
    /// Accepts relative (`/u/abc`) and absolute (`https://host/u/abc?x=1`) hrefs.
    #[must_use]
    pub fn from_href(href: &str, prefix: &str) -> Option<Self> {
        let start = href.find(prefix)? + prefix.len();
        let id: String = href[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();

        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated id; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `n` characters, used in file names and synthetic titles.
    #[must_use]
    pub fn prefix(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    fn validate(id: &str) -> Result<(), ScribeError> {
        static ID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(ScribeError::Validation(format!(
                "invalid item ID: must be non-empty [A-Za-z0-9_-], got '{id}'"
            )))
        }
    }
}

impl TryFrom<String> for ItemId {
    type Error = ScribeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One discoverable transcript.
///
/// Identity is the `id`; titles may drift between listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier
    pub id: ItemId,
    /// Human-readable title from the listing
    pub title: String,
    /// Canonical item page URL
    pub url: String,
}

impl Item {
    /// Create an item record.
    #[must_use]
    pub fn new(id: ItemId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
        }
    }

    /// Title shortened for log lines.
    #[must_use]
    pub fn short_title(&self) -> String {
        self.title.chars().take(40).collect()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_validation() {
        assert!(ItemId::new("AbC123_-xyz").is_ok());
        assert!(ItemId::new("").is_err());
        assert!(ItemId::new("has space").is_err());
        assert!(ItemId::new("slash/inside").is_err());
    }

    #[test]
    fn test_from_href_relative_and_absolute() {
        let id = ItemId::from_href("/u/Xk3jdP9qLm2?view=summary", "/u/").expect("parse id");
        assert_eq!(id.as_str(), "Xk3jdP9qLm2");

        let id = ItemId::from_href("https://otter.ai/u/abcDEF-123_x/", "/u/").expect("parse id");
        assert_eq!(id.as_str(), "abcDEF-123_x");

        assert!(ItemId::from_href("/settings", "/u/").is_none());
        assert!(ItemId::from_href("/u/?x=1", "/u/").is_none());
    }

    #[test]
    fn test_prefix_is_bounded() {
        let id = ItemId::new("short").expect("valid id");
        assert_eq!(id.prefix(15), "short");
        assert_eq!(id.prefix(3), "sho");
    }

    #[test]
    fn test_item_identity_ignores_title() {
        let id = ItemId::new("abcdefghijk").expect("valid id");
        let a = Item::new(id.clone(), "Standup", "https://otter.ai/u/abcdefghijk");
        let b = Item::new(id, "Standup (renamed)", "https://otter.ai/u/abcdefghijk");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        let id = ItemId("abcdefghijklmn\u{e9}op".to_string());
        assert_eq!(id.prefix(15), "abcdefghijklmn\u{e9}");
        assert_eq!(id.prefix(14), "abcdefghijklmn");
    }

    #[test]
    fn test_deserialize_validates() {
        let id: ItemId = serde_json::from_str("\"abcDEF-123_x\"").expect("valid id");
        assert_eq!(id.as_str(), "abcDEF-123_x");

        assert!(serde_json::from_str::<ItemId>("\"abcdefghijklmn\u{e9}op\"").is_err());
        assert!(serde_json::from_str::<ItemId>("\"\"").is_err());
    }

    #[test]
    fn test_item_id_serializes_as_string() {
        let id = ItemId::new("abcdefghijk").expect("valid id");
        let json = serde_json::to_string(&id).expect("serialize id");
        assert_eq!(json, "\"abcdefghijk\"");
    }
}

//! Catalog listing format.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::error::CatalogError;

/// Visibility of an item in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Live and open to everyone. The only status that is captured.
    #[default]
    Public,
    Offline,
    Private,
    /// Live but restricted to a paying group.
    Group,
    /// Any status this client does not know. Never captured.
    #[serde(other)]
    Unknown,
}

/// One entry of the catalog listing.
///
/// The listing is a JSON array mixing plain identifiers and objects:
///
/// ```json
/// ["alice", {"id": "bob", "status": "private"}, {"id": "carol"}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Id(String),
    Detailed {
        id: String,
        #[serde(default)]
        status: ItemStatus,
    },
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        match self {
            CatalogEntry::Id(id) => id,
            CatalogEntry::Detailed { id, .. } => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            CatalogEntry::Id(id) => id,
            CatalogEntry::Detailed { id, .. } => id,
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            CatalogEntry::Id(_) => ItemStatus::Public,
            CatalogEntry::Detailed { status, .. } => *status,
        }
    }
}

fn item_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+$").expect("item id pattern is valid")
    })
}

/// Whether `id` can be used as a single path component.
pub fn is_valid_item_id(id: &str) -> bool {
    id != "." && id != ".." && item_id_pattern().is_match(id)
}

/// Parses a catalog listing into the identifiers of public items.
///
/// Non-public entries are dropped. Entries whose identifier is not a safe
/// directory name are skipped with a warning.
pub fn parse_catalog(body: &str) -> Result<Vec<String>, CatalogError> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(body)
        .map_err(|e| CatalogError::MalformedResponse(e.to_string()))?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.status() != ItemStatus::Public {
            debug!("Skipping {:?} item: {}", entry.status(), entry.id());
            continue;
        }
        if !is_valid_item_id(entry.id()) {
            warn!("Skipping catalog item with unusable id: {:?}", entry.id());
            continue;
        }
        items.push(entry.into_id());
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_identifiers() {
        let items = parse_catalog(r#"["alice", "bob"]"#).unwrap();
        assert_eq!(items, vec!["alice", "bob"]);
    }

    #[test]
    fn test_parse_filters_non_public() {
        let body = r#"[
            "alice",
            {"id": "bob", "status": "private"},
            {"id": "carol"},
            {"id": "dave", "status": "group"},
            {"id": "erin", "status": "offline"},
            {"id": "frank", "status": "public"}
        ]"#;
        let items = parse_catalog(body).unwrap();
        assert_eq!(items, vec!["alice", "carol", "frank"]);
    }

    #[test]
    fn test_parse_skips_unknown_status() {
        let body = r#"["alice", {"id": "bob", "status": "away"}, {"id": "carol", "status": "public"}]"#;
        let items = parse_catalog(body).unwrap();
        assert_eq!(items, vec!["alice", "carol"]);
    }

    #[test]
    fn test_parse_keeps_duplicates_in_order() {
        let items = parse_catalog(r#"["alice", "bob", "alice"]"#).unwrap();
        assert_eq!(items, vec!["alice", "bob", "alice"]);
    }

    #[test]
    fn test_parse_skips_unsafe_ids() {
        let items = parse_catalog(r#"["", ".", "..", "../etc", "a/b", "ok_name-1.x"]"#).unwrap();
        assert_eq!(items, vec!["ok_name-1.x"]);
    }

    #[test]
    fn test_parse_empty_listing() {
        assert!(parse_catalog("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_catalog("<html>login</html>").unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));

        let err = parse_catalog(r#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));

        let err = parse_catalog(r#"[{"status": "public"}]"#).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    #[test]
    fn test_is_valid_item_id() {
        assert!(is_valid_item_id("alice"));
        assert!(is_valid_item_id("Alice_99.v2-x"));
        assert!(!is_valid_item_id(""));
        assert!(!is_valid_item_id("."));
        assert!(!is_valid_item_id(".."));
        assert!(!is_valid_item_id("a b"));
        assert!(!is_valid_item_id("a/b"));
        assert!(!is_valid_item_id("a\\b"));
    }
}

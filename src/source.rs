//! Read-only source-string store.
//!
//! The source strings live in a single `values/strings.json` file mapping
//! string key to authoritative text. Metadata records are *about* entries in
//! this set but do not own them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// The source locale's key -> text mapping.
#[derive(Debug, Clone, Default)]
pub struct SourceStrings {
    strings: BTreeMap<String, String>,
}

impl SourceStrings {
    /// Load the source strings file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source strings from {}", path.display()))?;
        let strings: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse source strings in {}", path.display()))?;

        info!(count = strings.len(), "Loaded source strings");
        Ok(Self { strings })
    }

    /// Build from an in-memory map (tests, previews).
    pub fn from_map(strings: BTreeMap<String, String>) -> Self {
        Self { strings }
    }

    /// The text for one key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// The whole key -> text mapping.
    pub fn get_all(&self) -> &BTreeMap<String, String> {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_source_strings() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("strings.json");
        std::fs::write(
            &path,
            r#"{"app_name": "Dive SMS", "msg_sent": "Sent %1$d of %2$d"}"#,
        )
        .expect("write");

        let source = SourceStrings::load(&path).expect("load");
        assert_eq!(source.len(), 2);
        assert_eq!(source.get("app_name"), Some("Dive SMS"));
        assert_eq!(source.get("missing"), None);
    }

    #[test]
    fn test_load_missing_file_fails_with_context() {
        let dir = tempdir().expect("tempdir");
        let err = SourceStrings::load(&dir.path().join("nope.json")).expect_err("missing");
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("strings.json");
        std::fs::write(&path, "not json").expect("write");
        assert!(SourceStrings::load(&path).is_err());
    }

    #[test]
    fn test_from_map() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), "v".to_string());
        let source = SourceStrings::from_map(map);
        assert!(!source.is_empty());
        assert_eq!(source.get_all().len(), 1);
    }
}

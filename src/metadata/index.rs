//! The metadata index: routing table from category to key-set.
//!
//! The index is the single source of truth for which shard holds a key.
//! Lookup is a linear scan over the category key-sets, which is fine at this
//! cardinality.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The on-disk index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub project: String,
    #[serde(default = "default_locale")]
    pub default_locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// category -> sorted list of string keys
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// category -> shard file path, relative to the store's parent directory
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub total_strings: usize,
    #[serde(default)]
    pub documented_strings: usize,
    #[serde(default)]
    pub last_updated: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

impl Index {
    /// Create an empty index for a new store.
    pub fn new(project: &str) -> Self {
        Self {
            version: default_version(),
            project: project.to_string(),
            default_locale: default_locale(),
            description: None,
            categories: BTreeMap::new(),
            files: BTreeMap::new(),
            total_strings: 0,
            documented_strings: 0,
            last_updated: String::new(),
        }
    }

    /// Load the index from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the index to `path`, refreshing the `last_updated` stamp.
    ///
    /// Uses write-then-rename so a crash never leaves a truncated index.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now().format("%Y-%m-%d").to_string();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Find the category holding `key`, if any.
    pub fn category_of(&self, key: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, keys)| keys.iter().any(|k| k == key))
            .map(|(category, _)| category.as_str())
    }

    /// All keys listed in the index, across every category.
    pub fn all_keys(&self) -> BTreeSet<String> {
        self.categories.values().flatten().cloned().collect()
    }

    /// Category names in sorted order.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// Replace the key-sets and file table from a regrouped working set.
    ///
    /// Categories with no keys are dropped entirely; key lists are sorted for
    /// deterministic output.
    pub fn set_categories(&mut self, grouped: BTreeMap<String, Vec<String>>, subdir: &str) {
        self.categories.clear();
        self.files.clear();

        for (category, mut keys) in grouped {
            if keys.is_empty() {
                continue;
            }
            keys.sort();
            self.files
                .insert(category.clone(), format!("{}/{}.json", subdir, category));
            self.categories.insert(category, keys);
        }

        self.documented_strings = self.categories.values().map(Vec::len).sum();
    }
}

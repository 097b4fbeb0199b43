//! Category shard storage.
//!
//! One shard file per category, holding that category's partial records
//! keyed by string key. Loads go through a per-instance cache that is
//! invalidated on every save to the same shard.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{MetadataError, Result};
use crate::metadata::record::MetadataRecord;

/// A shard's contents: string key -> partial record.
pub type ShardContents = BTreeMap<String, MetadataRecord>;

/// Loads and saves category shard files under a metadata directory.
pub struct ShardStore {
    dir: PathBuf,
    cache: HashMap<String, ShardContents>,
}

impl ShardStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            cache: HashMap::new(),
        }
    }

    /// Path of a category's shard file.
    pub fn shard_path(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{}.json", category))
    }

    /// Load one category's shard.
    ///
    /// Returns `ShardMissing` when the file does not exist; the caller
    /// decides whether that is drift (the index referenced it) or simply an
    /// empty store.
    pub fn load(&mut self, category: &str) -> Result<ShardContents> {
        if let Some(contents) = self.cache.get(category) {
            return Ok(contents.clone());
        }

        let path = self.shard_path(category);
        if !path.exists() {
            return Err(MetadataError::ShardMissing {
                category: category.to_string(),
                path,
            });
        }

        let content = fs::read_to_string(&path)?;
        let contents: ShardContents = serde_json::from_str(&content)?;
        self.cache.insert(category.to_string(), contents.clone());
        Ok(contents)
    }

    /// Save one category's shard in full, sorted by key.
    ///
    /// Atomic write-then-rename: a crash mid-save leaves the prior shard
    /// content intact.
    pub fn save(&mut self, category: &str, contents: &ShardContents) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.shard_path(category);
        let temp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(contents)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        self.cache.insert(category.to_string(), contents.clone());
        Ok(())
    }

    /// Delete a category's shard file (the category has no keys left).
    pub fn remove(&mut self, category: &str) -> Result<()> {
        let path = self.shard_path(category);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.cache.remove(category);
        Ok(())
    }

    /// Drop the cached contents of one category.
    pub fn invalidate(&mut self, category: &str) {
        self.cache.remove(category);
    }

    /// Drop every cached shard.
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Scan the directory for shard files and return the category names.
    ///
    /// `index.json` and `defaults.json` live alongside the shards and are
    /// skipped; unreadable entries are skipped with a warning.
    pub fn scan_categories(&self) -> Result<Vec<String>> {
        let mut categories = Vec::new();

        if !self.dir.exists() {
            return Ok(categories);
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };
            if stem == "index" || stem == "defaults" {
                continue;
            }

            categories.push(stem.to_string());
        }

        categories.sort();
        Ok(categories)
    }
}

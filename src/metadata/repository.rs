//! The metadata repository: a flat, merged, key-addressable view over
//! sharded storage.
//!
//! Two storage formats exist. The split format (index + per-category shards
//! + defaults) is the current one; the legacy format is a single JSON file
//! holding every record. The format is probed once at construction, never
//! per call.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MetadataError, Result};
use crate::metadata::defaults::DefaultsStore;
use crate::metadata::index::Index;
use crate::metadata::record::{DefaultsRecord, MetadataRecord};
use crate::metadata::shards::{ShardContents, ShardStore};

/// Default name of the split-format subdirectory.
pub const DEFAULT_METADATA_SUBDIR: &str = "metadata";

/// Name of the legacy single-file store.
pub const LEGACY_FILE: &str = "strings_metadata.json";

/// Which on-disk layout the repository is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    /// index.json + one shard per category + defaults.json
    Split,
    /// single strings_metadata.json
    Legacy,
}

/// The legacy single-file document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LegacyFile {
    #[serde(default)]
    metadata_version: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    default_locale: String,
    #[serde(default)]
    last_updated: String,
    #[serde(default)]
    total_strings: usize,
    #[serde(default)]
    documented_strings: usize,
    #[serde(default)]
    strings: BTreeMap<String, MetadataRecord>,
}

/// Key-indexed read/write facade over the metadata store.
pub struct MetadataRepository {
    base_dir: PathBuf,
    subdir: String,
    format: StorageFormat,
    index: Index,
    shards: ShardStore,
    defaults: DefaultsStore,
    /// Partial records staged for the next `save`; hydrated lazily.
    working: Option<BTreeMap<String, MetadataRecord>>,
}

impl MetadataRepository {
    /// Probe: does a split-format store exist under `base_dir/subdir`?
    pub fn is_split_format(base_dir: &Path, subdir: &str) -> bool {
        let metadata_dir = base_dir.join(subdir);
        metadata_dir.exists() && metadata_dir.join("index.json").exists()
    }

    /// Probe: does a legacy single-file store exist under `base_dir`?
    pub fn is_legacy_format(base_dir: &Path) -> bool {
        base_dir.join(LEGACY_FILE).exists()
    }

    /// Open a repository rooted at `base_dir`, selecting the storage format
    /// once, by capability probe:
    ///
    /// 1. split index present -> split format
    /// 2. shards present without an index -> split format after a self-heal
    ///    pass that re-derives the index from shard contents
    /// 3. legacy file present -> legacy format
    /// 4. nothing present -> a fresh, empty split store
    pub fn open(base_dir: &Path, subdir: &str, project: &str) -> Result<Self> {
        let metadata_dir = base_dir.join(subdir);
        let shards = ShardStore::new(&metadata_dir);
        let defaults = DefaultsStore::new(metadata_dir.join("defaults.json"));

        let mut repo = Self {
            base_dir: base_dir.to_path_buf(),
            subdir: subdir.to_string(),
            format: StorageFormat::Split,
            index: Index::new(project),
            shards,
            defaults,
            working: None,
        };

        if Self::is_split_format(base_dir, subdir) {
            repo.index = Index::load(&repo.index_path())?;

            // The index is written after the shards; a crash in between
            // leaves them disagreeing at the category level. Shard contents
            // win: re-derive the index instead of trusting it.
            let on_disk = repo.shards.scan_categories()?;
            let indexed = repo.index.category_names();
            if on_disk != indexed {
                warn!(
                    "index and shard files disagree (indexed: {:?}, on disk: {:?}); \
                     rebuilding index from shard contents",
                    indexed, on_disk
                );
                repo.rebuild_index_from_shards()?;
            } else {
                debug!(
                    categories = repo.index.categories.len(),
                    keys = repo.index.documented_strings,
                    "Opened split-format metadata store"
                );
            }
        } else if !repo.shards.scan_categories()?.is_empty() {
            warn!("index.json missing but shards exist; rebuilding index from shard contents");
            repo.rebuild_index_from_shards()?;
        } else if Self::is_legacy_format(base_dir) {
            repo.format = StorageFormat::Legacy;
            info!("Split format not found; using legacy {}", LEGACY_FILE);
        } else {
            debug!("No metadata store found; starting an empty split store");
        }

        Ok(repo)
    }

    fn index_path(&self) -> PathBuf {
        self.base_dir.join(&self.subdir).join("index.json")
    }

    fn legacy_path(&self) -> PathBuf {
        self.base_dir.join(LEGACY_FILE)
    }

    /// The storage format selected at construction.
    pub fn format(&self) -> StorageFormat {
        self.format
    }

    pub fn project(&self) -> &str {
        &self.index.project
    }

    pub fn default_locale(&self) -> &str {
        &self.index.default_locale
    }

    pub fn last_updated(&self) -> &str {
        &self.index.last_updated
    }

    pub fn total_strings(&self) -> usize {
        self.index.total_strings
    }

    pub fn documented_count(&mut self) -> Result<usize> {
        Ok(self.working_set()?.len())
    }

    /// Record the live source-string count (persisted on the next `save`).
    pub fn set_total_strings(&mut self, total: usize) {
        self.index.total_strings = total;
    }

    /// Get the effective (defaults-merged) record for `key`.
    pub fn get(&mut self, key: &str) -> Result<MetadataRecord> {
        match self.format {
            StorageFormat::Split => {
                let category = self
                    .index
                    .category_of(key)
                    .ok_or_else(|| MetadataError::NotFound(key.to_string()))?
                    .to_string();

                let shard = self.shards.load(&category)?;
                let partial = match shard.get(key) {
                    Some(partial) => partial.clone(),
                    None => {
                        warn!(
                            "index drift: key '{}' listed under '{}' but absent from its shard",
                            key, category
                        );
                        return Err(MetadataError::NotFound(key.to_string()));
                    }
                };

                let defaults = self.defaults.load()?;
                Ok(partial.merged_with(defaults))
            }
            StorageFormat::Legacy => {
                let partial = self
                    .working_set()?
                    .get(key)
                    .cloned()
                    .ok_or_else(|| MetadataError::NotFound(key.to_string()))?;
                let defaults = self.defaults.load()?;
                Ok(partial.merged_with(defaults))
            }
        }
    }

    /// Get every effective record in one category.
    pub fn get_by_category(&mut self, category: &str) -> Result<BTreeMap<String, MetadataRecord>> {
        let partials: ShardContents = match self.format {
            StorageFormat::Split => self.shards.load(category)?,
            StorageFormat::Legacy => self
                .working_set()?
                .iter()
                .filter(|(_, record)| record.category_or_default() == category)
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
        };

        let defaults = self.defaults.load()?;
        Ok(partials
            .iter()
            .map(|(key, partial)| (key.clone(), partial.merged_with(defaults)))
            .collect())
    }

    /// Get every effective record across every category.
    ///
    /// A key listed under more than one category is an invariant violation;
    /// it is surfaced as a warning and the first occurrence wins.
    pub fn get_all(&mut self) -> Result<BTreeMap<String, MetadataRecord>> {
        let mut partials: BTreeMap<String, MetadataRecord> = BTreeMap::new();

        match self.format {
            StorageFormat::Split => {
                for category in self.index.category_names() {
                    let shard = self.shards.load(&category)?;
                    for (key, partial) in shard {
                        if partials.contains_key(&key) {
                            warn!(
                                "duplicate key '{}' found again in category '{}'; keeping the first occurrence",
                                key, category
                            );
                            continue;
                        }
                        partials.insert(key, partial);
                    }
                }
            }
            StorageFormat::Legacy => {
                partials = self.working_set()?.clone();
            }
        }

        let defaults = self.defaults.load()?;
        Ok(partials
            .iter()
            .map(|(key, partial)| (key.clone(), partial.merged_with(defaults)))
            .collect())
    }

    /// All documented keys, sorted.
    pub fn keys(&mut self) -> Result<Vec<String>> {
        Ok(self.working_set()?.keys().cloned().collect())
    }

    /// Category names present in the store.
    pub fn categories(&self) -> Vec<String> {
        self.index.category_names()
    }

    /// Whether `key` is documented.
    pub fn contains(&mut self, key: &str) -> Result<bool> {
        if let Some(working) = &self.working {
            return Ok(working.contains_key(key));
        }
        match self.format {
            StorageFormat::Split => Ok(self.index.category_of(key).is_some()),
            StorageFormat::Legacy => Ok(self.working_set()?.contains_key(key)),
        }
    }

    /// Upsert a partial record into the working set. Nothing is written
    /// until `save`.
    pub fn put(&mut self, key: &str, record: MetadataRecord) -> Result<()> {
        self.working_set_mut()?.insert(key.to_string(), record);
        Ok(())
    }

    /// Delete a key from the working set only. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.working_set_mut()?.remove(key).is_some())
    }

    /// Persist the working set.
    ///
    /// Split format: the working set is regrouped by each record's
    /// `category`, every affected shard is rewritten in full (atomically,
    /// keys sorted), shards for now-empty categories are deleted, and the
    /// index is rewritten last with fresh key-sets and timestamp.
    pub fn save(&mut self) -> Result<()> {
        self.hydrate_working()?;
        let working = self.working.clone().expect("working set was hydrated");

        match self.format {
            StorageFormat::Split => {
                let mut grouped: BTreeMap<String, ShardContents> = BTreeMap::new();
                for (key, record) in &working {
                    grouped
                        .entry(record.category_or_default().to_string())
                        .or_default()
                        .insert(key.clone(), record.clone());
                }

                for (category, contents) in &grouped {
                    self.shards.save(category, contents)?;
                }

                for stale in self.index.category_names() {
                    if !grouped.contains_key(&stale) {
                        self.shards.remove(&stale)?;
                    }
                }

                let key_sets = grouped
                    .into_iter()
                    .map(|(category, contents)| {
                        (category, contents.keys().cloned().collect::<Vec<_>>())
                    })
                    .collect();
                self.index.set_categories(key_sets, &self.subdir);
                let index_path = self.index_path();
                self.index.save(&index_path)?;

                info!(
                    keys = working.len(),
                    categories = self.index.categories.len(),
                    "Saved split-format metadata store"
                );
            }
            StorageFormat::Legacy => {
                let file = LegacyFile {
                    metadata_version: self.index.version.clone(),
                    project: self.index.project.clone(),
                    default_locale: self.index.default_locale.clone(),
                    last_updated: chrono::Utc::now().format("%Y-%m-%d").to_string(),
                    total_strings: self.index.total_strings,
                    documented_strings: working.len(),
                    strings: working.clone(),
                };

                let path = self.legacy_path();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let temp_path = path.with_extension("json.tmp");
                let bytes = serde_json::to_vec_pretty(&file)?;
                fs::write(&temp_path, bytes)?;
                fs::rename(&temp_path, &path)?;

                info!(keys = working.len(), "Saved legacy metadata store");
            }
        }

        Ok(())
    }

    /// Re-derive the index from the shard files on disk and persist it.
    ///
    /// This is the self-heal pass for a partially-updated or missing index:
    /// shard contents win, the index is rewritten to match.
    pub fn rebuild_index_from_shards(&mut self) -> Result<()> {
        if self.format != StorageFormat::Split {
            return Err(MetadataError::IndexDrift(
                "cannot rebuild an index for a legacy-format store".to_string(),
            ));
        }

        self.shards.invalidate_all();
        let mut key_sets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for category in self.shards.scan_categories()? {
            let shard = self.shards.load(&category)?;
            key_sets.insert(category, shard.keys().cloned().collect());
        }

        self.index.set_categories(key_sets, &self.subdir);
        let index_path = self.index_path();
        self.index.save(&index_path)?;
        self.working = None;

        info!(
            categories = self.index.categories.len(),
            keys = self.index.documented_strings,
            "Rebuilt index from shard contents"
        );
        Ok(())
    }

    /// Load the current defaults record (cached per instance).
    pub fn load_defaults(&mut self) -> Result<DefaultsRecord> {
        Ok(self.defaults.load()?.clone())
    }

    /// Persist a new defaults record; the cache is invalidated.
    pub fn save_defaults(&mut self, defaults: &DefaultsRecord) -> Result<()> {
        self.defaults.save(defaults)
    }

    fn hydrate_working(&mut self) -> Result<()> {
        if self.working.is_some() {
            return Ok(());
        }

        let mut working: BTreeMap<String, MetadataRecord> = BTreeMap::new();
        match self.format {
            StorageFormat::Split => {
                for category in self.index.category_names() {
                    let shard = self.shards.load(&category)?;
                    for (key, partial) in shard {
                        working.entry(key).or_insert(partial);
                    }
                }
            }
            StorageFormat::Legacy => {
                let content = fs::read_to_string(self.legacy_path())?;
                let file: LegacyFile = serde_json::from_str(&content)?;
                if !file.project.is_empty() {
                    self.index.project = file.project;
                }
                if !file.default_locale.is_empty() {
                    self.index.default_locale = file.default_locale;
                }
                self.index.total_strings = file.total_strings;
                self.index.last_updated = file.last_updated;
                working = file.strings;
            }
        }

        self.working = Some(working);
        Ok(())
    }

    fn working_set(&mut self) -> Result<&BTreeMap<String, MetadataRecord>> {
        self.hydrate_working()?;
        Ok(self.working.as_ref().expect("working set was hydrated"))
    }

    fn working_set_mut(&mut self) -> Result<&mut BTreeMap<String, MetadataRecord>> {
        self.hydrate_working()?;
        Ok(self.working.as_mut().expect("working set was hydrated"))
    }
}

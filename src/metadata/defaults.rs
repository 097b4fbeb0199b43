//! Defaults storage.
//!
//! A single record of default field values, loaded lazily once per store
//! instance and cached for its lifetime. Any write to defaults storage must
//! go through `save`, which invalidates the cache.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metadata::record::DefaultsRecord;

/// The on-disk wrapper: `{"defaults": {...}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DefaultsFile {
    #[serde(default)]
    defaults: DefaultsRecord,
}

/// Lazily-cached defaults for one repository instance.
pub struct DefaultsStore {
    path: PathBuf,
    cache: Option<DefaultsRecord>,
}

impl DefaultsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: None,
        }
    }

    /// Load the defaults record, caching it for subsequent calls.
    ///
    /// A missing file yields an empty record: merging against it is the
    /// identity.
    pub fn load(&mut self) -> Result<&DefaultsRecord> {
        if self.cache.is_none() {
            let record = if self.path.exists() {
                let content = fs::read_to_string(&self.path)?;
                let file: DefaultsFile = serde_json::from_str(&content)?;
                file.defaults
            } else {
                DefaultsRecord::default()
            };
            self.cache = Some(record);
        }

        Ok(self.cache.as_ref().expect("cache was just filled"))
    }

    /// Persist a new defaults record and invalidate the cache.
    pub fn save(&mut self, defaults: &DefaultsRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = DefaultsFile {
            defaults: defaults.clone(),
        };
        let temp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&file)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &self.path)?;

        self.invalidate();
        Ok(())
    }

    /// Drop the cached record; the next `load` re-reads storage.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::record::TranslationGuidance;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_empty_defaults() {
        let dir = tempdir().expect("tempdir");
        let mut store = DefaultsStore::new(dir.path().join("defaults.json"));

        let defaults = store.load().expect("load");
        assert_eq!(*defaults, DefaultsRecord::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("defaults.json");
        let mut store = DefaultsStore::new(&path);

        let defaults = DefaultsRecord {
            translation_guidance: Some(TranslationGuidance {
                tone: Some("neutral".to_string()),
                ..TranslationGuidance::default()
            }),
            ..DefaultsRecord::default()
        };
        store.save(&defaults).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(
            loaded
                .translation_guidance
                .as_ref()
                .and_then(|g| g.tone.as_deref()),
            Some("neutral")
        );

        // The wrapper object is what hits the disk.
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"defaults\""));
    }

    #[test]
    fn test_cache_until_invalidated() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("defaults.json");
        let mut store = DefaultsStore::new(&path);

        store.load().expect("prime the cache");

        // A write the store doesn't know about is invisible until invalidation.
        fs::write(
            &path,
            r#"{"defaults": {"purpose": "changed behind the cache"}}"#,
        )
        .expect("write");
        assert_eq!(store.load().expect("cached").purpose, None);

        store.invalidate();
        assert_eq!(
            store.load().expect("reloaded").purpose.as_deref(),
            Some("changed behind the cache")
        );
    }
}

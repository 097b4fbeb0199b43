//! Per-locale output stores.
//!
//! One `values-<suffix>/strings.json` file per locale. Saving is always a
//! merge: existing entries are loaded first and only overwritten key by key,
//! so entries untouched by the current session survive. Keys whose values
//! carry non-standard formatting are recorded in the file's `unformatted`
//! set to suppress downstream lint false positives.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::i18n::{Locale, TranslationValidator};

/// The on-disk document for one locale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocaleFile {
    #[serde(default)]
    pub strings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unformatted: BTreeSet<String>,
}

/// Loads and merge-saves locale output files under a resource directory.
#[derive(Debug, Clone)]
pub struct LocaleOutputs {
    res_dir: PathBuf,
}

impl LocaleOutputs {
    pub fn new<P: AsRef<Path>>(res_dir: P) -> Self {
        Self {
            res_dir: res_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of a locale's output file.
    pub fn file_path(&self, locale: Locale) -> PathBuf {
        self.res_dir
            .join(format!("values-{}", locale.resource_suffix()))
            .join("strings.json")
    }

    /// Load a locale's persisted key -> text entries.
    ///
    /// A missing file is an empty store; an unreadable one is treated the
    /// same, with a warning, so one corrupt locale never blocks a session.
    pub fn load(&self, locale: Locale) -> BTreeMap<String, String> {
        self.load_file(locale).strings
    }

    fn load_file(&self, locale: Locale) -> LocaleFile {
        let path = self.file_path(locale);
        if !path.exists() {
            return LocaleFile::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Could not parse {}: {}", path.display(), e);
                    LocaleFile::default()
                }
            },
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                LocaleFile::default()
            }
        }
    }

    /// Merge new entries into a locale's store and persist it.
    ///
    /// Existing entries for keys not in `new_entries` are preserved. Values
    /// in `new_entries` must already be escaped; this method never escapes
    /// (escaping is not idempotent, and persisted values went through it
    /// when they were first written).
    ///
    /// `declared_unformatted` carries keys whose metadata declares format
    /// specifiers; on top of that, every merged value is auto-checked for a
    /// custom `%name%` placeholder or two-plus standard specifiers.
    ///
    /// Returns the number of entries written from `new_entries`.
    pub fn merge_and_save(
        &self,
        locale: Locale,
        new_entries: &BTreeMap<String, String>,
        declared_unformatted: &BTreeSet<String>,
    ) -> Result<usize> {
        let mut file = self.load_file(locale);

        for (key, value) in new_entries {
            file.strings.insert(key.clone(), value.clone());
            if declared_unformatted.contains(key) {
                file.unformatted.insert(key.clone());
            }
        }

        // Auto-detect non-standard formatting on the merged values.
        let flagged: Vec<String> = file
            .strings
            .iter()
            .filter(|(_, value)| needs_unformatted_flag(value))
            .map(|(key, _)| key.clone())
            .collect();
        file.unformatted.extend(flagged);

        let strings = &file.strings;
        file.unformatted.retain(|key| strings.contains_key(key));

        let path = self.file_path(locale);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let temp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&file)
            .context("Failed to serialize locale output file")?;
        fs::write(&temp_path, bytes)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        info!(
            locale = locale.code(),
            written = new_entries.len(),
            total = file.strings.len(),
            "Saved locale output file"
        );
        Ok(new_entries.len())
    }
}

/// Whether a value needs the non-standard-format flag: either a custom
/// `%name%` placeholder or two or more standard format specifiers.
pub fn needs_unformatted_flag(value: &str) -> bool {
    if !TranslationValidator::extract_custom_placeholders(value).is_empty() {
        return true;
    }
    TranslationValidator::extract_specifiers(value).len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn locale(code: &str) -> Locale {
        Locale::from_code(code).expect("registered locale")
    }

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_merge_preserves_existing_entries() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        let de = locale("de");

        outputs
            .merge_and_save(de, &entries(&[("x", "old")]), &BTreeSet::new())
            .expect("first save");
        outputs
            .merge_and_save(de, &entries(&[("y", "new")]), &BTreeSet::new())
            .expect("second save");

        let merged = outputs.load(de);
        assert_eq!(merged.get("x").map(String::as_str), Some("old"));
        assert_eq!(merged.get("y").map(String::as_str), Some("new"));
    }

    #[test]
    fn test_merge_overwrites_key_by_key() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        let fr = locale("fr");

        outputs
            .merge_and_save(fr, &entries(&[("x", "v1"), ("y", "kept")]), &BTreeSet::new())
            .expect("first save");
        outputs
            .merge_and_save(fr, &entries(&[("x", "v2")]), &BTreeSet::new())
            .expect("second save");

        let merged = outputs.load(fr);
        assert_eq!(merged.get("x").map(String::as_str), Some("v2"));
        assert_eq!(merged.get("y").map(String::as_str), Some("kept"));
    }

    #[test]
    fn test_load_missing_locale_is_empty() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        assert!(outputs.load(locale("ja")).is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty_with_warning() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        let it = locale("it");

        let path = outputs.file_path(it);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "garbage").expect("write");

        assert!(outputs.load(it).is_empty());
    }

    #[test]
    fn test_file_path_uses_resource_suffix() {
        let outputs = LocaleOutputs::new("/res");
        let path = outputs.file_path(locale("zh-CN"));
        assert!(path.ends_with("values-zh-rCN/strings.json"));
    }

    #[test]
    fn test_merge_leaves_no_temp_file() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        let ru = locale("ru");

        outputs
            .merge_and_save(ru, &entries(&[("k", "v")]), &BTreeSet::new())
            .expect("save");
        assert!(!outputs.file_path(ru).with_extension("json.tmp").exists());
    }

    // ==================== Unformatted Flag Tests ====================

    #[test]
    fn test_needs_unformatted_flag_custom_placeholder() {
        assert!(needs_unformatted_flag("Hello %userName%"));
    }

    #[test]
    fn test_needs_unformatted_flag_multiple_specifiers() {
        assert!(needs_unformatted_flag("Sent %1$d of %2$d"));
        assert!(needs_unformatted_flag("%s and %s"));
    }

    #[test]
    fn test_needs_unformatted_flag_single_specifier() {
        assert!(!needs_unformatted_flag("Hello %s"));
        assert!(!needs_unformatted_flag("plain text"));
    }

    #[test]
    fn test_declared_unformatted_keys_recorded() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        let pl = locale("pl");

        let mut declared = BTreeSet::new();
        declared.insert("count_msg".to_string());
        outputs
            .merge_and_save(pl, &entries(&[("count_msg", "Wysłano %d")]), &declared)
            .expect("save");

        let raw = fs::read_to_string(outputs.file_path(pl)).expect("read");
        let file: LocaleFile = serde_json::from_str(&raw).expect("parse");
        assert!(file.unformatted.contains("count_msg"));
    }

    #[test]
    fn test_auto_detected_unformatted_keys_recorded() {
        let dir = tempdir().expect("tempdir");
        let outputs = LocaleOutputs::new(dir.path());
        let tr = locale("tr");

        outputs
            .merge_and_save(
                tr,
                &entries(&[("both", "%1$d / %2$d"), ("plain", "metin")]),
                &BTreeSet::new(),
            )
            .expect("save");

        let raw = fs::read_to_string(outputs.file_path(tr)).expect("read");
        let file: LocaleFile = serde_json::from_str(&raw).expect("parse");
        assert!(file.unformatted.contains("both"));
        assert!(!file.unformatted.contains("plain"));
    }
}

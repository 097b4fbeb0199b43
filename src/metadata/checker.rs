//! Consistency checking between the metadata repository and the live source
//! strings.
//!
//! Orphans (documented keys with no source string) and undocumented keys
//! (source strings with no metadata) are reported, never auto-fixed:
//! removal runs in dry-run mode unless execution is explicit.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::Result;
use crate::metadata::repository::MetadataRepository;

/// Coverage statistics over the repository and source strings.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageStats {
    pub total_strings: usize,
    pub documented_strings: usize,
    pub undocumented_strings: usize,
    pub coverage_percent: f64,
    /// category -> documented key count
    pub categories: BTreeMap<String, usize>,
    pub with_format_specifiers: usize,
    pub with_emoji: usize,
    pub with_html: usize,
}

/// Diffs the repository's key-set against the live source-string key-set.
pub struct ConsistencyChecker<'a> {
    repo: &'a mut MetadataRepository,
    source: &'a BTreeMap<String, String>,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(repo: &'a mut MetadataRepository, source: &'a BTreeMap<String, String>) -> Self {
        Self { repo, source }
    }

    /// Keys present in the repository but absent from the source strings,
    /// grouped by category.
    pub fn find_orphans(&mut self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut orphans: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (key, record) in self.repo.get_all()? {
            if !self.source.contains_key(&key) {
                orphans
                    .entry(record.category_or_default().to_string())
                    .or_default()
                    .push(key);
            }
        }

        for keys in orphans.values_mut() {
            keys.sort();
        }
        Ok(orphans)
    }

    /// Keys present in the source strings but absent from the repository.
    pub fn find_undocumented(&mut self) -> Result<Vec<String>> {
        let mut undocumented = Vec::new();
        for key in self.source.keys() {
            if !self.repo.contains(key)? {
                undocumented.push(key.clone());
            }
        }
        Ok(undocumented)
    }

    /// Remove orphaned keys from the repository.
    ///
    /// When `dry_run` is true nothing is mutated; the returned count is what
    /// *would* be removed. Otherwise each orphan is dropped from the working
    /// set and the store is saved, which also drops any emptied category
    /// from the index.
    pub fn remove_orphans(&mut self, dry_run: bool) -> Result<usize> {
        let orphans = self.find_orphans()?;
        let total = orphans.values().map(Vec::len).sum();

        if dry_run || total == 0 {
            return Ok(total);
        }

        for keys in orphans.values() {
            for key in keys {
                self.repo.remove(key)?;
            }
        }
        self.repo.save()?;

        info!(removed = total, "Removed orphaned metadata entries");
        Ok(total)
    }

    /// Human-readable consistency report, in the shape the `validate`
    /// command prints. Also refreshes the repository's total-string count.
    pub fn validate(&mut self) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        self.repo.set_total_strings(self.source.len());

        let undocumented = self.find_undocumented()?;
        if !undocumented.is_empty() {
            issues.push(format!(
                "{} strings without metadata:",
                undocumented.len()
            ));
            for key in undocumented.iter().take(10) {
                let preview: String = self
                    .source
                    .get(key)
                    .map(|text| text.chars().take(50).collect())
                    .unwrap_or_default();
                issues.push(format!("  - {}: {}", key, preview));
            }
            if undocumented.len() > 10 {
                issues.push(format!("  ... and {} more", undocumented.len() - 10));
            }
        }

        let orphans = self.find_orphans()?;
        let orphan_count: usize = orphans.values().map(Vec::len).sum();
        if orphan_count > 0 {
            issues.push(format!("{} metadata entries without strings:", orphan_count));
            for keys in orphans.values() {
                for key in keys {
                    issues.push(format!("  - {}", key));
                }
            }
        }

        if issues.is_empty() {
            issues.push("All metadata is in sync with the source strings".to_string());
        }

        Ok(issues)
    }

    /// Coverage statistics for the `stats` command.
    pub fn stats(&mut self) -> Result<CoverageStats> {
        let all = self.repo.get_all()?;
        let total = self.source.len();
        let documented = all.len();

        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        let mut with_format_specifiers = 0;
        let mut with_emoji = 0;
        let mut with_html = 0;

        for record in all.values() {
            *categories
                .entry(record.category_or_default().to_string())
                .or_default() += 1;

            if let Some(technical) = &record.technical {
                if technical.format_specifiers.unwrap_or(false) {
                    with_format_specifiers += 1;
                }
                if technical.contains_emoji.unwrap_or(false) {
                    with_emoji += 1;
                }
                if technical.html_formatting.unwrap_or(false) {
                    with_html += 1;
                }
            }
        }

        Ok(CoverageStats {
            total_strings: total,
            documented_strings: documented,
            undocumented_strings: total.saturating_sub(documented),
            coverage_percent: if total > 0 {
                documented as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            categories,
            with_format_specifiers,
            with_emoji,
            with_html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::record::{MetadataRecord, Technical};
    use crate::metadata::repository::DEFAULT_METADATA_SUBDIR;
    use tempfile::tempdir;

    fn record(category: &str) -> MetadataRecord {
        MetadataRecord {
            category: category.to_string(),
            ..MetadataRecord::default()
        }
    }

    fn source_strings(keys: &[&str]) -> BTreeMap<String, String> {
        keys.iter()
            .map(|k| (k.to_string(), format!("text for {}", k)))
            .collect()
    }

    fn seeded_repo(dir: &std::path::Path, keys: &[(&str, &str)]) -> MetadataRepository {
        let mut repo = MetadataRepository::open(dir, DEFAULT_METADATA_SUBDIR, "Test").expect("open");
        for (key, category) in keys {
            repo.put(key, record(category)).expect("put");
        }
        repo.save().expect("save");
        repo
    }

    // ==================== Orphan Detection Tests ====================

    #[test]
    fn test_find_orphans_exact_set() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(
            dir.path(),
            &[("a", "general"), ("b", "general"), ("c", "general")],
        );
        let source = source_strings(&["a", "b"]);

        let mut checker = ConsistencyChecker::new(&mut repo, &source);
        let orphans = checker.find_orphans().expect("orphans");

        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans["general"], vec!["c".to_string()]);
        assert!(checker.find_undocumented().expect("undocumented").is_empty());
    }

    #[test]
    fn test_find_undocumented() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general")]);
        let source = source_strings(&["a", "b", "z"]);

        let mut checker = ConsistencyChecker::new(&mut repo, &source);
        let undocumented = checker.find_undocumented().expect("undocumented");

        assert_eq!(undocumented, vec!["b".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_no_orphans_when_in_sync() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general")]);
        let source = source_strings(&["a"]);

        let mut checker = ConsistencyChecker::new(&mut repo, &source);
        assert!(checker.find_orphans().expect("orphans").is_empty());
    }

    // ==================== Removal Tests ====================

    #[test]
    fn test_remove_orphans_dry_run_mutates_nothing() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general"), ("c", "general")]);
        let source = source_strings(&["a"]);

        let mut checker = ConsistencyChecker::new(&mut repo, &source);
        let would_remove = checker.remove_orphans(true).expect("dry run");
        assert_eq!(would_remove, 1);

        // Nothing changed on disk or in memory.
        assert!(repo.get("c").is_ok());
        let mut fresh = MetadataRepository::open(dir.path(), DEFAULT_METADATA_SUBDIR, "Test")
            .expect("reopen");
        assert!(fresh.get("c").is_ok());
    }

    #[test]
    fn test_remove_orphans_execute_saves() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general"), ("c", "general")]);
        let source = source_strings(&["a"]);

        let removed = ConsistencyChecker::new(&mut repo, &source)
            .remove_orphans(false)
            .expect("execute");
        assert_eq!(removed, 1);

        let mut fresh = MetadataRepository::open(dir.path(), DEFAULT_METADATA_SUBDIR, "Test")
            .expect("reopen");
        assert!(fresh.get("c").is_err());
        assert!(fresh.get("a").is_ok());
    }

    #[test]
    fn test_remove_orphans_drops_emptied_category() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general"), ("gone", "doomed")]);
        let source = source_strings(&["a"]);

        ConsistencyChecker::new(&mut repo, &source)
            .remove_orphans(false)
            .expect("execute");

        let fresh = MetadataRepository::open(dir.path(), DEFAULT_METADATA_SUBDIR, "Test")
            .expect("reopen");
        assert_eq!(fresh.categories(), vec!["general".to_string()]);
        assert!(!dir
            .path()
            .join(DEFAULT_METADATA_SUBDIR)
            .join("doomed.json")
            .exists());
    }

    // ==================== Validate / Stats Tests ====================

    #[test]
    fn test_validate_reports_in_sync() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general")]);
        let source = source_strings(&["a"]);

        let issues = ConsistencyChecker::new(&mut repo, &source)
            .validate()
            .expect("validate");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("in sync"));
        assert_eq!(repo.total_strings(), 1);
    }

    #[test]
    fn test_validate_reports_both_directions() {
        let dir = tempdir().expect("tempdir");
        let mut repo = seeded_repo(dir.path(), &[("a", "general"), ("c", "general")]);
        let source = source_strings(&["a", "b"]);

        let issues = ConsistencyChecker::new(&mut repo, &source)
            .validate()
            .expect("validate");
        let text = issues.join("\n");
        assert!(text.contains("1 strings without metadata"));
        assert!(text.contains("- b"));
        assert!(text.contains("1 metadata entries without strings"));
        assert!(text.contains("- c"));
    }

    #[test]
    fn test_stats_counts() {
        let dir = tempdir().expect("tempdir");
        let mut repo = MetadataRepository::open(dir.path(), DEFAULT_METADATA_SUBDIR, "Test")
            .expect("open");
        repo.put("plain", record("general")).expect("put");
        repo.put(
            "formatted",
            MetadataRecord {
                category: "general".to_string(),
                technical: Some(Technical {
                    format_specifiers: Some(true),
                    contains_emoji: Some(true),
                    ..Technical::default()
                }),
                ..MetadataRecord::default()
            },
        )
        .expect("put");
        repo.save().expect("save");

        let source = source_strings(&["plain", "formatted", "undocumented_1", "undocumented_2"]);
        let stats = ConsistencyChecker::new(&mut repo, &source)
            .stats()
            .expect("stats");

        assert_eq!(stats.total_strings, 4);
        assert_eq!(stats.documented_strings, 2);
        assert_eq!(stats.undocumented_strings, 2);
        assert!((stats.coverage_percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.categories["general"], 2);
        assert_eq!(stats.with_format_specifiers, 1);
        assert_eq!(stats.with_emoji, 1);
        assert_eq!(stats.with_html, 0);
    }
}

//! The translation session.
//!
//! One invocation walks `INIT -> (RESUME_SCAN | FORCE_ALL) -> BUILD_PROMPTS
//! -> DISPATCH -> MERGE_OUTPUT -> DONE`. A key failing to translate lands in
//! the failure list and never aborts the session. Because the output merge
//! is additive and the resume scan is the sole gate for re-work, an
//! interrupted session is resumable by simply re-running it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::escape::escape;
use crate::i18n::{Locale, TranslationValidator};
use crate::metadata::{MetadataRecord, MetadataRepository};
use crate::output::LocaleOutputs;
use crate::prompt::build_prompt;
use crate::provider::{LocaleTexts, TranslationService};
use crate::source::SourceStrings;

/// Options for one session invocation.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Target locales, never including the source locale.
    pub targets: Vec<Locale>,
    /// Translate only this key (always dispatched, even if complete).
    pub specific_key: Option<String>,
    /// Show prompts without calling the provider.
    pub dry_run: bool,
    /// Re-translate complete keys too.
    pub force: bool,
    /// Persist results into the locale output stores.
    pub write_output: bool,
    /// Bounded dispatch concurrency.
    pub concurrency: usize,
}

/// Aggregate result of one session.
#[derive(Debug, Default)]
pub struct SessionReport {
    /// Keys that produced translations this run.
    pub translated: usize,
    /// Keys skipped because every target locale already had them.
    pub skipped_complete: usize,
    /// Documented keys skipped for missing or empty source text.
    pub skipped_no_source: Vec<String>,
    /// Keys left untouched by cooperative cancellation.
    pub cancelled: usize,
    /// Provider calls actually made.
    pub dispatched: usize,
    /// Keys whose translation failed.
    pub failed: Vec<String>,
    /// Locale files written during the merge phase.
    pub saved_locales: usize,
    /// Individual locale values produced.
    pub total_translations: usize,
}

/// Result of inspecting the persisted output stores for resume.
#[derive(Debug, Default)]
struct ResumeScan {
    complete: BTreeSet<String>,
    incomplete: BTreeSet<String>,
}

enum KeyOutcome {
    Translated { key: String, texts: LocaleTexts },
    NoSource(String),
    Failed(String),
    Cancelled,
}

/// A multi-locale translation session over the documented keys.
pub struct TranslationSession {
    service: Arc<dyn TranslationService>,
    outputs: LocaleOutputs,
    options: SessionOptions,
    cancel: Arc<AtomicBool>,
}

impl TranslationSession {
    pub fn new(
        service: Arc<dyn TranslationService>,
        outputs: LocaleOutputs,
        options: SessionOptions,
    ) -> Self {
        Self {
            service,
            outputs,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The cooperative cancel flag. Setting it stops the session between
    /// keys: in-flight keys finish, pending ones are not dispatched.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run the session.
    pub async fn run(
        &self,
        repo: &mut MetadataRepository,
        source: &SourceStrings,
    ) -> Result<SessionReport> {
        let documented = repo.get_all()?;
        let mut report = SessionReport::default();

        let keys_to_translate = self.select_keys(&documented, &mut report);
        if keys_to_translate.is_empty() {
            info!("Nothing to translate");
            return Ok(report);
        }

        info!(
            keys = keys_to_translate.len(),
            locales = self.options.targets.len(),
            force = self.options.force,
            dry_run = self.options.dry_run,
            "Translating"
        );

        let total = keys_to_translate.len();
        let outcomes: Vec<KeyOutcome> = stream::iter(
            keys_to_translate.into_iter().enumerate().map(|(i, key)| {
                let documented = &documented;
                async move {
                    if self.cancel.load(Ordering::SeqCst) {
                        return KeyOutcome::Cancelled;
                    }
                    info!("[{}/{}] Processing {}...", i + 1, total, key);
                    self.translate_key(&key, documented, source).await
                }
            }),
        )
        .buffer_unordered(self.options.concurrency.max(1))
        .collect()
        .await;

        let mut all_translations: BTreeMap<String, LocaleTexts> = BTreeMap::new();
        for outcome in outcomes {
            match outcome {
                KeyOutcome::Translated { key, texts } => {
                    if !self.options.dry_run {
                        report.dispatched += 1;
                    }
                    report.total_translations += texts.len();
                    all_translations.insert(key, texts);
                }
                KeyOutcome::NoSource(key) => report.skipped_no_source.push(key),
                KeyOutcome::Failed(key) => report.failed.push(key),
                KeyOutcome::Cancelled => report.cancelled += 1,
            }
        }
        report.translated = all_translations.len();
        report.failed.sort();
        report.skipped_no_source.sort();

        if self.options.write_output && !self.options.dry_run && !all_translations.is_empty() {
            report.saved_locales = self.merge_output(&documented, &all_translations)?;
        }

        info!(
            translated = report.translated,
            skipped = report.skipped_complete,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Session complete"
        );
        if !report.failed.is_empty() {
            warn!(
                "Failed to translate {} keys: {}",
                report.failed.len(),
                report.failed.join(", ")
            );
        }

        Ok(report)
    }

    /// Decide which keys need translation: a specific key always does;
    /// otherwise every documented key that the resume scan does not prove
    /// complete (force mode dispatches them all).
    fn select_keys(
        &self,
        documented: &BTreeMap<String, MetadataRecord>,
        report: &mut SessionReport,
    ) -> Vec<String> {
        if let Some(key) = &self.options.specific_key {
            if documented.contains_key(key) {
                return vec![key.clone()];
            }
            warn!("[{}] No metadata found, skipping", key);
            report.failed.push(key.clone());
            return Vec::new();
        }

        if self.options.force || self.options.dry_run {
            return documented.keys().cloned().collect();
        }

        let scan = self.scan_existing(documented);
        info!(
            complete = scan.complete.len(),
            incomplete = scan.incomplete.len(),
            missing = documented.len() - scan.complete.len() - scan.incomplete.len(),
            "Resume scan of existing translations"
        );
        report.skipped_complete = scan.complete.len();

        documented
            .keys()
            .filter(|key| !scan.complete.contains(*key))
            .cloned()
            .collect()
    }

    /// Inspect every target locale's output store. A key is complete only
    /// if every target locale holds a non-empty value for it.
    fn scan_existing(&self, documented: &BTreeMap<String, MetadataRecord>) -> ResumeScan {
        let mut locales_by_key: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

        for locale in &self.options.targets {
            for (key, text) in self.outputs.load(*locale) {
                if !text.is_empty() {
                    locales_by_key.entry(key).or_default().insert(locale.code());
                }
            }
        }

        let mut scan = ResumeScan::default();
        for key in documented.keys() {
            match locales_by_key.get(key) {
                Some(present) if present.len() >= self.options.targets.len() => {
                    scan.complete.insert(key.clone());
                }
                Some(_) => {
                    scan.incomplete.insert(key.clone());
                }
                None => {}
            }
        }
        scan
    }

    async fn translate_key(
        &self,
        key: &str,
        documented: &BTreeMap<String, MetadataRecord>,
        source: &SourceStrings,
    ) -> KeyOutcome {
        let record = match documented.get(key) {
            Some(record) => record,
            None => {
                warn!("[{}] No metadata found, skipping", key);
                return KeyOutcome::Failed(key.to_string());
            }
        };

        let source_text = match source.get(key) {
            Some(text) if !text.is_empty() => text,
            _ => {
                warn!("[{}] No source text found, skipping", key);
                return KeyOutcome::NoSource(key.to_string());
            }
        };

        let prompt = build_prompt(key, source_text, record, &self.options.targets);

        if self.options.dry_run {
            info!("DRY RUN - prompt for {}:\n{}", key, prompt);
            let texts: LocaleTexts = self
                .options
                .targets
                .iter()
                .map(|locale| (locale.code().to_string(), source_text.to_string()))
                .collect();
            return KeyOutcome::Translated {
                key: key.to_string(),
                texts,
            };
        }

        match self.service.translate(&prompt).await {
            Ok(texts) if texts.is_empty() => {
                warn!("[{}] Translation returned no values", key);
                KeyOutcome::Failed(key.to_string())
            }
            Ok(texts) => {
                for (code, text) in &texts {
                    let validation = TranslationValidator::validate(source_text, text);
                    for error in &validation.errors {
                        warn!("[{}] {} validation error: {}", key, code, error);
                    }
                    for warning in &validation.warnings {
                        warn!("[{}] {} validation warning: {}", key, code, warning);
                    }
                }
                info!("[{}] Completed ({} locales)", key, texts.len());
                KeyOutcome::Translated {
                    key: key.to_string(),
                    texts,
                }
            }
            Err(e) => {
                warn!("[{}] Translation failed: {:#}", key, e);
                KeyOutcome::Failed(key.to_string())
            }
        }
    }

    /// Regroup results by locale and merge them into the output stores.
    ///
    /// Every outgoing value is escaped exactly once here; values already
    /// persisted are never re-escaped. Merges run sequentially so each
    /// locale file has a single writer.
    fn merge_output(
        &self,
        documented: &BTreeMap<String, MetadataRecord>,
        all_translations: &BTreeMap<String, LocaleTexts>,
    ) -> Result<usize> {
        let mut by_locale: BTreeMap<Locale, BTreeMap<String, String>> = BTreeMap::new();

        for (key, texts) in all_translations {
            for (code, text) in texts {
                let locale = match Locale::from_code(code) {
                    Ok(locale) => locale,
                    Err(_) => {
                        warn!("[{}] Ignoring unknown locale '{}' in response", key, code);
                        continue;
                    }
                };
                if text.is_empty() {
                    continue;
                }
                by_locale
                    .entry(locale)
                    .or_default()
                    .insert(key.clone(), escape(text));
            }
        }

        let declared_unformatted: BTreeSet<String> = documented
            .iter()
            .filter(|(_, record)| {
                record
                    .technical
                    .as_ref()
                    .and_then(|t| t.format_specifiers)
                    .unwrap_or(false)
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut saved = 0;
        for (locale, entries) in &by_locale {
            match self
                .outputs
                .merge_and_save(*locale, entries, &declared_unformatted)
            {
                Ok(_) => saved += 1,
                Err(e) => warn!("[{}] Failed to save locale output: {:#}", locale, e),
            }
        }

        info!(locales = saved, "Translations merged into locale stores");
        Ok(saved)
    }
}

//! Translation preservation checks.
//!
//! This module validates that a translated value preserves the technical
//! elements of its source string: format specifiers (in order), custom
//! `%name%` placeholders, HTML tags, and emoji. The checks are structural,
//! never linguistic.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Critical mismatches (a format specifier dropped or reordered)
    pub errors: Vec<String>,

    /// Non-critical issues (markup or emoji drift)
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for translated resource values.
pub struct TranslationValidator;

// Regex patterns for extraction (cached for performance)
static SPECIFIER_REGEX: OnceLock<Regex> = OnceLock::new();
static CUSTOM_PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate that a translation preserves the technical elements of the
    /// source string.
    ///
    /// Checks that:
    /// - format specifiers (`%s`, `%d`, `%1$s`, ...) appear unchanged, in the
    ///   same order
    /// - custom `%name%` placeholders are all present
    /// - HTML tags are preserved
    /// - emoji are preserved
    ///
    /// # Arguments
    /// * `source` - The source text (before translation)
    /// * `translated` - The translated text
    pub fn validate(source: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        // Format specifiers must match exactly, order included; a dropped or
        // reordered specifier breaks String.format at runtime.
        let source_specs = Self::extract_specifiers(source);
        let trans_specs = Self::extract_specifiers(translated);
        if source_specs != trans_specs {
            report.errors.push(format!(
                "Format specifier mismatch: source has {:?}, translation has {:?}",
                source_specs, trans_specs
            ));
        }

        // Custom placeholders are substituted by the app; order is free but
        // every one must survive.
        let source_placeholders = Self::extract_custom_placeholders(source);
        for placeholder in &source_placeholders {
            if !translated.contains(placeholder.as_str()) {
                report.warnings.push(format!(
                    "Custom placeholder {} missing from translation",
                    placeholder
                ));
            }
        }

        // HTML tags: compare the tag sequences.
        let source_tags = Self::extract_html_tags(source);
        let trans_tags = Self::extract_html_tags(translated);
        if source_tags != trans_tags {
            report.warnings.push(format!(
                "HTML tag mismatch: source has {:?}, translation has {:?}",
                source_tags, trans_tags
            ));
        }

        // Emoji must survive verbatim.
        for emoji in Self::extract_emoji(source) {
            if !translated.contains(emoji) {
                report
                    .warnings
                    .push(format!("Emoji '{}' missing from translation", emoji));
            }
        }

        report
    }

    /// Extract format specifiers in order of appearance.
    ///
    /// Matches positional (`%1$s`, `%2$d`) and plain (`%s`, `%d`, `%f`, ...)
    /// specifiers; `%%` is a literal percent and is skipped.
    pub fn extract_specifiers(text: &str) -> Vec<String> {
        let regex = SPECIFIER_REGEX
            .get_or_init(|| Regex::new(r"%(?:\d+\$)?(?:\.\d+)?[sdifgeoxX]").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Extract custom `%name%` placeholders.
    pub fn extract_custom_placeholders(text: &str) -> Vec<String> {
        let regex = CUSTOM_PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"%\w+%").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Extract HTML tags in order of appearance.
    pub fn extract_html_tags(text: &str) -> Vec<String> {
        let regex = HTML_TAG_REGEX.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Extract emoji characters.
    pub fn extract_emoji(text: &str) -> Vec<char> {
        text.chars()
            .filter(|c| {
                let cp = *c as u32;
                (0x1F000..=0x1FAFF).contains(&cp) || (0x2600..=0x27BF).contains(&cp)
            })
            .collect()
    }
}

//! AI-friendly translation export.
//!
//! Flattens the effective metadata records plus their source texts into a
//! single per-locale document a translation service (or a human reviewer)
//! can consume without access to the split store.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::i18n::Locale;
use crate::metadata::{MetadataRecord, SpecifierInfo, Terminology};
use crate::source::SourceStrings;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportFile {
    pub project: String,
    pub source_locale: String,
    pub target_locale: String,
    pub export_date: String,
    pub total_strings: usize,
    pub documented_strings: usize,
    pub strings: Vec<ExportString>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportString {
    pub key: String,
    pub source_text: String,
    pub context: ExportContext,
    pub constraints: ExportConstraints,
    pub technical: ExportTechnical,
    pub terminology: Terminology,
    pub cultural_notes: String,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportContext {
    pub ui_location: String,
    pub purpose: String,
    pub shown_when: String,
    pub surrounding_elements: Vec<String>,
    pub position: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportConstraints {
    pub max_length: Option<u32>,
    pub reason: String,
    pub tone: String,
    pub style: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportTechnical {
    pub format_specifiers: bool,
    pub specifier_info: Vec<SpecifierInfo>,
    pub html_formatting: bool,
    pub contains_emoji: bool,
    pub emoji_character: String,
}

/// Build the export document for one target locale.
pub fn build_export(
    records: &BTreeMap<String, MetadataRecord>,
    source: &SourceStrings,
    target: Locale,
    project: &str,
) -> ExportFile {
    let strings = records
        .iter()
        .map(|(key, record)| {
            let ui = record.ui.clone().unwrap_or_default();
            let context = record.context.clone().unwrap_or_default();
            let constraints = record.constraints.clone().unwrap_or_default();
            let guidance = record.translation_guidance.clone().unwrap_or_default();
            let technical = record.technical.clone().unwrap_or_default();

            ExportString {
                key: key.clone(),
                source_text: source.get(key).unwrap_or_default().to_string(),
                context: ExportContext {
                    ui_location: record.ui_location(),
                    purpose: record.purpose.clone().unwrap_or_default(),
                    shown_when: context.shown_when.unwrap_or_default(),
                    surrounding_elements: context.surrounding_elements.unwrap_or_default(),
                    position: ui.position.unwrap_or_default(),
                },
                constraints: ExportConstraints {
                    max_length: constraints.max_length,
                    reason: constraints.reason.unwrap_or_default(),
                    tone: guidance.tone.clone().unwrap_or_else(|| "neutral".to_string()),
                    style: guidance
                        .style
                        .clone()
                        .unwrap_or_else(|| "descriptive".to_string()),
                },
                technical: ExportTechnical {
                    format_specifiers: technical.format_specifiers.unwrap_or(false),
                    specifier_info: technical.specifier_info.unwrap_or_default(),
                    html_formatting: technical.html_formatting.unwrap_or(false),
                    contains_emoji: technical.contains_emoji.unwrap_or(false),
                    emoji_character: technical.emoji_character.unwrap_or_default(),
                },
                terminology: guidance.terminology.unwrap_or_default(),
                cultural_notes: guidance.cultural_notes.unwrap_or_default(),
                category: record.category_or_default().to_string(),
            }
        })
        .collect();

    ExportFile {
        project: project.to_string(),
        source_locale: Locale::source().code().to_string(),
        target_locale: target.code().to_string(),
        export_date: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        total_strings: source.len(),
        documented_strings: records.len(),
        strings,
    }
}

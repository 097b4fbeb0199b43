//! Metadata record types and the defaults merge.
//!
//! Records are stored *partial* (only overrides) and become *effective* after
//! merging over the defaults record. Every field's presence is explicit: a
//! missing field means "inherit from defaults", never "empty".

use serde::{Deserialize, Serialize};

/// Where a string appears in the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Length and fit constraints for the translated value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Domain terminology guidance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminology {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_emoji: Option<bool>,
}

/// Tone, style and terminology guidance for the translator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationGuidance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminology: Option<Terminology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_notes: Option<String>,
}

/// One format specifier occurring in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecifierInfo {
    pub placeholder: String,
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub represents: Option<String>,
}

/// Technical properties of the source text that must survive translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technical {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_specifiers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifier_info: Option<Vec<SpecifierInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_formatting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_emoji: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plurals: Option<bool>,
}

/// When the string is shown and what surrounds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shown_when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrounding_elements: Option<Vec<String>>,
}

/// Source-tree references for the string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct References {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layouts: Option<Vec<String>>,
}

/// Metadata for a single string resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_guidance: Option<TranslationGuidance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<Technical>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<UsageContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<References>,
}

/// Default field values applied under every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_guidance: Option<TranslationGuidance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<Technical>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<UsageContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<References>,
}

/// Merge a record's group over the defaults' same-named group, field by
/// field. One level only: a nested composite (e.g. `terminology`) is taken
/// as a unit from the record when present.
macro_rules! merge_fields {
    ($record:expr, $default:expr, { $($field:ident),+ $(,)? }) => {{
        let record = $record;
        let default = $default;
        Self {
            $($field: record.$field.clone().or_else(|| default.$field.clone()),)+
        }
    }};
}

trait MergeOver: Clone {
    fn merge_over(&self, default: &Self) -> Self;
}

impl MergeOver for UiContext {
    fn merge_over(&self, default: &Self) -> Self {
        merge_fields!(self, default, { element, screen, section, position })
    }
}

impl MergeOver for Constraints {
    fn merge_over(&self, default: &Self) -> Self {
        merge_fields!(self, default, { max_length, reason })
    }
}

impl MergeOver for TranslationGuidance {
    fn merge_over(&self, default: &Self) -> Self {
        merge_fields!(self, default, { tone, style, terminology, cultural_notes })
    }
}

impl MergeOver for Technical {
    fn merge_over(&self, default: &Self) -> Self {
        merge_fields!(self, default, {
            format_specifiers,
            specifier_info,
            html_formatting,
            contains_emoji,
            emoji_character,
            emoji_position,
            plurals,
        })
    }
}

impl MergeOver for UsageContext {
    fn merge_over(&self, default: &Self) -> Self {
        merge_fields!(self, default, { shown_when, surrounding_elements })
    }
}

impl MergeOver for References {
    fn merge_over(&self, default: &Self) -> Self {
        merge_fields!(self, default, { code_files, layouts })
    }
}

fn merge_group<T: MergeOver>(record: &Option<T>, default: &Option<T>) -> Option<T> {
    match (record, default) {
        (Some(r), Some(d)) => Some(r.merge_over(d)),
        (Some(r), None) => Some(r.clone()),
        (None, Some(d)) => Some(d.clone()),
        (None, None) => None,
    }
}

impl MetadataRecord {
    /// Produce the effective record: this partial record merged over the
    /// defaults. Pure: neither input is mutated.
    pub fn merged_with(&self, defaults: &DefaultsRecord) -> MetadataRecord {
        MetadataRecord {
            category: self.category.clone(),
            ui: merge_group(&self.ui, &defaults.ui),
            purpose: self.purpose.clone().or_else(|| defaults.purpose.clone()),
            constraints: merge_group(&self.constraints, &defaults.constraints),
            translation_guidance: merge_group(
                &self.translation_guidance,
                &defaults.translation_guidance,
            ),
            technical: merge_group(&self.technical, &defaults.technical),
            context: merge_group(&self.context, &defaults.context),
            references: merge_group(&self.references, &defaults.references),
        }
    }

    /// The UI location path: `screen[ > section] > element`.
    pub fn ui_location(&self) -> String {
        let ui = self.ui.clone().unwrap_or_default();
        let screen = ui.screen.as_deref().unwrap_or("Unknown");
        let element = ui.element.as_deref().unwrap_or("text");

        match ui.section.as_deref() {
            Some(section) => format!("{} > {} > {}", screen, section, element),
            None => format!("{} > {}", screen, element),
        }
    }

    /// One-line description for listings.
    pub fn short_description(&self) -> String {
        let ui = self.ui.clone().unwrap_or_default();
        let element = ui.element.as_deref().unwrap_or("text");
        let screen = ui.screen.as_deref().unwrap_or("Unknown");
        format!("[{}] {} in {}", self.category, element, screen)
    }

    /// Category with the uncategorized fallback applied.
    pub fn category_or_default(&self) -> &str {
        if self.category.is_empty() {
            "uncategorized"
        } else {
            &self.category
        }
    }
}

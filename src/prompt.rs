//! Prompt construction for multi-locale translation.
//!
//! One prompt covers every target locale at once; one provider call per key
//! rather than one per locale. The prompt is deterministic for a given
//! (key, source text, metadata, target list): same inputs, same bytes.

use std::fmt::Write as _;

use crate::i18n::{Locale, TranslationValidator};
use crate::metadata::MetadataRecord;

/// System prompt sent with every translation request.
pub fn system_prompt() -> &'static str {
    "You are a professional translator specializing in mobile app localization. \
     Provide accurate, natural translations that fit UI context perfectly."
}

/// Build the translation prompt for one string key.
pub fn build_prompt(
    key: &str,
    source_text: &str,
    metadata: &MetadataRecord,
    targets: &[Locale],
) -> String {
    let ui = metadata.ui.clone().unwrap_or_default();
    let context = metadata.context.clone().unwrap_or_default();
    let constraints = metadata.constraints.clone().unwrap_or_default();
    let guidance = metadata.translation_guidance.clone().unwrap_or_default();
    let terminology = guidance.terminology.clone().unwrap_or_default();
    let technical = metadata.technical.clone().unwrap_or_default();

    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Translate the following app string to ALL specified languages.\n"
    );
    let _ = writeln!(prompt, "STRING KEY: {}", key);
    let _ = writeln!(prompt, "SOURCE TEXT: {}", source_text);

    let _ = writeln!(prompt, "\n=== CONTEXT INFORMATION ===\n");
    let _ = writeln!(prompt, "UI Location: {}", metadata.ui_location());
    let _ = writeln!(
        prompt,
        "Element Type: {}",
        ui.element.as_deref().unwrap_or("text")
    );
    let _ = writeln!(prompt, "Category: {}", metadata.category_or_default());
    let _ = writeln!(
        prompt,
        "Purpose: {}",
        metadata.purpose.as_deref().unwrap_or("")
    );

    if let Some(shown_when) = &context.shown_when {
        let _ = writeln!(prompt, "Shown When: {}", shown_when);
    }
    if let Some(surrounding) = &context.surrounding_elements {
        if !surrounding.is_empty() {
            let _ = writeln!(prompt, "Surrounding Elements: {}", surrounding.join(", "));
        }
    }

    let _ = writeln!(prompt, "\n=== TRANSLATION CONSTRAINTS ===\n");

    match constraints.max_length {
        Some(max_length) => {
            let _ = writeln!(
                prompt,
                "Maximum Length: {} characters (CRITICAL - must fit in UI)",
                max_length
            );
            let _ = writeln!(
                prompt,
                "Reason: {}",
                constraints
                    .reason
                    .as_deref()
                    .unwrap_or("UI space limitation")
            );
        }
        None => {
            let _ = writeln!(prompt, "Maximum Length: No strict limit, but keep concise");
        }
    }

    let _ = writeln!(prompt, "Tone: {}", guidance.tone.as_deref().unwrap_or("neutral"));
    let _ = writeln!(
        prompt,
        "Style: {}",
        guidance.style.as_deref().unwrap_or("descriptive")
    );
    if let Some(domain) = &terminology.domain {
        let _ = writeln!(prompt, "Domain: {} (use appropriate terminology)", domain);
    }

    let _ = writeln!(prompt, "\n=== TECHNICAL REQUIREMENTS ===\n");

    let specifier_lines = specifier_lines(metadata, source_text);
    if !specifier_lines.is_empty() {
        let _ = writeln!(
            prompt,
            "CRITICAL: Contains format specifiers - MUST preserve exactly!"
        );
        let _ = writeln!(prompt, "Format specifiers:");
        for line in &specifier_lines {
            let _ = writeln!(prompt, "{}", line);
        }
        let _ = writeln!(
            prompt,
            "Preserve ALL placeholders (%s, %d, %1$s, etc.) in exact same order!"
        );
    }

    let custom_placeholders = TranslationValidator::extract_custom_placeholders(source_text);
    if !custom_placeholders.is_empty() {
        let _ = writeln!(
            prompt,
            "Custom placeholders to keep verbatim: {}",
            custom_placeholders.join(", ")
        );
    }

    let emoji = match &technical.emoji_character {
        Some(emoji) if !emoji.is_empty() => emoji.clone(),
        _ => TranslationValidator::extract_emoji(source_text)
            .into_iter()
            .collect(),
    };
    if technical.contains_emoji.unwrap_or(false) || !emoji.is_empty() {
        let _ = writeln!(prompt, "Contains emoji: {}", emoji);
        if let Some(position) = &technical.emoji_position {
            let _ = writeln!(prompt, "Emoji position: {}", position);
        }
        if terminology.preserve_emoji.unwrap_or(false) {
            let _ = writeln!(prompt, "Preserve emoji exactly in all translations.");
        }
    }

    if technical.html_formatting.unwrap_or(false)
        || !TranslationValidator::extract_html_tags(source_text).is_empty()
    {
        let _ = writeln!(
            prompt,
            "CRITICAL: Contains HTML tags - preserve all tags, translate only text!"
        );
    }

    if technical.plurals.unwrap_or(false) {
        let _ = writeln!(
            prompt,
            "This string has plural forms; translate for the given form only."
        );
    }

    let _ = writeln!(prompt, "\n=== TERMINOLOGY GUIDANCE ===\n");

    if let Some(preferred) = &terminology.preferred {
        if !preferred.is_empty() {
            let _ = writeln!(prompt, "Preferred terms: {}", preferred.join(", "));
        }
    }
    if let Some(avoid) = &terminology.avoid {
        if !avoid.is_empty() {
            let _ = writeln!(prompt, "Avoid: {}", avoid.join(", "));
        }
    }
    if terminology.critical.unwrap_or(false) {
        let _ = writeln!(
            prompt,
            "CRITICAL: Translation must be unambiguous and use standard terminology."
        );
    }
    if let Some(notes) = &guidance.cultural_notes {
        let _ = writeln!(prompt, "\nCultural Notes: {}", notes);
    }

    let locale_names: Vec<&str> = targets.iter().map(|locale| locale.name()).collect();
    let _ = writeln!(prompt, "\n=== TRANSLATION TASK ===\n");
    let _ = writeln!(
        prompt,
        "Translate to these {} languages: {}\n",
        targets.len(),
        locale_names.join(", ")
    );
    let _ = writeln!(prompt, "Requirements:");
    let _ = writeln!(prompt, "1. Translate naturally for native speakers");
    let _ = writeln!(prompt, "2. Maintain exact same meaning and intent");
    let _ = writeln!(
        prompt,
        "3. Respect all technical constraints (format specifiers, HTML, emoji)"
    );
    let _ = writeln!(prompt, "4. Stay within length limits (CRITICAL for UI fit)");
    let _ = writeln!(prompt, "5. Match specified tone and style");
    let _ = writeln!(prompt, "6. Use appropriate domain terminology");
    let _ = writeln!(prompt, "7. Adapt culturally while preserving meaning");

    let _ = writeln!(
        prompt,
        "\nReturn a JSON object with translations for ALL languages:"
    );
    let _ = writeln!(prompt, "{{");
    for locale in targets {
        let _ = writeln!(
            prompt,
            "  \"{}\": \"translated text in {}\",",
            locale.code(),
            locale.name()
        );
    }
    let _ = writeln!(prompt, "}}");

    let _ = writeln!(prompt, "\nIMPORTANT:");
    let _ = writeln!(prompt, "- Provide ALL languages in the response");
    let _ = writeln!(prompt, "- Preserve format specifiers in same positions");
    let _ = writeln!(prompt, "- Stay within character limits");
    let _ = writeln!(prompt, "- Use natural, fluent translations");
    let _ = writeln!(prompt, "- Return ONLY the JSON object, no explanations");

    prompt
}

/// One line per format specifier, with a position marker so ordering is
/// never ambiguous. Metadata-declared specifiers win; otherwise specifiers
/// detected in the source text are enumerated in order of appearance.
fn specifier_lines(metadata: &MetadataRecord, source_text: &str) -> Vec<String> {
    if let Some(technical) = &metadata.technical {
        if let Some(info) = &technical.specifier_info {
            if !info.is_empty() {
                return info
                    .iter()
                    .map(|spec| {
                        let represents = spec.represents.as_deref().unwrap_or("variable");
                        format!(
                            "  - {} (position {}): {}",
                            spec.placeholder, spec.position, represents
                        )
                    })
                    .collect();
            }
        }
    }

    TranslationValidator::extract_specifiers(source_text)
        .into_iter()
        .enumerate()
        .map(|(i, placeholder)| format!("  - {} (position {}): variable", placeholder, i + 1))
        .collect()
}

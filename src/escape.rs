//! Escaping for string resource values.
//!
//! Android resource files require apostrophes, quotes and backslashes to be
//! escaped, and a leading `@` or `?` to be neutralized so the value is not
//! read as a resource or attribute reference.
//!
//! The transform is NOT idempotent: escaping an already-escaped value doubles
//! its backslashes. Callers must escape newly produced values exactly once
//! and must never pass already-persisted values back through.

/// Escape special characters for a string resource value.
pub fn escape(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Backslashes first, before the escapes below introduce new ones.
    let mut escaped = text.replace('\\', "\\\\");
    escaped = escaped.replace('\'', "\\'");
    escaped = escaped.replace('"', "\\\"");

    if escaped.starts_with('@') || escaped.starts_with('?') {
        escaped.insert(0, '\\');
    }

    escaped
}

//! Locale registry: single source of truth for all supported locales.
//!
//! This module provides a centralized registry of every locale the
//! translation pipeline can target. It uses a singleton pattern with
//! `OnceLock`; the data is immutable after initialization.

use std::sync::OnceLock;

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// BCP 47-style code used in prompts and provider responses (e.g., "en", "zh-CN")
    pub code: &'static str,

    /// English name of the locale (e.g., "Chinese (Simplified)")
    pub name: &'static str,

    /// Native name of the locale (e.g., "简体中文")
    pub native_name: &'static str,

    /// Suffix of the resource directory holding this locale's strings
    /// (e.g., "zh-rCN" for `values-zh-rCN/`)
    pub resource_suffix: &'static str,

    /// Whether this is the source locale (only one should be true)
    pub is_source: bool,

    /// Whether this locale is enabled as a translation target
    pub enabled: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Get a locale configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|locale| locale.code == code)
    }

    /// Get all enabled locales, the source locale included.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales
            .iter()
            .filter(|locale| locale.enabled)
            .collect()
    }

    /// Get every enabled locale that is a valid translation target
    /// (everything except the source locale).
    pub fn list_targets(&self) -> Vec<&LocaleConfig> {
        self.locales
            .iter()
            .filter(|locale| locale.enabled && !locale.is_source)
            .collect()
    }

    /// Get the source locale configuration.
    ///
    /// # Panics
    /// Panics if zero or more than one source locale is defined; that is a
    /// registry definition error, not a runtime condition.
    pub fn source(&self) -> &LocaleConfig {
        let sources: Vec<_> = self
            .locales
            .iter()
            .filter(|locale| locale.is_source)
            .collect();

        match sources.len() {
            0 => panic!("No source locale found in registry"),
            1 => sources[0],
            _ => panic!("Multiple source locales found in registry"),
        }
    }

    /// Check if a locale code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|locale| locale.enabled)
            .unwrap_or(false)
    }
}

/// Locale table for the supported languages.
///
/// The resource suffix follows the Android `values-<qualifier>` convention
/// for region-qualified codes (`zh-CN` stores under `values-zh-rCN`).
fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            code: "en",
            name: "English",
            native_name: "English",
            resource_suffix: "en",
            is_source: true,
            enabled: true,
        },
        LocaleConfig {
            code: "zh-CN",
            name: "Chinese (Simplified)",
            native_name: "简体中文",
            resource_suffix: "zh-rCN",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "zh-TW",
            name: "Chinese (Traditional)",
            native_name: "繁體中文",
            resource_suffix: "zh-rTW",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "hi",
            name: "Hindi",
            native_name: "हिन्दी",
            resource_suffix: "hi",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            resource_suffix: "es",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ar",
            name: "Arabic",
            native_name: "العربية",
            resource_suffix: "ar",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "pt-BR",
            name: "Portuguese (Brazil)",
            native_name: "Português (Brasil)",
            resource_suffix: "pt-rBR",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "id",
            name: "Indonesian",
            native_name: "Bahasa Indonesia",
            resource_suffix: "id",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "bn",
            name: "Bengali",
            native_name: "বাংলা",
            resource_suffix: "bn",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ru",
            name: "Russian",
            native_name: "Русский",
            resource_suffix: "ru",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ja",
            name: "Japanese",
            native_name: "日本語",
            resource_suffix: "ja",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            resource_suffix: "de",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            resource_suffix: "fr",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ko",
            name: "Korean",
            native_name: "한국어",
            resource_suffix: "ko",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "tr",
            name: "Turkish",
            native_name: "Türkçe",
            resource_suffix: "tr",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "vi",
            name: "Vietnamese",
            native_name: "Tiếng Việt",
            resource_suffix: "vi",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "it",
            name: "Italian",
            native_name: "Italiano",
            resource_suffix: "it",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "th",
            name: "Thai",
            native_name: "ไทย",
            resource_suffix: "th",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "pl",
            name: "Polish",
            native_name: "Polski",
            resource_suffix: "pl",
            is_source: false,
            enabled: true,
        },
        LocaleConfig {
            code: "uk",
            name: "Ukrainian",
            native_name: "Українська",
            resource_suffix: "uk",
            is_source: false,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LocaleRegistry::get();
        let registry2 = LocaleRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_english() {
        let registry = LocaleRegistry::get();
        let config = registry.get_by_code("en").expect("en should exist");

        assert_eq!(config.code, "en");
        assert_eq!(config.name, "English");
        assert!(config.is_source);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_region_qualified() {
        let registry = LocaleRegistry::get();
        let config = registry.get_by_code("zh-CN").expect("zh-CN should exist");

        assert_eq!(config.resource_suffix, "zh-rCN");
        assert!(!config.is_source);
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        let registry = LocaleRegistry::get();
        assert!(registry.get_by_code("tlh").is_none());
    }

    #[test]
    fn test_list_enabled_has_twenty_locales() {
        let registry = LocaleRegistry::get();
        assert_eq!(registry.list_enabled().len(), 20);
    }

    #[test]
    fn test_list_targets_excludes_source() {
        let registry = LocaleRegistry::get();
        let targets = registry.list_targets();

        assert_eq!(targets.len(), 19);
        assert!(!targets.iter().any(|locale| locale.code == "en"));
        assert!(targets.iter().any(|locale| locale.code == "uk"));
    }

    #[test]
    fn test_source_is_english() {
        let registry = LocaleRegistry::get();
        let source = registry.source();

        assert_eq!(source.code, "en");
        assert!(source.is_source);
    }

    #[test]
    fn test_is_enabled() {
        let registry = LocaleRegistry::get();
        assert!(registry.is_enabled("pt-BR"));
        assert!(!registry.is_enabled("eo"));
    }

    #[test]
    fn test_resource_suffixes_are_unique() {
        let registry = LocaleRegistry::get();
        let mut suffixes: Vec<_> = registry
            .list_enabled()
            .iter()
            .map(|locale| locale.resource_suffix)
            .collect();
        suffixes.sort_unstable();
        suffixes.dedup();

        assert_eq!(suffixes.len(), 20);
    }
}

//! Locale type: validated locale representation.
//!
//! A `Locale` can only be constructed from a code the registry knows and has
//! enabled, so the rest of the pipeline never handles unknown codes.

use crate::i18n::{LocaleConfig, LocaleRegistry};
use anyhow::{bail, Result};

/// A validated locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locale {
    code: &'static str,
}

impl Locale {
    /// Create a Locale from a locale code string.
    ///
    /// # Returns
    /// * `Ok(Locale)` if the code is known and the locale is enabled
    /// * `Err` if the code is unknown or the locale is disabled
    pub fn from_code(code: &str) -> Result<Locale> {
        let registry = LocaleRegistry::get();

        match registry.get_by_code(code) {
            Some(config) if config.enabled => Ok(Locale {
                code: config.code, // use the static str from the registry
            }),
            Some(_) => bail!("Locale '{}' is not enabled", code),
            None => bail!("Unknown locale code: '{}'", code),
        }
    }

    /// Get the source locale (the locale translations are derived from).
    pub fn source() -> Locale {
        let config = LocaleRegistry::get().source();
        Locale { code: config.code }
    }

    /// All enabled translation targets, in registry order.
    pub fn all_targets() -> Vec<Locale> {
        LocaleRegistry::get()
            .list_targets()
            .into_iter()
            .map(|config| Locale { code: config.code })
            .collect()
    }

    /// Parse a comma-separated list of locale codes into targets.
    ///
    /// The source locale is rejected: it holds the authoritative text and is
    /// never a translation target.
    pub fn parse_targets(codes: &str) -> Result<Vec<Locale>> {
        let mut targets = Vec::new();
        for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let locale = Locale::from_code(code)?;
            if locale.is_source() {
                bail!(
                    "'{}' is the source locale and cannot be a translation target",
                    code
                );
            }
            if !targets.contains(&locale) {
                targets.push(locale);
            }
        }
        if targets.is_empty() {
            bail!("No target locales specified");
        }
        Ok(targets)
    }

    /// Get the locale code (e.g., "zh-CN").
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full locale configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is not found in the registry, which cannot happen
    /// for a `Locale` constructed through `from_code`.
    pub fn config(&self) -> &'static LocaleConfig {
        LocaleRegistry::get()
            .get_by_code(self.code)
            .expect("Locale code should always be valid")
    }

    /// Get the English name of the locale.
    pub fn name(&self) -> &'static str {
        self.config().name
    }

    /// Get the resource-directory suffix (e.g., "zh-rCN").
    pub fn resource_suffix(&self) -> &'static str {
        self.config().resource_suffix
    }

    /// Check if this is the source locale.
    pub fn is_source(&self) -> bool {
        self.config().is_source
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known() {
        let locale = Locale::from_code("ja").expect("ja is registered");
        assert_eq!(locale.code(), "ja");
        assert_eq!(locale.name(), "Japanese");
    }

    #[test]
    fn test_from_code_unknown() {
        assert!(Locale::from_code("tlh").is_err());
        assert!(Locale::from_code("").is_err());
    }

    #[test]
    fn test_source_is_english() {
        assert_eq!(Locale::source().code(), "en");
        assert!(Locale::source().is_source());
    }

    #[test]
    fn test_all_targets_excludes_source() {
        let targets = Locale::all_targets();
        assert_eq!(targets.len(), 19);
        assert!(!targets.iter().any(Locale::is_source));
    }

    #[test]
    fn test_resource_suffix_mapping() {
        assert_eq!(Locale::from_code("zh-TW").unwrap().resource_suffix(), "zh-rTW");
        assert_eq!(Locale::from_code("pt-BR").unwrap().resource_suffix(), "pt-rBR");
        assert_eq!(Locale::from_code("de").unwrap().resource_suffix(), "de");
    }

    #[test]
    fn test_parse_targets_list() {
        let targets = Locale::parse_targets("ru, fr,es").expect("valid list");
        let codes: Vec<_> = targets.iter().map(Locale::code).collect();
        assert_eq!(codes, vec!["ru", "fr", "es"]);
    }

    #[test]
    fn test_parse_targets_dedups() {
        let targets = Locale::parse_targets("fr,fr,de").expect("valid list");
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_parse_targets_rejects_source() {
        assert!(Locale::parse_targets("en,fr").is_err());
    }

    #[test]
    fn test_parse_targets_rejects_empty() {
        assert!(Locale::parse_targets("").is_err());
        assert!(Locale::parse_targets(" , ").is_err());
    }

    #[test]
    fn test_locale_is_copy_and_ord() {
        let a = Locale::from_code("de").unwrap();
        let b = a;
        assert_eq!(a, b);

        let mut locales = vec![
            Locale::from_code("uk").unwrap(),
            Locale::from_code("ar").unwrap(),
        ];
        locales.sort();
        assert_eq!(locales[0].code(), "ar");
    }

    #[test]
    fn test_display_uses_code() {
        let locale = Locale::from_code("ko").unwrap();
        assert_eq!(format!("{}", locale), "ko");
    }
}

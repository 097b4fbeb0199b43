use std::path::PathBuf;

use anyhow::Result;

use crate::provider::Provider;

#[derive(Debug, Clone)]
pub struct Config {
    // Provider selection
    pub provider: Provider,

    // OpenAI
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,

    // Anthropic
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_api_url: String,

    // Project layout
    pub project: String,
    pub i18n_dir: PathBuf,
    pub metadata_subdir: String,
    pub res_dir: PathBuf,

    // Dispatch
    pub concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            provider: std::env::var("AI_TRANSLATION_PROVIDER")
                .unwrap_or_else(|_| "openai".to_string())
                .parse()?,

            // OpenAI (key only required when the provider is selected)
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),

            // Anthropic
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            anthropic_model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-3-opus-20240229".to_string()),
            anthropic_api_url: std::env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),

            // Project layout
            project: std::env::var("I18N_PROJECT").unwrap_or_else(|_| "Dive SMS".to_string()),
            i18n_dir: std::env::var("I18N_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("i18n")),
            metadata_subdir: std::env::var("I18N_METADATA_SUBDIR")
                .unwrap_or_else(|_| "metadata".to_string()),
            res_dir: std::env::var("I18N_RES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("res")),

            // Dispatch
            concurrency: std::env::var("TRANSLATION_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
        })
    }

    /// Path of the source locale's strings file.
    pub fn source_strings_path(&self) -> PathBuf {
        self.res_dir.join("values").join("strings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            provider: Provider::OpenAi,
            openai_api_key: Some("test-key".to_string()),
            openai_model: "gpt-4o".to_string(),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-opus-20240229".to_string(),
            anthropic_api_url: "https://api.anthropic.com/v1/messages".to_string(),
            project: "Test".to_string(),
            i18n_dir: PathBuf::from("i18n"),
            metadata_subdir: "metadata".to_string(),
            res_dir: PathBuf::from("res"),
            concurrency: 4,
        }
    }

    #[test]
    fn test_source_strings_path() {
        let config = test_config();
        assert_eq!(
            config.source_strings_path(),
            PathBuf::from("res/values/strings.json")
        );
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = test_config();
        let cloned = config.clone();
        assert_eq!(cloned.project, "Test");
        assert_eq!(cloned.concurrency, 4);
    }
}

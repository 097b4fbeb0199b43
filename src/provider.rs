//! Translation service providers.
//!
//! The pipeline talks to an opaque `TranslationService`: one prompt in, one
//! locale -> text mapping out. Concrete providers are selected by
//! configuration at construction time, never by runtime introspection inside
//! the session logic.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::i18n::Locale;
use crate::prompt;
use crate::retry::{with_retry_if, RetryConfig};

/// A provider response: locale code -> translated text.
pub type LocaleTexts = BTreeMap<String, String>;

/// An opaque multi-locale translation service.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translate one prompt into every target locale.
    async fn translate(&self, prompt: &str) -> Result<LocaleTexts>;

    fn name(&self) -> &'static str;
}

/// Which provider backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => bail!("Unknown translation provider '{}'", other),
        }
    }
}

/// Build the configured translation service.
pub fn create_service(config: &Config, targets: &[Locale]) -> Result<Box<dyn TranslationService>> {
    let target_codes: Vec<String> = targets
        .iter()
        .map(|locale| locale.code().to_string())
        .collect();

    match config.provider {
        Provider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY not set")?;
            Ok(Box::new(OpenAiService {
                client: reqwest::Client::new(),
                api_url: config.openai_api_url.clone(),
                api_key,
                model: config.openai_model.clone(),
                target_codes,
            }))
        }
        Provider::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .context("ANTHROPIC_API_KEY not set")?;
            Ok(Box::new(AnthropicService {
                client: reqwest::Client::new(),
                api_url: config.anthropic_api_url.clone(),
                api_key,
                model: config.anthropic_model.clone(),
                target_codes,
            }))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

// ==================== OpenAI ====================

/// OpenAI chat completions with strict JSON-schema structured output.
pub struct OpenAiService {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    target_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl OpenAiService {
    pub fn new(api_url: &str, api_key: &str, model: &str, targets: &[Locale]) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            target_codes: targets.iter().map(|l| l.code().to_string()).collect(),
        }
    }

    /// Strict JSON schema with one required string property per target
    /// locale, so the response never needs repair.
    fn response_format(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for code in &self.target_codes {
            properties.insert(code.clone(), serde_json::json!({ "type": "string" }));
        }

        serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": "translations",
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": properties,
                    "required": self.target_codes,
                    "additionalProperties": false
                }
            }
        })
    }
}

#[async_trait]
impl TranslationService for OpenAiService {
    async fn translate(&self, user_prompt: &str) -> Result<LocaleTexts> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: prompt::system_prompt().to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_completion_tokens: 2000,
            temperature: Some(0.3),
            response_format: self.response_format(),
        };

        let content = with_retry_if(
            &RetryConfig::api_call(),
            "OpenAI translation",
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to send translation request to OpenAI API")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    anyhow::bail!("OpenAI API error ({}): {}", status, body);
                }

                let chat_response: ChatResponse = response
                    .json()
                    .await
                    .context("Failed to parse OpenAI translation response")?;

                chat_response
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .context("OpenAI translation response contained no choices")
            },
            is_retryable_error,
        )
        .await?;

        parse_locale_texts(&content, &self.target_codes)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ==================== Anthropic ====================

/// Anthropic messages API; the JSON object is extracted from the first text
/// content block.
pub struct AnthropicService {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    target_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicService {
    pub fn new(api_url: &str, api_key: &str, model: &str, targets: &[Locale]) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            target_codes: targets.iter().map(|l| l.code().to_string()).collect(),
        }
    }
}

#[async_trait]
impl TranslationService for AnthropicService {
    async fn translate(&self, user_prompt: &str) -> Result<LocaleTexts> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 2000,
            system: prompt::system_prompt().to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            }],
        };

        let content = with_retry_if(
            &RetryConfig::api_call(),
            "Anthropic translation",
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to send translation request to Anthropic API")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    anyhow::bail!("Anthropic API error ({}): {}", status, body);
                }

                let messages_response: MessagesResponse = response
                    .json()
                    .await
                    .context("Failed to parse Anthropic translation response")?;

                messages_response
                    .content
                    .into_iter()
                    .find(|block| block.kind == "text")
                    .map(|block| block.text)
                    .context("Anthropic translation response contained no text block")
            },
            is_retryable_error,
        )
        .await?;

        parse_locale_texts(&content, &self.target_codes)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

// ==================== Shared parsing / retry policy ====================

/// Parse a provider's JSON payload into locale texts.
///
/// The payload may be wrapped in prose or a markdown fence; everything
/// outside the outermost braces is discarded. Locales missing from the
/// response are accepted with a warning, never treated as fatal.
fn parse_locale_texts(content: &str, expected: &[String]) -> Result<LocaleTexts> {
    let trimmed = content.trim();
    let json_str = if trimmed.starts_with('{') && trimmed.ends_with('}') {
        trimmed
    } else {
        let start = trimmed.find('{');
        let end = trimmed.rfind('}');
        match (start, end) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => bail!("Translation response contained no JSON object: {}", trimmed),
        }
    };

    let texts: LocaleTexts =
        serde_json::from_str(json_str).context("Failed to parse translation JSON object")?;

    let missing: Vec<&str> = expected
        .iter()
        .filter(|code| {
            texts
                .get(code.as_str())
                .map(|text| text.is_empty())
                .unwrap_or(true)
        })
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        warn!("Translation response missing locales: {}", missing.join(", "));
    }

    Ok(texts)
}

/// Determine if an error is retryable (5xx errors, 429 rate limit, network
/// errors). Other 4xx client errors are not retried.
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string();

    // Provider API errors carry the status in parentheses:
    // "OpenAI API error (400 Bad Request): ..."
    if error_str.contains("API error") {
        if let Some(start) = error_str.find('(') {
            if let Some(end) = error_str[start..].find(')') {
                let status_str = &error_str[start + 1..start + end];
                let status_num = status_str.split_whitespace().next().unwrap_or("");
                if let Ok(status) = status_num.parse::<u16>() {
                    return status == 429 || status >= 500;
                }
            }
        }
    }

    // Retry network errors, timeouts, and other transient failures
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn locales(list: &[&str]) -> Vec<Locale> {
        list.iter()
            .map(|code| Locale::from_code(code).expect("registered"))
            .collect()
    }

    fn openai_response(content: &Value) -> Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": content.to_string()
                    },
                    "finish_reason": "stop"
                }
            ]
        })
    }

    fn anthropic_response(content: &Value) -> Value {
        serde_json::json!({
            "id": "msg_123",
            "type": "message",
            "content": [
                { "type": "text", "text": content.to_string() }
            ]
        })
    }

    // ==================== parse_locale_texts Tests ====================

    #[test]
    fn test_parse_plain_json_object() {
        let texts =
            parse_locale_texts(r#"{"de": "Hallo", "fr": "Bonjour"}"#, &codes(&["de", "fr"]))
                .expect("parse");
        assert_eq!(texts["de"], "Hallo");
        assert_eq!(texts["fr"], "Bonjour");
    }

    #[test]
    fn test_parse_fenced_json_object() {
        let content = "Here you go:\n```json\n{\"de\": \"Hallo\"}\n```";
        let texts = parse_locale_texts(content, &codes(&["de"])).expect("parse");
        assert_eq!(texts["de"], "Hallo");
    }

    #[test]
    fn test_parse_partial_response_accepted() {
        let texts = parse_locale_texts(r#"{"de": "Hallo"}"#, &codes(&["de", "fr"]))
            .expect("partial responses are not fatal");
        assert_eq!(texts.len(), 1);
    }

    #[test]
    fn test_parse_no_json_is_error() {
        assert!(parse_locale_texts("sorry, I cannot", &codes(&["de"])).is_err());
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        assert!(parse_locale_texts(r#"{"de": 42}"#, &codes(&["de"])).is_err());
    }

    // ==================== is_retryable_error Tests ====================

    #[test]
    fn test_retryable_500() {
        let error = anyhow::anyhow!("OpenAI API error (500 Internal Server Error): boom");
        assert!(is_retryable_error(&error));
    }

    #[test]
    fn test_retryable_429() {
        let error = anyhow::anyhow!("Anthropic API error (429 Too Many Requests): slow down");
        assert!(is_retryable_error(&error));
    }

    #[test]
    fn test_not_retryable_400() {
        let error = anyhow::anyhow!("OpenAI API error (400 Bad Request): nope");
        assert!(!is_retryable_error(&error));
    }

    #[test]
    fn test_not_retryable_401() {
        let error = anyhow::anyhow!("Anthropic API error (401 Unauthorized): bad key");
        assert!(!is_retryable_error(&error));
    }

    #[test]
    fn test_network_errors_are_retryable() {
        let error = anyhow::anyhow!("Failed to send translation request: connection refused");
        assert!(is_retryable_error(&error));
    }

    // ==================== Provider Selection Tests ====================

    #[test]
    fn test_provider_from_str() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("Anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("llamafile".parse::<Provider>().is_err());
    }

    // ==================== OpenAI Service Tests ====================

    #[tokio::test]
    async fn test_openai_translate_success() {
        let mock_server = MockServer::start().await;
        let body = openai_response(&serde_json::json!({"de": "Senden", "fr": "Envoyer"}));

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&mock_server)
            .await;

        let service = OpenAiService::new(
            &format!("{}/v1/chat/completions", mock_server.uri()),
            "test-key",
            "gpt-4o",
            &locales(&["de", "fr"]),
        );

        let texts = service.translate("translate 'Send'").await.expect("translate");
        assert_eq!(texts["de"], "Senden");
        assert_eq!(texts["fr"], "Envoyer");
    }

    #[tokio::test]
    async fn test_openai_translate_retries_on_500() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        let body = openai_response(&serde_json::json!({"de": "Senden"}));
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&mock_server)
            .await;

        let service = OpenAiService::new(
            &format!("{}/v1/chat/completions", mock_server.uri()),
            "test-key",
            "gpt-4o",
            &locales(&["de"]),
        );

        let texts = service.translate("prompt").await.expect("succeed after retry");
        assert_eq!(texts["de"], "Senden");
    }

    #[tokio::test]
    async fn test_openai_translate_no_retry_on_400() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = OpenAiService::new(
            &format!("{}/v1/chat/completions", mock_server.uri()),
            "test-key",
            "gpt-4o",
            &locales(&["de"]),
        );

        let result = service.translate("prompt").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_openai_translate_empty_choices_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&mock_server)
            .await;

        let service = OpenAiService::new(
            &format!("{}/v1/chat/completions", mock_server.uri()),
            "test-key",
            "gpt-4o",
            &locales(&["de"]),
        );

        let result = service.translate("prompt").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no choices"));
    }

    #[test]
    fn test_openai_response_format_lists_all_targets() {
        let service = OpenAiService::new("http://unused", "k", "m", &locales(&["de", "ja"]));
        let format = service.response_format();
        let required = format["json_schema"]["schema"]["required"]
            .as_array()
            .expect("required array");
        assert_eq!(required.len(), 2);
        assert!(format["json_schema"]["schema"]["properties"]["ja"].is_object());
    }

    // ==================== Anthropic Service Tests ====================

    #[tokio::test]
    async fn test_anthropic_translate_success() {
        let mock_server = MockServer::start().await;
        let body = anthropic_response(&serde_json::json!({"es": "Enviar"}));

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&mock_server)
            .await;

        let service = AnthropicService::new(
            &format!("{}/v1/messages", mock_server.uri()),
            "test-key",
            "claude-3-opus-20240229",
            &locales(&["es"]),
        );

        let texts = service.translate("translate 'Send'").await.expect("translate");
        assert_eq!(texts["es"], "Enviar");
    }

    #[tokio::test]
    async fn test_anthropic_translate_no_text_block_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": []
            })))
            .mount(&mock_server)
            .await;

        let service = AnthropicService::new(
            &format!("{}/v1/messages", mock_server.uri()),
            "test-key",
            "claude-3-opus-20240229",
            &locales(&["es"]),
        );

        let result = service.translate("prompt").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no text block"));
    }
}

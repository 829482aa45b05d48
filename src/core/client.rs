//! Language-model backend client
//!
//! The backend is consumed through the [`LanguageModel`] trait. Failures are
//! reported once as `BackendFailure`; nothing here retries.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::TranslationMethod;
use crate::core::prompt::ChatMessage;

/// Instruction-following text completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a chat prompt with the given model, returning the reply text
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String>;
}

/// Run a backend call under a deadline; an elapsed deadline is a backend failure
pub async fn with_timeout<T, F>(backend: TranslationMethod, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(TranslationError::backend(
            backend,
            format!("request timed out after {} ms", limit.as_millis()),
        )),
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
}

impl OpenAiCompatibleClient {
    /// Create a new client
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            temperature: 0.2,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Pull the reply text out of a chat-completions response body
    fn parse_reply(json: &serde_json::Value) -> Result<String> {
        json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| TranslationError::backend(TranslationMethod::Llm, "no completion in response"))
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(TranslationError::backend(
                TranslationMethod::Llm,
                "no API key configured (set OPENAI_API_KEY)",
            ));
        }

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
        });

        debug!("Sending {} messages to {} ({})", messages.len(), self.completions_url(), model);

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::backend(TranslationMethod::Llm, e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| TranslationError::backend(TranslationMethod::Llm, format!("invalid response: {}", e)))?;

            Self::parse_reply(&json)
        } else {
            let status_code = status.as_u16();
            let error_text = response.text().await.unwrap_or_default();

            if status_code == 429 {
                return Err(TranslationError::backend(
                    TranslationMethod::Llm,
                    format!("rate limited or out of quota: {}", error_text),
                ));
            }

            Err(TranslationError::backend(
                TranslationMethod::Llm,
                format!("API error {}: {}", status_code, error_text),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  ବୁଦ୍ଧି \n"}}]
        });
        assert_eq!(OpenAiCompatibleClient::parse_reply(&json).unwrap(), "ବୁଦ୍ଧି");

        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            OpenAiCompatibleClient::parse_reply(&json),
            Err(TranslationError::BackendFailure { backend: TranslationMethod::Llm, .. })
        ));
    }

    #[test]
    fn test_completions_url_strips_trailing_slash() {
        let config = TranslatorConfig {
            llm_endpoint: "https://llm.example.com/v1/".to_string(),
            ..Default::default()
        };
        let client = OpenAiCompatibleClient::new(&config).unwrap();
        assert_eq!(client.completions_url(), "https://llm.example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = OpenAiCompatibleClient::new(&TranslatorConfig::default()).unwrap();
        let result = client.complete(&[ChatMessage::user("hi")], "gpt-4o-mini").await;
        assert!(matches!(result, Err(TranslationError::BackendFailure { .. })));
    }

    #[tokio::test]
    async fn test_timeout_becomes_backend_failure() {
        let result: Result<()> = with_timeout(TranslationMethod::Neural, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(TranslationError::BackendFailure { backend, message }) => {
                assert_eq!(backend, TranslationMethod::Neural);
                assert!(message.contains("timed out"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

use super::{LLMError, LLMProvider, Message, MessageRole};
use crate::config::AnthropicConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: AnthropicConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// System messages are lifted into the top-level `system` field; every
    /// other turn is sent as user or assistant content.
    fn build_payload(&self, messages: &[Message], max_tokens: u32) -> serde_json::Value {
        let mut system_prompt = String::new();
        let mut api_messages = Vec::new();
        for msg in messages {
            if msg.role == MessageRole::System {
                system_prompt.push_str(&msg.content);
                system_prompt.push('\n');
                continue;
            }
            api_messages.push(json!({
                "role": if msg.role == MessageRole::Assistant { "assistant" } else { "user" },
                "content": msg.content
            }));
        }

        json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "system": system_prompt.trim_end(),
            "messages": api_messages,
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_local(&self) -> bool {
        false
    }

    /// Lists models, which needs a valid key but spends no tokens.
    async fn check_health(&self) -> bool {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => true,
            Ok(r) => {
                tracing::debug!("Anthropic health check returned {}", r.status());
                false
            }
            Err(e) => {
                tracing::debug!("Anthropic health check failed: {}", e);
                false
            }
        }
    }

    async fn generate(&self, messages: &[Message], max_tokens: u32) -> super::Result<String> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let payload = self.build_payload(messages, max_tokens);

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                500..=599 => LLMError::ProviderUnavailable(format!(
                    "Anthropic API error ({}): {}",
                    status, text
                )),
                _ => LLMError::InvalidRequest(text),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content_arr = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::ParseError("No content array in response".to_string()))?;

        let mut full_content = String::new();
        for item in content_arr {
            if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                full_content.push_str(text);
            }
        }

        tracing::debug!(
            "Anthropic response: {} chars in {:.1}s",
            full_content.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(full_content)
    }
}

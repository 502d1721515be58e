use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clients::traits::{ChatMessage, LanguageModel};
use crate::config::{Config, LlmProvider};
use crate::error::{Result, SavantError};

/// OpenAI-compatible chat completions client
pub struct OpenAiChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    attempts: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub(crate) fn is_placeholder_key(key: &str) -> bool {
    let t = key.trim();
    t.is_empty()
        || t.contains("${")
        || t.eq_ignore_ascii_case("your-api-key-here")
        || t.eq_ignore_ascii_case("your_api_key_here")
        || t.eq_ignore_ascii_case("changeme")
}

/// Join the base URL with the chat completions path unless it already ends with it.
pub(crate) fn chat_endpoint(base_url: &str) -> String {
    if base_url.ends_with("/chat/completions") {
        base_url.to_string()
    } else {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}

/// Pause after failed attempt `attempt`; `None` when no attempt follows
fn retry_delay(attempt: u32, attempts: u32) -> Option<Duration> {
    (attempt + 1 < attempts).then(|| Duration::from_millis(200u64 * (1u64 << attempt)))
}

impl OpenAiChatModel {
    pub fn new(api_key: String, config: &crate::config::LlmConfig) -> Result<Self> {
        let (_, model) = config.provider_and_model()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SavantError::Config {
                message: format!("Failed to build reqwest client with timeout: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.base_url),
            api_key,
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            attempts: config.retries.max(1),
        })
    }

    async fn backoff(&self, attempt: u32) {
        if let Some(delay) = retry_delay(attempt, self.attempts) {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if is_placeholder_key(&self.api_key) {
            return Err(SavantError::Llm {
                message: "OPENAI_API_KEY is not set".into(),
            });
        }

        debug!(
            "Calling chat completions (model={}, messages={})",
            self.model,
            messages.len()
        );

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        // Retry with simple exponential backoff
        let mut last_err: Option<SavantError> = None;
        for i in 0..self.attempts {
            let response = match self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("chat completion attempt {} failed: {}", i + 1, e);
                    last_err = Some(e.into());
                    self.backoff(i).await;
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                last_err = Some(SavantError::Llm {
                    message: format!("chat completions error {}: {}", status, error_text),
                });
                // Client errors other than rate limiting will not improve on retry
                if status.is_client_error() && status.as_u16() != 429 {
                    break;
                }
                self.backoff(i).await;
                continue;
            }

            match response.json::<ChatResponse>().await {
                Ok(parsed) => {
                    return parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message.content)
                        .map(|c| c.trim().to_string())
                        .ok_or_else(|| SavantError::Llm {
                            message: "No completion returned from chat completions".into(),
                        });
                }
                Err(e) => {
                    last_err = Some(SavantError::Llm {
                        message: format!("Failed to parse chat completions response: {}", e),
                    });
                    self.backoff(i).await;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SavantError::Llm {
            message: "Unknown chat completions error".into(),
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory function to create the configured language model
pub fn create_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let (provider, model) = config.llm.provider_and_model()?;
    match provider {
        LlmProvider::OpenAi => {
            let key = config.runtime.openai_api_key.clone().unwrap_or_default();
            if is_placeholder_key(&key) {
                warn!("OPENAI_API_KEY is not set; LLM calls will fail until it is configured");
            }
            info!(
                "Using chat completions at {} (model={})",
                config.llm.base_url, model
            );
            Ok(Arc::new(OpenAiChatModel::new(key, &config.llm)?))
        }
    }
}

//! OpenAI-compatible text-generation backend
//!
//! Implements the TextGenerator trait against a Chat Completions API with
//! bounded retry on transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;

use super::{BackendError, TextGenerator};

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Chat Completions API client
pub struct OpenAIGenerator {
    api_key: String,
    base_url: String,
    http: Client,
    default_model: String,
    max_tokens: u32,
}

impl OpenAIGenerator {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, BackendError> {
        debug!(base_url = %config.base_url, model = %config.model, "from_config: called");
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            BackendError::InvalidResponse(format!("API key not found in environment variable {}", config.api_key_env))
        })?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(BackendError::Network)?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            http,
            default_model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the Chat Completions API
    fn build_request_body(&self, prompt: &str, model: &str, max_tokens: u32, temperature: f64) -> serde_json::Value {
        let model = if model.is_empty() { &self.default_model } else { model };
        let max_tokens = max_tokens.min(self.max_tokens);
        debug!(%model, max_tokens, "build_request_body: called");

        serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": temperature,
        })
    }

    /// Extract the first choice's text from the API response
    fn parse_response(&self, api_response: ChatResponse) -> Result<String, BackendError> {
        debug!(choice_count = api_response.choices.len(), "parse_response: called");
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("Empty completion response".to_string()))
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, BackendError> {
        debug!(prompt_len = prompt.len(), "generate: called");
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(prompt, model, max_tokens, temperature);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "generate: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "generate: network error");
                    last_error = Some(BackendError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                debug!("generate: rate limited (429)");
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);

                return Err(BackendError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                });
            }

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "generate: retryable error");
                last_error = Some(BackendError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "generate: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(BackendError::ApiError { status, message: text });
            }

            debug!("generate: success");
            let api_response: ChatResponse = response.json().await?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| BackendError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

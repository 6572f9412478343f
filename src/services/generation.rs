//! Answer-generation client (Mistral chat completions).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GenerationError;
use crate::models::SearchbotConfig;
use crate::utils::retry::{RetryConfig, with_retry};

/// Environment variable holding the API key. Read once at construction,
/// never from persisted configuration.
pub const MISTRAL_API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Opaque completion service consumed by the query pipeline.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completions client for the Mistral API.
///
/// A missing key is not an error at construction; it surfaces as
/// `Authentication` on the first completion call.
pub struct MistralClient {
    client: Client,
    api_base: String,
    model_name: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    retry: RetryConfig,
}

impl MistralClient {
    pub fn new(config: &SearchbotConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Connection(e.to_string()))?;

        let api_key = std::env::var(MISTRAL_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryConfig::default(),
        })
    }

    /// Override the environment-sourced API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, prompt: &str, api_key: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GenerationError::Authentication(format!(
                "generation endpoint rejected the API key (status {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl GenerationService for MistralClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::Authentication(format!("{} is not set", MISTRAL_API_KEY_ENV))
        })?;

        with_retry(&self.retry, || self.request(prompt, api_key))
            .await
            .map_err(|exhausted| match exhausted.last_error {
                err @ GenerationError::Authentication(_) => err,
                err => GenerationError::Unavailable(format!(
                    "after {} attempts: {}",
                    exhausted.attempts, err
                )),
            })
    }
}

//! Remote embedding provider backed by the Gemini embedding API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EmbedPurpose, Embedder, EmbedderKind};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Environment variable holding the API key. Read once at construction,
/// never from persisted configuration.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Client for a remote `:embedContent`-style embedding endpoint.
///
/// A missing key is not an error at construction: it surfaces as
/// `Authentication` on first use, so offline commands keep working.
pub struct RemoteEmbedder {
    client: Client,
    api_base: String,
    model_name: String,
    api_key: Option<String>,
    dimension: usize,
}

impl RemoteEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;

        let api_key = std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            api_key,
            dimension: config.dimension as usize,
        })
    }

    /// Override the environment-sourced API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn embed_one(
        &self,
        text: &str,
        task_type: &'static str,
        api_key: &str,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.api_base, self.model_name, api_key
        );
        let request = EmbedContentRequest {
            model: format!("models/{}", self.model_name),
            content: Content {
                parts: vec![Part { text }],
            },
            task_type,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EmbeddingError::Authentication(format!(
                "embedding endpoint rejected the API key (status {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn kind(&self) -> EmbedderKind {
        EmbedderKind::Remote
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EmbeddingError::Authentication(format!("{} is not set", GEMINI_API_KEY_ENV))
        })?;

        let task_type = match purpose {
            EmbedPurpose::Document => "RETRIEVAL_DOCUMENT",
            EmbedPurpose::Query => "RETRIEVAL_QUERY",
        };

        // The endpoint embeds one content item per call
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text, task_type, api_key).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::retry::Retryable;
    use mockito::Matcher;

    fn test_config(api_base: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            api_base: api_base.to_string(),
            model_name: "test-embed".to_string(),
            dimension: 4,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let embedder = RemoteEmbedder::new(&test_config("http://localhost:1"))
            .unwrap()
            .with_api_key(None);

        let err = embedder
            .embed(&["hello".to_string()], EmbedPurpose::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_successful_embedding() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/test-embed:embedContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"embedding": {"values": [0.1, 0.2, 0.3, 0.4]}}"#)
            .expect(2)
            .create_async()
            .await;

        let embedder = RemoteEmbedder::new(&test_config(&server.url()))
            .unwrap()
            .with_api_key(Some("test-key".to_string()));

        let vectors = embedder
            .embed(
                &["one".to_string(), "two".to_string()],
                EmbedPurpose::Document,
            )
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3, 0.4]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/test-embed:embedContent")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": "invalid key"}"#)
            .create_async()
            .await;

        let embedder = RemoteEmbedder::new(&test_config(&server.url()))
            .unwrap()
            .with_api_key(Some("bad-key".to_string()));

        let err = embedder
            .embed(&["hello".to_string()], EmbedPurpose::Query)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::Authentication(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/test-embed:embedContent")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let embedder = RemoteEmbedder::new(&test_config(&server.url()))
            .unwrap()
            .with_api_key(Some("test-key".to_string()));

        let err = embedder
            .embed(&["hello".to_string()], EmbedPurpose::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::Server { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/test-embed:embedContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let embedder = RemoteEmbedder::new(&test_config(&server.url()))
            .unwrap()
            .with_api_key(Some("test-key".to_string()));

        let err = embedder
            .embed(&["hello".to_string()], EmbedPurpose::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_base_url_trimming() {
        let embedder =
            RemoteEmbedder::new(&test_config("http://localhost:9999/")).unwrap();
        assert_eq!(embedder.api_base(), "http://localhost:9999");
    }
}

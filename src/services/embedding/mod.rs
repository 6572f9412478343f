//! Embedding providers.
//!
//! A single `Embedder` capability with two variants (remote API, local ONNX
//! model) composed by a failover wrapper. Vectors from different variants
//! live in different embedding spaces; mixing them inside one collection is
//! prevented downstream by the store's dimension guard.

mod local;
mod remote;

pub use local::LocalEmbedder;
pub use remote::{GEMINI_API_KEY_ENV, RemoteEmbedder};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryConfig, RetryExhausted, with_retry};

/// Which provider variant produced a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Remote,
    Local,
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedderKind::Remote => write!(f, "remote"),
            EmbedderKind::Local => write!(f, "local"),
        }
    }
}

/// What the embedding will be used for. Retrieval models treat documents
/// and queries differently (instruction prefix locally, task type remotely).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPurpose {
    Document,
    Query,
}

/// Converts text to fixed-dimension vectors, one per input, same order.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn kind(&self) -> EmbedderKind;

    /// Vector dimension this provider produces.
    fn dimension(&self) -> usize;

    async fn embed(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Composes a primary embedder with an optional fallback.
///
/// The primary is retried with bounded backoff; once exhausted (or rejected
/// outright on an authentication failure) the wrapper pins itself to the
/// fallback for the rest of the process lifetime, so a run never alternates
/// between embedding spaces. Without a fallback, authentication failures
/// propagate as-is and everything else surfaces as `Unavailable`.
pub struct FailoverEmbedder {
    primary: Arc<dyn Embedder>,
    fallback: Option<Arc<dyn Embedder>>,
    retry: RetryConfig,
    degraded: AtomicBool,
}

impl FailoverEmbedder {
    pub fn new(primary: Arc<dyn Embedder>, fallback: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            primary,
            fallback,
            retry: RetryConfig::default(),
            degraded: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// True once the wrapper has switched to the fallback.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn active(&self) -> &Arc<dyn Embedder> {
        if self.is_degraded()
            && let Some(fallback) = &self.fallback
        {
            return fallback;
        }
        &self.primary
    }
}

#[async_trait]
impl Embedder for FailoverEmbedder {
    fn kind(&self) -> EmbedderKind {
        self.active().kind()
    }

    fn dimension(&self) -> usize {
        self.active().dimension()
    }

    async fn embed(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if self.is_degraded()
            && let Some(fallback) = &self.fallback
        {
            return fallback.embed(texts, purpose).await;
        }

        match with_retry(&self.retry, || self.primary.embed(texts, purpose)).await {
            Ok(vectors) => Ok(vectors),
            Err(RetryExhausted {
                last_error,
                attempts,
            }) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        error = %last_error,
                        attempts,
                        "primary embedder unavailable, switching to local fallback"
                    );
                    self.degraded.store(true, Ordering::Release);
                    fallback.embed(texts, purpose).await
                }
                None => match last_error {
                    err @ EmbeddingError::Authentication(_) => Err(err),
                    err => Err(EmbeddingError::Unavailable {
                        attempts,
                        last_error: err.to_string(),
                    }),
                },
            },
        }
    }
}

/// Build the embedding stack from configuration.
///
/// The remote provider is always the primary; the local model is attached
/// as fallback when enabled and loadable. A fallback that fails to load is
/// reported and skipped, matching the behavior of running without one.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<FailoverEmbedder>, EmbeddingError> {
    let primary: Arc<dyn Embedder> = Arc::new(RemoteEmbedder::new(config)?);

    let fallback: Option<Arc<dyn Embedder>> = if config.use_local_fallback {
        let model_dir = resolve_local_model_dir(&config.local_embedding_model);
        match LocalEmbedder::load(
            &model_dir,
            config.local_dimension as usize,
            config.max_tokens as usize,
        ) {
            Ok(local) => Some(Arc::new(local)),
            Err(err) => {
                warn!(
                    model_dir = %model_dir.display(),
                    error = %err,
                    "local fallback model unavailable, continuing without fallback"
                );
                None
            }
        }
    } else {
        None
    };

    Ok(Arc::new(FailoverEmbedder::new(primary, fallback)))
}

/// Resolve a configured model name to a directory holding `model.onnx` and
/// `tokenizer.json`. Absolute or existing paths are taken verbatim; bare
/// names resolve under the data directory.
fn resolve_local_model_dir(name: &str) -> PathBuf {
    let as_path = PathBuf::from(name);
    if as_path.is_absolute() || as_path.is_dir() {
        return as_path;
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docqa")
        .join("models")
        .join(name)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// Always succeeds, returning constant vectors of the given dimension.
    pub struct StaticEmbedder {
        pub kind: EmbedderKind,
        pub dimension: usize,
        pub value: f32,
        pub calls: AtomicU32,
    }

    impl StaticEmbedder {
        pub fn new(kind: EmbedderKind, dimension: usize, value: f32) -> Self {
            Self {
                kind,
                dimension,
                value,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for StaticEmbedder {
        fn kind(&self) -> EmbedderKind {
            self.kind
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(
            &self,
            texts: &[String],
            _purpose: EmbedPurpose,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|_| vec![self.value; self.dimension])
                .collect())
        }
    }

    /// Always fails with the error produced by the factory.
    pub struct FailingEmbedder<F: Fn() -> EmbeddingError + Send + Sync> {
        pub error: F,
        pub calls: AtomicU32,
    }

    impl<F: Fn() -> EmbeddingError + Send + Sync> FailingEmbedder<F> {
        pub fn new(error: F) -> Self {
            Self {
                error,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl<F: Fn() -> EmbeddingError + Send + Sync> Embedder for FailingEmbedder<F> {
        fn kind(&self) -> EmbedderKind {
            EmbedderKind::Remote
        }

        fn dimension(&self) -> usize {
            3072
        }

        async fn embed(
            &self,
            _texts: &[String],
            _purpose: EmbedPurpose,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
    }
}

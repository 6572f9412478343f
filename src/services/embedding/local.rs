//! Local embedding provider running an ONNX sentence-transformer offline.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{EmbedPurpose, Embedder, EmbedderKind};
use crate::error::EmbeddingError;

const QUERY_INSTRUCTION: &str =
    "Instruct: Given a search query, retrieve relevant passages\nQuery: ";

/// Offline fallback embedder: ONNX session plus tokenizer loaded from a
/// model directory containing `model.onnx` and `tokenizer.json`.
#[derive(Debug)]
pub struct LocalEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

impl LocalEmbedder {
    pub fn load(
        model_dir: &Path,
        dimension: usize,
        max_tokens: usize,
    ) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbeddingError::Model(format!(
                "local model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?
            .with_intra_threads(available_threads())
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        // Truncate long inputs instead of blowing the model's sequence limit
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension,
        })
    }

    fn run(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            for (j, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = m as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::Model("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                input_ids_tensor,
                attention_mask_tensor,
                token_type_ids_tensor
            ])
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;

        let shape = output_array.shape();

        let embeddings: Vec<Vec<f32>> = if shape.len() == 3 {
            // Token-level output: masked mean pooling over the sequence
            (0..batch_size)
                .map(|i| {
                    let mut pooled = vec![0.0f32; self.dimension];
                    let mut token_count = 0.0f32;
                    for j in 0..max_len {
                        if attention_mask[i * max_len + j] == 0 {
                            continue;
                        }
                        token_count += 1.0;
                        for (d, value) in pooled.iter_mut().enumerate() {
                            *value += output_array[[i, j, d]];
                        }
                    }
                    if token_count > 0.0 {
                        for value in &mut pooled {
                            *value /= token_count;
                        }
                    }
                    normalize(&pooled)
                })
                .collect()
        } else if shape.len() == 2 {
            // Already pooled sentence embeddings
            (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..self.dimension).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect()
        } else {
            return Err(EmbeddingError::Model(format!(
                "unexpected output shape: {:?}",
                shape
            )));
        };

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn kind(&self) -> EmbedderKind {
        EmbedderKind::Local
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let processed: Vec<String> = match purpose {
            EmbedPurpose::Query => texts
                .iter()
                .map(|t| format!("{}{}", QUERY_INSTRUCTION, t))
                .collect(),
            EmbedPurpose::Document => texts.to_vec(),
        };

        self.run(&processed)
    }
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

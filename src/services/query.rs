//! Query pipeline: retrieval, prompt assembly, answer generation.

use std::sync::Arc;

use tracing::debug;

use crate::error::QueryError;
use crate::models::Answer;
use crate::services::generation::GenerationService;
use crate::services::retriever::Retriever;

/// Answers questions from indexed documents.
pub struct QueryPipeline {
    retriever: Retriever,
    generator: Arc<dyn GenerationService>,
}

impl QueryPipeline {
    pub fn new(retriever: Retriever, generator: Arc<dyn GenerationService>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Retrieve relevant context and generate an answer.
    ///
    /// With an empty context the generation call is bypassed entirely and
    /// the fixed insufficient-context answer is returned; "no relevant
    /// documents" is never an error here.
    pub async fn answer_question(
        &self,
        question: &str,
        collection: &str,
        k: usize,
        max_context_chars: usize,
    ) -> Result<Answer, QueryError> {
        let context = self
            .retriever
            .retrieve(collection, question, k, max_context_chars)
            .await?;

        if context.is_empty() {
            debug!(collection, "no usable context, skipping generation");
            return Ok(Answer::insufficient_context());
        }

        let prompt = build_prompt(question, &context.text);
        let text = self.generator.complete(&prompt).await?;

        Ok(Answer {
            text,
            attributions: context.attributions,
            answered: true,
        })
    }
}

fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions based on the provided information.\n\n\
         Context information:\n{context}\n\n\
         User question: {question}\n\n\
         Answer the question based only on the provided context. If the context does not \
         contain relevant information to answer the question, say so clearly.\n\nAnswer:"
    )
}

//! Retrieval results, assembled context, and answers.

use serde::{Deserialize, Serialize};

/// Fixed answer returned when retrieval produces no usable context.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information to answer your question.";

/// Why an assembled context came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The collection produced zero candidates (empty or nonexistent).
    NoResults,
}

/// Source attribution for one chunk that made it into the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub source_id: String,
    pub source_path: String,
    pub chunk_index: u32,
    pub score: f32,
}

/// Bounded concatenation of retrieved chunk texts, ready for prompting.
///
/// Ephemeral: built per query and consumed immediately by generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub attributions: Vec<Attribution>,
    pub reason: Option<EmptyReason>,
}

impl AssembledContext {
    pub fn empty(reason: EmptyReason) -> Self {
        Self {
            text: String::new(),
            attributions: Vec::new(),
            reason: Some(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Context length in characters, the unit the budget is expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Final answer from the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub attributions: Vec<Attribution>,
    /// False when generation was bypassed for lack of context.
    pub answered: bool,
}

impl Answer {
    pub fn insufficient_context() -> Self {
        Self {
            text: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
            attributions: Vec::new(),
            answered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_carries_reason() {
        let context = AssembledContext::empty(EmptyReason::NoResults);
        assert!(context.is_empty());
        assert_eq!(context.reason, Some(EmptyReason::NoResults));
        assert!(context.attributions.is_empty());
    }

    #[test]
    fn test_insufficient_context_answer() {
        let answer = Answer::insufficient_context();
        assert!(!answer.answered);
        assert_eq!(answer.text, INSUFFICIENT_CONTEXT_ANSWER);
    }

    #[test]
    fn test_empty_reason_serializes_snake_case() {
        let json = serde_json::to_string(&EmptyReason::NoResults).unwrap();
        assert_eq!(json, "\"no_results\"");
    }
}

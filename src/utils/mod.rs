//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{calculate_checksum, extract_text, is_supported_document};
pub use retry::{RetryConfig, RetryExhausted, Retryable, with_retry};

//! Client side of the external language model.
//!
//! The model is an opaque collaborator: it takes a prompt (optionally with
//! an image) under a session identifier and returns text. Timeouts and
//! retries are left to the provider.

use async_trait::async_trait;
use pulsefit_core::ai::AiTask;

mod openai;

pub use openai::OpenAiClient;

/// Longest slice of an error body kept in `ModelError::Status`.
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("LLM API key is not configured")]
    MissingApiKey,
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be decoded: {0}")]
    Decode(String),
    #[error("model returned no completion")]
    EmptyCompletion,
}

impl ModelError {
    fn status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the task's prompt and return the raw completion text.
    async fn send(&self, task: &AiTask) -> Result<String, ModelError>;
}

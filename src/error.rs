use thiserror::Error;

use crate::api_connection::connection::ApiConnectionError;

/// Errors raised by a food-composition provider. The chain never lets these escape.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error talking to {provider}: {message}")]
    Network { provider: String, message: String },
    #[error("{provider} returned HTTP {status}: {body}")]
    Http { provider: String, status: u16, body: String },
    #[error("malformed response from {provider}: {message}")]
    Malformed { provider: String, message: String },
    #[error("{provider} has no food with id {id}")]
    NotFound { provider: String, id: String },
}

/// Failures of a meal-idea source. Never fatal: the pipeline falls back instead.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("meal-idea API call failed: {0}")]
    Api(#[from] ApiConnectionError),
    #[error("could not parse meal ideas: {0}")]
    Parse(String),
    #[error("meal ideas failed schema validation: {0}")]
    Schema(String),
}

/// Fatal pipeline errors. No partial plan is returned alongside these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid meal plan draft: {0}")]
    InvalidDraft(String),
    #[error("invalid compiled meal plan: {0}")]
    InvalidCompiledPlan(String),
    #[error("concurrency limiter closed: {0}")]
    Limiter(String),
}

/// Raised by the export step, distinct from core pipeline errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("plan exceeds render limit: {what} is {actual}, maximum is {max}")]
    LimitExceeded { what: String, actual: usize, max: usize },
    #[error("failed to write rendered plan: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize plan: {0}")]
    Serialization(#[from] serde_json::Error),
}

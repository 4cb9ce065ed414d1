pub mod connection;
pub mod endpoints;
pub mod retry;

pub use connection::ApiConnectionError;
pub use endpoints::LlmProvider;
pub use retry::{retry_with_backoff, RetryPolicy, Retryable};

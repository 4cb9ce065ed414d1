use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PipelineError;

pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 5;

/// Budget of simultaneous external food lookups for one compile run.
///
/// Cloning shares the budget; build a new limiter for an independent run.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Limiter(e.to_string()))
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_LOOKUPS)
    }
}

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api_connection::retry::{retry_with_backoff, RetryPolicy};
use crate::food_data::{FoodCandidate, FoodDataProvider, FoodServing};

pub const DEFAULT_MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedMatch {
    pub provider: String,
    pub food: FoodCandidate,
    pub serving: FoodServing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Verified(VerifiedMatch),
    Unmatched,
}

/// Providers tried in priority order. Results are never merged across providers.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn FoodDataProvider>>,
    retry: RetryPolicy,
    max_results: usize,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn FoodDataProvider>>, retry: RetryPolicy) -> Self {
        Self {
            providers,
            retry,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// A chain with no providers: every lookup is unmatched.
    pub fn empty() -> Self {
        Self::new(Vec::new(), RetryPolicy::immediate(0))
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Finds a verified serving for `query`, or `Unmatched` when every provider
    /// errors or comes back empty. Provider errors are logged, never returned.
    pub async fn lookup(&self, query: &str, target_kcal: f64) -> LookupOutcome {
        for provider in &self.providers {
            let name = provider.name();
            let candidates = match retry_with_backoff(&self.retry, name, || provider.search(query, self.max_results)).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(provider = %name, query = %query, error = %e, "Food search failed, trying next provider");
                    continue;
                }
            };

            let Some(food) = candidates.into_iter().next() else {
                debug!(provider = %name, query = %query, "No candidates");
                continue;
            };

            let details = match retry_with_backoff(&self.retry, name, || provider.get_details(&food.id)).await {
                Ok(details) => details,
                Err(e) => {
                    warn!(provider = %name, food_id = %food.id, error = %e, "Food details failed, trying next provider");
                    continue;
                }
            };

            match select_serving(&details.servings, target_kcal) {
                Some(serving) => {
                    debug!(provider = %name, query = %query, food = %food.name, serving = %serving.description, "Verified match");
                    return LookupOutcome::Verified(VerifiedMatch {
                        provider: name.to_string(),
                        food,
                        serving: serving.clone(),
                    });
                }
                None => {
                    debug!(provider = %name, food = %food.name, "Food has no usable serving");
                }
            }
        }
        LookupOutcome::Unmatched
    }
}

/// Serving with positive calories closest to the target; ties keep the first listed.
pub fn select_serving(servings: &[FoodServing], target_kcal: f64) -> Option<&FoodServing> {
    let mut best: Option<(&FoodServing, f64)> = None;
    for serving in servings.iter().filter(|s| s.calories > 0.0 && s.calories.is_finite()) {
        let distance = if target_kcal > 0.0 { (serving.calories - target_kcal).abs() } else { 0.0 };
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((serving, distance)),
        }
    }
    best.map(|(serving, _)| serving)
}

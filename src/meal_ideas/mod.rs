//! Meal-idea generation: an LLM source with a deterministic offline fallback.

pub mod fallback;
pub mod llm;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{GeneratorError, PipelineError};
use crate::models::{DraftDay, MealPlanDraft, PlanRequest, VarietyReport};
use crate::schema::validate_draft;

pub use fallback::DeterministicMealGenerator;
pub use llm::LlmMealIdeaGenerator;

/// Produces a draft plan from a request. Every source yields the same draft shape.
#[async_trait]
pub trait MealIdeaSource: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &PlanRequest) -> Result<MealPlanDraft, GeneratorError>;
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.push(value.to_string());
    }
}

/// Distinct proteins and cuisines in first-seen order, plus meal names used more than once.
pub fn variety_report(days: &[DraftDay]) -> VarietyReport {
    let mut report = VarietyReport::default();
    let mut names: Vec<String> = Vec::new();
    for meal in days.iter().flat_map(|d| &d.meals) {
        push_unique(&mut report.unique_proteins, &meal.primary_protein);
        push_unique(&mut report.unique_cuisines, &meal.cuisine);
        let name = meal.name.trim();
        if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            push_unique(&mut report.repeated_meal_names, name);
        } else {
            names.push(name.to_string());
        }
    }
    report
}

/// Asks `primary` for a draft and falls back to the deterministic generator when it is
/// absent, fails after its retries, or returns a draft that does not validate.
///
/// # Errors
/// Only a fallback draft that fails validation is an error.
pub async fn generate_with_fallback(
    primary: Option<&dyn MealIdeaSource>,
    fallback: &DeterministicMealGenerator,
    request: &PlanRequest,
) -> Result<MealPlanDraft, PipelineError> {
    if let Some(source) = primary {
        match source.generate(request).await {
            Ok(draft) => match validate_draft(&draft) {
                Ok(()) => {
                    info!(source = source.name(), days = draft.days.len(), "Meal ideas generated");
                    return Ok(draft);
                }
                Err(e) => warn!(source = source.name(), error = %GeneratorError::Schema(e.to_string()), "Discarding meal ideas"),
            },
            Err(e) => warn!(source = source.name(), error = %e, "Meal-idea source failed, using deterministic fallback"),
        }
    }

    let draft = fallback.generate_draft(request);
    validate_draft(&draft)?;
    info!(days = draft.days.len(), "Deterministic meal ideas generated");
    Ok(draft)
}

use std::path::Path;
use tracing::info;

use crate::error::RenderError;
use crate::models::MealPlanValidated;

/// Size limits enforced by the export step, separate from pipeline validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLimits {
    pub max_days: usize,
    pub max_meals_per_day: usize,
    pub max_ingredients_per_meal: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_days: 14,
            max_meals_per_day: 6,
            max_ingredients_per_meal: 25,
        }
    }
}

fn check(what: impl Into<String>, actual: usize, max: usize) -> Result<(), RenderError> {
    if actual > max {
        return Err(RenderError::LimitExceeded { what: what.into(), actual, max });
    }
    Ok(())
}

pub fn check_limits(plan: &MealPlanValidated, limits: &RenderLimits) -> Result<(), RenderError> {
    check("days", plan.days.len(), limits.max_days)?;
    for day in &plan.days {
        check(format!("meals on day {}", day.day_number), day.meals.len(), limits.max_meals_per_day)?;
        for meal in &day.meals {
            check(
                format!("ingredients in '{}' on day {}", meal.name, day.day_number),
                meal.ingredients.len(),
                limits.max_ingredients_per_meal,
            )?;
        }
    }
    Ok(())
}

/// Serializes the plan as pretty JSON after checking it against `limits`.
pub fn render_json(plan: &MealPlanValidated, limits: &RenderLimits) -> Result<String, RenderError> {
    check_limits(plan, limits)?;
    Ok(serde_json::to_string_pretty(plan)?)
}

pub async fn export_json(plan: &MealPlanValidated, limits: &RenderLimits, path: &Path) -> Result<(), RenderError> {
    let json = render_json(plan, limits)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), days = plan.days.len(), "Meal plan exported");
    Ok(())
}

//! Structural checks on the draft coming from a meal-idea source and on the
//! compiled plan handed to QA.

use std::collections::BTreeSet;

use crate::error::PipelineError;
use crate::models::{CompiledDay, DraftMeal, MealPlanDraft};
use crate::nutrition::{NutritionVector, ScaleBounds};

fn check_vector(what: &str, v: &NutritionVector) -> Result<(), String> {
    let values = [v.protein_g, v.carbs_g, v.fat_g, v.fiber_g.unwrap_or(0.0)];
    if v.kcal < 0 || values.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return Err(format!("{} has negative or non-finite values", what));
    }
    Ok(())
}

fn check_draft_meal(day_number: u32, meal: &DraftMeal) -> Result<(), String> {
    let label = format!("day {} {} '{}'", day_number, meal.slot.as_str(), meal.name);
    if meal.name.trim().is_empty() {
        return Err(format!("day {} has a {} with no name", day_number, meal.slot.as_str()));
    }
    if meal.search_query.trim().is_empty() {
        return Err(format!("{} has an empty search query", label));
    }
    if !meal.suggested_servings.is_finite() || meal.suggested_servings <= 0.0 {
        return Err(format!("{} has non-positive servings", label));
    }
    check_vector(&format!("{} estimated nutrition", label), &meal.estimated_nutrition)?;
    check_vector(&format!("{} target nutrition", label), &meal.target_nutrition)?;
    if let Some(ingredients) = &meal.ingredients {
        if ingredients.iter().any(|i| i.name.trim().is_empty() || !i.amount.is_finite() || i.amount < 0.0) {
            return Err(format!("{} has an invalid ingredient", label));
        }
    }
    Ok(())
}

fn check_draft(draft: &MealPlanDraft) -> Result<(), String> {
    if draft.days.is_empty() {
        return Err("draft has no days".to_string());
    }
    let mut seen = BTreeSet::new();
    for day in &draft.days {
        if day.day_number == 0 {
            return Err("day numbers start at 1".to_string());
        }
        if !seen.insert(day.day_number) {
            return Err(format!("day {} appears more than once", day.day_number));
        }
        if day.target_kcal <= 0 {
            return Err(format!("day {} has a non-positive kcal target", day.day_number));
        }
        if let Some(t) = day.macro_targets {
            if [t.protein_g, t.carbs_g, t.fat_g].iter().any(|x| !x.is_finite() || *x < 0.0) {
                return Err(format!("day {} has invalid macro targets", day.day_number));
            }
        }
        if day.meals.is_empty() {
            return Err(format!("day {} has no meals", day.day_number));
        }
        for meal in &day.meals {
            check_draft_meal(day.day_number, meal)?;
        }
    }
    Ok(())
}

/// Rejects drafts the compiler cannot work with.
pub fn validate_draft(draft: &MealPlanDraft) -> Result<(), PipelineError> {
    check_draft(draft).map_err(PipelineError::InvalidDraft)
}

// Slack for factors that land on a bound through floating-point arithmetic.
const BOUND_EPSILON: f64 = 1e-9;

/// Checks the compiled days: Atwater-consistent nutrition everywhere, scale factors
/// inside `bounds` and sane ingredient amounts.
pub fn validate_compiled(days: &[CompiledDay], bounds: &ScaleBounds) -> Result<(), PipelineError> {
    for day in days {
        if day.meals.is_empty() {
            return Err(PipelineError::InvalidCompiledPlan(format!("day {} has no meals", day.day_number)));
        }
        if !day.daily_totals.is_atwater_consistent() {
            return Err(PipelineError::InvalidCompiledPlan(format!(
                "day {} totals do not match their macros",
                day.day_number
            )));
        }
        for meal in &day.meals {
            let label = format!("day {} meal '{}'", day.day_number, meal.name);
            check_vector(&label, &meal.nutrition).map_err(PipelineError::InvalidCompiledPlan)?;
            if !meal.nutrition.is_atwater_consistent() {
                return Err(PipelineError::InvalidCompiledPlan(format!("{} kcal do not match its macros", label)));
            }
            if !meal.scale_factor.is_finite()
                || meal.scale_factor < bounds.min - BOUND_EPSILON
                || meal.scale_factor > bounds.max + BOUND_EPSILON
            {
                return Err(PipelineError::InvalidCompiledPlan(format!(
                    "{} has scale factor {} outside [{}, {}]",
                    label, meal.scale_factor, bounds.min, bounds.max
                )));
            }
            if meal.ingredients.iter().any(|i| !i.amount.is_finite() || i.amount < 0.0) {
                return Err(PipelineError::InvalidCompiledPlan(format!("{} has an invalid ingredient amount", label)));
            }
        }
    }
    Ok(())
}

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::day_aggregator::{rebuild_day, weekly_totals};
use crate::grocery::aggregate_grocery_list;
use crate::models::{
    CompiledDay, CompiledMeal, DayQaResult, MacroTargets, MealPlanCompiled, MealPlanValidated, QaResult, QaStatus,
};
use crate::nutrition::{scale_ingredients, NutritionVector, ScaleBounds};
use crate::optim::nutri_eval::{evaluate_day, overall_status, plan_score};
use crate::optim::tolerances::QaConfig;

pub fn engine_version() -> String {
    format!("meal-plan-engine/{}", env!("CARGO_PKG_VERSION"))
}

/// Multipliers applied to every meal of a day during correction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MacroScale {
    protein: f64,
    carbs: f64,
    fat: f64,
}

fn ratio(target: f64, actual: f64) -> f64 {
    if target <= 0.0 || actual <= 0.0 {
        1.0
    } else {
        target / actual
    }
}

/// Per-macro ratios toward the day's macro targets, each clamped to the correction bounds.
fn macro_scale(totals: &NutritionVector, targets: &MacroTargets, bounds: &ScaleBounds) -> MacroScale {
    MacroScale {
        protein: bounds.clamp(ratio(targets.protein_g, totals.protein_g)),
        carbs: bounds.clamp(ratio(targets.carbs_g, totals.carbs_g)),
        fat: bounds.clamp(ratio(targets.fat_g, totals.fat_g)),
    }
}

fn effective_factor(meal: &CompiledMeal) -> f64 {
    if meal.scale_factor.is_finite() && meal.scale_factor > 0.0 {
        meal.scale_factor
    } else {
        1.0
    }
}

/// A replacement meal with scaled macros; ingredient amounts follow the kcal change.
///
/// The meal's combined factor (compile-time factor times the correction) is clamped
/// to `bounds`, and the macro multipliers shrink with it.
fn scale_meal(meal: &CompiledMeal, scale: MacroScale, bounds: &ScaleBounds) -> CompiledMeal {
    let n = &meal.nutrition;
    let base = effective_factor(meal);
    let old_kcal = 4.0 * n.protein_g + 4.0 * n.carbs_g + 9.0 * n.fat_g;
    let raw_kcal = 4.0 * n.protein_g * scale.protein + 4.0 * n.carbs_g * scale.carbs + 9.0 * n.fat_g * scale.fat;
    let wanted = if old_kcal > 0.0 { raw_kcal / old_kcal } else { 1.0 };

    let combined = bounds.clamp(base * wanted);
    let kcal_ratio = combined / base;
    let shrink = if wanted > 0.0 { kcal_ratio / wanted } else { 1.0 };

    CompiledMeal {
        nutrition: NutritionVector::from_macros(
            n.protein_g * scale.protein * shrink,
            n.carbs_g * scale.carbs * shrink,
            n.fat_g * scale.fat * shrink,
            n.fiber_g.map(|f| f * kcal_ratio),
        ),
        ingredients: scale_ingredients(&meal.ingredients, kcal_ratio),
        scale_factor: combined,
        ..meal.clone()
    }
}

/// Per-meal kcal multipliers bringing the day as close to `target` as the bounds allow.
///
/// All meals share one multiplier except where a meal's combined factor would leave
/// `bounds`; the remaining meals then absorb the difference.
fn fill_to_target(meals: &[CompiledMeal], target: f64, bounds: &ScaleBounds) -> Vec<f64> {
    if meals.is_empty() || target <= 0.0 {
        return vec![1.0; meals.len()];
    }
    let limits: Vec<(f64, f64)> = meals
        .iter()
        .map(|m| {
            let base = effective_factor(m);
            (bounds.min / base, bounds.max / base)
        })
        .collect();
    let total = |k: f64| -> f64 {
        meals
            .iter()
            .zip(&limits)
            .map(|(m, (lo, hi))| f64::from(m.nutrition.kcal) * k.clamp(*lo, *hi))
            .sum()
    };

    let mut lo = limits.iter().map(|l| l.0).fold(f64::INFINITY, f64::min);
    let mut hi = limits.iter().map(|l| l.1).fold(0.0, f64::max);
    for _ in 0..60 {
        let mid = (lo + hi) / 2.0;
        if total(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let k = (lo + hi) / 2.0;
    limits.iter().map(|(l, h)| k.clamp(*l, *h)).collect()
}

fn correct_day(day: &CompiledDay, config: &QaConfig) -> (CompiledDay, String) {
    let bounds = &config.correction_bounds;
    let (meals, how): (Vec<CompiledMeal>, Option<String>) = match &day.macro_targets {
        Some(targets) => {
            let scale = macro_scale(&day.daily_totals, targets, bounds);
            let how = format!(
                "scaled protein x{:.3}, carbs x{:.3}, fat x{:.3}",
                scale.protein, scale.carbs, scale.fat
            );
            (day.meals.iter().map(|m| scale_meal(m, scale, bounds)).collect(), Some(how))
        }
        None => {
            let meals = fill_to_target(&day.meals, f64::from(day.target_kcal), bounds)
                .into_iter()
                .zip(&day.meals)
                .map(|(k, m)| scale_meal(m, MacroScale { protein: k, carbs: k, fat: k }, bounds))
                .collect();
            (meals, None)
        }
    };
    let corrected = rebuild_day(day, meals);

    let how = how.unwrap_or_else(|| {
        let overall = ratio(f64::from(corrected.daily_totals.kcal), f64::from(day.daily_totals.kcal));
        format!("scaled meal portions x{:.3}", overall)
    });
    let note = format!(
        "Day {}: {} ({} -> {} kcal, target {})",
        day.day_number, how, day.daily_totals.kcal, corrected.daily_totals.kcal, day.target_kcal
    );
    (corrected, note)
}

/// Scores a compiled plan and runs the bounded corrective pass.
///
/// Breaches never produce an error; they are reported through day statuses, the
/// score and `adjustments_made`. A day that still breaches after being corrected is
/// marked FAIL.
pub fn validate(compiled: &MealPlanCompiled, config: &QaConfig) -> MealPlanValidated {
    let mut days = compiled.days.clone();
    let mut results: Vec<DayQaResult> = days.iter().map(|d| evaluate_day(d, config)).collect();
    let mut adjustments = Vec::new();
    let mut corrected_days = BTreeSet::new();
    let mut iterations = 0;

    for _ in 0..config.max_passes {
        let breaching: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status != QaStatus::Pass)
            .map(|(i, _)| i)
            .collect();
        // a clean first pass still counts as one
        if breaching.is_empty() {
            iterations = iterations.max(1);
            break;
        }
        iterations += 1;
        for idx in breaching {
            let (corrected, note) = correct_day(&days[idx], config);
            debug!(adjustment = %note, "Corrective pass");
            corrected_days.insert(corrected.day_number);
            days[idx] = corrected;
            adjustments.push(note);
        }
        results = days.iter().map(|d| evaluate_day(d, config)).collect();
    }

    for result in results.iter_mut() {
        if result.status != QaStatus::Pass && corrected_days.contains(&result.day_number) {
            result.status = QaStatus::Fail;
        }
    }

    let qa = QaResult {
        status: overall_status(&results),
        score: plan_score(&results, config),
        day_results: results,
        iterations,
        adjustments_made: adjustments,
    };
    info!(status = ?qa.status, score = qa.score, adjustments = qa.adjustments_made.len(), "QA validation complete");

    MealPlanValidated {
        grocery_list: aggregate_grocery_list(&days),
        weekly_totals: weekly_totals(&days),
        qa,
        days,
        generated_at: Utc::now(),
        engine_version: engine_version(),
    }
}

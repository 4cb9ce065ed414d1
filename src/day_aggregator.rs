use crate::models::{CompiledDay, CompiledMeal, DailyAverage, MacroTargets, WeeklyTotals};
use crate::nutrition::{round1, NutritionVector};

/// Signed percent deviation of `actual` from `target`, to two decimals. Zero when there
/// is no positive target to compare against.
pub fn variance_percent(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (((actual - target) / target) * 10_000.0).round() / 100.0
}

/// Folds a day's compiled meals into its totals and calorie variance.
pub fn aggregate_day(
    day_number: u32,
    is_training_day: bool,
    target_kcal: i32,
    macro_targets: Option<MacroTargets>,
    meals: Vec<CompiledMeal>,
) -> CompiledDay {
    let daily_totals = NutritionVector::sum(meals.iter().map(|m| &m.nutrition));
    CompiledDay {
        day_number,
        is_training_day,
        target_kcal,
        macro_targets,
        variance_kcal: daily_totals.kcal - target_kcal,
        variance_percent: variance_percent(f64::from(daily_totals.kcal), f64::from(target_kcal)),
        daily_totals,
        meals,
    }
}

/// Rebuilds a day around replacement meals, keeping its identity and targets.
pub fn rebuild_day(day: &CompiledDay, meals: Vec<CompiledMeal>) -> CompiledDay {
    aggregate_day(day.day_number, day.is_training_day, day.target_kcal, day.macro_targets, meals)
}

/// Plan-wide totals and the mean day. Each averaged component is rounded on its own
/// from the unrounded mean, so the average kcal is not re-derived from averaged macros.
pub fn weekly_totals(days: &[CompiledDay]) -> WeeklyTotals {
    if days.is_empty() {
        return WeeklyTotals::default();
    }
    let n = days.len() as f64;
    let total_kcal: i64 = days.iter().map(|d| i64::from(d.daily_totals.kcal)).sum();
    let mean = |f: fn(&NutritionVector) -> f64| days.iter().map(|d| f(&d.daily_totals)).sum::<f64>() / n;

    let any_fiber = days.iter().any(|d| d.daily_totals.fiber_g.is_some());
    WeeklyTotals {
        days: days.len() as u32,
        total_kcal,
        average: DailyAverage {
            kcal: (total_kcal as f64 / n).round() as i32,
            protein_g: round1(mean(|v| v.protein_g)),
            carbs_g: round1(mean(|v| v.carbs_g)),
            fat_g: round1(mean(|v| v.fat_g)),
            fiber_g: any_fiber.then(|| round1(mean(|v| v.fiber_g.unwrap_or(0.0)))),
        },
    }
}

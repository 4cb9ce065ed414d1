use crate::day_aggregator::variance_percent;
use crate::models::{CompiledDay, DayQaResult, MacroVariances, QaStatus};
use crate::nutrition::round1;
use crate::optim::tolerances::QaConfig;

/// Per-macro percent deviation of the day's totals from its macro targets.
pub fn macro_variances(day: &CompiledDay) -> Option<MacroVariances> {
    let targets = day.macro_targets?;
    let totals = &day.daily_totals;
    Some(MacroVariances {
        protein_percent: variance_percent(totals.protein_g, targets.protein_g),
        carbs_percent: variance_percent(totals.carbs_g, targets.carbs_g),
        fat_percent: variance_percent(totals.fat_g, targets.fat_g),
    })
}

fn macro_array(v: &MacroVariances) -> [f64; 3] {
    [v.protein_percent, v.carbs_percent, v.fat_percent]
}

/// Classifies one day against the configured tolerances.
///
/// PASS needs the kcal check (percent band or absolute floor) and, when the day has
/// macro targets, every macro inside its own band. A breach past the severe threshold
/// is FAIL; any other breach is WARN and eligible for correction.
pub fn evaluate_day(day: &CompiledDay, config: &QaConfig) -> DayQaResult {
    let macro_variances = macro_variances(day);
    let tolerances = config.macro_tolerances();

    let kcal_ok = config.kcal_within(day.variance_percent, day.variance_kcal);
    let macros_ok = macro_variances.as_ref().map_or(true, |v| {
        macro_array(v).iter().zip(tolerances).all(|(pct, tol)| pct.abs() <= tol)
    });

    let status = if kcal_ok && macros_ok {
        QaStatus::Pass
    } else {
        let macro_severe = macro_variances.as_ref().map_or(false, |v| {
            macro_array(v)
                .iter()
                .zip(tolerances)
                .any(|(pct, tol)| pct.abs() > tol * config.severe_multiplier)
        });
        if macro_severe || config.kcal_severe(day.variance_percent, day.variance_kcal) {
            QaStatus::Fail
        } else {
            QaStatus::Warn
        }
    };

    DayQaResult {
        day_number: day.day_number,
        variance_percent: day.variance_percent,
        variance_kcal: day.variance_kcal,
        status,
        macro_variances,
    }
}

/// Weighted deviation of one day: kcal percent plus the summed macro percents.
pub fn day_penalty(result: &DayQaResult, config: &QaConfig) -> f64 {
    let macro_sum = result
        .macro_variances
        .as_ref()
        .map_or(0.0, |v| macro_array(v).iter().map(|pct| pct.abs()).sum());
    config.kcal_weight * result.variance_percent.abs() + config.macro_weight * macro_sum
}

/// 100 minus the mean day penalty, floored at 0, to one decimal.
pub fn plan_score(results: &[DayQaResult], config: &QaConfig) -> f64 {
    if results.is_empty() {
        return 100.0;
    }
    let mean_penalty = results.iter().map(|r| day_penalty(r, config)).sum::<f64>() / results.len() as f64;
    round1((100.0 - mean_penalty).max(0.0))
}

/// Worst status across all days; PASS for an empty plan.
pub fn overall_status(results: &[DayQaResult]) -> QaStatus {
    results.iter().map(|r| r.status).max().unwrap_or(QaStatus::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MacroTargets;
    use crate::nutrition::NutritionVector;

    fn day(kcal_actual: i32, target: i32, macros: Option<(NutritionVector, MacroTargets)>) -> CompiledDay {
        let totals = match macros {
            Some((totals, _)) => totals,
            None => NutritionVector { kcal: kcal_actual, protein_g: 0.0, carbs_g: 0.0, fat_g: 0.0, fiber_g: None },
        };
        CompiledDay {
            day_number: 1,
            is_training_day: false,
            target_kcal: target,
            macro_targets: macros.map(|(_, t)| t),
            meals: Vec::new(),
            variance_kcal: totals.kcal - target,
            variance_percent: variance_percent(f64::from(totals.kcal), f64::from(target)),
            daily_totals: totals,
        }
    }

    #[test]
    fn test_kcal_only_boundaries() {
        let config = QaConfig::default();
        assert_eq!(evaluate_day(&day(2058, 2000, None), &config).status, QaStatus::Pass);
        assert_eq!(evaluate_day(&day(2070, 2000, None), &config).status, QaStatus::Warn);
        assert_eq!(evaluate_day(&day(2300, 2000, None), &config).status, QaStatus::Fail);
        assert!(evaluate_day(&day(2070, 2000, None), &config).macro_variances.is_none());
    }

    #[test]
    fn test_macro_bands_are_per_macro() {
        let config = QaConfig::default();
        let targets = MacroTargets { protein_g: 150.0, carbs_g: 200.0, fat_g: 60.0 };

        // protein +12 %: outside its 10 % band
        let high_protein = NutritionVector::from_macros(168.0, 200.0, 60.0, None);
        let result = evaluate_day(&day(0, high_protein.kcal, Some((high_protein, targets))), &config);
        assert_ne!(result.status, QaStatus::Pass);
        assert_eq!(result.macro_variances.unwrap().protein_percent, 12.0);

        // carbs +12 %: inside its 15 % band, and kcal stays within tolerance
        let high_carbs = NutritionVector::from_macros(150.0, 224.0, 60.0, None);
        let result = evaluate_day(&day(0, 2000, Some((high_carbs, targets))), &config);
        assert_eq!(result.status, QaStatus::Pass);
    }

    #[test]
    fn test_score_and_overall_status() {
        let config = QaConfig::default();
        let results = vec![
            evaluate_day(&day(2000, 2000, None), &config),
            evaluate_day(&day(2070, 2000, None), &config),
        ];
        // penalties 0 and 2 * 3.5
        assert_eq!(plan_score(&results, &config), 96.5);
        assert_eq!(overall_status(&results), QaStatus::Warn);
        assert_eq!(plan_score(&[evaluate_day(&day(9000, 2000, None), &config)], &config), 0.0);
        assert_eq!(overall_status(&[]), QaStatus::Pass);
    }
}

use serde::{Deserialize, Serialize};

use crate::nutrition::ScaleBounds;

/// Tolerances, correction bounds and scoring weights used by the QA pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaConfig {
    /// Allowed absolute daily kcal deviation, in percent of target.
    pub kcal_tolerance_percent: f64,
    /// A day within this many kcal of target passes whatever its percent variance.
    pub kcal_floor: i32,
    pub protein_tolerance_percent: f64,
    pub carbs_tolerance_percent: f64,
    pub fat_tolerance_percent: f64,
    /// Breaches beyond `tolerance * severe_multiplier` are FAIL rather than WARN.
    pub severe_multiplier: f64,
    /// Upper bound on corrective passes. Zero disables correction.
    pub max_passes: u32,
    pub correction_bounds: ScaleBounds,
    pub kcal_weight: f64,
    pub macro_weight: f64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            kcal_tolerance_percent: 3.0,
            kcal_floor: 50,
            protein_tolerance_percent: 10.0,
            carbs_tolerance_percent: 15.0,
            fat_tolerance_percent: 15.0,
            severe_multiplier: 2.0,
            max_passes: 1,
            correction_bounds: ScaleBounds::default(),
            kcal_weight: 2.0,
            macro_weight: 0.5,
        }
    }
}

impl QaConfig {
    /// ±3 % kcal with no absolute floor, ±5 % on every macro, up to three passes.
    pub fn uniform_macro_policy() -> Self {
        Self {
            kcal_floor: 0,
            protein_tolerance_percent: 5.0,
            carbs_tolerance_percent: 5.0,
            fat_tolerance_percent: 5.0,
            max_passes: 3,
            ..Self::default()
        }
    }

    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn kcal_within(&self, variance_percent: f64, variance_kcal: i32) -> bool {
        variance_percent.abs() <= self.kcal_tolerance_percent || variance_kcal.abs() <= self.kcal_floor
    }

    pub fn kcal_severe(&self, variance_percent: f64, variance_kcal: i32) -> bool {
        variance_percent.abs() > self.kcal_tolerance_percent * self.severe_multiplier
            && variance_kcal.abs() > self.kcal_floor
    }

    /// Tolerances in protein, carbs, fat order.
    pub fn macro_tolerances(&self) -> [f64; 3] {
        [
            self.protein_tolerance_percent,
            self.carbs_tolerance_percent,
            self.fat_tolerance_percent,
        ]
    }
}

use serde::{Deserialize, Serialize};

use crate::models::Ingredient;
use crate::nutrition::vector::{round1, NutritionVector};

/// Lower and upper bound applied to every portion scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 3.0 }
    }
}

impl ScaleBounds {
    pub fn clamp(&self, factor: f64) -> f64 {
        factor.clamp(self.min, self.max)
    }
}

/// Raw (unrounded) macros of a serving before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawMacros {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
}

impl RawMacros {
    pub fn times(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein_g: self.protein_g * multiplier,
            carbs_g: self.carbs_g * multiplier,
            fat_g: self.fat_g * multiplier,
            fiber_g: self.fiber_g.map(|f| f * multiplier),
        }
    }
}

impl From<&NutritionVector> for RawMacros {
    fn from(v: &NutritionVector) -> Self {
        Self {
            calories: f64::from(v.kcal),
            protein_g: v.protein_g,
            carbs_g: v.carbs_g,
            fat_g: v.fat_g,
            fiber_g: v.fiber_g,
        }
    }
}

/// Computes the portion multiplier that moves `base_kcal` towards `target_kcal`.
///
/// The ratio is clamped to `bounds` so an incompatible food never yields an absurd
/// portion. Returns 1.0 when either side is not positive.
pub fn scale_factor(base_kcal: f64, target_kcal: f64, bounds: &ScaleBounds) -> f64 {
    if base_kcal <= 0.0 || target_kcal <= 0.0 || !base_kcal.is_finite() || !target_kcal.is_finite() {
        return 1.0;
    }
    bounds.clamp(target_kcal / base_kcal)
}

/// Applies `factor` to every macro, rounds to one decimal and re-derives kcal.
///
/// The scaled raw calorie figure is discarded.
pub fn scale_nutrition(raw: &RawMacros, factor: f64) -> NutritionVector {
    let scaled = raw.times(factor);
    NutritionVector::from_macros(scaled.protein_g, scaled.carbs_g, scaled.fat_g, scaled.fiber_g)
}

/// Scales every ingredient amount linearly, keeping names, units and food ids.
pub fn scale_ingredients(ingredients: &[Ingredient], factor: f64) -> Vec<Ingredient> {
    ingredients
        .iter()
        .map(|ing| Ingredient {
            amount: round1(ing.amount * factor),
            ..ing.clone()
        })
        .collect()
}

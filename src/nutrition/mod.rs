pub mod scaler;
pub mod vector;

pub use scaler::{scale_factor, scale_ingredients, scale_nutrition, RawMacros, ScaleBounds};
pub use vector::{kcal_from_macros, round1, NutritionVector};

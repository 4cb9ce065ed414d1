use serde::{Deserialize, Deserializer, Serialize};

/// Kcal per gram of protein.
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// Kcal per gram of carbohydrate.
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// Kcal per gram of fat.
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Calorie equivalent of the given macros (4/4/9), rounded to an integer.
///
/// ```
/// use meal_plan_engine::nutrition::kcal_from_macros;
/// assert_eq!(kcal_from_macros(25.5, 34.1, 10.4), 332);
/// ```
pub fn kcal_from_macros(protein_g: f64, carbs_g: f64, fat_g: f64) -> i32 {
    let kcal = KCAL_PER_G_PROTEIN * protein_g + KCAL_PER_G_CARBS * carbs_g + KCAL_PER_G_FAT * fat_g;
    kcal.round() as i32
}

/// Displayed nutrition for a meal, day or plan.
///
/// Values built through [`NutritionVector::from_macros`] always satisfy the Atwater
/// rule: `kcal == kcal_from_macros(protein_g, carbs_g, fat_g)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionVector {
    #[serde(deserialize_with = "deserialize_kcal")]
    pub kcal: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
}

impl NutritionVector {
    /// Rounds the macros to one decimal and derives kcal from the rounded values.
    pub fn from_macros(protein_g: f64, carbs_g: f64, fat_g: f64, fiber_g: Option<f64>) -> Self {
        let protein_g = round1(protein_g.max(0.0));
        let carbs_g = round1(carbs_g.max(0.0));
        let fat_g = round1(fat_g.max(0.0));
        Self {
            kcal: kcal_from_macros(protein_g, carbs_g, fat_g),
            protein_g,
            carbs_g,
            fat_g,
            fiber_g: fiber_g.map(|f| round1(f.max(0.0))),
        }
    }

    /// Re-derives this vector through [`Self::from_macros`], dropping any raw kcal figure.
    pub fn normalized(&self) -> Self {
        Self::from_macros(self.protein_g, self.carbs_g, self.fat_g, self.fiber_g)
    }

    pub fn is_atwater_consistent(&self) -> bool {
        self.kcal == kcal_from_macros(self.protein_g, self.carbs_g, self.fat_g)
    }

    /// Component-wise sum. The result is re-rounded and its kcal recomputed.
    pub fn sum<'a, I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = &'a NutritionVector>,
    {
        let mut protein = 0.0;
        let mut carbs = 0.0;
        let mut fat = 0.0;
        let mut fiber: Option<f64> = None;
        for v in vectors {
            protein += v.protein_g;
            carbs += v.carbs_g;
            fat += v.fat_g;
            if let Some(f) = v.fiber_g {
                fiber = Some(fiber.unwrap_or(0.0) + f);
            }
        }
        Self::from_macros(protein, carbs, fat, fiber)
    }
}

// Drafts coming back from an LLM often carry "520.0" instead of 520.
fn deserialize_kcal<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom("kcal must be a finite number"));
    }
    Ok(value.round() as i32)
}

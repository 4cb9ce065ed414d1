use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nutrition::NutritionVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_food_id: Option<String>,
}

impl Ingredient {
    pub fn new(name: &str, amount: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
            external_food_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroTargets {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// A meal idea with estimated nutrition only. Produced by a meal-idea source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMeal {
    pub slot: MealSlot,
    pub name: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub prep_time_minutes: u32,
    #[serde(default)]
    pub cook_time_minutes: u32,
    pub estimated_nutrition: NutritionVector,
    /// Missing targets are filled in from the day target when the draft is parsed.
    #[serde(default)]
    pub target_nutrition: NutritionVector,
    pub search_query: String,
    #[serde(default = "default_servings")]
    pub suggested_servings: f64,
    #[serde(default)]
    pub primary_protein: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Full ingredient list when the generator already enumerated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Ingredient>>,
}

fn default_servings() -> f64 {
    1.0
}

impl DraftMeal {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDay {
    pub day_number: u32,
    #[serde(default)]
    pub is_training_day: bool,
    #[serde(default)]
    pub target_kcal: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_targets: Option<MacroTargets>,
    pub meals: Vec<DraftMeal>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarietyReport {
    pub unique_proteins: Vec<String>,
    pub unique_cuisines: Vec<String>,
    pub repeated_meal_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftSource {
    #[default]
    Llm,
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDraft {
    pub days: Vec<DraftDay>,
    #[serde(default)]
    pub variety_report: VarietyReport,
    #[serde(default)]
    pub source: DraftSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Verified,
    AiEstimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedFood {
    pub provider: String,
    pub food_id: String,
    pub food_name: String,
    pub serving: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledMeal {
    pub slot: MealSlot,
    pub name: String,
    pub cuisine: String,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub estimated_nutrition: NutritionVector,
    /// Missing targets are filled in from the day target when the draft is parsed.
    #[serde(default)]
    pub target_nutrition: NutritionVector,
    pub search_query: String,
    pub suggested_servings: f64,
    pub primary_protein: String,
    pub tags: Vec<String>,
    pub nutrition: NutritionVector,
    pub confidence_level: ConfidenceLevel,
    pub scale_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_food: Option<MatchedFood>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledDay {
    pub day_number: u32,
    pub is_training_day: bool,
    pub target_kcal: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_targets: Option<MacroTargets>,
    pub meals: Vec<CompiledMeal>,
    pub daily_totals: NutritionVector,
    pub variance_kcal: i32,
    pub variance_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QaStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroVariances {
    pub protein_percent: f64,
    pub carbs_percent: f64,
    pub fat_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayQaResult {
    pub day_number: u32,
    pub variance_percent: f64,
    pub variance_kcal: i32,
    pub status: QaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_variances: Option<MacroVariances>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaResult {
    pub status: QaStatus,
    pub score: f64,
    pub day_results: Vec<DayQaResult>,
    pub iterations: u32,
    pub adjustments_made: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryCategory {
    pub category: String,
    pub items: Vec<GroceryItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverage {
    pub kcal: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTotals {
    pub days: u32,
    pub total_kcal: i64,
    pub average: DailyAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanCompiled {
    pub days: Vec<CompiledDay>,
    pub grocery_list: Vec<GroceryCategory>,
    pub weekly_totals: WeeklyTotals,
    pub variety_report: VarietyReport,
    pub source: DraftSource,
}

/// Terminal artifact of a pipeline run. A regeneration builds a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanValidated {
    pub days: Vec<CompiledDay>,
    pub grocery_list: Vec<GroceryCategory>,
    pub qa: QaResult,
    pub weekly_totals: WeeklyTotals,
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
}

/// What the caller asks the meal-idea source for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub days: u32,
    pub rest_day_kcal: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_day_kcal: Option<i32>,
    #[serde(default)]
    pub training_days: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_targets: Option<MacroTargets>,
    pub slots: Vec<MealSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_preference: Option<String>,
}

impl PlanRequest {
    pub fn is_training_day(&self, day_number: u32) -> bool {
        self.training_days.contains(&day_number)
    }

    pub fn kcal_for_day(&self, day_number: u32) -> i32 {
        if self.is_training_day(day_number) {
            self.training_day_kcal.unwrap_or(self.rest_day_kcal)
        } else {
            self.rest_day_kcal
        }
    }

    /// Macro targets for a day, rescaled to that day's kcal when it differs from rest days.
    pub fn macro_targets_for_day(&self, day_number: u32) -> Option<MacroTargets> {
        let targets = self.macro_targets?;
        if self.rest_day_kcal <= 0 {
            return Some(targets);
        }
        let ratio = f64::from(self.kcal_for_day(day_number)) / f64::from(self.rest_day_kcal);
        Some(MacroTargets {
            protein_g: crate::nutrition::round1(targets.protein_g * ratio),
            carbs_g: crate::nutrition::round1(targets.carbs_g * ratio),
            fat_g: crate::nutrition::round1(targets.fat_g * ratio),
        })
    }
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            days: 7,
            rest_day_kcal: 2000,
            training_day_kcal: None,
            training_days: Vec::new(),
            macro_targets: None,
            slots: vec![MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner, MealSlot::Snack],
            cuisine_preference: None,
        }
    }
}

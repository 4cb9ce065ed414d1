//! Food-composition providers and the ranked fallback chain over them.

pub mod chain;
pub mod local_table;
pub mod usda;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::nutrition::RawMacros;

pub use chain::{LookupOutcome, ProviderChain, VerifiedMatch};
pub use local_table::LocalFoodTable;
pub use usda::{UsdaConfig, UsdaProvider};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodServing {
    pub description: String,
    #[serde(default)]
    pub gram_weight: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: Option<f64>,
}

impl FoodServing {
    pub fn macros(&self) -> RawMacros {
        RawMacros {
            calories: self.calories,
            protein_g: self.protein,
            carbs_g: self.carbs,
            fat_g: self.fat,
            fiber_g: self.fiber,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoodDetails {
    pub servings: Vec<FoodServing>,
}

/// One source of food-composition data.
#[async_trait]
pub trait FoodDataProvider: Send + Sync {
    /// Short name used in logs and on verified meals.
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<FoodCandidate>, ProviderError>;

    async fn get_details(&self, id: &str) -> Result<FoodDetails, ProviderError>;
}

//! USDA FoodData Central client used as the secondary, remote provider.
//!
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::ProviderError;
use crate::food_data::{FoodCandidate, FoodDataProvider, FoodDetails, FoodServing};

const PROVIDER_NAME: &str = "usda";

const NUTRIENT_ENERGY_KCAL: u32 = 1008;
const NUTRIENT_PROTEIN: u32 = 1003;
const NUTRIENT_FAT: u32 = 1004;
const NUTRIENT_CARBS: u32 = 1005;
const NUTRIENT_FIBER: u32 = 1079;

#[derive(Debug, Clone)]
pub struct UsdaConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: u64,
    description: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    brand_owner: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodDetailsResponse {
    #[serde(default)]
    food_nutrients: Vec<FoodNutrientResponse>,
    #[serde(default)]
    serving_size: Option<f64>,
    #[serde(default)]
    serving_size_unit: Option<String>,
    #[serde(default)]
    household_serving_full_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoodNutrientResponse {
    nutrient: Option<NutrientInfo>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NutrientInfo {
    id: u32,
}

pub struct UsdaProvider {
    config: UsdaConfig,
    http_client: reqwest::Client,
}

impl UsdaProvider {
    pub fn new(config: UsdaConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http_client }
    }

    fn network_error(e: reqwest::Error) -> ProviderError {
        ProviderError::Network {
            provider: PROVIDER_NAME.to_string(),
            message: e.to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ProviderError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .query(&[("api_key", &self.config.api_key)])
            .send()
            .await
            .map_err(Self::network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await.map_err(Self::network_error)?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
            provider: PROVIDER_NAME.to_string(),
            message: e.to_string(),
        })
    }
}

/// Per-100 g serving plus the labelled serving when the record carries one.
fn servings_from_details(details: &FoodDetailsResponse) -> Vec<FoodServing> {
    let amount_of = |id: u32| {
        details
            .food_nutrients
            .iter()
            .find(|n| n.nutrient.as_ref().map(|info| info.id) == Some(id))
            .and_then(|n| n.amount)
    };

    let protein = amount_of(NUTRIENT_PROTEIN).unwrap_or(0.0);
    let carbs = amount_of(NUTRIENT_CARBS).unwrap_or(0.0);
    let fat = amount_of(NUTRIENT_FAT).unwrap_or(0.0);
    let fiber = amount_of(NUTRIENT_FIBER);
    let calories = amount_of(NUTRIENT_ENERGY_KCAL).unwrap_or(4.0 * protein + 4.0 * carbs + 9.0 * fat);

    let per_100g = FoodServing {
        description: "100 g".to_string(),
        gram_weight: Some(100.0),
        unit: Some("g".to_string()),
        calories,
        protein,
        carbs,
        fat,
        fiber,
    };

    let mut servings = vec![per_100g.clone()];
    if let (Some(size), Some(unit)) = (details.serving_size, details.serving_size_unit.as_deref()) {
        let unit = unit.to_lowercase();
        if size > 0.0 && (unit == "g" || unit == "ml" || unit == "grm") {
            let ratio = size / 100.0;
            servings.push(FoodServing {
                description: details
                    .household_serving_full_text
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", size, unit)),
                gram_weight: (unit != "ml").then_some(size),
                unit: Some(if unit == "ml" { "ml".to_string() } else { "g".to_string() }),
                calories: calories * ratio,
                protein: protein * ratio,
                carbs: carbs * ratio,
                fat: fat * ratio,
                fiber: fiber.map(|f| f * ratio),
            });
        }
    }
    servings
}

#[async_trait]
impl FoodDataProvider for UsdaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<FoodCandidate>, ProviderError> {
        let url = format!("{}/foods/search", self.config.base_url);
        let page_size = max_results.clamp(1, 200).to_string();
        let response: SearchResponse = self
            .get_json(&url, &[("query", query.to_string()), ("pageSize", page_size)])
            .await?;
        debug!(query = %query, hits = response.foods.len(), "USDA search");

        Ok(response
            .foods
            .into_iter()
            .map(|food| FoodCandidate {
                id: food.fdc_id.to_string(),
                description: [food.data_type, food.brand_owner]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", "),
                name: food.description,
            })
            .collect())
    }

    async fn get_details(&self, id: &str) -> Result<FoodDetails, ProviderError> {
        let url = format!("{}/food/{}", self.config.base_url, id);
        let details: FoodDetailsResponse = self.get_json(&url, &[]).await?;
        Ok(FoodDetails { servings: servings_from_details(&details) })
    }
}

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::api_connection::endpoints::{ChatCompletionRequest, ChatMessage, ResponseFormat};
use crate::api_connection::{retry_with_backoff, ApiConnectionError, LlmProvider, RetryPolicy};
use crate::error::GeneratorError;
use crate::meal_ideas::{variety_report, MealIdeaSource};
use crate::meal_ideas::fallback::slot_share;
use crate::models::{DraftDay, DraftSource, MealPlanDraft, PlanRequest};
use crate::nutrition::NutritionVector;

const SYSTEM_PROMPT: &str = "/no_thinking
You are a meal planning assistant. Plan varied meals for the requested days and meal slots.
Return a single JSON object and nothing else: no explanations, no markdown fences.
The object has one property \"days\", an array with one object per day:
- \"dayNumber\": integer starting at 1
- \"isTrainingDay\": boolean
- \"targetKcal\": integer
- \"meals\": array with one object per requested slot
Each meal object has:
- \"slot\": one of \"breakfast\", \"lunch\", \"dinner\", \"snack\"
- \"name\", \"cuisine\", \"primaryProtein\": strings
- \"prepTimeMinutes\", \"cookTimeMinutes\": integers
- \"estimatedNutrition\": your estimate for one serving as {\"kcal\", \"proteinG\", \"carbsG\", \"fatG\"}
- \"targetNutrition\": the share of the day's target this meal should provide, same shape
- \"searchQuery\": a short food-database search phrase for the main component, e.g. \"grilled chicken breast\"
- \"suggestedServings\": number, usually 1
- \"tags\": strings such as \"grill\", \"stir-fry\", \"bake\", \"no-cook\", \"vegetarian\"
Avoid repeating the same meal name within the plan and vary the primary proteins.";

/// Meal ideas from an OpenRouter chat model.
pub struct LlmMealIdeaGenerator {
    provider: LlmProvider,
    client: Client,
    model: String,
    retry: RetryPolicy,
}

impl LlmMealIdeaGenerator {
    pub fn new(provider: LlmProvider, retry: RetryPolicy) -> Self {
        let model = provider.default_model();
        Self {
            provider,
            client: Client::new(),
            model,
            retry,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn build_request(&self, request: &PlanRequest) -> Result<ChatCompletionRequest, GeneratorError> {
        let request_json = serde_json::to_string_pretty(request).map_err(ApiConnectionError::from)?;
        Ok(ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("Plan meals for this request:\n{}", request_json)),
            ],
            response_format: Some(ResponseFormat::json_object()),
            temperature: Some(0.4),
            max_tokens: Some(8192),
        })
    }

    async fn attempt(&self, request: &PlanRequest) -> Result<MealPlanDraft, GeneratorError> {
        let chat_request = self.build_request(request)?;
        let response = self.provider.call_chat_completion(&self.client, &chat_request).await?;
        let content = response
            .first_content()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiConnectionError::EmptyResponse("no content in completion".to_string()))?;
        debug!(chars = content.len(), "Received meal ideas");
        parse_draft(&content, request)
    }
}

/// Parses model output into a draft. Day targets always come from `request`; the
/// model's own figures for them are ignored.
pub fn parse_draft(content: &str, request: &PlanRequest) -> Result<MealPlanDraft, GeneratorError> {
    let content = crate::api_connection::endpoints::strip_code_fence(content);
    let mut draft: MealPlanDraft = serde_json::from_str(&content).map_err(|e| GeneratorError::Parse(e.to_string()))?;
    if draft.days.is_empty() {
        return Err(GeneratorError::Parse("model returned no days".to_string()));
    }
    for day in draft.days.iter_mut() {
        day.target_kcal = request.kcal_for_day(day.day_number);
        day.macro_targets = request.macro_targets_for_day(day.day_number);
        day.is_training_day = request.is_training_day(day.day_number);
        rebalance_meal_targets(day);
    }
    draft.variety_report = variety_report(&draft.days);
    draft.source = DraftSource::Llm;
    Ok(draft)
}

fn ratio(target: f64, sum: f64) -> f64 {
    if sum > 0.0 {
        target / sum
    } else {
        1.0
    }
}

/// Rescales the model's per-meal targets so they add up to the day's own targets.
///
/// With macro targets each macro is rescaled to its day total; otherwise every meal
/// keeps its macro split and the kcal sum is matched. Meals with no usable target
/// get a slot share of the day built from their estimate.
fn rebalance_meal_targets(day: &mut DraftDay) {
    for meal in day.meals.iter_mut() {
        meal.target_nutrition = meal.target_nutrition.normalized();
    }
    let kcal_sum: i32 = day.meals.iter().map(|m| m.target_nutrition.kcal).sum();
    if kcal_sum <= 0 {
        let share_total: f64 = day.meals.iter().map(|m| slot_share(m.slot)).sum();
        let day_kcal = f64::from(day.target_kcal);
        for meal in day.meals.iter_mut() {
            let e = meal.estimated_nutrition.normalized();
            let r = ratio(day_kcal * slot_share(meal.slot) / share_total, f64::from(e.kcal));
            meal.target_nutrition = NutritionVector::from_macros(e.protein_g * r, e.carbs_g * r, e.fat_g * r, None);
        }
        return;
    }

    let (p, c, f) = match day.macro_targets {
        Some(targets) => {
            let sum = |get: fn(&NutritionVector) -> f64| day.meals.iter().map(|m| get(&m.target_nutrition)).sum::<f64>();
            (
                ratio(targets.protein_g, sum(|v| v.protein_g)),
                ratio(targets.carbs_g, sum(|v| v.carbs_g)),
                ratio(targets.fat_g, sum(|v| v.fat_g)),
            )
        }
        None => {
            let k = ratio(f64::from(day.target_kcal), f64::from(kcal_sum));
            (k, k, k)
        }
    };
    for meal in day.meals.iter_mut() {
        let t = &meal.target_nutrition;
        meal.target_nutrition = NutritionVector::from_macros(t.protein_g * p, t.carbs_g * c, t.fat_g * f, t.fiber_g);
    }
}

#[async_trait]
impl MealIdeaSource for LlmMealIdeaGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(&self, request: &PlanRequest) -> Result<MealPlanDraft, GeneratorError> {
        info!(model = %self.model, days = request.days, "Requesting meal ideas");
        retry_with_backoff(&self.retry, "meal-idea generation", || self.attempt(request)).await
    }
}

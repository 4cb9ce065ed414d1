use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meal_plan_engine::api_connection::RetryPolicy;
use meal_plan_engine::error::ProviderError;
use meal_plan_engine::food_data::{FoodCandidate, FoodDataProvider, FoodDetails, FoodServing, ProviderChain};
use meal_plan_engine::config::EngineConfig;
use meal_plan_engine::grocery::aggregate_grocery_list;
use meal_plan_engine::limiter::ConcurrencyLimiter;
use meal_plan_engine::meal_compiler::MealCompiler;
use meal_plan_engine::meal_ideas::DeterministicMealGenerator;
use meal_plan_engine::models::{ConfidenceLevel, PlanRequest, QaStatus};
use meal_plan_engine::nutrition::ScaleBounds;
use meal_plan_engine::optim::nutri_eval::{overall_status, plan_score};
use meal_plan_engine::optim::{evaluate_day, QaConfig};
use meal_plan_engine::pipeline::Pipeline;
use meal_plan_engine::schema::validate_compiled;

/// Answers every query with the same food and records how many calls overlap.
#[derive(Default)]
struct SlowProvider {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    searches: AtomicUsize,
}

#[async_trait]
impl FoodDataProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<FoodCandidate>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![FoodCandidate {
            id: "42".to_string(),
            name: query.to_string(),
            description: String::new(),
        }])
    }

    async fn get_details(&self, _id: &str) -> Result<FoodDetails, ProviderError> {
        Ok(FoodDetails {
            servings: vec![FoodServing {
                description: "1 portion".to_string(),
                gram_weight: Some(250.0),
                unit: None,
                calories: 450.0,
                protein: 30.0,
                carbs: 45.0,
                fat: 16.0,
                fiber: Some(5.0),
            }],
        })
    }
}

struct BrokenProvider;

#[async_trait]
impl FoodDataProvider for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<FoodCandidate>, ProviderError> {
        Err(ProviderError::Http {
            provider: "broken".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    async fn get_details(&self, id: &str) -> Result<FoodDetails, ProviderError> {
        Err(ProviderError::NotFound { provider: "broken".to_string(), id: id.to_string() })
    }
}

fn week_draft() -> meal_plan_engine::models::MealPlanDraft {
    DeterministicMealGenerator::new().generate_draft(&PlanRequest::default())
}

#[tokio::test]
async fn test_lookups_never_exceed_concurrency_ceiling() {
    let provider = Arc::new(SlowProvider::default());
    let chain = ProviderChain::new(vec![provider.clone()], RetryPolicy::immediate(0));
    let compiler = MealCompiler::new(chain, ScaleBounds::default());
    let limiter = ConcurrencyLimiter::new(2);
    let draft = week_draft();
    let meal_count: usize = draft.days.iter().map(|d| d.meals.len()).sum();

    let compiled = compiler.compile(&draft, &limiter).await.unwrap();

    assert_eq!(provider.searches.load(Ordering::SeqCst), meal_count);
    assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(limiter.available(), 2);
    for meal in compiled.days.iter().flat_map(|d| d.meals.iter()) {
        assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
        assert_eq!(meal.matched_food.as_ref().map(|m| m.provider.as_str()), Some("slow"));
        assert!(meal.nutrition.is_atwater_consistent());
        assert!((0.5..=3.0).contains(&meal.scale_factor));
    }
}

#[tokio::test]
async fn test_failing_provider_falls_back_to_estimates() {
    let chain = ProviderChain::new(vec![Arc::new(BrokenProvider)], RetryPolicy::immediate(1));
    let compiler = MealCompiler::new(chain, ScaleBounds::default());
    let draft = week_draft();

    let compiled = compiler.compile(&draft, &ConcurrencyLimiter::new(3)).await.unwrap();

    assert_eq!(compiled.days.len(), 7);
    for meal in compiled.days.iter().flat_map(|d| d.meals.iter()) {
        assert_eq!(meal.confidence_level, ConfidenceLevel::AiEstimated);
        assert!(meal.matched_food.is_none());
        assert!(!meal.ingredients.is_empty());
    }
}

#[tokio::test]
async fn test_offline_plan_end_to_end() {
    let pipeline = Pipeline::new(
        None,
        MealCompiler::new(ProviderChain::empty(), ScaleBounds::default()),
        ConcurrencyLimiter::default(),
        QaConfig::default(),
    );
    let request = PlanRequest {
        training_day_kcal: Some(2400),
        training_days: vec![2, 4],
        ..PlanRequest::default()
    };

    let plan = pipeline.run(&request, |_| {}).await.unwrap();

    assert_eq!(plan.days.len(), 7);
    assert!(validate_compiled(&plan.days, &ScaleBounds::default()).is_ok());
    assert_eq!(plan.qa.iterations, 1);
    assert_eq!(plan.qa.day_results.len(), 7);
    assert!(plan.qa.score >= 0.0 && plan.qa.score <= 100.0);
    assert_eq!(plan.days[1].target_kcal, 2400);
    assert!(plan.days[1].is_training_day);
    assert_eq!(plan.days[0].target_kcal, 2000);

    for day in &plan.days {
        assert!(day.daily_totals.is_atwater_consistent());
        for meal in &day.meals {
            assert!(meal.nutrition.is_atwater_consistent());
        }
    }
    for note in &plan.qa.adjustments_made {
        assert!(plan.days.iter().any(|d| note.starts_with(&format!("Day {}: ", d.day_number))));
    }

    assert_eq!(aggregate_grocery_list(&plan.days), plan.grocery_list);
    assert_eq!(plan.weekly_totals.days, 7);
    assert!(plan.engine_version.starts_with("meal-plan-engine/"));
}

#[tokio::test]
async fn test_default_pipeline_with_builtin_food_table() {
    let config = EngineConfig { offline: true, ..EngineConfig::default() };
    let pipeline = Pipeline::from_config(&config).unwrap();
    let qa = QaConfig::default();

    let plan = pipeline.run(&PlanRequest::default(), |_| {}).await.unwrap();

    assert_eq!(plan.days.len(), 7);
    assert!(validate_compiled(&plan.days, &config.scale_bounds).is_ok());
    for meal in plan.days.iter().flat_map(|d| d.meals.iter()) {
        assert!(
            meal.scale_factor >= 0.5 - 1e-9 && meal.scale_factor <= 3.0 + 1e-9,
            "{} has scale factor {}",
            meal.name,
            meal.scale_factor
        );
        assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
        assert_eq!(meal.matched_food.as_ref().map(|m| m.provider.as_str()), Some("local"));
    }

    let salmon = plan.days[0].meals.iter().find(|m| m.name == "Baked Salmon with Sweet Potato").unwrap();
    assert_eq!(salmon.matched_food.as_ref().unwrap().food_name, "Salmon, atlantic, baked");

    // 100 g servings leave the first day far below target until QA corrects it
    assert_eq!(plan.qa.iterations, 1);
    assert!(!plan.qa.adjustments_made.is_empty());
    assert!(plan.qa.adjustments_made[0].starts_with("Day 1: scaled meal portions x"));
    for note in &plan.qa.adjustments_made {
        assert!(note.contains(" kcal, target "), "unexpected adjustment note: {}", note);
    }
    assert_eq!(plan.qa.day_results[0].status, QaStatus::Pass);
    assert!(plan.days[0].variance_kcal.abs() <= 50);

    for (day, result) in plan.days.iter().zip(&plan.qa.day_results) {
        let fresh = evaluate_day(day, &qa);
        assert_eq!(result.day_number, day.day_number);
        assert_eq!(result.status == QaStatus::Pass, fresh.status == QaStatus::Pass);
    }
    assert_eq!(plan.qa.status, overall_status(&plan.qa.day_results));
    assert_eq!(plan.qa.score, plan_score(&plan.qa.day_results, &qa));
    assert!(plan.qa.score > 0.0 && plan.qa.score <= 100.0);

    assert_eq!(aggregate_grocery_list(&plan.days), plan.grocery_list);
}

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::api_connection::LlmProvider;
use crate::config::EngineConfig;
use crate::error::PipelineError;
use crate::food_data::{FoodDataProvider, LocalFoodTable, ProviderChain, UsdaConfig, UsdaProvider};
use crate::limiter::ConcurrencyLimiter;
use crate::meal_compiler::MealCompiler;
use crate::meal_ideas::{generate_with_fallback, DeterministicMealGenerator, LlmMealIdeaGenerator, MealIdeaSource};
use crate::models::{MealPlanCompiled, MealPlanDraft, MealPlanValidated, PlanRequest};
use crate::optim::{self, QaConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    MealIdeas,
    Compilation,
    QaValidation,
    ReadyForRender,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub message: String,
    pub percent: u8,
}

impl ProgressEvent {
    fn new(stage: PipelineStage, percent: u8, message: impl Into<String>) -> Self {
        Self { stage, message: message.into(), percent }
    }
}

/// Meal ideas, then compilation, then QA. Each instance owns its lookup budget.
pub struct Pipeline {
    idea_source: Option<Box<dyn MealIdeaSource>>,
    fallback: DeterministicMealGenerator,
    compiler: MealCompiler,
    limiter: ConcurrencyLimiter,
    qa: QaConfig,
}

impl Pipeline {
    pub fn new(
        idea_source: Option<Box<dyn MealIdeaSource>>,
        compiler: MealCompiler,
        limiter: ConcurrencyLimiter,
        qa: QaConfig,
    ) -> Self {
        Self {
            idea_source,
            fallback: DeterministicMealGenerator::new(),
            compiler,
            limiter,
            qa,
        }
    }

    /// Wires providers, the idea source and the limiter from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let local = match &config.food_table {
            Some(path) => LocalFoodTable::load_csv(path)
                .with_context(|| format!("Failed to load food table from '{}'", path.display()))?,
            None => LocalFoodTable::builtin(),
        };
        let mut providers: Vec<Arc<dyn FoodDataProvider>> = vec![Arc::new(local)];
        if let Some(api_key) = &config.usda_api_key {
            providers.push(Arc::new(UsdaProvider::new(UsdaConfig {
                api_key: api_key.clone(),
                ..UsdaConfig::default()
            })));
        }
        let chain = ProviderChain::new(providers, config.retry.clone());
        info!(providers = ?chain.provider_names(), "Food data providers ready");

        let idea_source: Option<Box<dyn MealIdeaSource>> = if config.offline {
            None
        } else {
            let mut generator = LlmMealIdeaGenerator::new(LlmProvider::openrouter(&config.llm_api_key_var), config.retry.clone());
            if let Some(model) = &config.llm_model {
                generator = generator.with_model(model);
            }
            Some(Box::new(generator))
        };

        Ok(Self::new(
            idea_source,
            MealCompiler::new(chain, config.scale_bounds),
            ConcurrencyLimiter::new(config.max_concurrent_lookups),
            config.qa.clone(),
        ))
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub async fn generate_draft(&self, request: &PlanRequest) -> Result<MealPlanDraft, PipelineError> {
        generate_with_fallback(self.idea_source.as_deref(), &self.fallback, request).await
    }

    pub async fn compile_draft(&self, draft: &MealPlanDraft) -> Result<MealPlanCompiled, PipelineError> {
        self.compiler.compile(draft, &self.limiter).await
    }

    pub fn validate(&self, compiled: &MealPlanCompiled) -> MealPlanValidated {
        optim::validate(compiled, &self.qa)
    }

    /// Runs every stage in order and reports one progress event per stage, plus a
    /// final one when the plan is ready to render. Nothing partial is returned on error.
    pub async fn run<F>(&self, request: &PlanRequest, progress: F) -> Result<MealPlanValidated, PipelineError>
    where
        F: Fn(ProgressEvent),
    {
        progress(ProgressEvent::new(PipelineStage::MealIdeas, 0, format!("Generating meal ideas for {} days", request.days)));
        let draft = self.generate_draft(request).await?;

        let meal_count: usize = draft.days.iter().map(|d| d.meals.len()).sum();
        progress(ProgressEvent::new(
            PipelineStage::Compilation,
            25,
            format!("Verifying nutrition for {} meals ({:?} ideas)", meal_count, draft.source),
        ));
        let compiled = self.compile_draft(&draft).await?;

        progress(ProgressEvent::new(PipelineStage::QaValidation, 70, "Checking daily calorie and macro tolerances"));
        let validated = self.validate(&compiled);

        progress(ProgressEvent::new(
            PipelineStage::ReadyForRender,
            100,
            format!("Plan ready: QA {:?}, score {}", validated.qa.status, validated.qa.score),
        ));
        Ok(validated)
    }
}

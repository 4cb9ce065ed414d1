use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use meal_plan_engine::cli::parse_args;
use meal_plan_engine::config::EngineConfig;
use meal_plan_engine::models::{MealPlanDraft, MealPlanValidated};
use meal_plan_engine::pipeline::{Pipeline, ProgressEvent};
use meal_plan_engine::render::{export_json, RenderLimits};

fn print_summary(plan: &MealPlanValidated) {
    println!("\nQA status: {:?} (score {:.1}, {} corrective pass(es))", plan.qa.status, plan.qa.score, plan.qa.iterations);
    for day in &plan.days {
        println!(
            "  Day {}: {} kcal vs target {} ({:+.2}%)",
            day.day_number, day.daily_totals.kcal, day.target_kcal, day.variance_percent
        );
    }
    for adjustment in &plan.qa.adjustments_made {
        println!("  adjusted: {}", adjustment);
    }
    let average = &plan.weekly_totals.average;
    println!(
        "Average day: {} kcal, {:.1} g protein, {:.1} g carbs, {:.1} g fat",
        average.kcal, average.protein_g, average.carbs_g, average.fat_g
    );
    let item_count: usize = plan.grocery_list.iter().map(|c| c.items.len()).sum();
    println!("Grocery list: {} items in {} categories", item_count, plan.grocery_list.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();
    let mut config = EngineConfig::from_env().context("Failed to read engine configuration")?;
    cli.apply_overrides(&mut config);
    if config.offline && cli.draft.is_none() && !cli.offline {
        warn!("{} is not set, planning with the deterministic generator", config.llm_api_key_var);
    }

    let pipeline = Pipeline::from_config(&config).context("Failed to set up the meal plan pipeline")?;
    let progress = |event: ProgressEvent| println!("[{:>3}%] {}", event.percent, event.message);

    let plan = match &cli.draft {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read draft file '{}'", path.display()))?;
            let draft: MealPlanDraft =
                serde_json::from_str(&raw).with_context(|| format!("Failed to parse draft file '{}'", path.display()))?;
            let compiled = pipeline.compile_draft(&draft).await.context("Meal plan compilation failed")?;
            pipeline.validate(&compiled)
        }
        None => pipeline
            .run(&cli.plan_request(), progress)
            .await
            .context("Meal plan generation failed")?,
    };

    print_summary(&plan);

    if let Some(output) = &cli.output {
        export_json(&plan, &RenderLimits::default(), output)
            .await
            .with_context(|| format!("Failed to export plan to '{}'", output.display()))?;
        println!("Plan written to {}", output.display());
    }

    Ok(())
}

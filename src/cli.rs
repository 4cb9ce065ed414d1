use clap::Parser;
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::models::{MacroTargets, MealSlot, PlanRequest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds a verified, tolerance-checked meal plan and grocery list", long_about = None)]
pub struct Cli {
    /// Number of days to plan
    #[arg(short, long, default_value_t = 7)]
    pub days: u32,

    /// Daily kcal target on rest days
    #[arg(short, long, default_value_t = 2000)]
    pub kcal: i32,

    /// Daily kcal target on training days
    #[arg(long)]
    pub training_kcal: Option<i32>,

    /// Training day numbers, e.g. 1,3,5
    #[arg(long, value_delimiter = ',')]
    pub training_days: Vec<u32>,

    /// Daily protein target in grams (needs --carbs and --fat too)
    #[arg(long, requires_all = ["carbs", "fat"])]
    pub protein: Option<f64>,

    /// Daily carbohydrate target in grams
    #[arg(long, requires_all = ["protein", "fat"])]
    pub carbs: Option<f64>,

    /// Daily fat target in grams
    #[arg(long, requires_all = ["protein", "carbs"])]
    pub fat: Option<f64>,

    /// Meal slots per day
    #[arg(long, value_delimiter = ',', value_parser = parse_slot, default_values = ["breakfast", "lunch", "dinner", "snack"])]
    pub slots: Vec<MealSlot>,

    /// Preferred cuisine for meal ideas
    #[arg(long)]
    pub cuisine: Option<String>,

    /// Compile an existing draft JSON file instead of generating meal ideas
    #[arg(long)]
    pub draft: Option<PathBuf>,

    /// Where to write the validated plan as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Never call the LLM; use the deterministic meal generator
    #[arg(long)]
    pub offline: bool,

    /// Chat model used for meal ideas
    #[arg(long)]
    pub model: Option<String>,

    /// CSV food table (Name, kcal/100g, Protein, Carbohydrate, Fat, Fiber per 100 g)
    #[arg(long)]
    pub food_table: Option<PathBuf>,

    /// Ceiling on simultaneous food-data lookups
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Upper bound on QA corrective passes
    #[arg(long)]
    pub qa_passes: Option<u32>,
}

fn parse_slot(raw: &str) -> Result<MealSlot, String> {
    match raw.trim().to_lowercase().as_str() {
        "breakfast" => Ok(MealSlot::Breakfast),
        "lunch" => Ok(MealSlot::Lunch),
        "dinner" => Ok(MealSlot::Dinner),
        "snack" => Ok(MealSlot::Snack),
        other => Err(format!("unknown meal slot '{}'", other)),
    }
}

impl Cli {
    pub fn plan_request(&self) -> PlanRequest {
        let macro_targets = match (self.protein, self.carbs, self.fat) {
            (Some(protein_g), Some(carbs_g), Some(fat_g)) => Some(MacroTargets { protein_g, carbs_g, fat_g }),
            _ => None,
        };
        PlanRequest {
            days: self.days,
            rest_day_kcal: self.kcal,
            training_day_kcal: self.training_kcal,
            training_days: self.training_days.clone(),
            macro_targets,
            slots: self.slots.clone(),
            cuisine_preference: self.cuisine.clone(),
        }
    }

    /// Command-line flags win over environment configuration.
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if self.offline {
            config.offline = true;
        }
        if let Some(model) = &self.model {
            config.llm_model = Some(model.clone());
        }
        if let Some(path) = &self.food_table {
            config.food_table = Some(path.clone());
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent_lookups = n.max(1);
        }
        if let Some(passes) = self.qa_passes {
            config.qa.max_passes = passes;
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

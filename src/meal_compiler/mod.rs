//! Turns draft meals into verified, portion-scaled meals with ingredients and steps.

pub mod ingredient_tables;

use futures::future::join_all;
use tracing::{debug, info};

use crate::day_aggregator::{aggregate_day, weekly_totals};
use crate::error::PipelineError;
use crate::food_data::{LookupOutcome, ProviderChain, VerifiedMatch};
use crate::grocery::aggregate_grocery_list;
use crate::limiter::ConcurrencyLimiter;
use crate::meal_ideas::variety_report;
use crate::models::{
    CompiledDay, CompiledMeal, ConfidenceLevel, DraftDay, DraftMeal, Ingredient, MatchedFood, MealPlanCompiled,
    MealPlanDraft, MealSlot,
};
use crate::nutrition::{round1, scale_factor, scale_ingredients, scale_nutrition, RawMacros, ScaleBounds};
use crate::schema;
use ingredient_tables::{
    all_matches, first_match, mentions, IngredientEntry, CARBS, COOKING_FAT, DEFAULT_INSTRUCTIONS, DEFAULT_VEGETABLE,
    INSTRUCTION_TEMPLATES, PROTEINS, SEASONING, VEGETABLES,
};

const DEFAULT_COOK_MINUTES: u32 = 15;

pub struct MealCompiler {
    chain: ProviderChain,
    scale_bounds: ScaleBounds,
}

impl MealCompiler {
    pub fn new(chain: ProviderChain, scale_bounds: ScaleBounds) -> Self {
        Self { chain, scale_bounds }
    }

    /// Compiles every day of `draft` concurrently. Each provider lookup holds a permit
    /// from `limiter` for its whole duration.
    ///
    /// # Errors
    /// Fails when the draft or the compiled plan does not pass schema validation.
    pub async fn compile(&self, draft: &MealPlanDraft, limiter: &ConcurrencyLimiter) -> Result<MealPlanCompiled, PipelineError> {
        schema::validate_draft(draft)?;
        let meal_count: usize = draft.days.iter().map(|d| d.meals.len()).sum();
        info!(days = draft.days.len(), meals = meal_count, max_concurrent = limiter.max_concurrent(), "Compiling meal plan");

        let days = join_all(draft.days.iter().map(|day| self.compile_day(day, limiter)))
            .await
            .into_iter()
            .collect::<Result<Vec<CompiledDay>, PipelineError>>()?;

        let plan = MealPlanCompiled {
            grocery_list: aggregate_grocery_list(&days),
            weekly_totals: weekly_totals(&days),
            variety_report: variety_report(&draft.days),
            source: draft.source,
            days,
        };
        schema::validate_compiled(&plan.days, &self.scale_bounds)?;
        Ok(plan)
    }

    async fn compile_day(&self, day: &DraftDay, limiter: &ConcurrencyLimiter) -> Result<CompiledDay, PipelineError> {
        let meals = join_all(day.meals.iter().map(|meal| self.compile_meal(meal, limiter)))
            .await
            .into_iter()
            .collect::<Result<Vec<CompiledMeal>, PipelineError>>()?;
        Ok(aggregate_day(day.day_number, day.is_training_day, day.target_kcal, day.macro_targets, meals))
    }

    pub async fn compile_meal(&self, meal: &DraftMeal, limiter: &ConcurrencyLimiter) -> Result<CompiledMeal, PipelineError> {
        let outcome = {
            let _permit = limiter.acquire().await?;
            self.chain
                .lookup(&meal.search_query, f64::from(meal.target_nutrition.kcal))
                .await
        };
        Ok(self.build_meal(meal, outcome))
    }

    /// Pure part of compilation: scaling, ingredient and instruction synthesis.
    pub fn build_meal(&self, meal: &DraftMeal, outcome: LookupOutcome) -> CompiledMeal {
        let target_kcal = f64::from(meal.target_nutrition.kcal);
        let servings = meal.suggested_servings;

        let (nutrition, factor, ingredients, confidence_level, matched_food) = match outcome {
            LookupOutcome::Verified(VerifiedMatch { provider, food, serving }) => {
                let base = serving.macros().times(servings);
                let factor = scale_factor(base.calories, target_kcal, &self.scale_bounds);
                let ingredients = match draft_ingredients(meal) {
                    Some(list) => scale_ingredients(list, factor),
                    None => {
                        let (amount, unit) = match serving.gram_weight {
                            Some(grams) => (grams * servings * factor, "g".to_string()),
                            None => (servings * factor, serving.unit.clone().unwrap_or_else(|| "serving".to_string())),
                        };
                        let mut list = vec![Ingredient {
                            name: food.name.clone(),
                            amount: round1(amount),
                            unit,
                            external_food_id: Some(format!("{}:{}", provider, food.id)),
                        }];
                        list.extend(complementary_ingredients(meal, &food.name, factor));
                        list
                    }
                };
                debug!(meal = %meal.name, food = %food.name, factor, "Scaled verified meal");
                let matched = MatchedFood {
                    provider,
                    food_id: food.id,
                    food_name: food.name,
                    serving: serving.description,
                };
                (scale_nutrition(&base, factor), factor, ingredients, ConfidenceLevel::Verified, Some(matched))
            }
            LookupOutcome::Unmatched => {
                let base = RawMacros::from(&meal.estimated_nutrition);
                let factor = scale_factor(base.calories, target_kcal, &self.scale_bounds);
                let ingredients = match draft_ingredients(meal) {
                    Some(list) => scale_ingredients(list, factor),
                    None => synthesize_ingredients(meal, factor),
                };
                debug!(meal = %meal.name, factor, "No verified match, scaled AI estimate");
                (scale_nutrition(&base, factor), factor, ingredients, ConfidenceLevel::AiEstimated, None)
            }
        };

        CompiledMeal {
            slot: meal.slot,
            name: meal.name.clone(),
            cuisine: meal.cuisine.clone(),
            prep_time_minutes: meal.prep_time_minutes,
            cook_time_minutes: meal.cook_time_minutes,
            estimated_nutrition: meal.estimated_nutrition,
            target_nutrition: meal.target_nutrition,
            search_query: meal.search_query.clone(),
            suggested_servings: meal.suggested_servings,
            primary_protein: meal.primary_protein.clone(),
            tags: meal.tags.clone(),
            nutrition,
            confidence_level,
            scale_factor: factor,
            matched_food,
            ingredients,
            instructions: synthesize_instructions(meal),
        }
    }
}

fn draft_ingredients(meal: &DraftMeal) -> Option<&[Ingredient]> {
    meal.ingredients.as_deref().filter(|list| !list.is_empty())
}

pub fn requires_cooking(meal: &DraftMeal) -> bool {
    meal.cook_time_minutes > 0 && !meal.has_tag("no-cook") && !meal.has_tag("raw")
}

/// Portion ingredients scale with servings and the meal factor; oil and seasoning
/// only with servings.
fn portion(entry: &IngredientEntry, servings: f64, factor: f64) -> Ingredient {
    Ingredient::new(entry.1, round1(entry.2 * servings * factor), entry.3)
}

fn fixed(entry: &IngredientEntry, servings: f64) -> Ingredient {
    Ingredient::new(entry.1, round1(entry.2 * servings), entry.3)
}

fn finishing_ingredients(meal: &DraftMeal, list: &mut Vec<Ingredient>) {
    if requires_cooking(meal) {
        list.push(fixed(&COOKING_FAT, meal.suggested_servings));
    }
    list.push(fixed(&SEASONING, meal.suggested_servings));
}

/// Side ingredients inferred from the search query around a verified main food.
pub fn complementary_ingredients(meal: &DraftMeal, matched_food: &str, factor: f64) -> Vec<Ingredient> {
    let matched = matched_food.to_lowercase();
    let already_covered = |entry: &IngredientEntry| {
        let first_word = entry.1.split_whitespace().next().unwrap_or(entry.1).to_lowercase();
        mentions(&matched, entry.0) || mentions(&matched, first_word.trim_end_matches('s'))
    };

    let mut list = Vec::new();
    if let Some(carb) = first_match(CARBS, &meal.search_query).filter(|e| !already_covered(*e)) {
        list.push(portion(carb, meal.suggested_servings, factor));
    }
    match first_match(VEGETABLES, &meal.search_query) {
        Some(veg) if !already_covered(veg) => list.push(portion(veg, meal.suggested_servings, factor)),
        Some(_) => {}
        None if matches!(meal.slot, MealSlot::Lunch | MealSlot::Dinner) => {
            list.push(portion(&DEFAULT_VEGETABLE, meal.suggested_servings, factor))
        }
        None => {}
    }
    finishing_ingredients(meal, &mut list);
    list
}

/// Ingredient list for a meal with no verified food, built from keyword tables.
pub fn synthesize_ingredients(meal: &DraftMeal, factor: f64) -> Vec<Ingredient> {
    let servings = meal.suggested_servings;
    let mut list = Vec::new();

    let protein = first_match(PROTEINS, &meal.search_query).or_else(|| first_match(PROTEINS, &meal.primary_protein));
    match protein {
        Some(entry) => list.push(portion(entry, servings, factor)),
        None if !meal.primary_protein.trim().is_empty() => {
            list.push(Ingredient::new(meal.primary_protein.trim(), round1(150.0 * servings * factor), "g"))
        }
        None => {}
    }
    if let Some(carb) = first_match(CARBS, &meal.search_query) {
        list.push(portion(carb, servings, factor));
    }
    for veg in all_matches(VEGETABLES, &meal.search_query).into_iter().take(2) {
        list.push(portion(veg, servings, factor));
    }
    finishing_ingredients(meal, &mut list);
    list
}

/// Cooking steps from the first tag template that applies, or a generic pan method.
pub fn synthesize_instructions(meal: &DraftMeal) -> Vec<String> {
    let template = if !requires_cooking(meal) {
        INSTRUCTION_TEMPLATES[0].1
    } else {
        INSTRUCTION_TEMPLATES
            .iter()
            .find(|(tags, _)| tags.iter().any(|tag| meal.has_tag(tag)))
            .map(|(_, steps)| *steps)
            .unwrap_or(DEFAULT_INSTRUCTIONS)
    };

    let protein = if meal.primary_protein.trim().is_empty() {
        "main ingredient".to_string()
    } else {
        meal.primary_protein.trim().to_lowercase()
    };
    let minutes = if meal.cook_time_minutes > 0 { meal.cook_time_minutes } else { DEFAULT_COOK_MINUTES };
    let half = (minutes / 2).max(1);

    template
        .iter()
        .map(|step| {
            step.replace("{protein}", &protein)
                .replace("{minutes}", &minutes.to_string())
                .replace("{half}", &half.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food_data::{FoodCandidate, FoodServing};
    use crate::nutrition::NutritionVector;

    fn draft(query: &str, tags: &[&str], cook: u32) -> DraftMeal {
        DraftMeal {
            slot: MealSlot::Dinner,
            name: "Test dinner".to_string(),
            cuisine: "american".to_string(),
            prep_time_minutes: 10,
            cook_time_minutes: cook,
            estimated_nutrition: NutritionVector::from_macros(30.0, 50.0, 15.0, None),
            target_nutrition: NutritionVector::from_macros(45.0, 60.0, 20.0, None),
            search_query: query.to_string(),
            suggested_servings: 1.0,
            primary_protein: "Chicken".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: None,
        }
    }

    fn verified(calories: f64, protein: f64, carbs: f64, fat: f64) -> LookupOutcome {
        LookupOutcome::Verified(VerifiedMatch {
            provider: "local".to_string(),
            food: FoodCandidate { id: "0".to_string(), name: "Chicken breast, roasted".to_string(), description: String::new() },
            serving: FoodServing {
                description: "100 g".to_string(),
                gram_weight: Some(100.0),
                unit: Some("g".to_string()),
                calories,
                protein,
                carbs,
                fat,
                fiber: None,
            },
        })
    }

    fn compiler() -> MealCompiler {
        MealCompiler::new(ProviderChain::empty(), ScaleBounds::default())
    }

    #[test]
    fn test_verified_meal_scaled_to_target() {
        let meal = draft("grilled chicken with rice and broccoli", &["grill"], 20);
        // target kcal = 180 + 240 + 180 = 600; serving 200 kcal -> factor 3.0
        let compiled = compiler().build_meal(&meal, verified(200.0, 31.0, 0.0, 3.6));
        assert_eq!(compiled.confidence_level, ConfidenceLevel::Verified);
        assert_eq!(compiled.scale_factor, 3.0);
        assert_eq!(compiled.nutrition.protein_g, 93.0);
        assert_eq!(compiled.nutrition.fat_g, 10.8);
        assert!(compiled.nutrition.is_atwater_consistent());

        let names: Vec<&str> = compiled.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Chicken breast, roasted", "Brown rice", "Broccoli", "Olive oil", "Salt and pepper"]);
        assert_eq!(compiled.ingredients[0].amount, 300.0);
        assert_eq!(compiled.ingredients[0].external_food_id.as_deref(), Some("local:0"));
        assert_eq!(compiled.matched_food.as_ref().unwrap().provider, "local");
        assert!(compiled.instructions[0].contains("grill"));
    }

    #[test]
    fn test_unmatched_meal_keeps_scaled_estimate() {
        let meal = draft("lemon herb chicken with quinoa and spinach", &[], 25);
        let compiled = compiler().build_meal(&meal, LookupOutcome::Unmatched);
        assert_eq!(compiled.confidence_level, ConfidenceLevel::AiEstimated);
        assert!(compiled.matched_food.is_none());
        // estimate 455 kcal, target 600 kcal
        let expected_factor = 600.0 / 455.0;
        assert!((compiled.scale_factor - expected_factor).abs() < 1e-9);
        assert!(compiled.nutrition.is_atwater_consistent());
        assert!((compiled.nutrition.kcal - 600).abs() <= 3);

        let names: Vec<&str> = compiled.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Chicken breast", "Quinoa", "Spinach", "Olive oil", "Salt and pepper"]);
    }

    #[test]
    fn test_no_cook_meal_skips_oil() {
        let mut meal = draft("greek yogurt with berries and granola", &["no-cook"], 0);
        meal.slot = MealSlot::Breakfast;
        meal.primary_protein = "Greek yogurt".to_string();
        let ingredients = synthesize_ingredients(&meal, 1.0);
        let names: Vec<&str> = ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Greek yogurt", "Granola", "Mixed berries", "Salt and pepper"]);
        assert_eq!(synthesize_instructions(&meal)[0], "Combine all ingredients in a bowl or container.");
    }

    #[test]
    fn test_draft_ingredient_list_is_scaled_not_replaced() {
        let mut meal = draft("chicken stir-fry", &["stir-fry"], 12);
        meal.ingredients = Some(vec![Ingredient::new("Chicken thigh", 200.0, "g"), Ingredient::new("Soy sauce", 2.0, "tbsp")]);
        let compiled = compiler().build_meal(&meal, verified(300.0, 40.0, 0.0, 15.3));
        let factor = compiled.scale_factor;
        assert_eq!(compiled.ingredients.len(), 2);
        assert_eq!(compiled.ingredients[0].amount, round1(200.0 * factor));
        assert!(compiled.instructions[1].contains("wok"));
        assert!(compiled.instructions[2].contains("12 minutes"));
    }

    #[test]
    fn test_unknown_protein_uses_declared_name() {
        let mut meal = draft("seitan bowl", &[], 10);
        meal.primary_protein = "Seitan".to_string();
        let ingredients = synthesize_ingredients(&meal, 1.0);
        assert_eq!(ingredients[0].name, "Seitan");
        assert_eq!(ingredients[0].amount, 150.0);
    }
}

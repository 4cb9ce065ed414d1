use async_trait::async_trait;

use crate::error::GeneratorError;
use crate::meal_ideas::{variety_report, MealIdeaSource};
use crate::models::{DraftDay, DraftMeal, DraftSource, MacroTargets, MealPlanDraft, MealSlot, PlanRequest};
use crate::nutrition::NutritionVector;

/// A canned meal idea with nutrition for one serving.
struct MealTemplate {
    name: &'static str,
    cuisine: &'static str,
    search_query: &'static str,
    primary_protein: &'static str,
    tags: &'static [&'static str],
    prep_time_minutes: u32,
    cook_time_minutes: u32,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
}

const BREAKFASTS: &[MealTemplate] = &[
    MealTemplate {
        name: "Greek Yogurt Parfait",
        cuisine: "mediterranean",
        search_query: "greek yogurt with berries and granola",
        primary_protein: "Greek yogurt",
        tags: &["no-cook", "quick"],
        prep_time_minutes: 5,
        cook_time_minutes: 0,
        protein_g: 28.0,
        carbs_g: 52.0,
        fat_g: 9.0,
    },
    MealTemplate {
        name: "Veggie Egg Scramble with Toast",
        cuisine: "american",
        search_query: "scrambled eggs with spinach and toast",
        primary_protein: "Eggs",
        tags: &["quick"],
        prep_time_minutes: 5,
        cook_time_minutes: 8,
        protein_g: 26.0,
        carbs_g: 34.0,
        fat_g: 20.0,
    },
    MealTemplate {
        name: "Protein Oatmeal with Banana",
        cuisine: "american",
        search_query: "oatmeal with banana and greek yogurt",
        primary_protein: "Greek yogurt",
        tags: &["vegetarian"],
        prep_time_minutes: 3,
        cook_time_minutes: 5,
        protein_g: 24.0,
        carbs_g: 68.0,
        fat_g: 8.0,
    },
    MealTemplate {
        name: "Breakfast Burrito",
        cuisine: "mexican",
        search_query: "egg and black bean breakfast burrito wrap",
        primary_protein: "Eggs",
        tags: &["meal-prep"],
        prep_time_minutes: 10,
        cook_time_minutes: 10,
        protein_g: 27.0,
        carbs_g: 48.0,
        fat_g: 17.0,
    },
];

const LUNCHES: &[MealTemplate] = &[
    MealTemplate {
        name: "Grilled Chicken Quinoa Bowl",
        cuisine: "american",
        search_query: "grilled chicken breast with quinoa and broccoli",
        primary_protein: "Chicken",
        tags: &["grill", "meal-prep"],
        prep_time_minutes: 10,
        cook_time_minutes: 20,
        protein_g: 45.0,
        carbs_g: 55.0,
        fat_g: 14.0,
    },
    MealTemplate {
        name: "Turkey Wrap with Salad",
        cuisine: "american",
        search_query: "turkey wrap with tomato and salad",
        primary_protein: "Turkey",
        tags: &["no-cook", "quick"],
        prep_time_minutes: 10,
        cook_time_minutes: 0,
        protein_g: 38.0,
        carbs_g: 50.0,
        fat_g: 15.0,
    },
    MealTemplate {
        name: "Tuna Rice Bowl",
        cuisine: "japanese",
        search_query: "tuna with brown rice and carrot",
        primary_protein: "Tuna",
        tags: &["quick"],
        prep_time_minutes: 10,
        cook_time_minutes: 15,
        protein_g: 40.0,
        carbs_g: 62.0,
        fat_g: 10.0,
    },
    MealTemplate {
        name: "Lentil and Vegetable Stew",
        cuisine: "mediterranean",
        search_query: "lentil stew with carrot and spinach",
        primary_protein: "Lentils",
        tags: &["vegetarian", "meal-prep"],
        prep_time_minutes: 15,
        cook_time_minutes: 30,
        protein_g: 26.0,
        carbs_g: 70.0,
        fat_g: 11.0,
    },
];

const DINNERS: &[MealTemplate] = &[
    MealTemplate {
        name: "Baked Salmon with Sweet Potato",
        cuisine: "american",
        search_query: "baked salmon with sweet potato and asparagus",
        primary_protein: "Salmon",
        tags: &["bake"],
        prep_time_minutes: 10,
        cook_time_minutes: 25,
        protein_g: 38.0,
        carbs_g: 45.0,
        fat_g: 20.0,
    },
    MealTemplate {
        name: "Beef and Broccoli Stir-Fry",
        cuisine: "chinese",
        search_query: "beef stir-fry with broccoli and rice",
        primary_protein: "Beef",
        tags: &["stir-fry"],
        prep_time_minutes: 15,
        cook_time_minutes: 12,
        protein_g: 40.0,
        carbs_g: 58.0,
        fat_g: 16.0,
    },
    MealTemplate {
        name: "Chicken Fajitas",
        cuisine: "mexican",
        search_query: "chicken fajitas with bell peppers and tortilla",
        primary_protein: "Chicken",
        tags: &["stir-fry"],
        prep_time_minutes: 15,
        cook_time_minutes: 15,
        protein_g: 42.0,
        carbs_g: 50.0,
        fat_g: 15.0,
    },
    MealTemplate {
        name: "Tofu Vegetable Curry",
        cuisine: "indian",
        search_query: "tofu curry with rice and vegetables",
        primary_protein: "Tofu",
        tags: &["vegetarian"],
        prep_time_minutes: 15,
        cook_time_minutes: 25,
        protein_g: 28.0,
        carbs_g: 65.0,
        fat_g: 18.0,
    },
    MealTemplate {
        name: "Roast Pork with Potatoes",
        cuisine: "european",
        search_query: "roasted pork tenderloin with potato and green beans",
        primary_protein: "Pork",
        tags: &["roast"],
        prep_time_minutes: 10,
        cook_time_minutes: 35,
        protein_g: 40.0,
        carbs_g: 48.0,
        fat_g: 14.0,
    },
];

const SNACKS: &[MealTemplate] = &[
    MealTemplate {
        name: "Apple with Peanut Butter",
        cuisine: "american",
        search_query: "apple with peanut butter",
        primary_protein: "Peanut butter",
        tags: &["no-cook", "quick"],
        prep_time_minutes: 2,
        cook_time_minutes: 0,
        protein_g: 7.0,
        carbs_g: 27.0,
        fat_g: 16.0,
    },
    MealTemplate {
        name: "Cottage Cheese and Berries",
        cuisine: "american",
        search_query: "cottage cheese with berries",
        primary_protein: "Cottage cheese",
        tags: &["no-cook", "quick"],
        prep_time_minutes: 2,
        cook_time_minutes: 0,
        protein_g: 24.0,
        carbs_g: 18.0,
        fat_g: 5.0,
    },
    MealTemplate {
        name: "Hummus with Carrot Sticks",
        cuisine: "mediterranean",
        search_query: "chickpea hummus with carrot",
        primary_protein: "Chickpeas",
        tags: &["no-cook", "vegetarian"],
        prep_time_minutes: 5,
        cook_time_minutes: 0,
        protein_g: 8.0,
        carbs_g: 24.0,
        fat_g: 10.0,
    },
];

/// Share of the day's kcal for each slot before renormalising over the requested slots.
pub fn slot_share(slot: MealSlot) -> f64 {
    match slot {
        MealSlot::Breakfast => 0.25,
        MealSlot::Lunch => 0.35,
        MealSlot::Dinner => 0.30,
        MealSlot::Snack => 0.10,
    }
}

fn templates_for(slot: MealSlot) -> &'static [MealTemplate] {
    match slot {
        MealSlot::Breakfast => BREAKFASTS,
        MealSlot::Lunch => LUNCHES,
        MealSlot::Dinner => DINNERS,
        MealSlot::Snack => SNACKS,
    }
}

/// Offline meal-idea source. Same request, same draft.
#[derive(Debug, Clone, Default)]
pub struct DeterministicMealGenerator;

impl DeterministicMealGenerator {
    pub fn new() -> Self {
        Self
    }

    fn pick(slot: MealSlot, day_number: u32, cuisine: Option<&str>) -> &'static MealTemplate {
        let all = templates_for(slot);
        let preferred: Vec<&'static MealTemplate> = match cuisine {
            Some(c) => all.iter().filter(|t| t.cuisine.eq_ignore_ascii_case(c.trim())).collect(),
            None => Vec::new(),
        };
        let offset = (day_number.saturating_sub(1)) as usize;
        if preferred.is_empty() {
            &all[offset % all.len()]
        } else {
            preferred[offset % preferred.len()]
        }
    }

    fn build_meal(template: &MealTemplate, slot: MealSlot, share: f64, day_kcal: i32, day_macros: Option<MacroTargets>) -> DraftMeal {
        let estimated = NutritionVector::from_macros(template.protein_g, template.carbs_g, template.fat_g, None);
        let target = match day_macros {
            Some(m) => NutritionVector::from_macros(m.protein_g * share, m.carbs_g * share, m.fat_g * share, None),
            None => {
                let slot_kcal = f64::from(day_kcal) * share;
                let ratio = if estimated.kcal > 0 { slot_kcal / f64::from(estimated.kcal) } else { 1.0 };
                NutritionVector::from_macros(template.protein_g * ratio, template.carbs_g * ratio, template.fat_g * ratio, None)
            }
        };
        DraftMeal {
            slot,
            name: template.name.to_string(),
            cuisine: template.cuisine.to_string(),
            prep_time_minutes: template.prep_time_minutes,
            cook_time_minutes: template.cook_time_minutes,
            estimated_nutrition: estimated,
            target_nutrition: target,
            search_query: template.search_query.to_string(),
            suggested_servings: 1.0,
            primary_protein: template.primary_protein.to_string(),
            tags: template.tags.iter().map(|t| t.to_string()).collect(),
            ingredients: None,
        }
    }

    pub fn generate_draft(&self, request: &PlanRequest) -> MealPlanDraft {
        let default_slots = PlanRequest::default().slots;
        let slots = if request.slots.is_empty() { &default_slots } else { &request.slots };
        let share_total: f64 = slots.iter().map(|s| slot_share(*s)).sum();
        let cuisine = request.cuisine_preference.as_deref();

        let days: Vec<DraftDay> = (1..=request.days.max(1))
            .map(|day_number| {
                let target_kcal = request.kcal_for_day(day_number);
                let macro_targets = request.macro_targets_for_day(day_number);
                let meals = slots
                    .iter()
                    .map(|slot| {
                        let template = Self::pick(*slot, day_number, cuisine);
                        let share = slot_share(*slot) / share_total;
                        Self::build_meal(template, *slot, share, target_kcal, macro_targets)
                    })
                    .collect();
                DraftDay {
                    day_number,
                    is_training_day: request.is_training_day(day_number),
                    target_kcal,
                    macro_targets,
                    meals,
                }
            })
            .collect();

        MealPlanDraft {
            variety_report: variety_report(&days),
            days,
            source: DraftSource::Deterministic,
        }
    }
}

#[async_trait]
impl MealIdeaSource for DeterministicMealGenerator {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn generate(&self, request: &PlanRequest) -> Result<MealPlanDraft, GeneratorError> {
        Ok(self.generate_draft(request))
    }
}

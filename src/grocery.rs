use std::collections::BTreeMap;

use crate::meal_compiler::ingredient_tables::mentions;
use crate::models::{CompiledDay, GroceryCategory, GroceryItem};

/// Shopping-list sections in display order. Unmatched items land in the last one.
pub const CATEGORY_ORDER: [&str; 7] = [
    "Produce",
    "Meat and Seafood",
    "Dairy and Eggs",
    "Grains and Bakery",
    "Pantry",
    "Spices and Seasonings",
    "Other",
];

const OTHER: usize = 6;

/// `(keyword, index into CATEGORY_ORDER)`. The longest keyword found in a name wins,
/// so "peanut butter" goes to Pantry rather than Dairy and Eggs.
const CATEGORY_KEYWORDS: &[(&str, usize)] = &[
    // Produce
    ("apple", 0),
    ("avocado", 0),
    ("banana", 0),
    ("berries", 0),
    ("broccoli", 0),
    ("carrot", 0),
    ("kale", 0),
    ("lemon", 0),
    ("lime", 0),
    ("lettuce", 0),
    ("onion", 0),
    ("garlic", 0),
    ("pepper", 0),
    ("spinach", 0),
    ("tomato", 0),
    ("zucchini", 0),
    ("asparagus", 0),
    ("mushroom", 0),
    ("potato", 0),
    ("salad greens", 0),
    ("vegetables", 0),
    ("green beans", 0),
    ("cucumber", 0),
    ("herbs", 0),
    ("eggplant", 0),
    // Meat and Seafood
    ("chicken", 1),
    ("turkey", 1),
    ("beef", 1),
    ("steak", 1),
    ("pork", 1),
    ("salmon", 1),
    ("tuna", 1),
    ("cod", 1),
    ("shrimp", 1),
    ("fish", 1),
    // Dairy and Eggs
    ("egg", 2),
    ("milk", 2),
    ("yogurt", 2),
    ("cheese", 2),
    ("butter", 2),
    ("cream", 2),
    // Grains and Bakery
    ("rice", 3),
    ("quinoa", 3),
    ("pasta", 3),
    ("noodles", 3),
    ("couscous", 3),
    ("oats", 3),
    ("granola", 3),
    ("bread", 3),
    ("tortilla", 3),
    ("bagel", 3),
    // Pantry
    ("oil", 4),
    ("olive oil", 4),
    ("beans", 4),
    ("black beans", 4),
    ("lentils", 4),
    ("chickpeas", 4),
    ("tofu", 4),
    ("tempeh", 4),
    ("peanut butter", 4),
    ("almond butter", 4),
    ("honey", 4),
    ("soy sauce", 4),
    ("vinegar", 4),
    ("nuts", 4),
    ("almonds", 4),
    ("canned", 4),
    ("stock", 4),
    ("broth", 4),
    // Spices and Seasonings
    ("salt", 5),
    ("salt and pepper", 5),
    ("black pepper", 5),
    ("cumin", 5),
    ("paprika", 5),
    ("oregano", 5),
    ("cinnamon", 5),
    ("chili flakes", 5),
    ("seasoning", 5),
    ("spice", 5),
];

/// Category of an ingredient name by longest keyword match, "Other" when none match.
/// Keywords must start a word, so "veggie" does not count as "egg".
pub fn categorize(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    let idx = CATEGORY_KEYWORDS
        .iter()
        .filter(|(keyword, _)| mentions(&lower, keyword))
        .max_by_key(|(keyword, _)| keyword.len())
        .map_or(OTHER, |(_, idx)| *idx);
    CATEGORY_ORDER[idx]
}

/// Rounds a merged amount up so the list never under-buys. Mass and volume units go
/// to whole numbers, counts and spoons to the next quarter.
pub fn round_up_amount(amount: f64, unit: &str) -> f64 {
    match unit.trim().to_lowercase().as_str() {
        "g" | "ml" | "mg" => (amount - 1e-9).ceil(),
        _ => ((amount - 1e-9) * 4.0).ceil() / 4.0,
    }
}

/// Merges every ingredient in the plan by case-insensitive name within the same
/// unit, sums the amounts and groups the result into shopping-list sections.
///
/// Deterministic: the same days always produce the same list.
pub fn aggregate_grocery_list(days: &[CompiledDay]) -> Vec<GroceryCategory> {
    // (name key, unit key) -> (display name, display unit, total)
    let mut merged: BTreeMap<(String, String), (String, String, f64)> = BTreeMap::new();
    for ingredient in days.iter().flat_map(|d| &d.meals).flat_map(|m| &m.ingredients) {
        let name = ingredient.name.trim();
        let unit = ingredient.unit.trim();
        let key = (name.to_lowercase(), unit.to_lowercase());
        merged
            .entry(key)
            .or_insert_with(|| (name.to_string(), unit.to_string(), 0.0))
            .2 += ingredient.amount;
    }

    let mut buckets: Vec<Vec<GroceryItem>> = vec![Vec::new(); CATEGORY_ORDER.len()];
    for (display_name, display_unit, total) in merged.into_values() {
        let category = categorize(&display_name);
        let idx = CATEGORY_ORDER.iter().position(|c| *c == category).unwrap_or(OTHER);
        buckets[idx].push(GroceryItem {
            amount: round_up_amount(total, &display_unit),
            name: display_name,
            unit: display_unit,
        });
    }

    CATEGORY_ORDER
        .iter()
        .zip(buckets)
        .filter(|(_, items)| !items.is_empty())
        .map(|(category, mut items)| {
            items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.unit.cmp(&b.unit)));
            GroceryCategory {
                category: category.to_string(),
                items,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_aggregator::aggregate_day;
    use crate::models::{CompiledMeal, ConfidenceLevel, Ingredient, MealSlot};
    use crate::nutrition::NutritionVector;

    fn meal_with(ingredients: Vec<Ingredient>) -> CompiledMeal {
        let nutrition = NutritionVector::from_macros(30.0, 40.0, 10.0, None);
        CompiledMeal {
            slot: MealSlot::Lunch,
            name: "Bowl".to_string(),
            cuisine: String::new(),
            prep_time_minutes: 0,
            cook_time_minutes: 0,
            estimated_nutrition: nutrition,
            target_nutrition: nutrition,
            search_query: String::new(),
            suggested_servings: 1.0,
            primary_protein: String::new(),
            tags: Vec::new(),
            nutrition,
            confidence_level: ConfidenceLevel::AiEstimated,
            scale_factor: 1.0,
            matched_food: None,
            ingredients,
            instructions: Vec::new(),
        }
    }

    fn sample_days() -> Vec<CompiledDay> {
        let day1 = aggregate_day(
            1,
            false,
            2000,
            None,
            vec![
                meal_with(vec![
                    Ingredient::new("Chicken breast", 150.4, "g"),
                    Ingredient::new("Brown rice", 75.0, "g"),
                    Ingredient::new("Olive oil", 1.0, "tbsp"),
                ]),
                meal_with(vec![Ingredient::new("Eggs", 3.0, "large"), Ingredient::new("Spinach", 60.0, "g")]),
            ],
        );
        let day2 = aggregate_day(
            2,
            false,
            2000,
            None,
            vec![meal_with(vec![
                Ingredient::new("chicken breast ", 180.2, "G"),
                Ingredient::new("Olive oil", 1.3, "tbsp"),
                Ingredient::new("Salt and pepper", 1.0, "pinch"),
                Ingredient::new("Mystery sauce", 2.0, "tbsp"),
            ])],
        );
        vec![day1, day2]
    }

    #[test]
    fn test_same_name_and_unit_are_summed() {
        let list = aggregate_grocery_list(&sample_days());
        let meat = list.iter().find(|c| c.category == "Meat and Seafood").unwrap();
        assert_eq!(meat.items.len(), 1);
        assert_eq!(meat.items[0].name, "Chicken breast");
        assert_eq!(meat.items[0].amount, 331.0);
        assert!(meat.items[0].amount >= 180.2);

        let pantry = list.iter().find(|c| c.category == "Pantry").unwrap();
        assert_eq!(pantry.items[0].name, "Olive oil");
        assert_eq!(pantry.items[0].amount, 2.5);
    }

    #[test]
    fn test_categories_in_taxonomy_order() {
        let list = aggregate_grocery_list(&sample_days());
        let names: Vec<&str> = list.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(
            names,
            vec!["Produce", "Meat and Seafood", "Dairy and Eggs", "Grains and Bakery", "Pantry", "Spices and Seasonings", "Other"]
        );
        assert_eq!(list.last().unwrap().items[0].name, "Mystery sauce");
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let days = sample_days();
        assert_eq!(aggregate_grocery_list(&days), aggregate_grocery_list(&days));
    }

    #[test]
    fn test_longest_keyword_wins() {
        assert_eq!(categorize("Peanut butter"), "Pantry");
        assert_eq!(categorize("Salt and pepper"), "Spices and Seasonings");
        assert_eq!(categorize("Bell pepper"), "Produce");
        assert_eq!(categorize("Greek yogurt"), "Dairy and Eggs");
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert_eq!(categorize("Veggie burger"), "Other");
        assert_eq!(categorize("Egg, whole, boiled"), "Dairy and Eggs");
        assert_eq!(categorize("Eggs"), "Dairy and Eggs");
        assert_eq!(categorize("Eggplant"), "Produce");
        assert_eq!(categorize("Tofu, firm"), "Pantry");
    }

    #[test]
    fn test_round_up_amount() {
        assert_eq!(round_up_amount(330.6, "g"), 331.0);
        assert_eq!(round_up_amount(200.0, "g"), 200.0);
        assert_eq!(round_up_amount(2.3, "tbsp"), 2.5);
        assert_eq!(round_up_amount(3.0, "large"), 3.0);
    }
}

//! Keyword tables used to synthesize ingredient lists and cooking steps.
//!
//! Entries are matched in order against lower-cased text, so longer keywords that
//! contain shorter ones ("sweet potato" before "potato") must come first.

/// `(keyword, ingredient name, amount per serving, unit)`
pub type IngredientEntry = (&'static str, &'static str, f64, &'static str);

pub const PROTEINS: &[IngredientEntry] = &[
    ("chicken", "Chicken breast", 150.0, "g"),
    ("turkey", "Ground turkey", 150.0, "g"),
    ("steak", "Sirloin steak", 170.0, "g"),
    ("beef", "Lean ground beef", 150.0, "g"),
    ("pork", "Pork tenderloin", 150.0, "g"),
    ("salmon", "Salmon fillet", 150.0, "g"),
    ("tuna", "Canned tuna", 120.0, "g"),
    ("cod", "Cod fillet", 170.0, "g"),
    ("shrimp", "Shrimp", 150.0, "g"),
    ("prawn", "Shrimp", 150.0, "g"),
    ("tofu", "Firm tofu", 180.0, "g"),
    ("tempeh", "Tempeh", 150.0, "g"),
    ("egg", "Eggs", 3.0, "large"),
    ("yogurt", "Greek yogurt", 200.0, "g"),
    ("cottage cheese", "Cottage cheese", 200.0, "g"),
    ("lentil", "Lentils", 150.0, "g"),
    ("chickpea", "Chickpeas", 150.0, "g"),
    ("bean", "Black beans", 150.0, "g"),
];

pub const CARBS: &[IngredientEntry] = &[
    ("brown rice", "Brown rice", 75.0, "g"),
    ("rice", "Brown rice", 75.0, "g"),
    ("quinoa", "Quinoa", 60.0, "g"),
    ("pasta", "Whole wheat pasta", 80.0, "g"),
    ("spaghetti", "Whole wheat pasta", 80.0, "g"),
    ("noodle", "Rice noodles", 75.0, "g"),
    ("couscous", "Couscous", 60.0, "g"),
    ("sweet potato", "Sweet potato", 200.0, "g"),
    ("potato", "Potatoes", 200.0, "g"),
    ("oat", "Rolled oats", 50.0, "g"),
    ("porridge", "Rolled oats", 50.0, "g"),
    ("tortilla", "Whole wheat tortillas", 2.0, "pieces"),
    ("wrap", "Whole wheat tortillas", 2.0, "pieces"),
    ("toast", "Whole wheat bread", 2.0, "slices"),
    ("sandwich", "Whole wheat bread", 2.0, "slices"),
    ("bread", "Whole wheat bread", 2.0, "slices"),
    ("granola", "Granola", 40.0, "g"),
];

pub const VEGETABLES: &[IngredientEntry] = &[
    ("broccoli", "Broccoli", 100.0, "g"),
    ("spinach", "Spinach", 60.0, "g"),
    ("kale", "Kale", 60.0, "g"),
    ("bell pepper", "Bell pepper", 1.0, "piece"),
    ("peppers", "Bell pepper", 1.0, "piece"),
    ("zucchini", "Zucchini", 150.0, "g"),
    ("asparagus", "Asparagus", 120.0, "g"),
    ("mushroom", "Mushrooms", 100.0, "g"),
    ("tomato", "Tomatoes", 150.0, "g"),
    ("carrot", "Carrots", 100.0, "g"),
    ("green bean", "Green beans", 120.0, "g"),
    ("salad", "Mixed salad greens", 75.0, "g"),
    ("berr", "Mixed berries", 100.0, "g"),
    ("banana", "Banana", 1.0, "medium"),
    ("apple", "Apple", 1.0, "medium"),
    ("avocado", "Avocado", 0.5, "piece"),
    ("vegetable", "Mixed vegetables", 150.0, "g"),
    ("veggie", "Mixed vegetables", 150.0, "g"),
    ("stir-fry", "Stir-fry vegetables", 150.0, "g"),
];

pub const COOKING_FAT: IngredientEntry = ("oil", "Olive oil", 1.0, "tbsp");
pub const SEASONING: IngredientEntry = ("salt", "Salt and pepper", 1.0, "pinch");

/// Vegetable side used for cooked main meals when the text names none.
pub const DEFAULT_VEGETABLE: IngredientEntry = ("vegetable", "Mixed vegetables", 150.0, "g");

/// True when `keyword` occurs in `text` starting at a word boundary, so "cod" does
/// not fire on "avocado" while "berr" still matches "berries".
pub fn mentions(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(idx, _)| {
        text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// First table entry whose keyword occurs in `text`.
pub fn first_match(table: &'static [IngredientEntry], text: &str) -> Option<&'static IngredientEntry> {
    let text = text.to_lowercase();
    table.iter().find(|(keyword, ..)| mentions(&text, keyword))
}

/// Every distinct ingredient in `table` whose keyword occurs in `text`, in table order.
pub fn all_matches(table: &'static [IngredientEntry], text: &str) -> Vec<&'static IngredientEntry> {
    let text = text.to_lowercase();
    let mut found: Vec<&'static IngredientEntry> = Vec::new();
    for entry in table.iter().filter(|(keyword, ..)| mentions(&text, keyword)) {
        if !found.iter().any(|f| f.1 == entry.1) {
            found.push(entry);
        }
    }
    found
}

/// `(tag keywords, step templates)`. `{protein}`, `{minutes}` and `{half}` are filled in.
pub type InstructionTemplate = (&'static [&'static str], &'static [&'static str]);

pub const INSTRUCTION_TEMPLATES: &[InstructionTemplate] = &[
    (
        &["no-cook", "no cook", "raw", "overnight"],
        &[
            "Combine all ingredients in a bowl or container.",
            "Mix well and season to taste.",
            "Serve immediately or chill until ready to eat.",
        ],
    ),
    (
        &["grill", "grilled", "bbq"],
        &[
            "Preheat the grill to medium-high heat.",
            "Season the {protein} and grill for about {half} minutes per side until cooked through.",
            "Prepare the remaining ingredients while the {protein} rests for 5 minutes.",
            "Slice and serve together.",
        ],
    ),
    (
        &["stir-fry", "stir fry", "wok"],
        &[
            "Slice the {protein} into bite-sized pieces and prepare the vegetables.",
            "Heat the oil in a wok over high heat and stir-fry the {protein} until browned.",
            "Add the vegetables and cook for {minutes} minutes in total, tossing frequently.",
            "Season and serve immediately.",
        ],
    ),
    (
        &["bake", "baked", "roast", "roasted", "oven", "sheet-pan"],
        &[
            "Preheat the oven to 200°C (400°F).",
            "Arrange the {protein} and vegetables on a lined baking sheet and season.",
            "Bake for {minutes} minutes until cooked through.",
            "Serve warm.",
        ],
    ),
];

pub const DEFAULT_INSTRUCTIONS: &[&str] = &[
    "Heat the oil in a pan over medium heat.",
    "Cook the {protein} for {minutes} minutes, turning as needed.",
    "Add the remaining ingredients and heat through.",
    "Season to taste and serve.",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longer_keywords_win() {
        assert_eq!(first_match(CARBS, "Sweet Potato Hash").unwrap().1, "Sweet potato");
        assert_eq!(first_match(CARBS, "baked potato").unwrap().1, "Potatoes");
        assert!(first_match(PROTEINS, "garden salad").is_none());
        assert!(first_match(PROTEINS, "avocado toast").is_none());
        assert_eq!(first_match(PROTEINS, "Egg white omelette").unwrap().1, "Eggs");
    }

    #[test]
    fn test_all_matches_dedupes_names() {
        let found = all_matches(VEGETABLES, "spinach salad with berries and mixed veggies");
        let names: Vec<&str> = found.iter().map(|e| e.1).collect();
        assert_eq!(names, vec!["Spinach", "Mixed salad greens", "Mixed berries", "Mixed vegetables"]);
    }
}

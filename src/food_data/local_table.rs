use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::path::Path;
use tracing::info;

use crate::error::ProviderError;
use crate::food_data::{FoodCandidate, FoodDataProvider, FoodDetails, FoodServing};

// Expected column headers, nutrients per 100 g.
const NAME_COL: &str = "Name";
const KCAL_COL: &str = "kcal/100g";
const PROTEIN_COL: &str = "Protein (g/100g)";
const CARB_COL: &str = "Carbohydrate (g/100g)";
const FAT_COL: &str = "Fat (g/100g)";
const FIBER_COL: &str = "Fiber (g/100g)";

const PROVIDER_NAME: &str = "local";

#[derive(Debug, Clone, PartialEq)]
pub struct LocalFoodItem {
    pub name: String,
    pub kcal_per_100g: Option<f64>,
    pub protein_g_per_100g: Option<f64>,
    pub carbohydrate_g_per_100g: Option<f64>,
    pub fat_g_per_100g: Option<f64>,
    pub fiber_g_per_100g: Option<f64>,
}

impl LocalFoodItem {
    fn new(name: &str, kcal: f64, protein: f64, carbs: f64, fat: f64, fiber: f64) -> Self {
        Self {
            name: name.to_string(),
            kcal_per_100g: Some(kcal),
            protein_g_per_100g: Some(protein),
            carbohydrate_g_per_100g: Some(carbs),
            fat_g_per_100g: Some(fat),
            fiber_g_per_100g: Some(fiber),
        }
    }

    fn serving(&self) -> FoodServing {
        let protein = self.protein_g_per_100g.unwrap_or(0.0);
        let carbs = self.carbohydrate_g_per_100g.unwrap_or(0.0);
        let fat = self.fat_g_per_100g.unwrap_or(0.0);
        FoodServing {
            description: "100 g".to_string(),
            gram_weight: Some(100.0),
            unit: Some("g".to_string()),
            calories: self.kcal_per_100g.unwrap_or(4.0 * protein + 4.0 * carbs + 9.0 * fat),
            protein,
            carbs,
            fat,
            fiber: self.fiber_g_per_100g,
        }
    }
}

/// Primary curated food table held in memory, nutrients per 100 g.
#[derive(Debug, Clone)]
pub struct LocalFoodTable {
    items: Vec<LocalFoodItem>,
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok()
}

// Preparation words say nothing about which food is meant.
const IGNORED_WORDS: &[&str] = &[
    "and", "with", "baked", "boiled", "cooked", "dry", "fried", "grilled", "plain", "raw", "roasted", "scrambled",
    "steamed",
];

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
        .filter(|t| !IGNORED_WORDS.contains(&t.as_str()))
        .collect()
}

/// The dish's main component: everything before the first "with".
fn main_clause(query: &str) -> &str {
    match query.to_ascii_lowercase().find(" with ") {
        Some(idx) => &query[..idx],
        None => query,
    }
}

fn overlap(query_tokens: &[String], name_tokens: &[String]) -> usize {
    query_tokens
        .iter()
        .filter(|q| name_tokens.iter().any(|n| n == *q || n.trim_end_matches('s') == q.trim_end_matches('s')))
        .count()
}

impl LocalFoodTable {
    pub fn from_items(items: Vec<LocalFoodItem>) -> Self {
        Self { items }
    }

    /// Loads the table from a CSV export. The fiber column is optional.
    pub fn load_csv(csv_path: &Path) -> Result<Self> {
        if !csv_path.exists() {
            return Err(anyhow::anyhow!("Food table CSV file not found at: {:?}", csv_path));
        }

        let file = std::fs::File::open(csv_path)
            .with_context(|| format!("Failed to open food table CSV file at {:?}", csv_path))?;
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", name))
        };
        let name_idx = column(NAME_COL)?;
        let kcal_idx = column(KCAL_COL)?;
        let protein_idx = column(PROTEIN_COL)?;
        let carb_idx = column(CARB_COL)?;
        let fat_idx = column(FAT_COL)?;
        let fiber_idx = column(FIBER_COL).ok();

        let mut items = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;

            let name = record.get(name_idx).unwrap_or_default().trim().to_string();
            if name.is_empty() {
                continue;
            }

            items.push(LocalFoodItem {
                name,
                kcal_per_100g: record.get(kcal_idx).and_then(parse_optional_f64),
                protein_g_per_100g: record.get(protein_idx).and_then(parse_optional_f64),
                carbohydrate_g_per_100g: record.get(carb_idx).and_then(parse_optional_f64),
                fat_g_per_100g: record.get(fat_idx).and_then(parse_optional_f64),
                fiber_g_per_100g: fiber_idx.and_then(|i| record.get(i)).and_then(parse_optional_f64),
            });
        }

        if items.is_empty() {
            return Err(anyhow::anyhow!("No valid food data loaded from {:?}", csv_path));
        }
        info!(items = items.len(), path = ?csv_path, "Loaded local food table");
        Ok(Self { items })
    }

    /// Small built-in table of common whole foods, used when no CSV is configured.
    pub fn builtin() -> Self {
        Self::from_items(vec![
            LocalFoodItem::new("Chicken breast, roasted", 165.0, 31.0, 0.0, 3.6, 0.0),
            LocalFoodItem::new("Turkey breast, roasted", 147.0, 30.1, 0.0, 2.1, 0.0),
            LocalFoodItem::new("Beef, lean ground, cooked", 217.0, 26.1, 0.0, 11.8, 0.0),
            LocalFoodItem::new("Salmon, atlantic, baked", 206.0, 22.1, 0.0, 12.4, 0.0),
            LocalFoodItem::new("Cod, baked", 105.0, 22.8, 0.0, 0.9, 0.0),
            LocalFoodItem::new("Shrimp, cooked", 99.0, 24.0, 0.2, 0.3, 0.0),
            LocalFoodItem::new("Tofu, firm", 144.0, 17.3, 2.8, 8.7, 2.3),
            LocalFoodItem::new("Egg, whole, boiled", 155.0, 12.6, 1.1, 10.6, 0.0),
            LocalFoodItem::new("Greek yogurt, plain, nonfat", 59.0, 10.2, 3.6, 0.4, 0.0),
            LocalFoodItem::new("Cottage cheese, low fat", 72.0, 12.4, 2.7, 1.0, 0.0),
            LocalFoodItem::new("Oats, rolled, dry", 379.0, 13.2, 67.7, 6.5, 10.1),
            LocalFoodItem::new("Rice, brown, cooked", 123.0, 2.7, 25.6, 1.0, 1.6),
            LocalFoodItem::new("Rice, white, cooked", 130.0, 2.7, 28.2, 0.3, 0.4),
            LocalFoodItem::new("Quinoa, cooked", 120.0, 4.4, 21.3, 1.9, 2.8),
            LocalFoodItem::new("Pasta, whole wheat, cooked", 149.0, 5.8, 30.1, 1.7, 3.9),
            LocalFoodItem::new("Sweet potato, baked", 90.0, 2.0, 20.7, 0.2, 3.3),
            LocalFoodItem::new("Lentils, cooked", 116.0, 9.0, 20.1, 0.4, 7.9),
            LocalFoodItem::new("Chickpeas, cooked", 164.0, 8.9, 27.4, 2.6, 7.6),
            LocalFoodItem::new("Black beans, cooked", 132.0, 8.9, 23.7, 0.5, 8.7),
            LocalFoodItem::new("Broccoli, steamed", 35.0, 2.4, 7.2, 0.4, 3.3),
            LocalFoodItem::new("Spinach, raw", 23.0, 2.9, 3.6, 0.4, 2.2),
            LocalFoodItem::new("Banana, raw", 89.0, 1.1, 22.8, 0.3, 2.6),
            LocalFoodItem::new("Blueberries, raw", 57.0, 0.7, 14.5, 0.3, 2.4),
            LocalFoodItem::new("Avocado, raw", 160.0, 2.0, 8.5, 14.7, 6.7),
            LocalFoodItem::new("Almonds, raw", 579.0, 21.2, 21.6, 49.9, 12.5),
            LocalFoodItem::new("Peanut butter, smooth", 588.0, 25.1, 20.0, 50.4, 6.0),
            LocalFoodItem::new("Whole wheat bread", 247.0, 13.0, 41.3, 3.4, 6.8),
        ])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Candidates ranked by overlap with the dish's main component first, then by
    /// overlap with the whole query.
    fn rank(&self, query: &str) -> Vec<(usize, (usize, usize))> {
        let query_tokens = tokens(query);
        let main_tokens = tokens(main_clause(query));
        let mut scored: Vec<(usize, (usize, usize))> = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let name_tokens = tokens(&item.name);
                let total = overlap(&query_tokens, &name_tokens);
                (total > 0).then(|| (idx, (overlap(&main_tokens, &name_tokens), total)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
    }
}

#[async_trait]
impl FoodDataProvider for LocalFoodTable {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<FoodCandidate>, ProviderError> {
        Ok(self
            .rank(query)
            .into_iter()
            .take(max_results)
            .map(|(idx, _)| FoodCandidate {
                id: idx.to_string(),
                name: self.items[idx].name.clone(),
                description: format!("{} (per 100 g)", self.items[idx].name),
            })
            .collect())
    }

    async fn get_details(&self, id: &str) -> Result<FoodDetails, ProviderError> {
        let item = id
            .parse::<usize>()
            .ok()
            .and_then(|idx| self.items.get(idx))
            .ok_or_else(|| ProviderError::NotFound {
                provider: PROVIDER_NAME.to_string(),
                id: id.to_string(),
            })?;
        Ok(FoodDetails { servings: vec![item.serving()] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv_file() -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{},{},{},{},{},{}", NAME_COL, KCAL_COL, PROTEIN_COL, CARB_COL, FAT_COL, FIBER_COL)?;
        writeln!(file, "Apple,52,0.3,13.8,0.2,2.4")?;
        writeln!(file, "Banana,,1.1,22.8,0.3,2.6")?; // missing kcal
        writeln!(file, "Carrot,41,0.9,9.6,0.2,2.8")?;
        writeln!(file, ",10,10,10,10,10")?; // empty name
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_csv_success() -> Result<()> {
        let file = create_test_csv_file()?;
        let table = LocalFoodTable::load_csv(file.path())?;
        assert_eq!(table.len(), 3);

        let banana = table.items.iter().find(|item| item.name == "Banana").unwrap();
        assert_eq!(banana.kcal_per_100g, None);
        // Missing kcal falls back to the macro equivalent.
        let serving = banana.serving();
        assert!((serving.calories - (4.4 + 91.2 + 2.7)).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_load_csv_missing_column() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{},{},{},{}", NAME_COL, PROTEIN_COL, CARB_COL, FAT_COL)?;
        writeln!(file, "Apple,0.3,13.8,0.2")?;
        file.flush()?;

        let result = LocalFoodTable::load_csv(file.path());
        assert!(result.unwrap_err().to_string().contains(&format!("Column '{}' not found", KCAL_COL)));
        Ok(())
    }

    #[test]
    fn test_load_csv_file_not_found() {
        let result = LocalFoodTable::load_csv(Path::new("this_file_does_not_exist.csv"));
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_search_ranks_by_word_overlap() {
        let table = LocalFoodTable::builtin();
        let results = table.search("grilled chicken breast with rice", 3).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].name, "Chicken breast, roasted");

        let details = table.get_details(&results[0].id).await.unwrap();
        assert_eq!(details.servings.len(), 1);
        assert_eq!(details.servings[0].gram_weight, Some(100.0));
        assert_eq!(details.servings[0].calories, 165.0);
    }

    #[tokio::test]
    async fn test_main_component_outranks_side_dish() {
        let table = LocalFoodTable::builtin();
        let results = table.search("baked salmon with sweet potato and asparagus", 3).await.unwrap();
        assert_eq!(results[0].name, "Salmon, atlantic, baked");
        assert!(results.iter().any(|r| r.name == "Sweet potato, baked"));

        let results = table.search("scrambled eggs with spinach and toast", 3).await.unwrap();
        assert_eq!(results[0].name, "Egg, whole, boiled");

        // no main-component match, so the side dish is still better than nothing
        let results = table.search("tuna with brown rice and carrot", 3).await.unwrap();
        assert_eq!(results[0].name, "Rice, brown, cooked");
    }

    #[tokio::test]
    async fn test_unknown_food() {
        let table = LocalFoodTable::builtin();
        assert!(table.search("zzz qqq", 5).await.unwrap().is_empty());
        assert!(matches!(table.get_details("9999").await, Err(ProviderError::NotFound { .. })));
    }
}

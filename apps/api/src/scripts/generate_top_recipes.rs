//! Fill the top-recipes database with popular dishes per region.
//!
//! Each region is topped up to `RECIPES_PER_REGION` entries, one LLM batch at
//! a time. Recipes already stored for the region are skipped, so the script
//! can be re-run after an interruption.

use anyhow::{anyhow, Context};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use recipe_recommender_api::{
    models::{Ingredient, NewTopRecipe, Taste},
    services::{
        llm_text::strip_code_fences, prompts, GeminiClient, LanguageModel, TopRecipeStore,
    },
    Config,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REGIONS: [&str; 8] = [
    "Indian",
    "Chinese",
    "Italian",
    "Mexican",
    "Japanese",
    "Mediterranean",
    "Thai",
    "Korean",
];
const RECIPES_PER_REGION: usize = 30;
const RECIPES_PER_BATCH: usize = 10;
const DELAY_BETWEEN_BATCHES: Duration = Duration::from_secs(3);
const MAX_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_TASTE_INTENSITY: i64 = 3;

#[derive(Debug, Deserialize)]
struct GeneratedIngredient {
    name: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    preparation: String,
}

/// One element of the JSON array the model returns.
#[derive(Debug, Deserialize)]
struct GeneratedRecipe {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    prep_time_minutes: Option<i64>,
    #[serde(default)]
    cook_time_minutes: Option<i64>,
    #[serde(default)]
    total_time_minutes: Option<i64>,
    #[serde(default)]
    servings: Option<i64>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    tastes: Vec<String>,
    #[serde(default)]
    meal_types: Vec<String>,
    #[serde(default)]
    dietary_tags: Vec<String>,
    #[serde(default)]
    ingredients: Vec<GeneratedIngredient>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    calories: Option<i64>,
    #[serde(default)]
    rating: Option<f64>,
}

fn normalize_difficulty(difficulty: Option<&str>) -> String {
    match difficulty.map(str::trim) {
        Some(d) if d.eq_ignore_ascii_case("easy") => "Easy",
        Some(d) if d.eq_ignore_ascii_case("hard") => "Hard",
        _ => "Medium",
    }
    .to_string()
}

impl GeneratedRecipe {
    /// Stored under the region it was generated for, whatever cuisine label
    /// the model attached.
    fn into_new_recipe(self, region: &str) -> NewTopRecipe {
        let total = self.total_time_minutes.or_else(|| {
            match (self.prep_time_minutes, self.cook_time_minutes) {
                (Some(prep), Some(cook)) => Some(prep + cook),
                _ => None,
            }
        });

        NewTopRecipe {
            name: self.name.trim().to_string(),
            description: Some(self.description),
            region: Some(region.to_string()),
            tastes: self
                .tastes
                .into_iter()
                .map(|name| Taste {
                    name,
                    intensity: DEFAULT_TASTE_INTENSITY,
                })
                .collect(),
            meal_types: self.meal_types,
            dietary_tags: self.dietary_tags,
            difficulty: Some(normalize_difficulty(self.difficulty.as_deref())),
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            total_time_minutes: total,
            servings: self.servings.or(Some(4)),
            calories: self.calories,
            ingredients: self
                .ingredients
                .into_iter()
                .map(|i| Ingredient {
                    quantity: i.quantity,
                    unit: i.unit,
                    name: i.name,
                    preparation_note: i.preparation,
                })
                .collect(),
            steps: self.instructions,
            image_url: None,
            step_image_urls: Vec::new(),
            rating: self.rating.unwrap_or(4.0).clamp(0.0, 5.0),
            popularity_score: 0.0,
            source: "gemini".to_string(),
        }
    }
}

fn parse_batch(reply: &str) -> anyhow::Result<Vec<GeneratedRecipe>> {
    let recipes: Vec<GeneratedRecipe> = serde_json::from_str(strip_code_fences(reply))
        .context("Response is not a JSON array of recipes")?;
    if recipes.is_empty() {
        return Err(anyhow!("No valid recipes in response"));
    }
    Ok(recipes)
}

/// Ask for one batch, retrying with a doubling delay.
async fn generate_batch(
    llm: &dyn LanguageModel,
    region: &str,
    batch_num: usize,
    existing_count: usize,
) -> anyhow::Result<Vec<GeneratedRecipe>> {
    let prompt = prompts::generate_batch(region, batch_num, existing_count);
    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempt = 1;

    loop {
        let result = match llm.complete(&prompt).await {
            Ok(reply) => parse_batch(&reply),
            Err(e) => {
                if e.is_rate_limited() {
                    warn!("⏳ Rate limited on {} batch {}", region, batch_num);
                }
                Err(e.into())
            }
        };

        match result {
            Ok(recipes) => return Ok(recipes),
            Err(e) if attempt >= MAX_ATTEMPTS => {
                return Err(e.context(format!("Failed after {} attempts", MAX_ATTEMPTS)));
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed, retrying in {}s: {}",
                    attempt,
                    MAX_ATTEMPTS,
                    delay.as_secs(),
                    e
                );
                sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

struct RegionSummary {
    region: &'static str,
    inserted: usize,
    skipped: usize,
    total: i64,
}

async fn generate_for_region(
    llm: &dyn LanguageModel,
    store: &TopRecipeStore,
    region: &'static str,
    progress: &ProgressBar,
) -> anyhow::Result<RegionSummary> {
    let existing = usize::try_from(store.count_for_region(region).await?).unwrap_or(0);
    let mut summary = RegionSummary {
        region,
        inserted: 0,
        skipped: 0,
        total: 0,
    };

    if existing >= RECIPES_PER_REGION {
        info!("✅ {} already has {} recipes", region, existing);
        summary.total = existing as i64;
        return Ok(summary);
    }

    let needed = RECIPES_PER_REGION - existing;
    let batches = needed.div_ceil(RECIPES_PER_BATCH);
    progress.set_length(needed as u64);
    progress.set_position(0);
    progress.set_message(region.to_string());

    for batch_num in 1..=batches {
        let recipes =
            match generate_batch(llm, region, batch_num, existing + summary.inserted).await {
                Ok(recipes) => recipes,
                Err(e) => {
                    error!("❌ {} batch {} failed: {:#}", region, batch_num, e);
                    sleep(DELAY_BETWEEN_BATCHES).await;
                    continue;
                }
            };

        for recipe in recipes {
            if store.exists(&recipe.name, region).await? {
                summary.skipped += 1;
                continue;
            }
            let name = recipe.name.clone();
            match store.create(&recipe.into_new_recipe(region)).await {
                Ok(_) => {
                    summary.inserted += 1;
                    progress.inc(1);
                }
                Err(e) => warn!("Could not store '{}': {}", name, e),
            }
        }

        if existing + summary.inserted >= RECIPES_PER_REGION {
            break;
        }
        if batch_num < batches {
            sleep(DELAY_BETWEEN_BATCHES).await;
        }
    }

    summary.total = store.count_for_region(region).await?;
    Ok(summary)
}

fn print_summary(summaries: &[RegionSummary]) {
    println!();
    println!("{}", style("Generation summary").bold().underlined());
    println!(
        "{:<15} {:>9} {:>8} {:>6}",
        "Region", "Inserted", "Skipped", "Total"
    );
    for s in summaries {
        let total = if s.total >= RECIPES_PER_REGION as i64 {
            style(s.total.to_string()).green()
        } else {
            style(s.total.to_string()).yellow()
        };
        println!(
            "{:<15} {:>9} {:>8} {:>6}",
            s.region, s.inserted, s.skipped, total
        );
    }
    let inserted: usize = summaries.iter().map(|s| s.inserted).sum();
    println!("{}", style(format!("{} recipes added", inserted)).cyan().bold());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "generate_top_recipes=info,recipe_recommender_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let llm = GeminiClient::from_config(&config);
    let store = TopRecipeStore::connect(&config.top_recipes_db_path)
        .await
        .context("Failed to open top recipes database")?;

    info!(
        "🚀 Generating recipes with {} into {}",
        llm.model_name(),
        config.top_recipes_db_path
    );

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:<14} [{bar:40.cyan/blue}] {pos}/{len}")
            .progress_chars("#>-"),
    );

    let mut summaries = Vec::with_capacity(REGIONS.len());
    for region in REGIONS {
        match generate_for_region(&llm, &store, region, &progress).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => error!("❌ {} failed: {:#}", region, e),
        }
    }
    progress.finish_and_clear();

    print_summary(&summaries);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_recommender_api::services::FakeLanguageModel;

    const REPLY: &str = r#"```json
[
  {
    "name": "Pad Thai",
    "description": "Stir-fried rice noodles.",
    "cuisine": "Central Thai",
    "prep_time_minutes": 15,
    "cook_time_minutes": 10,
    "difficulty": "Easy|Medium|Hard",
    "tastes": ["Sweet", "Sour"],
    "meal_types": ["Lunch", "Dinner"],
    "ingredients": [{"name": "rice noodles", "quantity": "200", "unit": "g", "preparation": "soaked"}],
    "instructions": ["Step 1: Soak noodles", "Step 2: Stir-fry"],
    "rating": 7.0
  }
]
```"#;

    #[test]
    fn test_fenced_reply_converts_to_store_record() {
        let recipes = parse_batch(REPLY).unwrap();
        let recipe = recipes.into_iter().next().unwrap().into_new_recipe("Thai");

        assert_eq!(recipe.region.as_deref(), Some("Thai"));
        assert_eq!(recipe.total_time_minutes, Some(25));
        assert_eq!(recipe.difficulty.as_deref(), Some("Medium"));
        assert_eq!(recipe.rating, 5.0);
        assert_eq!(recipe.source, "gemini");
        assert!(recipe.tastes.iter().all(|t| t.intensity == 3));
        assert_eq!(recipe.ingredients[0].preparation_note, "soaked");
        assert_eq!(recipe.steps.len(), 2);
    }

    #[test]
    fn test_empty_or_invalid_reply_is_rejected() {
        assert!(parse_batch("[]").is_err());
        assert!(parse_batch("Here are some recipes!").is_err());
    }

    #[tokio::test]
    async fn test_region_is_topped_up_and_duplicates_skipped() {
        let store = TopRecipeStore::in_memory().await.unwrap();
        let llm = FakeLanguageModel::new().with_default_response(REPLY);
        let progress = ProgressBar::hidden();

        let summary = generate_for_region(&llm, &store, "Thai", &progress)
            .await
            .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total, 1);
        assert!(store.exists("Pad Thai", "Thai").await.unwrap());
    }
}

//! SQLite store for the curated `top_recipes` table.
//!
//! List-like columns use the pipe encoding from [`super::recipe_codec`].

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::recipe_codec::{
    decode_ingredients, decode_list, decode_steps, decode_tastes, encode_ingredients, encode_list,
    encode_steps, encode_tastes, fit_step_images, validate_difficulty, validate_rating, CodecError,
};
use crate::error::{ApiError, Result};
use crate::models::{
    AvailableFilters, NewTopRecipe, RecipeFieldsPatch, RecipeListing, RecipeStats, TopRated,
    TopRecipe, TopRecipePage, TopRecipePatch, TopRecipeQuery, TopRecipeSummary,
};

pub const MAX_PAGE_SIZE: u32 = 100;
const TOP_RATED_COUNT: i64 = 5;

const SORT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "region",
    "difficulty",
    "prep_time_minutes",
    "cook_time_minutes",
    "total_time_minutes",
    "servings",
    "calories",
    "rating",
    "popularity_score",
    "created_at",
    "updated_at",
];

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS top_recipes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    region TEXT,
    tastes TEXT,
    meal_types TEXT,
    dietary_tags TEXT,
    difficulty TEXT,
    prep_time_minutes INTEGER,
    cook_time_minutes INTEGER,
    total_time_minutes INTEGER,
    servings INTEGER,
    calories INTEGER,
    ingredients TEXT,
    steps TEXT,
    image_url TEXT,
    step_image_urls TEXT,
    popularity_score REAL DEFAULT 0,
    rating REAL DEFAULT 0,
    source TEXT,
    created_at TEXT,
    updated_at TEXT
)";

#[derive(Debug, FromRow)]
struct TopRecipeRow {
    id: i64,
    name: String,
    description: Option<String>,
    region: Option<String>,
    tastes: Option<String>,
    meal_types: Option<String>,
    dietary_tags: Option<String>,
    difficulty: Option<String>,
    prep_time_minutes: Option<i64>,
    cook_time_minutes: Option<i64>,
    total_time_minutes: Option<i64>,
    servings: Option<i64>,
    calories: Option<i64>,
    ingredients: Option<String>,
    steps: Option<String>,
    image_url: Option<String>,
    step_image_urls: Option<String>,
    popularity_score: Option<f64>,
    rating: Option<f64>,
    source: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<TopRecipeRow> for TopRecipe {
    fn from(row: TopRecipeRow) -> Self {
        let steps = decode_steps(row.steps.as_deref());
        let step_image_urls = fit_step_images(decode_steps(row.step_image_urls.as_deref()), steps.len());
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            region: row.region,
            tastes: decode_tastes(row.tastes.as_deref()),
            meal_types: decode_list(row.meal_types.as_deref()),
            dietary_tags: decode_list(row.dietary_tags.as_deref()),
            difficulty: row.difficulty,
            prep_time_minutes: row.prep_time_minutes,
            cook_time_minutes: row.cook_time_minutes,
            total_time_minutes: row.total_time_minutes,
            servings: row.servings,
            calories: row.calories,
            ingredients: decode_ingredients(row.ingredients.as_deref()),
            steps,
            image_url: row.image_url,
            step_image_urls,
            rating: row.rating.unwrap_or_default(),
            popularity_score: row.popularity_score.unwrap_or_default(),
            source: row.source.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Validated, pipe-encoded column values of one recipe.
struct EncodedColumns {
    tastes: String,
    meal_types: String,
    dietary_tags: String,
    ingredients: String,
    steps: String,
    step_image_urls: String,
}

fn encode_columns(recipe: &NewTopRecipe) -> std::result::Result<EncodedColumns, CodecError> {
    if let Some(difficulty) = &recipe.difficulty {
        validate_difficulty(difficulty)?;
    }
    validate_rating(recipe.rating)?;

    let images = fit_step_images(recipe.step_image_urls.clone(), recipe.steps.len());
    Ok(EncodedColumns {
        tastes: encode_tastes(&recipe.tastes)?,
        meal_types: encode_list("meal_types", &recipe.meal_types)?,
        dietary_tags: encode_list("dietary_tags", &recipe.dietary_tags)?,
        ingredients: encode_ingredients(&recipe.ingredients)?,
        steps: encode_steps("steps", &recipe.steps)?,
        step_image_urls: encode_steps("step_image_urls", &images)?,
    })
}

fn into_new(recipe: TopRecipe) -> NewTopRecipe {
    NewTopRecipe {
        name: recipe.name,
        description: recipe.description,
        region: recipe.region,
        tastes: recipe.tastes,
        meal_types: recipe.meal_types,
        dietary_tags: recipe.dietary_tags,
        difficulty: recipe.difficulty,
        prep_time_minutes: recipe.prep_time_minutes,
        cook_time_minutes: recipe.cook_time_minutes,
        total_time_minutes: recipe.total_time_minutes,
        servings: recipe.servings,
        calories: recipe.calories,
        ingredients: recipe.ingredients,
        steps: recipe.steps,
        image_url: recipe.image_url,
        step_image_urls: recipe.step_image_urls,
        rating: recipe.rating,
        popularity_score: recipe.popularity_score,
        source: recipe.source,
    }
}

fn apply_patch(target: &mut NewTopRecipe, patch: TopRecipePatch) {
    macro_rules! set {
        ($($field:ident),*) => {
            $(if let Some(value) = patch.$field { target.$field = value; })*
        };
    }
    macro_rules! set_opt {
        ($($field:ident),*) => {
            $(if let Some(value) = patch.$field { target.$field = Some(value); })*
        };
    }
    set!(name, tastes, meal_types, dietary_tags, ingredients, steps, step_image_urls, rating, popularity_score);
    set_opt!(
        description,
        region,
        difficulty,
        prep_time_minutes,
        cook_time_minutes,
        total_time_minutes,
        servings,
        calories,
        image_url
    );
}

fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Facet values are listed trimmed, without blanks.
fn filter_values(values: Vec<String>) -> impl Iterator<Item = String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &TopRecipeQuery) {
    if let Some(region) = query.region.as_ref().filter(|r| !r.is_empty()) {
        qb.push(" AND region = ").push_bind(region.clone());
    }
    if let Some(difficulty) = query.difficulty.as_ref().filter(|d| !d.is_empty()) {
        qb.push(" AND difficulty = ").push_bind(difficulty.clone());
    }

    let meal_types = split_csv(query.meal_types.as_deref());
    if !meal_types.is_empty() {
        qb.push(" AND (");
        for (i, meal_type) in meal_types.into_iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("meal_types LIKE ").push_bind(format!("%{}%", meal_type));
        }
        qb.push(")");
    }

    for tag in split_csv(query.dietary_tags.as_deref()) {
        qb.push(" AND dietary_tags LIKE ").push_bind(format!("%{}%", tag));
    }

    if let Some(max_time) = query.max_time {
        qb.push(" AND total_time_minutes <= ").push_bind(max_time);
    }
    if let Some(min_rating) = query.min_rating {
        qb.push(" AND rating >= ").push_bind(min_rating);
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR description LIKE ")
            .push_bind(pattern.clone())
            .push(" OR ingredients LIKE ")
            .push_bind(pattern.clone())
            .push(" OR steps LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn sort_clause(query: &TopRecipeQuery) -> (&'static str, &'static str) {
    let column = SORT_COLUMNS
        .iter()
        .find(|c| **c == query.sort_by)
        .copied()
        .unwrap_or("popularity_score");
    let order = if query.sort_order.eq_ignore_ascii_case("ASC") {
        "ASC"
    } else {
        "DESC"
    };
    (column, order)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Recipe with ID {} not found", id))
}

#[derive(Debug, Clone)]
pub struct TopRecipeStore {
    pool: SqlitePool,
}

impl TopRecipeStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!("📚 Opened top recipes database at {}", path);
        Self::with_pool(pool).await
    }

    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn list(&self, query: &TopRecipeQuery) -> Result<TopRecipePage> {
        if query.page < 1 {
            return Err(ApiError::InvalidInput("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&query.page_size) {
            return Err(ApiError::InvalidInput(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM top_recipes WHERE 1 = 1");
        push_filters(&mut count, query);
        let total_count: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let (column, order) = sort_clause(query);
        let page_size = i64::from(query.page_size);
        let offset = i64::from(query.page - 1) * page_size;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM top_recipes WHERE 1 = 1");
        push_filters(&mut select, query);
        select
            .push(format!(" ORDER BY {} {}", column, order))
            .push(" LIMIT ")
            .push_bind(page_size)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows: Vec<TopRecipeRow> = select.build_query_as().fetch_all(&self.pool).await?;

        let recipes: Vec<TopRecipe> = rows.into_iter().map(TopRecipe::from).collect();
        let recipes = if query.detailed {
            RecipeListing::Detailed(recipes)
        } else {
            RecipeListing::Summary(recipes.into_iter().map(TopRecipeSummary::from).collect())
        };

        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + page_size - 1) / page_size
        };

        Ok(TopRecipePage {
            recipes,
            total_count,
            page: query.page,
            page_size: query.page_size,
            total_pages,
            success: true,
        })
    }

    pub async fn get(&self, id: i64) -> Result<TopRecipe> {
        let row: Option<TopRecipeRow> = sqlx::query_as("SELECT * FROM top_recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TopRecipe::from).ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, recipe: &NewTopRecipe) -> Result<TopRecipe> {
        let columns = encode_columns(recipe)?;
        let now = Utc::now().to_rfc3339();

        let id = sqlx::query(
            "INSERT INTO top_recipes (
                name, description, region, tastes, meal_types, dietary_tags, difficulty,
                prep_time_minutes, cook_time_minutes, total_time_minutes, servings, calories,
                ingredients, steps, image_url, step_image_urls, popularity_score, rating,
                source, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.region)
        .bind(&columns.tastes)
        .bind(&columns.meal_types)
        .bind(&columns.dietary_tags)
        .bind(&recipe.difficulty)
        .bind(recipe.prep_time_minutes)
        .bind(recipe.cook_time_minutes)
        .bind(recipe.total_time_minutes)
        .bind(recipe.servings)
        .bind(recipe.calories)
        .bind(&columns.ingredients)
        .bind(&columns.steps)
        .bind(&recipe.image_url)
        .bind(&columns.step_image_urls)
        .bind(recipe.popularity_score)
        .bind(recipe.rating)
        .bind(&recipe.source)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get(id).await
    }

    /// Overwrite every column of an existing recipe.
    pub async fn replace(&self, id: i64, recipe: &NewTopRecipe) -> Result<TopRecipe> {
        let columns = encode_columns(recipe)?;

        let result = sqlx::query(
            "UPDATE top_recipes SET
                name = ?, description = ?, region = ?, tastes = ?, meal_types = ?,
                dietary_tags = ?, difficulty = ?, prep_time_minutes = ?, cook_time_minutes = ?,
                total_time_minutes = ?, servings = ?, calories = ?, ingredients = ?, steps = ?,
                image_url = ?, step_image_urls = ?, popularity_score = ?, rating = ?,
                source = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.region)
        .bind(&columns.tastes)
        .bind(&columns.meal_types)
        .bind(&columns.dietary_tags)
        .bind(&recipe.difficulty)
        .bind(recipe.prep_time_minutes)
        .bind(recipe.cook_time_minutes)
        .bind(recipe.total_time_minutes)
        .bind(recipe.servings)
        .bind(recipe.calories)
        .bind(&columns.ingredients)
        .bind(&columns.steps)
        .bind(&recipe.image_url)
        .bind(&columns.step_image_urls)
        .bind(recipe.popularity_score)
        .bind(recipe.rating)
        .bind(&recipe.source)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }

    /// Merge `patch` over the stored recipe. Step images are re-fitted to the
    /// resulting step count.
    pub async fn patch(&self, id: i64, patch: TopRecipePatch) -> Result<TopRecipe> {
        let mut merged = into_new(self.get(id).await?);
        apply_patch(&mut merged, patch);
        self.replace(id, &merged).await
    }

    pub async fn patch_fields(&self, id: i64, fields: RecipeFieldsPatch) -> Result<TopRecipe> {
        self.patch(id, fields.into()).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM top_recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub async fn available_filters(&self) -> Result<AvailableFilters> {
        let regions: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT region FROM top_recipes WHERE region IS NOT NULL ORDER BY region",
        )
        .fetch_all(&self.pool)
        .await?;
        let difficulties: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT difficulty FROM top_recipes WHERE difficulty IS NOT NULL ORDER BY difficulty",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut meal_types = BTreeSet::new();
        let mut dietary_tags = BTreeSet::new();
        let rows: Vec<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT meal_types, dietary_tags FROM top_recipes")
                .fetch_all(&self.pool)
                .await?;
        for (meals, tags) in rows {
            meal_types.extend(filter_values(decode_list(meals.as_deref())));
            dietary_tags.extend(filter_values(decode_list(tags.as_deref())));
        }

        Ok(AvailableFilters {
            regions,
            difficulties,
            meal_types: meal_types.into_iter().collect(),
            dietary_tags: dietary_tags.into_iter().collect(),
        })
    }

    pub async fn stats(&self) -> Result<RecipeStats> {
        let total_recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM top_recipes")
            .fetch_one(&self.pool)
            .await?;

        let by_region: Vec<(String, i64)> = sqlx::query_as(
            "SELECT region, COUNT(*) AS n FROM top_recipes
             WHERE region IS NOT NULL
             GROUP BY region
             ORDER BY n DESC, region",
        )
        .fetch_all(&self.pool)
        .await?;

        let average_rating: Option<f64> =
            sqlx::query_scalar("SELECT AVG(rating) FROM top_recipes WHERE rating > 0")
                .fetch_one(&self.pool)
                .await?;
        let average_time: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(total_time_minutes) FROM top_recipes WHERE total_time_minutes IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        let top_rated: Vec<(String, f64)> = sqlx::query_as(
            "SELECT name, rating FROM top_recipes
             WHERE rating > 0
             ORDER BY rating DESC, popularity_score DESC
             LIMIT ?",
        )
        .bind(TOP_RATED_COUNT)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecipeStats {
            total_recipes,
            recipes_by_region: by_region
                .into_iter()
                .map(|(region, n)| (region, serde_json::Value::from(n)))
                .collect(),
            average_rating: round_to(average_rating.unwrap_or_default(), 2),
            average_time_minutes: round_to(average_time.unwrap_or_default(), 1),
            top_rated_recipes: top_rated
                .into_iter()
                .map(|(name, rating)| TopRated { name, rating })
                .collect(),
        })
    }

    /// Case-insensitive name + region check used by the bulk generator.
    pub async fn exists(&self, name: &str, region: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM top_recipes WHERE lower(name) = lower(?) AND lower(region) = lower(?)",
        )
        .bind(name)
        .bind(region)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn count_for_region(&self, region: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM top_recipes WHERE lower(region) = lower(?)")
                .bind(region)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

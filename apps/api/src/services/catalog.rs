//! Structured recipe catalog: hard-filtered candidate search, semantic
//! nearest-neighbour search and name lookup.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::models::{Candidate, CatalogIngredient, CatalogRecipe};

pub const DEFAULT_CANDIDATE_LIMIT: usize = 20;

/// Hard filters plus the taste labels used for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub cuisine: String,
    pub meal_type: String,
    pub max_minutes: i32,
    pub exclude_allergens: Vec<String>,
    pub tastes: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    Prefix,
    Contains,
}

impl NameMatch {
    pub fn pattern(self, name: &str) -> String {
        match self {
            NameMatch::Exact => name.to_string(),
            NameMatch::Prefix => format!("{}%", name),
            NameMatch::Contains => format!("%{}%", name),
        }
    }

    fn matches(self, stored: &str, name: &str) -> bool {
        let stored = stored.to_lowercase();
        let name = name.to_lowercase();
        match self {
            NameMatch::Exact => stored == name,
            NameMatch::Prefix => stored.starts_with(&name),
            NameMatch::Contains => stored.contains(&name),
        }
    }
}

#[async_trait]
pub trait RecipeCatalog: Send + Sync + fmt::Debug {
    /// Rows passing every hard filter, best match first.
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>>;

    /// Rows nearest to `embedding`, most similar first.
    async fn semantic_search(&self, embedding: &[f32], limit: usize) -> Result<Vec<Candidate>>;

    /// First row whose name matches case-insensitively under `mode`.
    async fn find_by_name(&self, name: &str, mode: NameMatch) -> Result<Option<CatalogRecipe>>;
}

fn contains_ignore_case(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|h| h.eq_ignore_ascii_case(needle))
}

/// 2·cuisine + 2·meal type + 1·time fit + taste overlap fraction + popularity/100.
pub fn match_score(candidate: &Candidate, query: &CandidateQuery) -> f64 {
    let cuisine = if candidate.cuisine_type.eq_ignore_ascii_case(&query.cuisine) {
        2.0
    } else {
        0.0
    };
    let meal = if contains_ignore_case(&candidate.meal_type, &query.meal_type) {
        2.0
    } else {
        0.0
    };
    let time = if candidate.total_time_minutes <= query.max_minutes {
        1.0
    } else {
        0.0
    };
    let overlap = query
        .tastes
        .iter()
        .filter(|t| contains_ignore_case(&candidate.taste_profile, t))
        .count() as f64;
    let taste = overlap / query.tastes.len().max(1) as f64;

    cuisine + meal + time + taste + candidate.popularity_score / 100.0
}

pub fn passes_hard_filters(candidate: &Candidate, query: &CandidateQuery) -> bool {
    candidate.cuisine_type.eq_ignore_ascii_case(&query.cuisine)
        && contains_ignore_case(&candidate.meal_type, &query.meal_type)
        && candidate.total_time_minutes <= query.max_minutes
        && !query
            .exclude_allergens
            .iter()
            .any(|a| contains_ignore_case(&candidate.allergens, a))
}

/// Score, then sort by score and popularity, both descending.
pub fn rank_candidates(mut candidates: Vec<Candidate>, query: &CandidateQuery) -> Vec<Candidate> {
    for candidate in &mut candidates {
        candidate.match_score = match_score(candidate, query);
    }
    candidates.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.popularity_score
                    .partial_cmp(&a.popularity_score)
                    .unwrap_or(Ordering::Equal)
            })
    });
    candidates.truncate(query.limit);
    candidates
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    id: String,
    name: String,
    cuisine_type: String,
    meal_type: Option<Vec<String>>,
    prep_time_minutes: Option<i32>,
    cooking_time_minutes: Option<i32>,
    total_time_minutes: Option<i32>,
    difficulty: Option<String>,
    servings: Option<i32>,
    taste_profile: Option<Vec<String>>,
    allergens: Option<Vec<String>>,
    dietary_tags: Option<Vec<String>>,
    ingredients: Option<Json<Vec<CatalogIngredient>>>,
    popularity_score: Option<f64>,
    match_score: Option<f64>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            cuisine_type: row.cuisine_type,
            meal_type: row.meal_type.unwrap_or_default(),
            prep_time_minutes: row.prep_time_minutes,
            cooking_time_minutes: row.cooking_time_minutes,
            total_time_minutes: row.total_time_minutes.unwrap_or_default(),
            difficulty: row.difficulty.unwrap_or_default(),
            servings: row.servings,
            taste_profile: row.taste_profile.unwrap_or_default(),
            allergens: row.allergens.unwrap_or_default(),
            dietary_tags: row.dietary_tags.unwrap_or_default(),
            ingredients: row.ingredients.map(|j| j.0).unwrap_or_default(),
            popularity_score: row.popularity_score.unwrap_or_default(),
            match_score: row.match_score.unwrap_or_default(),
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: String,
    name: String,
    ingredients: Option<Json<Vec<CatalogIngredient>>>,
    steps: Option<Vec<String>>,
    tips: Option<String>,
    prep_time_minutes: Option<i32>,
    cooking_time_minutes: Option<i32>,
    total_time_minutes: Option<i32>,
    difficulty: Option<String>,
    servings: Option<i32>,
}

impl From<RecipeRow> for CatalogRecipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            ingredients: row.ingredients.map(|j| j.0).unwrap_or_default(),
            steps: row.steps.unwrap_or_default(),
            tips: row.tips.unwrap_or_default(),
            prep_time_minutes: row.prep_time_minutes,
            cooking_time_minutes: row.cooking_time_minutes,
            total_time_minutes: row.total_time_minutes,
            difficulty: row.difficulty,
            servings: row.servings,
        }
    }
}

const CANDIDATE_COLUMNS: &str = "id::text AS id, name, cuisine_type, meal_type, \
     prep_time_minutes, cooking_time_minutes, total_time_minutes, difficulty, servings, \
     taste_profile, allergens, dietary_tags, ingredients, popularity_score::float8 AS popularity_score";

/// PostgreSQL `recipes` table with a pgvector `embedding` column.
#[derive(Debug, Clone)]
pub struct PgRecipeCatalog {
    pool: PgPool,
}

impl PgRecipeCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lazily connecting pool; the first query opens the connection.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| ApiError::DatabaseError(format!("Invalid database URL: {}", e)))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RecipeCatalog for PgRecipeCatalog {
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>> {
        let tastes: Vec<String> = query.tastes.iter().map(|t| t.to_lowercase()).collect();
        let allergens: Vec<String> = query
            .exclude_allergens
            .iter()
            .map(|a| a.to_lowercase())
            .collect();

        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS},
                (
                    CASE WHEN lower(cuisine_type) = lower($1) THEN 2 ELSE 0 END +
                    CASE WHEN EXISTS (SELECT 1 FROM unnest(meal_type) m WHERE lower(m) = lower($2)) THEN 2 ELSE 0 END +
                    CASE WHEN total_time_minutes <= $3 THEN 1 ELSE 0 END +
                    (SELECT COUNT(*)::float8 FROM unnest(taste_profile) t WHERE lower(t) = ANY($4))
                        / GREATEST(cardinality($4::text[]), 1) +
                    popularity_score::float8 / 100
                ) AS match_score
             FROM recipes
             WHERE lower(cuisine_type) = lower($1)
               AND EXISTS (SELECT 1 FROM unnest(meal_type) m WHERE lower(m) = lower($2))
               AND total_time_minutes <= $3
               AND NOT EXISTS (SELECT 1 FROM unnest(allergens) a WHERE lower(a) = ANY($5))
             ORDER BY match_score DESC, popularity_score DESC
             LIMIT $6"
        );

        let rows: Vec<CandidateRow> = sqlx::query_as(&sql)
            .bind(&query.cuisine)
            .bind(&query.meal_type)
            .bind(query.max_minutes)
            .bind(&tastes)
            .bind(&allergens)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!("Catalog returned {} candidates", rows.len());
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    async fn semantic_search(&self, embedding: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS},
                (1 - (embedding <=> $1::real[]::vector))::float8 AS match_score
             FROM recipes
             WHERE embedding IS NOT NULL
             ORDER BY embedding <=> $1::real[]::vector
             LIMIT $2"
        );

        let rows: Vec<CandidateRow> = sqlx::query_as(&sql)
            .bind(embedding)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    async fn find_by_name(&self, name: &str, mode: NameMatch) -> Result<Option<CatalogRecipe>> {
        let row: Option<RecipeRow> = sqlx::query_as(
            "SELECT id::text AS id, name, ingredients, steps, tips,
                    prep_time_minutes, cooking_time_minutes, total_time_minutes,
                    difficulty, servings
             FROM recipes
             WHERE name ILIKE $1
             LIMIT 1",
        )
        .bind(mode.pattern(name))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CatalogRecipe::from))
    }
}

/// Catalog held in memory. Counts every call so tests can assert on access.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    candidates: Vec<Candidate>,
    recipes: Vec<CatalogRecipe>,
    lookups: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new(candidates: Vec<Candidate>, recipes: Vec<CatalogRecipe>) -> Self {
        Self {
            candidates,
            recipes,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(AtomicOrdering::Relaxed)
    }

    fn touch(&self) {
        self.lookups.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

#[async_trait]
impl RecipeCatalog for InMemoryCatalog {
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>> {
        self.touch();
        let matching = self
            .candidates
            .iter()
            .filter(|c| passes_hard_filters(c, query))
            .cloned()
            .collect();
        Ok(rank_candidates(matching, query))
    }

    /// Insertion order stands in for similarity.
    async fn semantic_search(&self, _embedding: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        self.touch();
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }

    async fn find_by_name(&self, name: &str, mode: NameMatch) -> Result<Option<CatalogRecipe>> {
        self.touch();
        Ok(self
            .recipes
            .iter()
            .find(|r| mode.matches(&r.name, name))
            .cloned())
    }
}

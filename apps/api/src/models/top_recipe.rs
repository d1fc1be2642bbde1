use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taste {
    pub name: String,
    pub intensity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    pub name: String,
    #[serde(default)]
    pub preparation_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRecipe {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub tastes: Vec<Taste>,
    pub meal_types: Vec<String>,
    pub dietary_tags: Vec<String>,
    pub difficulty: Option<String>,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub total_time_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub calories: Option<i64>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub step_image_urls: Vec<String>,
    pub rating: f64,
    pub popularity_score: f64,
    pub source: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// List-view projection of [`TopRecipe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRecipeSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub difficulty: Option<String>,
    pub total_time_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub calories: Option<i64>,
    pub image_url: Option<String>,
    pub rating: f64,
    pub popularity_score: f64,
    pub meal_types: Vec<String>,
    pub dietary_tags: Vec<String>,
}

impl From<TopRecipe> for TopRecipeSummary {
    fn from(recipe: TopRecipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            description: recipe.description,
            region: recipe.region,
            difficulty: recipe.difficulty,
            total_time_minutes: recipe.total_time_minutes,
            servings: recipe.servings,
            calories: recipe.calories,
            image_url: recipe.image_url,
            rating: recipe.rating,
            popularity_score: recipe.popularity_score,
            meal_types: recipe.meal_types,
            dietary_tags: recipe.dietary_tags,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecipeListing {
    Detailed(Vec<TopRecipe>),
    Summary(Vec<TopRecipeSummary>),
}

impl RecipeListing {
    pub fn len(&self) -> usize {
        match self {
            RecipeListing::Detailed(r) => r.len(),
            RecipeListing::Summary(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn default_source() -> String {
    "api".to_string()
}

/// Body of a create or full replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTopRecipe {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub tastes: Vec<Taste>,
    #[serde(default)]
    pub meal_types: Vec<String>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub prep_time_minutes: Option<i64>,
    #[serde(default)]
    pub cook_time_minutes: Option<i64>,
    #[serde(default)]
    pub total_time_minutes: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub calories: Option<i64>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub step_image_urls: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub popularity_score: f64,
    #[serde(default = "default_source")]
    pub source: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopRecipePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub tastes: Option<Vec<Taste>>,
    pub meal_types: Option<Vec<String>>,
    pub dietary_tags: Option<Vec<String>>,
    pub difficulty: Option<String>,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub total_time_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub calories: Option<i64>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub steps: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub step_image_urls: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub popularity_score: Option<f64>,
}

/// Targeted update of the media-bearing fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFieldsPatch {
    pub steps: Option<Vec<String>>,
    pub step_image_urls: Option<Vec<String>>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub image_url: Option<String>,
}

impl From<RecipeFieldsPatch> for TopRecipePatch {
    fn from(fields: RecipeFieldsPatch) -> Self {
        Self {
            steps: fields.steps,
            step_image_urls: fields.step_image_urls,
            ingredients: fields.ingredients,
            image_url: fields.image_url,
            ..Default::default()
        }
    }
}

fn default_sort_by() -> String {
    "popularity_score".to_string()
}

fn default_sort_order() -> String {
    "DESC".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    30
}

fn default_detailed() -> bool {
    true
}

/// Query string of `GET /api/top-recipes`. `meal_types` and `dietary_tags`
/// are comma-separated.
#[derive(Debug, Clone, Deserialize)]
pub struct TopRecipeQuery {
    pub region: Option<String>,
    pub difficulty: Option<String>,
    pub meal_types: Option<String>,
    pub dietary_tags: Option<String>,
    pub max_time: Option<i64>,
    pub min_rating: Option<f64>,
    pub search: Option<String>,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_detailed")]
    pub detailed: bool,
}

impl Default for TopRecipeQuery {
    fn default() -> Self {
        Self {
            region: None,
            difficulty: None,
            meal_types: None,
            dietary_tags: None,
            max_time: None,
            min_rating: None,
            search: None,
            sort_by: default_sort_by(),
            sort_order: default_sort_order(),
            page: default_page(),
            page_size: default_page_size(),
            detailed: default_detailed(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopRecipePage {
    pub recipes: RecipeListing,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailableFilters {
    pub regions: Vec<String>,
    pub difficulties: Vec<String>,
    pub meal_types: Vec<String>,
    pub dietary_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRated {
    pub name: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeStats {
    pub total_recipes: i64,
    /// Largest region first.
    pub recipes_by_region: serde_json::Map<String, serde_json::Value>,
    pub average_rating: f64,
    pub average_time_minutes: f64,
    pub top_rated_recipes: Vec<TopRated>,
}

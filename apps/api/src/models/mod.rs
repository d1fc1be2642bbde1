use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use preferences::{parse_time_minutes, Preferences, PreferencesInput, StructuredPreferences};
pub use recipe::{format_ingredients, Candidate, CatalogIngredient, CatalogRecipe, ParsedRecipe};
pub use session::{HistoryEntry, Session, StepAdvance, StepError, StepState};
pub use top_recipe::{
    AvailableFilters, Ingredient, NewTopRecipe, RecipeFieldsPatch, RecipeListing, RecipeStats,
    Taste, TopRated, TopRecipe, TopRecipePage, TopRecipePatch, TopRecipeQuery, TopRecipeSummary,
};
pub use user::{SignInOutcome, SignInRequest, User, UserPreferences};

mod preferences;
mod recipe;
mod session;
mod top_recipe;
mod user;

/// `?session_id=` on every session-scoped endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

/// Response of `POST /api/preferences`
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: String,
    pub recipe_mapping: BTreeMap<String, String>,
    pub success: bool,
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDetailRequest {
    pub recipe_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetailResponse {
    pub recipe_name: String,
    pub ingredients: String,
    pub steps: Vec<String>,
    pub tips: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResponse {
    pub step: Option<String>,
    pub step_number: usize,
    pub total_steps: usize,
    pub completed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tips: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipResponse {
    pub message: String,
    pub success: bool,
    pub tips: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlternativesRequest {
    pub missing_ingredient: String,
    #[serde(default)]
    pub recipe_context: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlternativesResponse {
    pub alternatives: String,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationType {
    Gemini,
    StableDiffusion,
    TextOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    /// Base64-encoded image, absent when only a text description is available
    pub image_data: Option<String>,
    pub description: String,
    pub success: bool,
    pub generation_type: GenerationType,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub current_recipe: Option<String>,
    pub current_step: usize,
    pub total_steps: usize,
    pub has_recipe: bool,
    pub state: StepState,
    pub success: bool,
}

impl SessionInfo {
    pub fn from_session(session_id: &str, session: &Session) -> Self {
        Self {
            session_id: session_id.to_string(),
            current_recipe: session.current_recipe.clone(),
            current_step: session.current_step_index,
            total_steps: session.total_steps(),
            has_recipe: session.current_recipe.is_some(),
            state: session.state(),
            success: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionHistoryResponse {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
    pub total_completed_steps: usize,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageCapabilities {
    pub gemini: bool,
    pub stable_diffusion: bool,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub catalog_enabled: bool,
    pub rag_enabled: bool,
    pub image_generation: ImageCapabilities,
    pub success: bool,
}

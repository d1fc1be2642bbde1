pub mod catalog;
pub mod embedder;
pub mod gemini;
pub mod image_generator;
pub mod llm;
pub mod llm_text;
pub mod pinecone;
pub mod prompts;
pub mod recipe_codec;
pub mod recommendation;
pub mod reconciler;
pub mod session_store;
pub mod supabase;
pub mod top_recipes;
pub mod users;

// Re-export public types
pub use catalog::{InMemoryCatalog, PgRecipeCatalog, RecipeCatalog};
pub use embedder::Embedder;
pub use gemini::GeminiClient;
pub use image_generator::{BackendKind, ImageGenerator};
pub use llm::{FakeLanguageModel, LanguageModel};
pub use pinecone::{DocumentIndex, PineconeIndex};
pub use recommendation::RecommendationService;
pub use session_store::SessionStore;
pub use supabase::SupabaseClient;
pub use top_recipes::TopRecipeStore;
pub use users::UserService;

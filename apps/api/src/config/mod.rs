use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Runtime settings, read from `APP_*` environment variables (a `.env` file is
/// loaded first by the binaries).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    pub google_api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// PostgreSQL catalog backing the database-first recommender.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_top_recipes_db_path")]
    pub top_recipes_db_path: String,

    #[serde(default)]
    pub pinecone_api_key: Option<String>,
    #[serde(default)]
    pub pinecone_index_host: Option<String>,

    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_key: Option<String>,

    #[serde(default)]
    pub diffusion_url: Option<String>,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_top_recipes_db_path() -> String {
    "data/top_recipes_final.db".to_string()
}

fn default_session_ttl_secs() -> u64 {
    86_400
}

impl Config {
    pub fn load() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration (is APP_GOOGLE_API_KEY set?)")?;

        if config.google_api_key.trim().is_empty() {
            anyhow::bail!("APP_GOOGLE_API_KEY is empty");
        }

        Ok(config)
    }

    /// `None` disables idle expiry.
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }

    pub fn pinecone(&self) -> Option<(&str, &str)> {
        match (&self.pinecone_api_key, &self.pinecone_index_host) {
            (Some(key), Some(host)) if !key.is_empty() && !host.is_empty() => {
                Some((key.as_str(), host.as_str()))
            }
            _ => None,
        }
    }

    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                Some((url.as_str(), key.as_str()))
            }
            _ => None,
        }
    }
}

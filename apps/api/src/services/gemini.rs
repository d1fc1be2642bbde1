//! Gemini REST client: text generation, query embeddings and image generation.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lru::LruCache;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::embedder::Embedder;
use super::llm::{LanguageModel, LlmError, Prompt};
use crate::config::Config;

const EMBEDDING_CACHE_SIZE: usize = 256;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![TextPart { text }],
        }
    }

    fn plain(text: &'a str) -> Self {
        Self {
            role: None,
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiApiError,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
    image_model: String,
    embedding_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        let cache_size = NonZeroUsize::new(EMBEDDING_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: crate::config::DEFAULT_EMBEDDING_MODEL.to_string(),
            image_model: crate::config::DEFAULT_IMAGE_MODEL.to_string(),
            embedding_cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.google_api_key, &config.gemini_base_url, &config.llm_model)
            .with_embedding_model(&config.embedding_model)
            .with_image_model(&config.image_model)
    }

    pub fn with_embedding_model(mut self, model: &str) -> Self {
        self.embedding_model = model.to_string();
        self
    }

    pub fn with_image_model(mut self, model: &str) -> Self {
        self.image_model = model.to_string();
        self
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        model: &str,
        action: &str,
        body: &B,
    ) -> Result<R, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured("GOOGLE_API_KEY".to_string()));
        }

        let url = format!("{}/models/{}:{}", self.base_url, model, action);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if status == 429 {
            return Err(LlmError::RateLimited(text));
        }
        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<GeminiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::ApiError { status, message });
        }

        serde_json::from_str(&text).map_err(|e| LlmError::ParseError(e.to_string()))
    }

    async fn generate(
        &self,
        model: &str,
        system: Option<&str>,
        user: &str,
        modalities: Option<Vec<&'static str>>,
    ) -> Result<Vec<ResponsePart>, LlmError> {
        let request = GenerateRequest {
            system_instruction: system.filter(|s| !s.is_empty()).map(Content::plain),
            contents: vec![Content::user(user)],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_modalities: modalities,
            },
        };

        let response: GenerateResponse = self.post(model, "generateContent", &request).await?;
        Ok(response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default())
    }

    /// Ask the image model for a picture. `Ok(None)` when the reply carries
    /// no inline image.
    pub async fn generate_image(&self, prompt: &str) -> Result<Option<Vec<u8>>, LlmError> {
        let parts = self
            .generate(&self.image_model, None, prompt, Some(vec!["TEXT", "IMAGE"]))
            .await?;

        let Some(inline) = parts.into_iter().find_map(|p| p.inline_data) else {
            warn!("No image data found in Gemini response");
            return Ok(None);
        };

        STANDARD
            .decode(inline.data.as_bytes())
            .map(Some)
            .map_err(|e| LlmError::ParseError(format!("invalid inline image data: {}", e)))
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let parts = self
            .generate(&self.model, Some(&prompt.system), &prompt.user, None)
            .await?;

        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            return Err(LlmError::ParseError("No text content in response".to_string()));
        }
        debug!("Gemini reply preview: {}", text.chars().take(200).collect::<String>());
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if let Ok(mut cache) = self.embedding_cache.lock() {
            if let Some(hit) = cache.get(text) {
                return Ok(hit.clone());
            }
        }

        let request = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content::plain(text),
        };
        let response: EmbedResponse = self
            .post(&self.embedding_model, "embedContent", &request)
            .await?;

        if let Ok(mut cache) = self.embedding_cache.lock() {
            cache.put(text.to_string(), response.embedding.values.clone());
        }
        Ok(response.embedding.values)
    }
}

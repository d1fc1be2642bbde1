//! Step illustrations. The language model first writes a short photography
//! prompt; one of two backends then renders it.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::gemini::GeminiClient;
use super::llm::{LanguageModel, LlmError};
use super::prompts;
use crate::models::ImageCapabilities;

const DIFFUSION_STEPS: u32 = 30;
const DIFFUSION_GUIDANCE: f32 = 7.5;
const DIFFUSION_SIZE: u32 = 512;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Image request failed: {0}")]
    Request(String),

    #[error("Invalid image payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    StableDiffusion,
}

#[async_trait]
pub trait ImageBackend: Send + Sync + fmt::Debug {
    /// Render a prompt. `Ok(None)` when the backend answered without an image.
    async fn render(&self, prompt: &str) -> Result<Option<Vec<u8>>, ImageError>;
}

#[derive(Debug)]
pub struct GeminiImageBackend {
    client: Arc<GeminiClient>,
}

impl GeminiImageBackend {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageBackend for GeminiImageBackend {
    async fn render(&self, prompt: &str) -> Result<Option<Vec<u8>>, ImageError> {
        self.client.generate_image(prompt).await.map_err(|e| match e {
            LlmError::NotConfigured(what) => ImageError::NotConfigured(what),
            other => ImageError::Llm(other),
        })
    }
}

#[derive(Debug, Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    steps: u32,
    cfg_scale: f32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// A locally hosted diffusion server speaking the `sdapi/v1/txt2img` protocol.
#[derive(Debug, Clone)]
pub struct LocalDiffusionBackend {
    client: Client,
    base_url: String,
}

impl LocalDiffusionBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageBackend for LocalDiffusionBackend {
    async fn render(&self, prompt: &str) -> Result<Option<Vec<u8>>, ImageError> {
        let request = Txt2ImgRequest {
            prompt,
            steps: DIFFUSION_STEPS,
            cfg_scale: DIFFUSION_GUIDANCE,
            width: DIFFUSION_SIZE,
            height: DIFFUSION_SIZE,
        };

        let response = self
            .client
            .post(format!("{}/sdapi/v1/txt2img", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ImageError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Request(format!("{}: {}", status, body)));
        }

        let body: Txt2ImgResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        match body.images.into_iter().next() {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(|e| ImageError::Decode(e.to_string())),
            None => Ok(None),
        }
    }
}

/// Result of one generation: the image (if any) and the prompt that was used,
/// which doubles as the text-only description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image_base64: Option<String>,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct ImageGenerator {
    llm: Arc<dyn LanguageModel>,
    gemini: Option<Arc<dyn ImageBackend>>,
    local: Option<Arc<dyn ImageBackend>>,
}

impl ImageGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            gemini: None,
            local: None,
        }
    }

    pub fn with_gemini(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.gemini = Some(backend);
        self
    }

    pub fn with_local(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.local = Some(backend);
        self
    }

    pub fn capabilities(&self) -> ImageCapabilities {
        ImageCapabilities {
            gemini: self.gemini.is_some(),
            stable_diffusion: self.local.is_some(),
        }
    }

    pub async fn image_prompt(&self, recipe_name: &str, step: &str) -> Result<String, ImageError> {
        let reply = self.llm.complete(&prompts::image(recipe_name, step)).await?;
        Ok(reply.trim().trim_matches('"').trim().to_string())
    }

    /// Write the prompt, then render it with the requested backend.
    ///
    /// Backend failures are logged and reported as a missing image. A missing
    /// Gemini backend is a configuration error; a missing local backend is not.
    pub async fn generate(
        &self,
        recipe_name: &str,
        step: &str,
        kind: BackendKind,
    ) -> Result<GeneratedImage, ImageError> {
        let backend = match kind {
            BackendKind::Gemini => Some(self.gemini.as_ref().ok_or_else(|| {
                ImageError::NotConfigured("GOOGLE_API_KEY".to_string())
            })?),
            BackendKind::StableDiffusion => self.local.as_ref(),
        };

        let prompt = self.image_prompt(recipe_name, step).await?;

        let Some(backend) = backend else {
            warn!("Local diffusion backend not configured, returning prompt only");
            return Ok(GeneratedImage {
                image_base64: None,
                prompt,
            });
        };

        let image_base64 = match backend.render(&prompt).await {
            Ok(Some(bytes)) => {
                info!("🎨 Generated {:?} image ({} bytes)", kind, bytes.len());
                Some(STANDARD.encode(bytes))
            }
            Ok(None) => None,
            Err(ImageError::NotConfigured(msg)) => return Err(ImageError::NotConfigured(msg)),
            Err(e) => {
                error!("{:?} image generation failed: {}", kind, e);
                None
            }
        };

        Ok(GeneratedImage {
            image_base64,
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::FakeLanguageModel;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn llm() -> Arc<dyn LanguageModel> {
        Arc::new(
            FakeLanguageModel::new()
                .with_default_response("\"Overhead shot of dal simmering, warm light\"\n"),
        )
    }

    #[tokio::test]
    async fn test_local_backend_decodes_first_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/txt2img"))
            .and(body_partial_json(json!({"steps": 30, "width": 512, "height": 512})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": ["aGVsbG8="]})))
            .expect(1)
            .mount(&server)
            .await;

        let generator = ImageGenerator::new(llm())
            .with_local(Arc::new(LocalDiffusionBackend::new(&server.uri())));
        let result = generator
            .generate("Dal Tadka", "STEP 3: Simmer the lentils", BackendKind::StableDiffusion)
            .await
            .unwrap();

        assert_eq!(result.image_base64.as_deref(), Some("aGVsbG8="));
        assert_eq!(result.prompt, "Overhead shot of dal simmering, warm light");
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_text_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
            .mount(&server)
            .await;

        let generator = ImageGenerator::new(llm())
            .with_local(Arc::new(LocalDiffusionBackend::new(&server.uri())));
        let result = generator
            .generate("Dal Tadka", "STEP 1", BackendKind::StableDiffusion)
            .await
            .unwrap();

        assert!(result.image_base64.is_none());
        assert!(!result.prompt.is_empty());
    }

    #[tokio::test]
    async fn test_missing_backends() {
        let generator = ImageGenerator::new(llm());
        assert!(matches!(
            generator.generate("Dal", "STEP 1", BackendKind::Gemini).await,
            Err(ImageError::NotConfigured(_))
        ));

        let local = generator
            .generate("Dal", "STEP 1", BackendKind::StableDiffusion)
            .await
            .unwrap();
        assert!(local.image_base64.is_none());
        assert_eq!(
            generator.capabilities().gemini,
            generator.capabilities().stable_diffusion
        );
    }

    #[tokio::test]
    async fn test_gemini_without_key_is_a_configuration_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = Arc::new(GeminiClient::new("", &server.uri(), "m"));
        let generator =
            ImageGenerator::new(llm()).with_gemini(Arc::new(GeminiImageBackend::new(client)));
        let result = generator.generate("Dal", "STEP 1", BackendKind::Gemini).await;

        assert!(matches!(
            result,
            Err(ImageError::NotConfigured(ref what)) if what == "GOOGLE_API_KEY"
        ));
    }
}

//! Language-model abstraction.
//!
//! Every prompt the service sends goes through [`LanguageModel`], so the
//! recommendation pipeline can run against Gemini in production and against
//! [`FakeLanguageModel`] in tests.

use async_trait::async_trait;
use std::fmt;
use std::sync::{Mutex, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl LlmError {
    /// Rate-limit and quota signals, which callers may want to back off on.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LlmError::RateLimited(_) => true,
            LlmError::ApiError { status, message } => {
                *status == 429 || message.to_lowercase().contains("quota")
            }
            _ => false,
        }
    }
}

/// A system instruction plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    /// Send a prompt and return the model's text reply.
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

/// Deterministic model for tests: replies are chosen by the first registered
/// substring found in the user turn.
#[derive(Debug, Default)]
pub struct FakeLanguageModel {
    responses: RwLock<Vec<(String, String)>>,
    default_response: Option<String>,
    calls: Mutex<Vec<Prompt>>,
}

impl FakeLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let model = Self::new();
        model.add_response(prompt_contains, response);
        model
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        if let Ok(mut responses) = self.responses.write() {
            responses.push((prompt_contains.to_string(), response.to_string()));
        }
    }

    /// Prompts received so far, oldest first.
    pub fn calls(&self) -> Vec<Prompt> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt.clone());
        }

        let matched = self.responses.read().ok().and_then(|responses| {
            responses
                .iter()
                .find(|(needle, _)| prompt.user.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
        });

        matched
            .or_else(|| self.default_response.clone())
            .ok_or_else(|| {
                LlmError::RequestFailed(format!(
                    "no fake response registered for prompt: {}",
                    prompt.user.chars().take(80).collect::<String>()
                ))
            })
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_matches_substring_in_registration_order() {
        let model = FakeLanguageModel::with_response("ranking", "first");
        model.add_response("rank", "second");

        let reply = model
            .complete(&Prompt::new("system", "please do the ranking"))
            .await
            .unwrap();
        assert_eq!(reply, "first");
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fake_without_match_or_default_errors() {
        let model = FakeLanguageModel::new();
        let result = model.complete(&Prompt::new("s", "anything")).await;
        assert!(matches!(result, Err(LlmError::RequestFailed(_))));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(LlmError::RateLimited("slow down".into()).is_rate_limited());
        assert!(LlmError::ApiError {
            status: 403,
            message: "Quota exceeded".into()
        }
        .is_rate_limited());
        assert!(!LlmError::ParseError("bad".into()).is_rate_limited());
    }
}

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::llm::LlmError;

#[async_trait]
pub trait Embedder: Send + Sync + fmt::Debug {
    /// Embed a search query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// Returns the same vector for every query and counts calls.
#[derive(Debug)]
pub struct FakeEmbedder {
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.vector.clone())
    }
}

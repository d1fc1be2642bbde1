use async_trait::async_trait;
use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::embedder::Embedder;
use crate::error::{ApiError, Result};

pub const RETRIEVAL_K: usize = 5;

/// Recipe-document chunks nearest to a free-text query.
#[async_trait]
pub trait DocumentIndex: Send + Sync + fmt::Debug {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Pinecone index queried over REST; chunk text lives in `metadata.text`.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    embedder: Arc<dyn Embedder>,
}

impl PineconeIndex {
    pub fn new(api_key: &str, index_host: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key)
                .map_err(|e| ApiError::InvalidInput(format!("Invalid Pinecone API key: {}", e)))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let host = index_host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            host,
            embedder,
        })
    }
}

#[async_trait]
impl DocumentIndex for PineconeIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let vector = self.embedder.embed(query).await?;
        let request = QueryRequest {
            vector,
            top_k,
            include_values: false,
            include_metadata: true,
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ApiError::ExternalServiceError(format!(
                "Pinecone query failed: {}",
                error_text
            )));
        }

        let body: QueryResponse = response.json().await?;
        Ok(body
            .matches
            .into_iter()
            .filter_map(|m| {
                debug!("Pinecone match {} (score {:.3})", m.id, m.score);
                m.metadata?
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(str::to_string)
            })
            .collect())
    }
}

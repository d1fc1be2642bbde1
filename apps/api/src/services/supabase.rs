use crate::error::ApiError;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

/// Minimal PostgREST client for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::DatabaseError(format!(
                "Unexpected status code: {} {}",
                status, body
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// `SELECT * FROM table WHERE column = value`
    pub async fn select_eq<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>, ApiError> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[("select", "*".to_string()), (column, format!("eq.{}", value))])
            .send()
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        Self::rows(response).await
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        data: &B,
    ) -> Result<Vec<T>, ApiError> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        Self::rows(response).await
    }

    /// Update rows where `column = value` and return them.
    pub async fn update_eq<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        data: &B,
    ) -> Result<Vec<T>, ApiError> {
        let response = self
            .authorized(self.client.patch(self.table_url(table)))
            .query(&[(column, format!("eq.{}", value))])
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        Self::rows(response).await
    }
}

use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::supabase::SupabaseClient;
use crate::error::{ApiError, Result};
use crate::models::{SignInOutcome, SignInRequest, User, UserPreferences};

const USERS_TABLE: &str = "users";

/// User profiles stored in Supabase.
#[derive(Debug, Clone, Default)]
pub struct UserService {
    client: Option<SupabaseClient>,
}

impl UserService {
    pub fn new(client: Option<SupabaseClient>) -> Self {
        Self { client }
    }

    pub fn enabled(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&SupabaseClient> {
        self.client
            .as_ref()
            .ok_or_else(|| ApiError::NotConfigured("Supabase".to_string()))
    }

    /// Create the user on first sign-in, refresh the profile afterwards.
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<(SignInOutcome, Option<User>)> {
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::InvalidInput("Email is required".to_string()))?;

        let client = self.client()?;
        let now = Utc::now().to_rfc3339();
        let mut record = json!({
            "email": email,
            "name": request.name,
            "image": request.image,
            "google_id": request.google_id,
            "updated_at": now,
        });

        if self.get_user(email).await?.is_some() {
            let rows: Vec<User> = client
                .update_eq(USERS_TABLE, "email", email, &record)
                .await?;
            info!("👤 Updated user {}", email);
            Ok((SignInOutcome::Updated, rows.into_iter().next()))
        } else {
            record["created_at"] = json!(now);
            let rows: Vec<User> = client.insert(USERS_TABLE, &record).await?;
            info!("👤 Created user {}", email);
            Ok((SignInOutcome::Created, rows.into_iter().next()))
        }
    }

    pub async fn get_user(&self, email: &str) -> Result<Option<User>> {
        let rows: Vec<User> = self
            .client()?
            .select_eq(USERS_TABLE, "email", email)
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn get_preferences(&self, email: &str) -> Result<Option<UserPreferences>> {
        Ok(self.get_user(email).await?.and_then(|u| u.preferences))
    }

    pub async fn update_preferences(
        &self,
        email: &str,
        preferences: &UserPreferences,
    ) -> Result<User> {
        let update = json!({
            "preferences": preferences,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let rows: Vec<User> = self
            .client()?
            .update_eq(USERS_TABLE, "email", email, &update)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        json!({
            "id": 7,
            "email": "cook@example.com",
            "name": "Cook",
            "preferences": {"allergies": ["peanuts"], "dislikes": []}
        })
    }

    #[tokio::test]
    async fn test_sign_in_creates_missing_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("email", "eq.cook@example.com"))
            .and(header("apikey", "anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .and(header("Prefer", "return=representation"))
            .and(body_partial_json(json!({"email": "cook@example.com"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([user_json()])))
            .expect(1)
            .mount(&server)
            .await;

        let service = UserService::new(Some(SupabaseClient::new(&server.uri(), "anon")));
        let request = SignInRequest {
            email: Some("cook@example.com".into()),
            name: Some("Cook".into()),
            ..SignInRequest::default()
        };
        let (outcome, user) = service.sign_in(&request).await.unwrap();
        assert_eq!(outcome, SignInOutcome::Created);
        assert_eq!(user.unwrap().email, "cook@example.com");
    }

    #[tokio::test]
    async fn test_preferences_round_trip_through_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_json()])))
            .mount(&server)
            .await;

        let service = UserService::new(Some(SupabaseClient::new(&server.uri(), "anon")));
        let prefs = service.get_preferences("cook@example.com").await.unwrap().unwrap();
        assert_eq!(prefs.allergies, vec!["peanuts"]);
    }

    #[tokio::test]
    async fn test_missing_email_and_missing_config() {
        let unconfigured = UserService::default();
        assert!(matches!(
            unconfigured.sign_in(&SignInRequest::default()).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            unconfigured.get_user("a@b.c").await,
            Err(ApiError::NotConfigured(_))
        ));
    }
}

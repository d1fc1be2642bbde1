use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    error::{ApiError, Result},
    models::{SignInOutcome, SignInRequest, UserPreferences},
    services::UserService,
};

pub fn users_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .service(web::resource("/signin").route(web::post().to(sign_in)))
            .service(
                web::resource("/{email}/preferences")
                    .route(web::get().to(get_preferences))
                    .route(web::put().to(update_preferences)),
            )
            .service(web::resource("/{email}").route(web::get().to(get_user))),
    );
}

/// Upsert the profile on every sign-in.
pub async fn sign_in(
    request: web::Json<SignInRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse> {
    let (outcome, user) = users.sign_in(&request).await?;
    let message = match outcome {
        SignInOutcome::Created => "User created successfully",
        SignInOutcome::Updated => "User updated successfully",
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "user": user,
    })))
}

pub async fn get_user(
    email: web::Path<String>,
    users: web::Data<UserService>,
) -> Result<HttpResponse> {
    let user = users
        .get_user(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user })))
}

pub async fn get_preferences(
    email: web::Path<String>,
    users: web::Data<UserService>,
) -> Result<HttpResponse> {
    let body = match users.get_preferences(&email).await? {
        Some(preferences) => json!({ "success": true, "preferences": preferences }),
        None => json!({ "success": false, "message": "No preferences found" }),
    };
    Ok(HttpResponse::Ok().json(body))
}

pub async fn update_preferences(
    email: web::Path<String>,
    preferences: web::Json<UserPreferences>,
    users: web::Data<UserService>,
) -> Result<HttpResponse> {
    let user = users.update_preferences(&email, &preferences).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Preferences updated successfully",
        "user": user,
    })))
}

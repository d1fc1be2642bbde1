use actix_web::{web, HttpResponse};
use log::info;

use crate::{
    error::Result,
    models::{PreferencesInput, RecommendationResponse, Session},
    services::{RecommendationService, SessionStore},
};

pub fn preferences_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/preferences").route(web::post().to(submit_preferences)));
}

/// Rank recipes for the submitted preferences and open a cooking session.
pub async fn submit_preferences(
    input: web::Json<PreferencesInput>,
    recommender: web::Data<RecommendationService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let preferences = input.into_inner().into_preferences();
    info!(
        "🍽️ Preferences received: {} {}, {}",
        preferences.region, preferences.meal_type, preferences.time_available
    );

    let recommendation = recommender.recommend(&preferences).await?;

    let mut session = Session::new(preferences.to_prompt_text());
    session.recipe_mapping = recommendation.mapping.clone();
    let session_id = sessions.create(session).await?;

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        recommendations: recommendation.text,
        recipe_mapping: recommendation.mapping,
        success: true,
        message: "Recommendations generated successfully! Use the session_id below for all subsequent requests.".to_string(),
        session_id,
    }))
}

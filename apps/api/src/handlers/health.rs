use actix_web::{get, web, HttpResponse};

use crate::models::HealthResponse;
use crate::services::{ImageGenerator, RecommendationService};

fn health(recommender: &RecommendationService, images: &ImageGenerator) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        catalog_enabled: recommender.catalog_enabled(),
        rag_enabled: recommender.rag_enabled(),
        image_generation: images.capabilities(),
        success: true,
    }
}

#[get("/health")]
pub async fn health_check(
    recommender: web::Data<RecommendationService>,
    images: web::Data<ImageGenerator>,
) -> HttpResponse {
    HttpResponse::Ok().json(health(&recommender, &images))
}

/// `GET /` reports the same flags as `/api/health`.
pub async fn root(
    recommender: web::Data<RecommendationService>,
    images: web::Data<ImageGenerator>,
) -> HttpResponse {
    HttpResponse::Ok().json(health(&recommender, &images))
}

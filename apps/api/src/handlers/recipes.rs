use actix_web::{web, HttpResponse};
use log::info;
use std::collections::BTreeMap;

use crate::{
    error::Result,
    models::{
        AlternativesRequest, AlternativesResponse, RecipeDetailRequest, RecipeDetailResponse,
        SessionQuery,
    },
    services::{RecommendationService, SessionStore},
};

pub fn recipes_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recipe/details").route(web::post().to(get_recipe_details)))
        .service(
            web::resource("/ingredients/alternatives").route(web::post().to(get_alternatives)),
        );
}

/// Labels like `Recipe 2` resolve through the session's ranking mapping.
fn resolve_name(requested: &str, mapping: &BTreeMap<String, String>) -> String {
    let requested = requested.trim();
    mapping
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(requested))
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| requested.to_string())
}

pub async fn get_recipe_details(
    query: web::Query<SessionQuery>,
    request: web::Json<RecipeDetailRequest>,
    recommender: web::Data<RecommendationService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let session = sessions.get(&query.session_id).await?;
    let recipe_name = resolve_name(&request.recipe_name, &session.recipe_mapping);
    if recipe_name != request.recipe_name.trim() {
        info!("🔗 '{}' resolved to '{}'", request.recipe_name, recipe_name);
    }

    let parsed = recommender
        .detailed_recipe(&recipe_name, &session.preferences)
        .await?;

    let response = RecipeDetailResponse {
        recipe_name: recipe_name.clone(),
        ingredients: parsed.ingredients.clone(),
        steps: parsed.steps.clone(),
        tips: parsed.tips.clone(),
        success: true,
    };

    sessions
        .modify(&query.session_id, move |s| s.load_recipe(&recipe_name, parsed))
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

pub async fn get_alternatives(
    query: web::Query<SessionQuery>,
    request: web::Json<AlternativesRequest>,
    recommender: web::Data<RecommendationService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let session = sessions.get(&query.session_id).await?;
    let context = session
        .current_recipe
        .unwrap_or_else(|| request.recipe_context.clone());

    let alternatives = recommender
        .ingredient_alternatives(&request.missing_ingredient, &context)
        .await?;

    Ok(HttpResponse::Ok().json(AlternativesResponse {
        alternatives,
        success: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_name_uses_mapping() {
        let mut mapping = BTreeMap::new();
        mapping.insert("Recipe 2".to_string(), "Aloo Gobi".to_string());

        assert_eq!(resolve_name(" recipe 2 ", &mapping), "Aloo Gobi");
        assert_eq!(resolve_name("Dal Tadka", &mapping), "Dal Tadka");
        assert_eq!(resolve_name("Recipe 3", &mapping), "Recipe 3");
    }
}

use actix_web::{web, HttpResponse};
use log::info;

use super::Success;
use crate::{
    error::Result,
    models::{NewTopRecipe, RecipeFieldsPatch, TopRecipePatch, TopRecipeQuery},
    services::TopRecipeStore,
};

/// Fixed paths are registered before `/{id}` so they are not parsed as ids.
pub fn top_recipes_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/top-recipes")
            .service(
                web::resource(["", "/"])
                    .route(web::get().to(list_recipes))
                    .route(web::post().to(create_recipe)),
            )
            .service(web::resource("/filters/available").route(web::get().to(available_filters)))
            .service(web::resource("/stats/summary").route(web::get().to(stats_summary)))
            .service(web::resource("/{id}/fields").route(web::patch().to(patch_recipe_fields)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_recipe))
                    .route(web::put().to(replace_recipe))
                    .route(web::patch().to(patch_recipe))
                    .route(web::delete().to(delete_recipe)),
            ),
    );
}

pub async fn list_recipes(
    query: web::Query<TopRecipeQuery>,
    store: web::Data<TopRecipeStore>,
) -> Result<HttpResponse> {
    let page = store.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_recipe(id: web::Path<i64>, store: web::Data<TopRecipeStore>) -> Result<HttpResponse> {
    let recipe = store.get(*id).await?;
    Ok(HttpResponse::Ok().json(Success::new(recipe)))
}

pub async fn create_recipe(
    body: web::Json<NewTopRecipe>,
    store: web::Data<TopRecipeStore>,
) -> Result<HttpResponse> {
    let recipe = store.create(&body).await?;
    info!("➕ Created top recipe {} ({})", recipe.id, recipe.name);
    Ok(HttpResponse::Created().json(Success::new(recipe)))
}

pub async fn replace_recipe(
    id: web::Path<i64>,
    body: web::Json<NewTopRecipe>,
    store: web::Data<TopRecipeStore>,
) -> Result<HttpResponse> {
    let recipe = store.replace(*id, &body).await?;
    Ok(HttpResponse::Ok().json(Success::new(recipe)))
}

pub async fn patch_recipe(
    id: web::Path<i64>,
    body: web::Json<TopRecipePatch>,
    store: web::Data<TopRecipeStore>,
) -> Result<HttpResponse> {
    let recipe = store.patch(*id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Success::new(recipe)))
}

pub async fn patch_recipe_fields(
    id: web::Path<i64>,
    body: web::Json<RecipeFieldsPatch>,
    store: web::Data<TopRecipeStore>,
) -> Result<HttpResponse> {
    let recipe = store.patch_fields(*id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Success::new(recipe)))
}

pub async fn delete_recipe(
    id: web::Path<i64>,
    store: web::Data<TopRecipeStore>,
) -> Result<HttpResponse> {
    store.delete(*id).await?;
    info!("🗑️ Deleted top recipe {}", id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Recipe {} deleted successfully", id),
    })))
}

pub async fn available_filters(store: web::Data<TopRecipeStore>) -> Result<HttpResponse> {
    let filters = store.available_filters().await?;
    Ok(HttpResponse::Ok().json(Success::new(filters)))
}

pub async fn stats_summary(store: web::Data<TopRecipeStore>) -> Result<HttpResponse> {
    let stats = store.stats().await?;
    Ok(HttpResponse::Ok().json(Success::new(stats)))
}

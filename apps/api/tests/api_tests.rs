use actix_web::{http::StatusCode, test, App};
use recipe_recommender_api::{
    models::{Candidate, CatalogIngredient, CatalogRecipe},
    services::{
        FakeLanguageModel, ImageGenerator, InMemoryCatalog, RecommendationService, SessionStore,
        TopRecipeStore, UserService,
    },
    AppServices,
};
use serde_json::{json, Value};
use std::sync::Arc;

const RANKING_REPLY: &str = "1. Chana Masala - spicy chickpeas, ready in 25 minutes\n\
2. Aloo Gobi - mild and quick";

fn candidate(name: &str, minutes: i32, taste: &str) -> Candidate {
    Candidate {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        cuisine_type: "Indian".to_string(),
        meal_type: vec!["Lunch".to_string()],
        prep_time_minutes: None,
        cooking_time_minutes: None,
        total_time_minutes: minutes,
        difficulty: "Easy".to_string(),
        servings: Some(2),
        taste_profile: vec![taste.to_string()],
        allergens: vec![],
        dietary_tags: vec!["Vegetarian".to_string()],
        ingredients: vec![CatalogIngredient {
            name: "Chickpeas".to_string(),
            amount: "1 can".to_string(),
            optional: false,
        }],
        popularity_score: 10.0,
        match_score: 0.0,
    }
}

fn chana_masala() -> CatalogRecipe {
    CatalogRecipe {
        id: "chana-masala".to_string(),
        name: "Chana Masala".to_string(),
        ingredients: vec![CatalogIngredient {
            name: "Chickpeas".to_string(),
            amount: "1 can".to_string(),
            optional: false,
        }],
        steps: vec![
            "STEP 1: Heat oil and add cumin seeds.".to_string(),
            "STEP 2: Add onions and cook until golden.".to_string(),
            "STEP 3: Stir in tomatoes and spices.".to_string(),
            "STEP 4: Add chickpeas and simmer for 10 minutes.".to_string(),
        ],
        tips: "Finish with lemon juice.".to_string(),
        prep_time_minutes: Some(10),
        cooking_time_minutes: Some(15),
        total_time_minutes: Some(25),
        difficulty: Some("Easy".to_string()),
        servings: Some(2),
    }
}

struct Fixture {
    services: AppServices,
    catalog: Arc<InMemoryCatalog>,
    llm: Arc<FakeLanguageModel>,
}

async fn fixture(ranking_reply: &str) -> Fixture {
    let catalog = Arc::new(InMemoryCatalog::new(
        vec![
            candidate("Chana Masala", 25, "Spicy"),
            candidate("Aloo Gobi", 20, "Mild"),
        ],
        vec![chana_masala()],
    ));
    let llm = Arc::new(
        FakeLanguageModel::with_response("Available recipe names", ranking_reply)
            .with_default_response("Close-up of chickpeas simmering in a copper pot, soft light"),
    );

    let recommender = RecommendationService::new(llm.clone()).with_catalog(catalog.clone());
    let images = ImageGenerator::new(llm.clone());
    let top_recipes = TopRecipeStore::in_memory().await.unwrap();

    Fixture {
        services: AppServices::new(
            recommender,
            images,
            SessionStore::in_memory(None),
            top_recipes,
            UserService::default(),
        ),
        catalog,
        llm,
    }
}

fn lunch_preferences() -> Value {
    json!({
        "region": "Indian",
        "taste_preferences": ["Spicy"],
        "meal_type": "lunch",
        "time_available": "30 mins",
        "allergies": [],
        "dislikes": [],
        "available_ingredients": ["chickpeas", "onion"]
    })
}

macro_rules! app {
    ($services:expr) => {{
        let services = $services.clone();
        test::init_service(App::new().configure(move |cfg| services.register(cfg))).await
    }};
}

#[actix_web::test]
async fn test_full_cooking_session() {
    let fx = fixture(RANKING_REPLY).await;
    let app = app!(fx.services);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/preferences")
            .set_json(lunch_preferences())
            .to_request(),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["recipe_mapping"]["Recipe 1"], "Chana Masala");
    assert_eq!(body["recipe_mapping"]["Recipe 2"], "Aloo Gobi");
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(session_id.starts_with("session_"));

    let details: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/recipe/details?session_id={}", session_id))
            .set_json(json!({"recipe_name": "Recipe 1"}))
            .to_request(),
    )
    .await;
    assert_eq!(details["recipe_name"], "Chana Masala");
    assert_eq!(details["steps"].as_array().unwrap().len(), 4);
    assert!(details["ingredients"].as_str().unwrap().contains("Chickpeas"));

    let image: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/step/image?session_id={}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(image["generation_type"], "text_only");
    assert!(image["image_data"].is_null());
    assert!(image["description"].as_str().unwrap().contains("chickpeas"));

    for expected in 1..=4 {
        let step: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/step/next?session_id={}", session_id))
                .to_request(),
        )
        .await;
        assert_eq!(step["step_number"], expected);
        assert_eq!(step["total_steps"], 4);
        assert_eq!(step["completed"], false);
        assert!(step.get("tips").is_none());
    }

    let done: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/step/next?session_id={}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(done["completed"], true);
    assert!(done["step"].is_null());
    assert_eq!(done["message"], "All steps completed!");
    assert_eq!(done["tips"], "Finish with lemon juice.");

    let info: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/session/{}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(info["current_recipe"], "Chana Masala");
    assert_eq!(info["state"], "completed");

    let history: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/history/{}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(history["total_completed_steps"], 4);

    let alternatives: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/ingredients/alternatives?session_id={}", session_id))
            .set_json(json!({"missing_ingredient": "chickpeas"}))
            .to_request(),
    )
    .await;
    assert_eq!(alternatives["success"], true);
    let calls = fx.llm.calls();
    let prompt = &calls.last().unwrap().user;
    assert!(prompt.contains("Chana Masala"));

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/session/{}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/session/{}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_unknown_session_is_404_without_mutation() {
    let fx = fixture(RANKING_REPLY).await;
    let app = app!(fx.services);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/preferences")
            .set_json(lunch_preferences())
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert_eq!(fx.services.sessions.len().await.unwrap(), 1);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/api/session/session_doesnotexist")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Session not found");
    assert_eq!(fx.services.sessions.len().await.unwrap(), 1);
}

#[actix_web::test]
async fn test_unmapped_placeholder_skips_catalog() {
    let fx = fixture("1. Chana Masala - spicy chickpeas").await;
    let app = app!(fx.services);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/preferences")
            .set_json(lunch_preferences())
            .to_request(),
    )
    .await;
    assert!(body["recipe_mapping"].get("Recipe 2").is_none());
    let session_id = body["session_id"].as_str().unwrap().to_string();
    let lookups = fx.catalog.lookups();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/recipe/details?session_id={}", session_id))
            .set_json(json!({"recipe_name": "Recipe 2"}))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert_eq!(fx.catalog.lookups(), lookups);
}

#[actix_web::test]
async fn test_step_endpoints_before_recipe_is_loaded() {
    let fx = fixture(RANKING_REPLY).await;
    let app = app!(fx.services);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/step/next?session_id=session_missing")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/preferences")
            .set_json(lunch_preferences())
            .to_request(),
    )
    .await;
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/step/next?session_id={}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "No recipe loaded");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/step/gemini_image?session_id={}", session_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_top_recipes_crud_over_http() {
    let fx = fixture(RANKING_REPLY).await;
    let app = app!(fx.services);

    let created: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/top-recipes")
            .set_json(json!({
                "name": "Margherita Pizza",
                "region": "Italian",
                "difficulty": "Medium",
                "meal_types": ["Dinner"],
                "steps": ["Stretch the dough", "Top and bake"],
                "rating": 4.6
            }))
            .to_request(),
    )
    .await;
    assert_eq!(created["success"], true);
    assert_eq!(created["step_image_urls"], json!(["", ""]));
    let id = created["id"].as_i64().unwrap();

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/top-recipes?region=Italian&detailed=false")
            .to_request(),
    )
    .await;
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["recipes"][0]["name"], "Margherita Pizza");

    let filters: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/top-recipes/filters/available")
            .to_request(),
    )
    .await;
    assert_eq!(filters["regions"], json!(["Italian"]));

    let patched: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/api/top-recipes/{}", id))
            .set_json(json!({"rating": 4.9}))
            .to_request(),
    )
    .await;
    assert_eq!(patched["rating"], 4.9);
    assert_eq!(patched["name"], "Margherita Pizza");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/top-recipes")
            .set_json(json!({"name": "Bad", "difficulty": "Impossible"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/top-recipes/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/top-recipes/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], format!("Recipe with ID {} not found", id));
}

#[actix_web::test]
async fn test_health_reports_modes() {
    let fx = fixture(RANKING_REPLY).await;
    let app = app!(fx.services);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(body["catalog_enabled"], true);
    assert_eq!(body["rag_enabled"], false);
    assert_eq!(body["image_generation"]["gemini"], false);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/user/cook@example.com").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

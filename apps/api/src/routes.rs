use actix_web::{web, Scope};

use crate::handlers::{
    health_check, preferences_config, recipes_config, root, sessions_config, steps_config,
    top_recipes_config, users_config,
};

/// Configure all routes for the API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health_check)
        .configure(preferences_config)
        .configure(recipes_config)
        .configure(steps_config)
        .configure(sessions_config)
        .configure(top_recipes_config)
        .configure(users_config)
}

/// `GET /`
pub fn root_route() -> actix_web::Resource {
    web::resource("/").route(web::get().to(root))
}

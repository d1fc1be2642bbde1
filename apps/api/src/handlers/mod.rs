use serde::Serialize;

pub mod health;
pub mod preferences;
pub mod recipes;
pub mod sessions;
pub mod steps;
pub mod top_recipes;
pub mod users;

pub use health::{health_check, root};
pub use preferences::preferences_config;
pub use recipes::recipes_config;
pub use sessions::sessions_config;
pub use steps::steps_config;
pub use top_recipes::top_recipes_config;
pub use users::users_config;

/// Adds `"success": true` next to the fields of a payload.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

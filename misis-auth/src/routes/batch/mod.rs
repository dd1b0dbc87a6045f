//! Externally triggered profile refresh of all stored users.

use axum::{Router, routing};

use super::State;

mod api;
mod response;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/update-user-data", routing::get(api::get_update_user_data))
            .with_state(state.clone()),
    )
}

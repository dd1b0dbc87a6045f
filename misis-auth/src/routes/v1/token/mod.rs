use axum::{Router, routing};

use super::super::State;

mod api;
mod request;
mod response;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/validate", routing::post(api::post_validate))
            .with_state(state.clone()),
    )
}

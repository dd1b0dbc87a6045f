use axum::{Router, routing};

use super::super::State;

mod api;
mod response;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/info", routing::get(api::get_info))
            .with_state(state.clone()),
    )
}

use axum::{Router, routing};

use super::super::{State, oauth2::middleware::SessionService};

mod api;
mod request;
mod response;

/// Application management of the signed-in user. Authenticated with the login session cookie.
pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/", routing::post(api::post_client))
            .route("/count", routing::get(api::get_client_count))
            .route("/list", routing::get(api::get_client_list))
            .route(
                "/{client_id}",
                routing::get(api::get_client)
                    .patch(api::patch_client)
                    .delete(api::delete_client),
            )
            .layer(SessionService::new(&state.model))
            .with_state(state.clone()),
    )
}

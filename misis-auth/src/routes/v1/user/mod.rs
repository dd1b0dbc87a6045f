use std::collections::HashMap;

use axum::{Router, http::Method, routing};

use super::super::{State, oauth2::middleware::AuthService};

mod api;
mod response;

/// The scope required by the full profile.
pub const SCOPE_PROFILE: &'static str = "profile";

pub fn new_service(scope_path: &str, state: &State) -> Router {
    let mut api_scopes_root: HashMap<Method, Vec<String>> = HashMap::new();
    let mut api_scopes_profile: HashMap<Method, Vec<String>> = HashMap::new();

    match state.api_scopes.get("user.get") {
        None => {
            api_scopes_root.insert(Method::GET, vec![]);
        }
        Some(scopes) => {
            api_scopes_root.insert(Method::GET, scopes.clone());
        }
    }
    api_scopes_profile.insert(Method::GET, vec![SCOPE_PROFILE.to_string()]);

    Router::new().nest(
        scope_path,
        Router::new()
            .route(
                "/",
                routing::get(api::get_user).layer(AuthService::new(
                    &state.model,
                    &state.signer,
                    api_scopes_root,
                )),
            )
            .route(
                "/profile",
                routing::get(api::get_profile).layer(AuthService::new(
                    &state.model,
                    &state.signer,
                    api_scopes_profile,
                )),
            )
            .with_state(state.clone()),
    )
}

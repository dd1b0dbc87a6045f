//! Handlers of all OAuth2 functions.

use axum::{Router, routing};
use tera::Tera;

use super::State;

pub mod api;
pub mod middleware;
pub mod primitive;
pub(crate) mod request;
pub mod response;
mod template;

/// To register all OAuth2 relative URIs.
pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/authorize", routing::get(api::get_authorize))
            .route(
                "/login",
                routing::get(api::get_login).post(api::post_login),
            )
            .route("/token", routing::post(api::post_token))
            .with_state(state.clone()),
    )
}

/// To load the sign-in page from the configured file or the built-in template.
pub fn new_tera(login_template: Option<&String>) -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    match login_template {
        None => tera.add_raw_template(api::TMPL_LOGIN, template::LOGIN)?,
        Some(path) => tera.add_template_file(path.as_str(), Some(api::TMPL_LOGIN))?,
    }
    Ok(tera)
}

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};

use misis_corelib::http::Json;

use super::{super::super::State as AppState, response};
use crate::routes::oauth2::primitive::{
    GRANT_TYPE_CODE, GRANT_TYPE_REFRESH, RESPONSE_TYPE_CODE, SUPPORTED_SCOPES,
};

const DEF_ISSUER: &'static str = "http://localhost";

/// `GET /{base}/api/v1/oauth/info`
pub async fn get_info(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let issuer = match state.issuer.as_ref() {
        Some(issuer) => issuer.clone(),
        None => match headers.get(header::HOST) {
            None => DEF_ISSUER.to_string(),
            Some(host) => match host.to_str() {
                Err(_) => DEF_ISSUER.to_string(),
                Ok(host) => format!("http://{}", host),
            },
        },
    };
    let base = format!("{}{}", issuer, state.scope_path);

    Json(response::GetInfo {
        authorization_endpoint: format!("{}/oauth/authorize", base),
        token_endpoint: format!("{}/oauth/token", base),
        userinfo_endpoint: format!("{}/api/v1/user", base),
        profile_endpoint: format!("{}/api/v1/user/profile", base),
        token_validation_endpoint: format!("{}/api/v1/token/validate", base),
        scopes_supported: SUPPORTED_SCOPES.to_vec(),
        response_types_supported: vec![RESPONSE_TYPE_CODE],
        grant_types_supported: vec![GRANT_TYPE_CODE, GRANT_TYPE_REFRESH],
        token_endpoint_auth_methods_supported: vec!["client_secret_post"],
        code_challenge_methods_supported: vec![],
        service_documentation: format!("{}/docs", issuer),
        ui_locales_supported: vec!["ru", "en"],
        issuer,
    })
}

use axum::{extract::State, response::IntoResponse};
use log::error;

use misis_corelib::{
    err::{E_TOKEN, ErrResp},
    http::Json,
};

use super::{super::super::State as AppState, request, response};
use crate::routes::oauth2::primitive;

/// `POST /{base}/api/v1/token/validate`
///
/// Invalid tokens are reported with `200 OK` and `valid: false`.
pub async fn post_validate(
    State(state): State<AppState>,
    Json(body): Json<request::PostValidateBody>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "post_validate";

    let access_token = match body.access_token.as_ref() {
        Some(token) if token.len() > 0 => token,
        _ => {
            return Err(ErrResp::ErrParam(Some(
                "access_token is required".to_string(),
            )));
        }
    };
    let info = match primitive::validate_access_token(
        state.model.as_ref(),
        &state.signer,
        access_token.as_str(),
    )
    .await
    {
        Err(e) => {
            error!("[{}] validate token error: {}", FN_NAME, e);
            return Err(ErrResp::ErrDb(None));
        }
        Ok(info) => info,
    };

    Ok(Json(match info {
        None => response::PostValidate {
            valid: false,
            user_id: None,
            scopes: None,
            error: Some(E_TOKEN.to_string()),
            error_description: Some("token is invalid, expired or revoked".to_string()),
        },
        Some(info) => response::PostValidate {
            valid: true,
            user_id: Some(info.user_id),
            scopes: Some(info.scopes),
            error: None,
            error_description: None,
        },
    }))
}

use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use log::{error, info, warn};

use misis_corelib::{
    err::ErrResp,
    http::{Json, parse_bearer_token},
    strings::{redact, secure_eq, time_str},
};

use super::{super::State as AppState, response};

const STATUS_SUCCESS: &'static str = "success";
const STATUS_ERROR: &'static str = "error";

/// `GET /{base}/batch/update-user-data`
///
/// Requires `Authorization: Bearer <batch secret>`. Always rejected when no secret is configured.
pub async fn get_update_user_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "get_update_user_data";

    let secret = match state.batch_secret.as_ref() {
        None => {
            warn!("[{}] batch secret is not configured", FN_NAME);
            return Err(ErrResp::ErrAuth(None));
        }
        Some(secret) => secret,
    };
    let token = parse_bearer_token(&headers)?;
    if !secure_eq(token.as_str(), secret.as_str()) {
        warn!("[{}] wrong batch secret {}", FN_NAME, redact(token.as_str()));
        return Err(ErrResp::ErrAuth(None));
    }

    info!("[{}] start", FN_NAME);
    let report = match state.bridge.refresh_all().await {
        Err(e) => {
            error!("[{}] list users error: {}", FN_NAME, e);
            return Err(ErrResp::ErrDb(None));
        }
        Ok(report) => report,
    };

    Ok(Json(response::GetUpdateUserData {
        success: true,
        message: format!(
            "updated {} of {} users",
            report.success_count, report.total_users
        ),
        total_users: report.total_users,
        success_count: report.success_count,
        error_count: report.error_count,
        results: report
            .results
            .into_iter()
            .map(|r| response::UpdateResult {
                user_id: r.user_id,
                login: r.login,
                status: match r.error.is_none() {
                    false => STATUS_ERROR,
                    true => STATUS_SUCCESS,
                },
                error: r.error,
                updated_at: time_str(&r.updated_at),
            })
            .collect(),
    }))
}

//! To generate HTTP error response.
//!
//! Errors are serialized in the OAuth 2.0 style `{ "error": ..., "error_description": ... }`.
//!
//! ```ignore
//! use misis_corelib::err::ErrResp;
//! // To generate HTTP request body format error.
//! if format_error(body) {
//!     return Err(ErrResp::ErrParam(Some("input format error".to_string())));
//! }
//! ```

use std::{error::Error, fmt};

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json;

/// The standard error definitions.
#[derive(Debug)]
pub enum ErrResp {
    /// Missing credentials.
    ErrAuth(Option<String>),
    /// Invalid, expired or revoked bearer token.
    ErrToken(Option<String>),
    /// The bearer token does not carry the required scope.
    ErrScope(Option<String>),
    ErrDb(Option<String>),
    ErrNotFound(Option<String>),
    ErrParam(Option<String>),
    ErrPerm(Option<String>),
    ErrUnknown(Option<String>),
    Custom(u16, &'static str, Option<String>),
}

/// Used for generating HTTP body for errors.
#[derive(Serialize)]
struct RespJson<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<&'a str>,
}

/// 401, no credentials.
pub const E_AUTH: &'static str = "unauthorized";
/// 401, invalid token.
pub const E_TOKEN: &'static str = "invalid_token";
/// 403, the token has no required scope.
pub const E_SCOPE: &'static str = "insufficient_scope";
/// 500, database error.
pub const E_DB: &'static str = "server_error";
/// 404, resource (in path) not found.
pub const E_NOT_FOUND: &'static str = "not_found";
/// 400, request (body) format error.
pub const E_PARAM: &'static str = "invalid_request";
/// 403, invalid permission.
pub const E_PERM: &'static str = "forbidden";
/// 500, unknown error.
pub const E_UNKNOWN: &'static str = "server_error";

/// To generate error JSON string for HTTP body.
pub fn to_json(error: &str, description: Option<&str>) -> String {
    match serde_json::to_string(&RespJson {
        error,
        error_description: description,
    }) {
        Err(_) => format!("{{\"error\":\"{}\"}}", error),
        Ok(str) => str,
    }
}

impl ErrResp {
    fn resp_json(&'_ self) -> RespJson<'_> {
        let (error, desc) = match self {
            ErrResp::ErrAuth(desc) => (E_AUTH, desc),
            ErrResp::ErrToken(desc) => (E_TOKEN, desc),
            ErrResp::ErrScope(desc) => (E_SCOPE, desc),
            ErrResp::ErrDb(desc) => (E_DB, desc),
            ErrResp::ErrNotFound(desc) => (E_NOT_FOUND, desc),
            ErrResp::ErrParam(desc) => (E_PARAM, desc),
            ErrResp::ErrPerm(desc) => (E_PERM, desc),
            ErrResp::ErrUnknown(desc) => (E_UNKNOWN, desc),
            ErrResp::Custom(_, error, desc) => (*error, desc),
        };
        RespJson {
            error,
            error_description: desc.as_deref(),
        }
    }

    /// The HTTP status code of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrResp::ErrAuth(_) => StatusCode::UNAUTHORIZED,
            ErrResp::ErrToken(_) => StatusCode::UNAUTHORIZED,
            ErrResp::ErrScope(_) => StatusCode::FORBIDDEN,
            ErrResp::ErrDb(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrResp::ErrNotFound(_) => StatusCode::NOT_FOUND,
            ErrResp::ErrParam(_) => StatusCode::BAD_REQUEST,
            ErrResp::ErrPerm(_) => StatusCode::FORBIDDEN,
            ErrResp::ErrUnknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrResp::Custom(code, _, _) => match StatusCode::from_u16(*code) {
                Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
                Ok(code) => code,
            },
        }
    }
}

impl fmt::Display for ErrResp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let json = self.resp_json();
        write!(f, "{}", to_json(json.error, json.error_description))
    }
}

impl Error for ErrResp {}

impl IntoResponse for ErrResp {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ErrResp::ErrAuth(_) | ErrResp::ErrToken(_) => {
                let challenge = match self {
                    ErrResp::ErrToken(_) => "Bearer error=\"invalid_token\"",
                    _ => "Bearer",
                };
                (
                    status,
                    [(header::WWW_AUTHENTICATE, challenge)],
                    Json(self.resp_json()),
                )
                    .into_response()
            }
            _ => (status, Json(self.resp_json())).into_response(),
        }
    }
}

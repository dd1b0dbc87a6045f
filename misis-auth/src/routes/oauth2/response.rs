use std::fmt;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json;

/// OAuth2 error body `{error, error_description}`.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct OAuth2Error {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}

pub struct OAuth2ErrorCode;

impl OAuth2ErrorCode {
    pub const ACCESS_DENIED: &'static str = "access_denied";
    pub const INVALID_CLIENT: &'static str = "invalid_client";
    pub const INVALID_GRANT: &'static str = "invalid_grant";
    pub const INVALID_REQUEST: &'static str = "invalid_request";
    pub const SERVER_ERROR: &'static str = "server_error";
    pub const UNSUPPORTED_GRANT_TYPE: &'static str = "unsupported_grant_type";
    pub const UNSUPPORTED_RESPONSE_TYPE: &'static str = "unsupported_response_type";
}

impl OAuth2Error {
    pub fn new(error: &str, description: Option<&str>) -> Self {
        OAuth2Error {
            error: error.to_string(),
            error_description: match description {
                None => None,
                Some(description) => Some(description.to_string()),
            },
        }
    }

    pub fn new_request(description: Option<&str>) -> Self {
        OAuth2Error::new(OAuth2ErrorCode::INVALID_REQUEST, description)
    }

    pub fn new_server(description: Option<&str>) -> Self {
        OAuth2Error::new(OAuth2ErrorCode::SERVER_ERROR, description)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            OAuth2ErrorCode::SERVER_ERROR => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for OAuth2Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(self) {
            Err(_) => write!(f, "{}", self.error),
            Ok(str) => write!(f, "{}", str),
        }
    }
}

impl IntoResponse for OAuth2Error {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CACHE_CONTROL, "no-store")],
            axum::Json(self),
        )
            .into_response()
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store"), (header::PRAGMA, "no-cache")],
            axum::Json(self),
        )
            .into_response()
    }
}

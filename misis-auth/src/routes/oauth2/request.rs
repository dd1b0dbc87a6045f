use axum::{
    extract::{Form, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::response::OAuth2Error;

/// Query parameters of the authorization endpoint.
///
/// All fields are optional so that missing fields can be reported with OAuth2 error codes.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AuthorizeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Query parameters of the sign-in page.
#[derive(Deserialize, Serialize)]
pub struct GetLoginRequest {
    /// The URL-encoded query of the original authorize request.
    pub state: String,
}

#[derive(Deserialize)]
pub struct PostLoginRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    pub state: String,
    /// Present when the user pressed the cancel button.
    pub cancel: Option<String>,
}

/// Form body of the token endpoint.
#[derive(Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// For `authorization_code`.
    pub code: Option<String>,
    /// For `authorization_code`.
    pub redirect_uri: Option<String>,
    /// For `refresh_token`.
    pub refresh_token: Option<String>,
}

impl<S> FromRequestParts<S> for AuthorizeRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<AuthorizeRequest>::from_request_parts(parts, state).await {
            Err(e) => Err(OAuth2Error::new_request(Some(e.body_text().as_str())).into_response()),
            Ok(request) => Ok(request.0),
        }
    }
}

impl<S> FromRequestParts<S> for GetLoginRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<GetLoginRequest>::from_request_parts(parts, state).await {
            Err(e) => Err(OAuth2Error::new_request(Some(e.body_text().as_str())).into_response()),
            Ok(request) => Ok(request.0),
        }
    }
}

impl<S> FromRequest<S> for PostLoginRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<PostLoginRequest>::from_request(req, state).await {
            Err(e) => Err(OAuth2Error::new_request(Some(e.body_text().as_str())).into_response()),
            Ok(body) => Ok(body.0),
        }
    }
}

impl<S> FromRequest<S> for TokenRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<TokenRequest>::from_request(req, state).await {
            Err(e) => Err(OAuth2Error::new_request(Some(e.body_text().as_str())).into_response()),
            Ok(body) => Ok(body.0),
        }
    }
}

impl AuthorizeRequest {
    /// To parse the authorize query carried by the `state` of the sign-in page.
    pub fn from_state(state: &str) -> Option<Self> {
        match state.len() {
            0 => None,
            _ => match serde_urlencoded::from_str::<AuthorizeRequest>(state) {
                Err(_) => None,
                Ok(req) => Some(req),
            },
        }
    }
}

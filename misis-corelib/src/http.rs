//! HTTP helpers: extractors that answer with [`ErrResp`] on rejection and `Authorization` header
//! parsing.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::err::ErrResp;

/// JSON extractor/response which rejects malformed bodies with `400 invalid_request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// URL-encoded form extractor which rejects malformed bodies with `400 invalid_request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Form<T>(pub T);

/// Query string extractor which rejects malformed queries with `400 invalid_request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

/// Path parameter extractor which rejects malformed parameters with `400 invalid_request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrResp;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Err(e) => Err(ErrResp::ErrParam(Some(e.body_text()))),
            Ok(value) => Ok(Self(value.0)),
        }
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl<T, S> FromRequest<S> for Form<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrResp;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Form::<T>::from_request(req, state).await {
            Err(e) => Err(ErrResp::ErrParam(Some(e.body_text()))),
            Ok(value) => Ok(Self(value.0)),
        }
    }
}

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrResp;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Err(e) => Err(ErrResp::ErrParam(Some(e.body_text()))),
            Ok(value) => Ok(Self(value.0)),
        }
    }
}

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ErrResp;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Err(e) => Err(ErrResp::ErrParam(Some(e.body_text()))),
            Ok(value) => Ok(Self(value.0)),
        }
    }
}

/// Parse Authorization header content. Returns `None` means no Authorization header.
pub fn parse_header_auth(req: &Request) -> Result<Option<String>, ErrResp> {
    parse_headers_auth(req.headers())
}

/// Same as [`parse_header_auth`] but works on a header map.
pub fn parse_headers_auth(headers: &HeaderMap) -> Result<Option<String>, ErrResp> {
    let mut auth_all = headers.get_all(header::AUTHORIZATION).iter();
    let auth = match auth_all.next() {
        None => return Ok(None),
        Some(auth) => match auth.to_str() {
            Err(e) => return Err(ErrResp::ErrParam(Some(e.to_string()))),
            Ok(auth) => auth,
        },
    };
    if auth_all.next() != None {
        return Err(ErrResp::ErrParam(Some(
            "invalid multiple Authorization header".to_string(),
        )));
    }
    Ok(Some(auth.to_string()))
}

/// To get the bearer token of the Authorization header.
///
/// - Missing header or non-Bearer scheme: `ErrAuth`.
/// - Malformed header: `ErrParam`.
pub fn parse_bearer_token(headers: &HeaderMap) -> Result<String, ErrResp> {
    let auth = match parse_headers_auth(headers)? {
        None => return Err(ErrResp::ErrAuth(Some("Bearer token required".to_string()))),
        Some(auth) => auth,
    };
    let mut split = auth.splitn(2, ' ');
    match (split.next(), split.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            match token.len() {
                0 => Err(ErrResp::ErrAuth(Some("Bearer token required".to_string()))),
                _ => Ok(token.to_string()),
            }
        }
        _ => Err(ErrResp::ErrAuth(Some("Bearer token required".to_string()))),
    }
}

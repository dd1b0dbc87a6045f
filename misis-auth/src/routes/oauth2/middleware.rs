use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use futures::future::BoxFuture;
use log::error;
use tower::{Layer, Service};

use misis_corelib::{err::ErrResp, http::parse_bearer_token};

use super::{api::SESSION_COOKIE, primitive};
use crate::{libs::jwt::Signer, models::Model};

/// Bearer token authentication layer.
///
/// Inserts the token owner [`crate::models::user::User`] and [`primitive::TokenInfo`] into the
/// request extensions.
#[derive(Clone)]
pub struct AuthService {
    model: Arc<dyn Model>,
    signer: Signer,
    api_scopes: HashMap<Method, Vec<String>>,
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    model: Arc<dyn Model>,
    signer: Signer,
    api_scopes: HashMap<Method, HashSet<String>>,
    service: S,
}

impl AuthService {
    /// `api_scopes` lists the scopes of each method. The token must have one of them when the
    /// list is not empty.
    pub fn new(
        model: &Arc<dyn Model>,
        signer: &Signer,
        api_scopes: HashMap<Method, Vec<String>>,
    ) -> Self {
        AuthService {
            model: model.clone(),
            signer: signer.clone(),
            api_scopes,
        }
    }
}

impl<S> Layer<S> for AuthService {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let mut api_scopes: HashMap<Method, HashSet<String>> = HashMap::new();
        for (k, s) in self.api_scopes.iter() {
            api_scopes.insert(k.clone(), s.iter().map(|s| s.clone()).collect());
        }
        AuthMiddleware {
            model: self.model.clone(),
            signer: self.signer.clone(),
            api_scopes,
            service: inner,
        }
    }
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        const FN_NAME: &'static str = "AuthMiddleware";

        let mut svc = self.service.clone();
        let model = self.model.clone();
        let signer = self.signer.clone();
        let api_scopes = self.api_scopes.clone();

        Box::pin(async move {
            let token = match parse_bearer_token(req.headers()) {
                Err(e) => return Ok(e.into_response()),
                Ok(token) => token,
            };
            let (user, info) =
                match primitive::get_user_info(model.as_ref(), &signer, token.as_str()).await {
                    Err(e) => {
                        error!("[{}] validate token error: {}", FN_NAME, e);
                        return Ok(ErrResp::ErrDb(None).into_response());
                    }
                    Ok(None) => {
                        let e = ErrResp::ErrToken(Some("invalid or expired token".to_string()));
                        return Ok(e.into_response());
                    }
                    Ok(Some(result)) => result,
                };
            if let Some(required) = api_scopes.get(req.method()) {
                if required.len() > 0 && !info.scopes.iter().any(|s| required.contains(s)) {
                    let e = ErrResp::ErrScope(Some("insufficient scope".to_string()));
                    return Ok(e.into_response());
                }
            }
            req.extensions_mut().insert(user);
            req.extensions_mut().insert(info);

            let res = svc.call(req).await?;
            Ok(res)
        })
    }
}

/// Login session authentication layer for the pages of the signed-in user.
///
/// Reads the session cookie set by the sign-in page and inserts the session owner
/// [`crate::models::user::User`] into the request extensions. Bearer tokens are not accepted.
#[derive(Clone)]
pub struct SessionService {
    model: Arc<dyn Model>,
}

#[derive(Clone)]
pub struct SessionMiddleware<S> {
    model: Arc<dyn Model>,
    service: S,
}

impl SessionService {
    pub fn new(model: &Arc<dyn Model>) -> Self {
        SessionService {
            model: model.clone(),
        }
    }
}

impl<S> Layer<S> for SessionService {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            model: self.model.clone(),
            service: inner,
        }
    }
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        const FN_NAME: &'static str = "SessionMiddleware";

        let mut svc = self.service.clone();
        let model = self.model.clone();

        Box::pin(async move {
            let jar = CookieJar::from_headers(req.headers());
            let session_id = match jar.get(SESSION_COOKIE) {
                None => {
                    let e = ErrResp::ErrAuth(Some("sign-in required".to_string()));
                    return Ok(e.into_response());
                }
                Some(cookie) => cookie.value().to_string(),
            };
            let user = match primitive::get_session_user(model.as_ref(), session_id.as_str()).await {
                Err(e) => {
                    error!("[{}] get session user error: {}", FN_NAME, e);
                    return Ok(ErrResp::ErrDb(None).into_response());
                }
                Ok(None) => {
                    let e = ErrResp::ErrAuth(Some("sign-in required".to_string()));
                    return Ok(e.into_response());
                }
                Ok(Some(user)) => user,
            };
            req.extensions_mut().insert(user);

            let res = svc.call(req).await?;
            Ok(res)
        })
    }
}

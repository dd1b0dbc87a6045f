use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use log::{error, info, warn};
use tera::Context;
use url::Url;

use misis_corelib::{constants::ContentType, strings};

use super::{
    super::State as AppState,
    primitive,
    request::{AuthorizeRequest, GetLoginRequest, PostLoginRequest, TokenRequest},
    response::{OAuth2Error, OAuth2ErrorCode},
};
use crate::{
    libs::bridge::LoginError,
    models::{
        client::Client,
        login_session::{self, LoginSession},
        user::User,
    },
};

pub const TMPL_LOGIN: &'static str = "login.html";
pub const SESSION_COOKIE: &'static str = "misis_sid";

const SESSION_ID_LEN: usize = 40;
const LOGIN_FAILED_MSG: &'static str = "Неверный логин или пароль";

/// `GET /{base}/oauth/authorize`
///
/// Issues an authorization code for the signed-in user or redirects to the sign-in page.
pub async fn get_authorize(
    State(state): State<AppState>,
    jar: CookieJar,
    req: AuthorizeRequest,
) -> Response {
    const FN_NAME: &'static str = "get_authorize";

    let (client, redirect_uri) = match check_client(FN_NAME, &state, &req).await {
        Err(resp) => return resp,
        Ok(client) => client,
    };
    let redirect_uri = redirect_uri.as_str();
    if let Err(e) = primitive::validate_authorization_request(&req) {
        return redirect_error(FN_NAME, redirect_uri, e, req.state.as_deref());
    }
    let scopes = primitive::resolve_scopes(&client, &primitive::parse_scope(req.scope.as_deref()));

    let user = match get_session_user(FN_NAME, &state, &jar).await {
        Err(resp) => return resp,
        Ok(None) => {
            let login_state = match serde_urlencoded::to_string(&req) {
                Err(e) => {
                    error!("[{}] encode authorize state error: {}", FN_NAME, e);
                    return OAuth2Error::new_server(None).into_response();
                }
                Ok(str) => str,
            };
            let query = match serde_urlencoded::to_string(GetLoginRequest { state: login_state }) {
                Err(e) => {
                    error!("[{}] encode login state error: {}", FN_NAME, e);
                    return OAuth2Error::new_server(None).into_response();
                }
                Ok(str) => str,
            };
            return resp_found(format!("{}/oauth/login?{}", state.scope_path, query).as_str());
        }
        Ok(Some(user)) => user,
    };

    let code = match primitive::issue_authorization_code(
        state.model.as_ref(),
        user.user_id.as_str(),
        client.client_id.as_str(),
        redirect_uri,
        &scopes,
    )
    .await
    {
        Err(e) => {
            error!("[{}] issue code error: {}", FN_NAME, e);
            let e = OAuth2Error::new_server(None);
            return redirect_error(FN_NAME, redirect_uri, e, req.state.as_deref());
        }
        Ok(code) => code,
    };
    let mut params = vec![("code", code.as_str())];
    if let Some(s) = req.state.as_deref() {
        params.push(("state", s));
    }
    match append_query(redirect_uri, &params) {
        None => OAuth2Error::new_server(None).into_response(),
        Some(location) => resp_found(location.as_str()),
    }
}

/// `GET /{base}/oauth/login`
///
/// To render the sign-in page.
pub async fn get_login(State(state): State<AppState>, req: GetLoginRequest) -> Response {
    const FN_NAME: &'static str = "get_login";

    let auth_req = match AuthorizeRequest::from_state(req.state.as_str()) {
        None => {
            warn!("[{}] invalid state content", FN_NAME);
            return OAuth2Error::new_request(Some("invalid state content")).into_response();
        }
        Some(auth_req) => auth_req,
    };
    let (client, _) = match check_client(FN_NAME, &state, &auth_req).await {
        Err(resp) => return resp,
        Ok(client) => client,
    };
    render_login(FN_NAME, &state, &client, &auth_req, req.state.as_str(), None)
}

/// `POST /{base}/oauth/login`
///
/// Do the sign-in process with the credential bridge.
pub async fn post_login(
    State(state): State<AppState>,
    jar: CookieJar,
    req: PostLoginRequest,
) -> Response {
    const FN_NAME: &'static str = "post_login";

    let auth_req = match AuthorizeRequest::from_state(req.state.as_str()) {
        None => {
            warn!("[{}] invalid state content", FN_NAME);
            return OAuth2Error::new_request(Some("invalid state content")).into_response();
        }
        Some(auth_req) => auth_req,
    };
    let (client, redirect_uri) = match check_client(FN_NAME, &state, &auth_req).await {
        Err(resp) => return resp,
        Ok(client) => client,
    };

    if req.cancel.is_some() {
        let e = OAuth2Error::new(
            OAuth2ErrorCode::ACCESS_DENIED,
            Some("the user denied the request"),
        );
        return redirect_error(FN_NAME, redirect_uri.as_str(), e, auth_req.state.as_deref());
    }

    let user = match state
        .bridge
        .login(req.login.as_str(), req.password.as_str())
        .await
    {
        Err(LoginError::Rejected) => {
            let page = render_login(
                FN_NAME,
                &state,
                &client,
                &auth_req,
                req.state.as_str(),
                Some(LOGIN_FAILED_MSG),
            );
            return (StatusCode::UNAUTHORIZED, page).into_response();
        }
        Err(LoginError::Db(_)) => return OAuth2Error::new_server(None).into_response(),
        Ok(user) => user,
    };

    let now = Utc::now();
    let session = LoginSession {
        session_id: strings::randomstring(SESSION_ID_LEN),
        expires_at: now + Duration::seconds(login_session::EXPIRES),
        user_id: user.user_id.clone(),
    };
    if let Err(e) = state.model.login_session().add(&session).await {
        error!("[{}] add login session error: {}", FN_NAME, e);
        return OAuth2Error::new_server(None).into_response();
    }
    info!("[{}] user {} signed in", FN_NAME, user.user_id);

    let cookie = Cookie::build((SESSION_COOKIE, session.session_id))
        .path(match state.scope_path {
            "" => "/",
            path => path,
        })
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let location = format!("{}/oauth/authorize?{}", state.scope_path, req.state);
    (jar.add(cookie), resp_found(location.as_str())).into_response()
}

/// `POST /{base}/oauth/token`
pub async fn post_token(State(state): State<AppState>, req: TokenRequest) -> Response {
    if let Err(e) = primitive::validate_token_request(&req) {
        return e.into_response();
    }
    let client_id = req.client_id.as_deref().unwrap_or("");
    let client_secret = req.client_secret.as_deref().unwrap_or("");
    let model = state.model.as_ref();
    if let Err(e) = primitive::authenticate_client(model, client_id, client_secret).await {
        return e.into_response();
    }

    let result = match req.grant_type.as_deref() {
        Some(primitive::GRANT_TYPE_CODE) => {
            let code = match req.code.as_deref() {
                None | Some("") => {
                    return OAuth2Error::new_request(Some("code is required")).into_response();
                }
                Some(code) => code,
            };
            let redirect_uri = match req.redirect_uri.as_deref() {
                None | Some("") => {
                    let e = OAuth2Error::new_request(Some("redirect_uri is required"));
                    return e.into_response();
                }
                Some(uri) => uri,
            };
            primitive::exchange_code_for_tokens(model, &state.signer, code, client_id, redirect_uri)
                .await
        }
        _ => {
            let refresh_token = match req.refresh_token.as_deref() {
                None | Some("") => {
                    let e = OAuth2Error::new_request(Some("refresh_token is required"));
                    return e.into_response();
                }
                Some(token) => token,
            };
            primitive::refresh_access_token(model, &state.signer, refresh_token, client_id).await
        }
    };
    match result {
        Err(e) => e.into_response(),
        Ok(token) => token.into_response(),
    }
}

/// To check that the client is active and the redirect URI is registered.
///
/// Errors are responded with JSON bodies because the redirect URI cannot be trusted.
async fn check_client(
    fn_name: &str,
    state: &AppState,
    req: &AuthorizeRequest,
) -> Result<(Client, String), Response> {
    let (client_id, redirect_uri) = match (req.client_id.as_deref(), req.redirect_uri.as_deref()) {
        (None, _) | (Some(""), _) => {
            let e = OAuth2Error::new_request(Some("client_id is required"));
            return Err(e.into_response());
        }
        (_, None) | (_, Some("")) => {
            let e = OAuth2Error::new_request(Some("redirect_uri is required"));
            return Err(e.into_response());
        }
        (Some(client_id), Some(redirect_uri)) => (client_id, redirect_uri),
    };
    let client = match primitive::get_client(state.model.as_ref(), client_id).await {
        Err(e) => {
            error!("[{}] get client error: {}", fn_name, e);
            return Err(OAuth2Error::new_server(None).into_response());
        }
        Ok(None) => {
            let e = OAuth2Error::new(OAuth2ErrorCode::INVALID_CLIENT, Some("invalid client"));
            return Err(e.into_response());
        }
        Ok(Some(client)) => client,
    };
    if !primitive::validate_redirect_uri(&client, redirect_uri) {
        let e = OAuth2Error::new_request(Some("invalid redirect_uri"));
        return Err(e.into_response());
    }
    Ok((client, redirect_uri.to_string()))
}

/// The active user of a valid login session cookie.
async fn get_session_user(
    fn_name: &str,
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<User>, Response> {
    let session_id = match jar.get(SESSION_COOKIE) {
        None => return Ok(None),
        Some(cookie) => cookie.value().to_string(),
    };
    match primitive::get_session_user(state.model.as_ref(), session_id.as_str()).await {
        Err(e) => {
            error!("[{}] get session user error: {}", fn_name, e);
            Err(OAuth2Error::new_server(None).into_response())
        }
        Ok(user) => Ok(user),
    }
}

fn render_login(
    fn_name: &str,
    state: &AppState,
    client: &Client,
    req: &AuthorizeRequest,
    login_state: &str,
    error: Option<&str>,
) -> Response {
    let scopes = primitive::resolve_scopes(client, &primitive::parse_scope(req.scope.as_deref()));
    let mut context = Context::new();
    context.insert("scope_path", &state.scope_path);
    context.insert("state", login_state);
    context.insert("client_name", client.name.as_str());
    context.insert("scope", &scopes.join(" "));
    context.insert("error", &error);
    match state.tera.render(TMPL_LOGIN, &context) {
        Err(e) => {
            error!("[{}] render login template error: {}", fn_name, e);
            OAuth2Error::new_server(None).into_response()
        }
        Ok(page) => ([(header::CONTENT_TYPE, ContentType::HTML)], page).into_response(),
    }
}

/// To redirect an error to a trusted redirect URI.
fn redirect_error(
    fn_name: &str,
    redirect_uri: &str,
    e: OAuth2Error,
    state: Option<&str>,
) -> Response {
    let mut params = vec![("error", e.error.as_str())];
    if let Some(description) = e.error_description.as_deref() {
        params.push(("error_description", description));
    }
    if let Some(state) = state {
        params.push(("state", state));
    }
    match append_query(redirect_uri, &params) {
        None => {
            error!("[{}] invalid redirect_uri {}", fn_name, redirect_uri);
            OAuth2Error::new_server(None).into_response()
        }
        Some(location) => resp_found(location.as_str()),
    }
}

fn append_query(uri: &str, params: &[(&str, &str)]) -> Option<String> {
    let mut url = Url::parse(uri).ok()?;
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params.iter() {
            pairs.append_pair(k, v);
        }
    }
    Some(url.to_string())
}

fn resp_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

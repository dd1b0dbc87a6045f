//! The authorization-code grant engine.
//!
//! Functions here only depend on the [`Model`] collaborators and the token [`Signer`]. Code and
//! token records are committed only after every validation step has succeeded.

use std::error::Error as StdError;

use chrono::{Duration, Utc};
use log::{error, warn};

use misis_corelib::strings;

use super::{
    request::{AuthorizeRequest, TokenRequest},
    response::{OAuth2Error, OAuth2ErrorCode, TokenResponse},
};
use crate::{
    libs::jwt::{Claims, Signer, TokenType},
    models::{
        Model, authorization_code,
        authorization_code::{AuthorizationCode, ConsumeCond},
        client::{Client, QueryCond as ClientQueryCond},
        token,
        login_session::QueryCond as SessionQueryCond,
        token::{QueryCond as TokenQueryCond, RefreshCond, RefreshUpdates, Token},
        user::{QueryCond as UserQueryCond, User},
    },
};

/// Result of a successful access token validation.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenInfo {
    pub user_id: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

pub const RESPONSE_TYPE_CODE: &'static str = "code";
pub const GRANT_TYPE_CODE: &'static str = "authorization_code";
pub const GRANT_TYPE_REFRESH: &'static str = "refresh_token";
pub const TOKEN_TYPE_BEARER: &'static str = "Bearer";
pub const DEFAULT_SCOPES: [&'static str; 2] = ["read", "profile"];
pub const SUPPORTED_SCOPES: [&'static str; 4] = ["read", "profile", "email", "misis_data"];

const CODE_LEN: usize = 40;

/// To check the shape of an authorization request.
pub fn validate_authorization_request(req: &AuthorizeRequest) -> Result<(), OAuth2Error> {
    if is_empty(&req.client_id) {
        return Err(OAuth2Error::new_request(Some("client_id is required")));
    } else if is_empty(&req.redirect_uri) {
        return Err(OAuth2Error::new_request(Some("redirect_uri is required")));
    }
    match req.response_type.as_deref() {
        None | Some("") => Err(OAuth2Error::new_request(Some("response_type is required"))),
        Some(RESPONSE_TYPE_CODE) => Ok(()),
        Some(_) => Err(OAuth2Error::new(
            OAuth2ErrorCode::UNSUPPORTED_RESPONSE_TYPE,
            Some("only \"code\" response type is supported"),
        )),
    }
}

/// To get an active client. Inactive clients are reported as not exist.
pub async fn get_client(
    model: &dyn Model,
    client_id: &str,
) -> Result<Option<Client>, Box<dyn StdError>> {
    let cond = ClientQueryCond {
        client_id: Some(client_id),
        is_active: Some(true),
        ..Default::default()
    };
    model.client().get(&cond).await
}

/// Exact membership of the registered redirect URIs.
pub fn validate_redirect_uri(client: &Client, redirect_uri: &str) -> bool {
    client.redirect_uris.iter().any(|uri| uri.as_str() == redirect_uri)
}

/// Requested scopes allowed by the client or the default set. Falls back to the default set.
pub fn resolve_scopes(client: &Client, requested: &[String]) -> Vec<String> {
    let mut granted: Vec<String> = vec![];
    for scope in requested.iter() {
        let allowed = client.scopes.contains(scope) || DEFAULT_SCOPES.contains(&scope.as_str());
        if allowed && !granted.contains(scope) {
            granted.push(scope.clone());
        }
    }
    match granted.len() {
        0 => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        _ => granted,
    }
}

/// Splits a space-delimited scope string. `None` gives the default set.
pub fn parse_scope(scope: Option<&str>) -> Vec<String> {
    match scope {
        Some(scope) if scope.trim().len() > 0 => {
            scope.split_whitespace().map(|s| s.to_string()).collect()
        }
        _ => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

/// To persist a new authorization code valid for [`authorization_code::EXPIRES`] seconds.
pub async fn issue_authorization_code(
    model: &dyn Model,
    user_id: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
) -> Result<String, Box<dyn StdError>> {
    let now = Utc::now();
    let code = AuthorizationCode {
        code: strings::randomstring(CODE_LEN),
        user_id: user_id.to_string(),
        client_id: client_id.to_string(),
        redirect_uri: redirect_uri.to_string(),
        scopes: scopes.to_vec(),
        expires_at: now + Duration::seconds(authorization_code::EXPIRES),
        used: false,
        created_at: now,
    };
    model.authorization_code().add(&code).await?;
    Ok(code.code)
}

/// To check the shape of a token request.
pub fn validate_token_request(req: &TokenRequest) -> Result<(), OAuth2Error> {
    match req.grant_type.as_deref() {
        None | Some("") => return Err(OAuth2Error::new_request(Some("grant_type is required"))),
        Some(GRANT_TYPE_CODE) | Some(GRANT_TYPE_REFRESH) => (),
        Some(_) => {
            return Err(OAuth2Error::new(
                OAuth2ErrorCode::UNSUPPORTED_GRANT_TYPE,
                Some("only \"authorization_code\" and \"refresh_token\" grant types are supported"),
            ));
        }
    }
    if is_empty(&req.client_id) {
        return Err(OAuth2Error::new_request(Some("client_id is required")));
    } else if is_empty(&req.client_secret) {
        return Err(OAuth2Error::new_request(Some("client_secret is required")));
    }
    Ok(())
}

/// To authenticate a client with its secret.
pub async fn authenticate_client(
    model: &dyn Model,
    client_id: &str,
    client_secret: &str,
) -> Result<Client, OAuth2Error> {
    const FN_NAME: &'static str = "authenticate_client";

    match get_client(model, client_id).await {
        Err(e) => {
            error!("[{}] get client error: {}", FN_NAME, e);
            Err(OAuth2Error::new_server(None))
        }
        Ok(None) => Err(OAuth2Error::new(
            OAuth2ErrorCode::INVALID_CLIENT,
            Some("invalid client"),
        )),
        Ok(Some(client)) => {
            if !strings::secure_eq(client.client_secret.as_str(), client_secret) {
                warn!(
                    "[{}] client {} secret mismatch ({})",
                    FN_NAME,
                    client_id,
                    strings::redact(client_secret)
                );
                return Err(OAuth2Error::new(
                    OAuth2ErrorCode::INVALID_CLIENT,
                    Some("invalid client"),
                ));
            }
            Ok(client)
        }
    }
}

/// To exchange an authorization code for a token pair.
///
/// The code is consumed with a conditional update so that only one of concurrent exchanges
/// succeeds.
pub async fn exchange_code_for_tokens(
    model: &dyn Model,
    signer: &Signer,
    code: &str,
    client_id: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, OAuth2Error> {
    const FN_NAME: &'static str = "exchange_code_for_tokens";

    let now = Utc::now();
    let cond = ConsumeCond {
        code,
        client_id,
        redirect_uri,
        now,
    };
    match model.authorization_code().consume(&cond).await {
        Err(e) => {
            error!("[{}] consume code error: {}", FN_NAME, e);
            return Err(OAuth2Error::new_server(None));
        }
        Ok(false) => return Err(invalid_grant("invalid or expired authorization code")),
        Ok(true) => (),
    }
    let code = match model.authorization_code().get(code).await {
        Err(e) => {
            error!("[{}] get code error: {}", FN_NAME, e);
            return Err(OAuth2Error::new_server(None));
        }
        Ok(None) => return Err(invalid_grant("invalid or expired authorization code")),
        Ok(Some(code)) => code,
    };

    let access_token = sign(signer, &code.user_id, client_id, &code.scopes, TokenType::ACCESS)?;
    let refresh_token = sign(signer, &code.user_id, client_id, &code.scopes, TokenType::REFRESH)?;
    let token = Token {
        access_token: access_token.clone(),
        refresh_token: refresh_token.clone(),
        expires_at: now + Duration::seconds(token::ACCESS_EXPIRES),
        refresh_expires_at: now + Duration::seconds(token::REFRESH_EXPIRES),
        scopes: code.scopes.clone(),
        client_id: client_id.to_string(),
        user_id: code.user_id.clone(),
        revoked: false,
        created_at: now,
    };
    if let Err(e) = model.token().add(&token).await {
        error!("[{}] add token error: {}", FN_NAME, e);
        return Err(OAuth2Error::new_server(None));
    }

    Ok(TokenResponse {
        access_token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: token::ACCESS_EXPIRES,
        refresh_token,
        scope: code.scopes.join(" "),
    })
}

/// To mint a new access token with a refresh token. The refresh token value is kept.
pub async fn refresh_access_token(
    model: &dyn Model,
    signer: &Signer,
    refresh_token: &str,
    client_id: &str,
) -> Result<TokenResponse, OAuth2Error> {
    const FN_NAME: &'static str = "refresh_access_token";

    match signer.verify(refresh_token, TokenType::REFRESH) {
        Some(claims) if claims.client_id.as_str() == client_id => (),
        _ => return Err(invalid_grant("invalid or expired refresh token")),
    }

    let cond = TokenQueryCond {
        refresh_token: Some(refresh_token),
        client_id: Some(client_id),
        ..Default::default()
    };
    let record = match model.token().get(&cond).await {
        Err(e) => {
            error!("[{}] get token error: {}", FN_NAME, e);
            return Err(OAuth2Error::new_server(None));
        }
        Ok(None) => return Err(invalid_grant("invalid or expired refresh token")),
        Ok(Some(record)) => record,
    };

    let now = Utc::now();
    let access_token = sign(
        signer,
        &record.user_id,
        client_id,
        &record.scopes,
        TokenType::ACCESS,
    )?;
    let cond = RefreshCond {
        refresh_token,
        client_id,
        now,
    };
    let updates = RefreshUpdates {
        access_token: access_token.as_str(),
        expires_at: now + Duration::seconds(token::ACCESS_EXPIRES),
    };
    match model.token().refresh(&cond, &updates).await {
        Err(e) => {
            error!("[{}] refresh token error: {}", FN_NAME, e);
            return Err(OAuth2Error::new_server(None));
        }
        Ok(false) => return Err(invalid_grant("invalid or expired refresh token")),
        Ok(true) => (),
    }

    Ok(TokenResponse {
        access_token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: token::ACCESS_EXPIRES,
        refresh_token: refresh_token.to_string(),
        scope: record.scopes.join(" "),
    })
}

/// Stateless check: signature, expiry and type of an access token.
pub fn verify_access_claims(signer: &Signer, access_token: &str) -> Option<Claims> {
    signer.verify(access_token, TokenType::ACCESS)
}

/// Stateful check: the persisted record exists, is not revoked and is not expired.
pub async fn check_token_record(
    model: &dyn Model,
    access_token: &str,
) -> Result<Option<Token>, Box<dyn StdError>> {
    let cond = TokenQueryCond {
        access_token: Some(access_token),
        ..Default::default()
    };
    let record = match model.token().get(&cond).await? {
        None => return Ok(None),
        Some(record) => record,
    };
    if record.revoked || Utc::now() > record.expires_at {
        return Ok(None);
    }
    Ok(Some(record))
}

/// Both the stateless and the stateful checks must pass.
pub async fn validate_access_token(
    model: &dyn Model,
    signer: &Signer,
    access_token: &str,
) -> Result<Option<TokenInfo>, Box<dyn StdError>> {
    let claims = match verify_access_claims(signer, access_token) {
        None => return Ok(None),
        Some(claims) => claims,
    };
    let record = match check_token_record(model, access_token).await? {
        None => return Ok(None),
        Some(record) => record,
    };
    if record.user_id != claims.sub || record.client_id != claims.client_id {
        return Ok(None);
    }
    Ok(Some(TokenInfo {
        user_id: record.user_id,
        client_id: record.client_id,
        scopes: record.scopes,
    }))
}

/// The active user of a valid access token.
pub async fn get_user_info(
    model: &dyn Model,
    signer: &Signer,
    access_token: &str,
) -> Result<Option<(User, TokenInfo)>, Box<dyn StdError>> {
    let info = match validate_access_token(model, signer, access_token).await? {
        None => return Ok(None),
        Some(info) => info,
    };
    let cond = UserQueryCond {
        user_id: Some(info.user_id.as_str()),
        ..Default::default()
    };
    match model.user().get(&cond).await? {
        Some(user) if user.is_active => Ok(Some((user, info))),
        _ => Ok(None),
    }
}

/// The active user of a live login session. An expired session is deleted.
pub async fn get_session_user(
    model: &dyn Model,
    session_id: &str,
) -> Result<Option<User>, Box<dyn StdError>> {
    const FN_NAME: &'static str = "get_session_user";

    let session = match model.login_session().get(session_id).await? {
        None => return Ok(None),
        Some(session) => session,
    };
    if Utc::now() > session.expires_at {
        let cond = SessionQueryCond {
            session_id: Some(session_id),
            ..Default::default()
        };
        if let Err(e) = model.login_session().del(&cond).await {
            error!("[{}] delete login session error: {}", FN_NAME, e);
        }
        return Ok(None);
    }
    let cond = UserQueryCond {
        user_id: Some(session.user_id.as_str()),
        ..Default::default()
    };
    match model.user().get(&cond).await? {
        Some(user) if user.is_active => Ok(Some(user)),
        _ => Ok(None),
    }
}

fn sign(
    signer: &Signer,
    user_id: &str,
    client_id: &str,
    scopes: &[String],
    token_type: &str,
) -> Result<String, OAuth2Error> {
    const FN_NAME: &'static str = "sign";

    match signer.sign(user_id, client_id, scopes, token_type, &Utc::now(), ttl_of(token_type)) {
        Err(e) => {
            error!("[{}] sign {} error: {}", FN_NAME, token_type, e);
            Err(OAuth2Error::new_server(None))
        }
        Ok(token) => Ok(token),
    }
}

fn ttl_of(token_type: &str) -> i64 {
    match token_type {
        TokenType::REFRESH => token::REFRESH_EXPIRES,
        _ => token::ACCESS_EXPIRES,
    }
}

fn invalid_grant(description: &str) -> OAuth2Error {
    OAuth2Error::new(OAuth2ErrorCode::INVALID_GRANT, Some(description))
}

fn is_empty(value: &Option<String>) -> bool {
    match value.as_ref() {
        None => true,
        Some(value) => value.len() == 0,
    }
}

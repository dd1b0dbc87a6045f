use std::{collections::HashMap, error::Error as StdError, sync::Arc, time::Duration};

use axum::{Router, http::StatusCode, response::IntoResponse};
use log::warn;
use serde::{Deserialize, Serialize};
use tera::Tera;
use tower_http::timeout::TimeoutLayer;

use misis_corelib::{
    constants::DbEngine,
    http::{Json, Query},
    strings,
};

use crate::{
    libs::{
        bridge::Bridge,
        config::{self, Config},
        jwt::Signer,
        misis::{MisisClient, Options as MisisOptions},
    },
    models::{self, ConnOptions, Model, MongoDbOptions, SqliteOptions},
};

pub mod batch;
pub mod oauth2;
mod v1;

/// The resources used by this service.
#[derive(Clone)]
pub struct State {
    /// The scope root path for the service. An empty string means the root.
    ///
    /// For example `/auth`, the APIs are
    /// - `http://host:port/auth/oauth/xxx`
    /// - `http://host:port/auth/api/v1/user/xxx`
    /// - `http://host:port/auth/api/v1/client/xxx`
    pub scope_path: &'static str,
    /// The public base URL. `None` to derive it from the `Host` header.
    pub issuer: Option<String>,
    /// The scopes for accessing APIs.
    pub api_scopes: HashMap<String, Vec<String>>,
    /// The database model.
    pub model: Arc<dyn Model>,
    /// Credential bridge to the upstream portal.
    pub bridge: Bridge,
    /// Bearer token signer.
    pub signer: Signer,
    /// The secret of the batch endpoint.
    pub batch_secret: Option<String>,
    pub max_applications: u64,
    /// The sign-in page.
    pub tera: Arc<Tera>,
}

/// The service specific error codes in addition to standard [`ErrResp`].
///
/// [`ErrResp`]: misis_corelib::err::ErrResp
pub struct ErrReq;

/// Query parameters for `GET /version`
#[derive(Deserialize)]
pub struct GetVersionQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct GetVersionRes<'a> {
    data: GetVersionResData<'a>,
}

#[derive(Serialize)]
struct GetVersionResData<'a> {
    name: &'a str,
    version: &'a str,
}

const SERV_NAME: &'static str = env!("CARGO_PKG_NAME");
const SERV_VER: &'static str = env!("CARGO_PKG_VERSION");
const JWT_SECRET_LEN: usize = 64;
const TMPL_LOGIN_KEY: &'static str = "login";

impl ErrReq {
    pub const APP_LIMIT: (u16, &'static str) = (400, "err_app_limit");
}

/// To create resources for the service.
pub async fn new_state(
    scope_path: &'static str,
    conf: &Config,
) -> Result<State, Box<dyn StdError>> {
    const FN_NAME: &'static str = "new_state";

    let conf = config::apply_default(conf);
    let db_conf = match conf.db.as_ref() {
        None => return Err(Box::new(config_err("db"))),
        Some(db) => db,
    };
    let db_opts = match db_conf.engine.as_deref() {
        Some(DbEngine::MONGODB) => match db_conf.mongodb.as_ref() {
            None => return Err(Box::new(config_err("db.mongodb"))),
            Some(conf) => ConnOptions::MongoDB(MongoDbOptions {
                url: conf.url.clone().unwrap_or(config::DEF_MONGODB_URL.to_string()),
                db: conf
                    .database
                    .clone()
                    .unwrap_or(config::DEF_MONGODB_DB.to_string()),
                pool_size: conf.pool_size,
            }),
        },
        _ => match db_conf.sqlite.as_ref() {
            None => return Err(Box::new(config_err("db.sqlite"))),
            Some(conf) => ConnOptions::Sqlite(SqliteOptions {
                path: conf
                    .path
                    .clone()
                    .unwrap_or(config::DEF_SQLITE_PATH.to_string()),
            }),
        },
    };
    let model = models::new(&db_opts).await?;

    let jwt_secret = match conf.jwt_secret.as_ref() {
        Some(secret) => secret.clone(),
        None => {
            warn!(
                "[{}] no JWT secret configured, tokens will not survive restarts",
                FN_NAME
            );
            strings::randomstring(JWT_SECRET_LEN)
        }
    };
    let misis_opts = match conf.misis.as_ref() {
        None => MisisOptions {
            base_url: config::DEF_MISIS_BASE_URL.to_string(),
            timeout: Duration::from_secs(config::DEF_MISIS_TIMEOUT),
        },
        Some(misis) => MisisOptions {
            base_url: misis
                .base_url
                .clone()
                .unwrap_or(config::DEF_MISIS_BASE_URL.to_string()),
            timeout: Duration::from_secs(misis.timeout.unwrap_or(config::DEF_MISIS_TIMEOUT)),
        },
    };
    let (batch_secret, batch_delay) = match conf.batch.as_ref() {
        None => (None, config::DEF_BATCH_DELAY),
        Some(batch) => (
            batch.secret.clone(),
            batch.delay.unwrap_or(config::DEF_BATCH_DELAY),
        ),
    };
    let templates = conf.templates.clone().unwrap_or_default();
    let tera = oauth2::new_tera(templates.get(TMPL_LOGIN_KEY))?;

    Ok(State {
        scope_path: scope_path.trim_end_matches('/'),
        issuer: conf.issuer.clone(),
        api_scopes: conf.api_scopes.clone().unwrap_or_default(),
        bridge: Bridge::new(
            model.clone(),
            MisisClient::new(&misis_opts),
            Duration::from_millis(batch_delay),
        ),
        model,
        signer: Signer::new(jwt_secret.as_bytes()),
        batch_secret,
        max_applications: conf
            .max_applications
            .unwrap_or(config::DEF_MAX_APPLICATIONS),
        tera: Arc::new(tera),
    })
}

/// To register service URIs in the specified root path.
pub fn new_service(state: &State) -> Router {
    let router = Router::new()
        .merge(oauth2::new_service("/oauth", state))
        .merge(v1::user::new_service("/api/v1/user", state))
        .merge(v1::token::new_service("/api/v1/token", state))
        .merge(v1::oauth::new_service("/api/v1/oauth", state))
        .merge(v1::client::new_service("/api/v1/client", state));
    match state.scope_path.len() {
        0 => router,
        _ => Router::new().nest(state.scope_path, router),
    }
}

/// Requests still running after `secs` seconds are answered with `500 Internal Server Error`.
pub fn new_timeout_layer(secs: u64) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::INTERNAL_SERVER_ERROR, Duration::from_secs(secs))
}

/// To register the batch endpoint. It is mounted outside the request timeout because one run
/// signs in every stored user.
pub fn new_batch_service(state: &State) -> Router {
    let router = batch::new_service("/batch", state);
    match state.scope_path.len() {
        0 => router,
        _ => Router::new().nest(state.scope_path, router),
    }
}

pub async fn get_version(Query(query): Query<GetVersionQuery>) -> impl IntoResponse {
    if let Some(q) = query.q.as_ref() {
        match q.as_str() {
            "name" => return SERV_NAME.into_response(),
            "version" => return SERV_VER.into_response(),
            _ => (),
        }
    }

    Json(GetVersionRes {
        data: GetVersionResData {
            name: SERV_NAME,
            version: SERV_VER,
        },
    })
    .into_response()
}

fn config_err(key: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("missing configuration `{}`", key),
    )
}

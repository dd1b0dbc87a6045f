use std::collections::HashMap;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
};
use axum_test::{TestResponse, TestServer};
use chrono::{SubsecRound, Utc};
use httpmock::MockServer;
use serde::{Deserialize, Serialize};
use sql_builder::SqlBuilder;
use tokio::runtime::Runtime;
use url::Url;

use misis_auth::{
    libs::config::{Batch, Config, Db as DbConfig, Misis, Sqlite as SqliteConfig},
    models::{SqliteModel, SqliteOptions, client::Client, user::User},
    routes,
};

use crate::{TestState, libs::remove_sqlite};

pub const SCOPE_PATH: &'static str = "/auth";
pub const JWT_SECRET: &'static str = "jwt-secret-for-routes-test";
pub const BATCH_SECRET: &'static str = "batch-secret-for-routes-test";
pub const MAX_APPLICATIONS: u64 = 3;
pub const CLIENT_ID: &'static str = "misis_test_client";
pub const CLIENT_SECRET: &'static str = "misis_test_client_secret";
pub const USER_LOGIN: &'static str = "m1900001";
pub const USER_PASSWORD: &'static str = "stored-password";

const TABLES: &'static [&'static str] = &[
    "user",
    "client",
    "login_session",
    "authorization_code",
    "token",
];

#[derive(Serialize)]
pub struct AuthorizeParams<'a> {
    pub response_type: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'a str>,
}

#[derive(Serialize)]
pub struct LoginForm<'a> {
    pub login: &'a str,
    pub password: &'a str,
    pub state: &'a str,
}

#[derive(Serialize)]
pub struct TokenForm<'a> {
    pub grant_type: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
}

#[derive(Deserialize)]
pub struct TokenBody {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}

/// Error body of both OAuth2 endpoints and APIs.
#[derive(Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// To create a route state backed by the test SQLite file and the mocked portal.
pub fn new_state() -> TestState {
    let runtime = match Runtime::new() {
        Err(e) => panic!("create runtime error: {}", e),
        Ok(runtime) => runtime,
    };
    let portal = MockServer::start();

    let path = sqlite_path();
    let conf = new_config(path.as_str(), portal.base_url().as_str());
    let routes_state = match runtime.block_on(async { routes::new_state(SCOPE_PATH, &conf).await }) {
        Err(e) => panic!("create route state error: {}", e),
        Ok(state) => state,
    };
    let sqlite = match runtime.block_on(async { SqliteModel::new(&SqliteOptions { path }).await }) {
        Err(e) => panic!("create sqlite model error: {}", e),
        Ok(model) => model,
    };

    TestState {
        runtime: Some(runtime),
        sqlite: Some(sqlite),
        routes_state: Some(routes_state),
        portal: Some(portal),
        ..Default::default()
    }
}

fn sqlite_path() -> String {
    let mut path = std::env::temp_dir();
    path.push(crate::TEST_SQLITE_PATH);
    path.to_str().unwrap().to_string()
}

fn new_config(sqlite_path: &str, portal_url: &str) -> Config {
    Config {
        db: Some(DbConfig {
            engine: Some("sqlite".to_string()),
            sqlite: Some(SqliteConfig {
                path: Some(sqlite_path.to_string()),
            }),
            ..Default::default()
        }),
        issuer: Some("https://auth.example.com".to_string()),
        jwt_secret: Some(JWT_SECRET.to_string()),
        misis: Some(Misis {
            base_url: Some(portal_url.to_string()),
            timeout: Some(5),
        }),
        batch: Some(Batch {
            secret: Some(BATCH_SECRET.to_string()),
            delay: Some(0),
        }),
        max_applications: Some(MAX_APPLICATIONS),
        ..Default::default()
    }
}

/// A route state whose database connection is already closed so that every query fails.
pub fn new_closed_state(runtime: &Runtime, portal: &MockServer) -> Result<routes::State, String> {
    let conf = new_config(sqlite_path().as_str(), portal.base_url().as_str());
    let routes_state = match runtime.block_on(async { routes::new_state(SCOPE_PATH, &conf).await }) {
        Err(e) => return Err(format!("new_state() error: {}", e)),
        Ok(state) => state,
    };
    match runtime.block_on(async { routes_state.model.close().await }) {
        Err(e) => Err(format!("close model error: {}", e)),
        Ok(_) => Ok(routes_state),
    }
}

/// To empty all tables and reset the portal mocks.
pub fn clear_state(state: &mut TestState) {
    let runtime = state.runtime.as_ref().unwrap();
    let conn = state.sqlite.as_ref().unwrap().get_connection();
    for table in TABLES {
        let sql = SqlBuilder::delete_from(table).sql().unwrap();
        if let Err(e) = runtime.block_on(async { sqlx::query(sql.as_str()).execute(conn).await }) {
            panic!("clear table {} error: {}", table, e);
        }
    }
    if let Some(portal) = state.portal.as_ref() {
        portal.reset();
    }
}

pub fn close_state(state: &mut TestState) {
    let runtime = state.runtime.as_ref().unwrap();
    if let Some(routes_state) = state.routes_state.as_ref() {
        let _ = runtime.block_on(async { routes_state.model.close().await });
    }
    if let Some(model) = state.sqlite.as_ref() {
        runtime.block_on(async { model.get_connection().close().await });
    }
    remove_sqlite(crate::TEST_SQLITE_PATH);
}

pub fn new_server(state: &routes::State) -> Result<TestServer, String> {
    let app = Router::new().merge(routes::new_service(state));
    match TestServer::new(app) {
        Err(e) => Err(format!("new server error: {}", e)),
        Ok(server) => Ok(server),
    }
}

/// A user that has a stored password so that sign-in does not reach the portal.
pub fn create_user(login: &str, password: Option<&str>) -> User {
    let now = Utc::now().trunc_subsecs(3);
    User {
        user_id: format!("user_{}", login),
        login: login.to_string(),
        email: format!("{}@misis.ru", login),
        password: password.map(|p| p.to_string()),
        profile: None,
        is_active: true,
        created_at: now,
        modified_at: now,
    }
}

pub fn create_client(client_id: &str, secret: &str, owner_id: &str) -> Client {
    let now = Utc::now().trunc_subsecs(3);
    Client {
        client_id: client_id.to_string(),
        client_secret: secret.to_string(),
        name: client_id.to_string(),
        description: None,
        redirect_uris: vec![crate::TEST_REDIRECT_URI.to_string()],
        scopes: vec!["email".to_string()],
        owner_id: owner_id.to_string(),
        is_active: true,
        created_at: now,
        modified_at: now,
    }
}

pub fn add_user(runtime: &Runtime, state: &routes::State, user: &User) -> Result<(), String> {
    match runtime.block_on(async { state.model.user().add(user).await }) {
        Err(e) => Err(format!("add user error: {}", e)),
        Ok(_) => Ok(()),
    }
}

pub fn add_client(runtime: &Runtime, state: &routes::State, client: &Client) -> Result<(), String> {
    match runtime.block_on(async { state.model.client().add(client).await }) {
        Err(e) => Err(format!("add client error: {}", e)),
        Ok(_) => Ok(()),
    }
}

/// To add the default user and the default client.
pub fn add_defaults(runtime: &Runtime, state: &routes::State) -> Result<User, String> {
    let user = create_user(USER_LOGIN, Some(USER_PASSWORD));
    add_user(runtime, state, &user)?;
    let client = create_client(CLIENT_ID, CLIENT_SECRET, "user_owner");
    add_client(runtime, state, &client)?;
    Ok(user)
}

pub fn read_location(resp: &TestResponse) -> Result<Url, String> {
    let location = match resp.headers().get(header::LOCATION) {
        None => return Err("no location header".to_string()),
        Some(location) => match location.to_str() {
            Err(e) => return Err(format!("location to_str() error: {}", e)),
            Ok(location) => location,
        },
    };
    match Url::parse(location) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            match Url::parse(format!("http://localhost{}", location).as_str()) {
                Err(e) => Err(format!("parse url with base error: {}", e)),
                Ok(url) => Ok(url),
            }
        }
        Err(e) => Err(format!("parse url error: {}", e)),
        Ok(url) => Ok(url),
    }
}

/// To read a query parameter of the `Location` header.
pub fn location_param(resp: &TestResponse, key: &str) -> Result<Option<String>, String> {
    let location = read_location(resp)?;
    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    Ok(params.get(key).cloned())
}

/// To read the `name=value` part of the session cookie.
pub fn read_session_cookie(resp: &TestResponse) -> Result<String, String> {
    for value in resp.headers().get_all(header::SET_COOKIE).iter() {
        let value = match value.to_str() {
            Err(e) => return Err(format!("set-cookie to_str() error: {}", e)),
            Ok(value) => value,
        };
        if let Some(pair) = value.split(';').next() {
            if pair.starts_with("misis_sid=") {
                return Ok(pair.to_string());
            }
        }
    }
    Err("no session cookie".to_string())
}

pub fn authorize_query(client_id: &str, scope: Option<&str>, state: Option<&str>) -> String {
    let params = AuthorizeParams {
        response_type: "code",
        client_id,
        redirect_uri: crate::TEST_REDIRECT_URI,
        scope,
        state,
    };
    serde_urlencoded::to_string(&params).unwrap()
}

/// To sign in and return the session cookie.
pub fn login(
    runtime: &Runtime,
    server: &TestServer,
    login: &str,
    password: &str,
    authorize_query: &str,
) -> Result<String, String> {
    let form = LoginForm {
        login,
        password,
        state: authorize_query,
    };
    let req = server.post("/auth/oauth/login").form(&form);
    let resp = runtime.block_on(async { req.await });
    if resp.status_code() != StatusCode::FOUND {
        return Err(format!(
            "post login response not 302, {} {}",
            resp.status_code(),
            resp.text()
        ));
    }
    read_session_cookie(&resp)
}

/// To get an authorization code with a signed-in session.
pub fn authorize(
    runtime: &Runtime,
    server: &TestServer,
    cookie: &str,
    authorize_query: &str,
) -> Result<String, String> {
    let req = server
        .get(format!("/auth/oauth/authorize?{}", authorize_query).as_str())
        .add_header(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    let resp = runtime.block_on(async { req.await });
    if resp.status_code() != StatusCode::FOUND {
        return Err(format!("get authorize response not 302, {}", resp.status_code()));
    }
    let location = read_location(&resp)?;
    if !location.as_str().starts_with(crate::TEST_REDIRECT_URI) {
        return Err(format!("redirect wrong URI: {}", location.as_str()));
    }
    match location_param(&resp, "code")? {
        None => Err(format!("no code in {}", location.as_str())),
        Some(code) => Ok(code),
    }
}

pub fn exchange_code(
    runtime: &Runtime,
    server: &TestServer,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<TestResponse, String> {
    let form = TokenForm {
        grant_type: "authorization_code",
        client_id,
        client_secret,
        code: Some(code),
        redirect_uri: Some(crate::TEST_REDIRECT_URI),
        refresh_token: None,
    };
    let req = server.post("/auth/oauth/token").form(&form);
    Ok(runtime.block_on(async { req.await }))
}

/// To run the whole authorization code flow and get a token pair.
pub fn get_token(
    runtime: &Runtime,
    state: &routes::State,
    login_name: &str,
    password: &str,
    client_id: &str,
    client_secret: &str,
    scope: Option<&str>,
) -> Result<TokenBody, String> {
    let server = new_server(state)?;
    let query = authorize_query(client_id, scope, Some("xyz"));
    let cookie = login(runtime, &server, login_name, password, query.as_str())?;
    let code = authorize(runtime, &server, cookie.as_str(), query.as_str())?;
    let resp = exchange_code(runtime, &server, client_id, client_secret, code.as_str())?;
    if resp.status_code() != StatusCode::OK {
        let body: ErrorBody = resp.json();
        return Err(format!("post token error: {}", body.error));
    }
    Ok(resp.json::<TokenBody>())
}

/// [`get_token`] with the default user and client.
pub fn get_default_token(
    runtime: &Runtime,
    state: &routes::State,
    scope: Option<&str>,
) -> Result<TokenBody, String> {
    get_token(
        runtime,
        state,
        USER_LOGIN,
        USER_PASSWORD,
        CLIENT_ID,
        CLIENT_SECRET,
        scope,
    )
}

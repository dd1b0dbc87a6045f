use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use chrono::{TimeDelta, Utc};
use laboratory::{SpecContext, expect};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use misis_auth::models::{
    client::QueryCond,
    login_session::LoginSession,
    token::QueryCond as TokenQueryCond,
};

use super::{
    super::libs::{self, CLIENT_ID, ErrorBody, MAX_APPLICATIONS, USER_LOGIN, USER_PASSWORD},
    STATE,
};
use crate::TestState;

#[derive(Deserialize)]
struct PostClient {
    data: PostClientData,
}

#[derive(Deserialize)]
struct PostClientData {
    #[serde(rename = "clientId")]
    client_id: String,
    #[serde(rename = "clientSecret")]
    client_secret: String,
}

#[derive(Deserialize)]
struct GetCount {
    data: GetCountData,
}

#[derive(Deserialize)]
struct GetCountData {
    count: u64,
}

fn auth(token: &str) -> HeaderValue {
    HeaderValue::from_str(format!("Bearer {}", token).as_str()).unwrap()
}

/// To sign in the default user and get the session cookie.
fn session(runtime: &Runtime, server: &TestServer) -> Result<HeaderValue, String> {
    let query = libs::authorize_query(CLIENT_ID, None, None);
    let cookie = libs::login(runtime, server, USER_LOGIN, USER_PASSWORD, query.as_str())?;
    match HeaderValue::from_str(cookie.as_str()) {
        Err(e) => Err(format!("cookie header error: {}", e)),
        Ok(value) => Ok(value),
    }
}

fn new_body(name: &str) -> Value {
    json!({
        "data": {
            "name": name,
            "redirectUris": [crate::TEST_REDIRECT_URI],
            "scopes": ["email"],
        }
    })
}

pub fn post(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    let body = json!({
        "data": {
            "name": "  My App  ",
            "description": "for tests",
            "redirectUris": ["https://app.example.com/cb", "https://app.example.com/cb"],
            "scopes": ["email", "misis_data", "email"],
        }
    });
    let req = server
        .post("/auth/api/v1/client")
        .add_header(header::COOKIE, cookie.clone())
        .json(&body);
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::OK)?;
    let body: PostClient = resp.json();
    if !body.data.client_id.starts_with("misis_") {
        return Err(format!("unexpected client ID {}", body.data.client_id));
    }
    expect(body.data.client_secret.len()).to_equal(40)?;

    let cond = QueryCond {
        client_id: Some(body.data.client_id.as_str()),
        ..Default::default()
    };
    let client = match runtime.block_on(async { routes_state.model.client().get(&cond).await }) {
        Err(e) => return Err(format!("get client error: {}", e)),
        Ok(None) => return Err("client should be stored".to_string()),
        Ok(Some(client)) => client,
    };
    expect(client.name.as_str()).to_equal("My App")?;
    expect(client.description.as_deref()).to_equal(Some("for tests"))?;
    expect(client.redirect_uris).to_equal(vec!["https://app.example.com/cb".to_string()])?;
    expect(client.scopes).to_equal(vec!["email".to_string(), "misis_data".to_string()])?;
    expect(client.owner_id).to_equal(user.user_id)?;
    expect(client.client_secret).to_equal(body.data.client_secret)?;
    expect(client.is_active).to_equal(true)
}

pub fn post_invalid(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    libs::add_defaults(runtime, routes_state)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    let bodies = [
        json!({}),
        json!({"data": {"redirectUris": [crate::TEST_REDIRECT_URI]}}),
        json!({"data": {"name": "  ", "redirectUris": [crate::TEST_REDIRECT_URI]}}),
        json!({"data": {"name": "app", "redirectUris": []}}),
        json!({"data": {"name": "app", "redirectUris": ["not a uri"]}}),
        json!({"data": {"name": "app", "redirectUris": ["ftp://example.com/cb"]}}),
        json!({"data": {"name": "app", "redirectUris": [crate::TEST_REDIRECT_URI], "scopes": ["admin"]}}),
    ];
    for body in bodies.iter() {
        let req = server
            .post("/auth/api/v1/client")
            .add_header(header::COOKIE, cookie.clone())
            .json(body);
        let resp = runtime.block_on(async { req.await });
        expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
        let resp_body: ErrorBody = resp.json();
        expect(resp_body.error.as_str()).to_equal("invalid_request")?;
    }
    Ok(())
}

pub fn post_limit(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    libs::add_defaults(runtime, routes_state)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    for i in 0..MAX_APPLICATIONS {
        let req = server
            .post("/auth/api/v1/client")
            .add_header(header::COOKIE, cookie.clone())
            .json(&new_body(format!("app{}", i).as_str()));
        let resp = runtime.block_on(async { req.await });
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
    }
    let req = server
        .post("/auth/api/v1/client")
        .add_header(header::COOKIE, cookie.clone())
        .json(&new_body("one more"));
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
    let body: ErrorBody = resp.json();
    expect(body.error.as_str()).to_equal("err_app_limit")
}

pub fn get_list(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    for i in 0..3 {
        let mut client = libs::create_client(
            format!("list{}", i).as_str(),
            "secret",
            user.user_id.as_str(),
        );
        client.created_at = client.created_at + TimeDelta::try_seconds(i).unwrap();
        libs::add_client(runtime, routes_state, &client)?;
    }
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    let req = server
        .get("/auth/api/v1/client/count")
        .add_header(header::COOKIE, cookie.clone());
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::OK)?;
    let body: GetCount = resp.json();
    expect(body.data.count).to_equal(3)?;

    let req = server
        .get("/auth/api/v1/client/list")
        .add_header(header::COOKIE, cookie.clone());
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::OK)?;
    let body: Value = resp.json();
    let list = match body.get("data").and_then(|v| v.as_array()) {
        None => return Err("data should be an array".to_string()),
        Some(list) => list.clone(),
    };
    let ids: Vec<&str> = list
        .iter()
        .filter_map(|c| c.get("clientId").and_then(|v| v.as_str()))
        .collect();
    expect(ids).to_equal(vec!["list2", "list1", "list0"])?;
    if list.iter().any(|c| c.get("clientSecret").is_some()) {
        return Err("list should not contain secrets".to_string());
    }

    let req = server
        .get("/auth/api/v1/client/list?offset=1&limit=1")
        .add_header(header::COOKIE, cookie.clone());
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::OK)?;
    let body: Value = resp.json();
    let ids: Vec<String> = match body.get("data").and_then(|v| v.as_array()) {
        None => return Err("data should be an array".to_string()),
        Some(list) => list
            .iter()
            .filter_map(|c| c.get("clientId").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect(),
    };
    expect(ids).to_equal(vec!["list1".to_string()])
}

pub fn get(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let client = libs::create_client("owned", "owned_secret", user.user_id.as_str());
    libs::add_client(runtime, routes_state, &client)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    let req = server
        .get("/auth/api/v1/client/owned")
        .add_header(header::COOKIE, cookie.clone());
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::OK)?;
    let body: Value = resp.json();
    let data = match body.get("data") {
        None => return Err("no data".to_string()),
        Some(data) => data.clone(),
    };
    expect(data.get("clientId").and_then(|v| v.as_str())).to_equal(Some("owned"))?;
    expect(data.get("clientSecret").and_then(|v| v.as_str())).to_equal(Some("owned_secret"))?;
    expect(data.get("redirectUris").cloned()).to_equal(Some(json!([crate::TEST_REDIRECT_URI])))?;
    expect(data.get("isActive").and_then(|v| v.as_bool())).to_equal(Some(true))?;

    // Other users' clients are hidden.
    for uri in [
        format!("/auth/api/v1/client/{}", CLIENT_ID),
        "/auth/api/v1/client/not_exist".to_string(),
    ] {
        let req = server
            .get(uri.as_str())
            .add_header(header::COOKIE, cookie.clone());
        let resp = runtime.block_on(async { req.await });
        expect(resp.status_code()).to_equal(StatusCode::NOT_FOUND)?;
    }
    Ok(())
}

pub fn patch(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let mut client = libs::create_client("patched", "patched_secret", user.user_id.as_str());
    client.description = Some("old".to_string());
    libs::add_client(runtime, routes_state, &client)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    let body = json!({
        "data": {
            "name": "renamed",
            "description": null,
            "redirectUris": ["https://new.example.com/cb"],
            "scopes": [],
            "isActive": false,
        }
    });
    let req = server
        .patch("/auth/api/v1/client/patched")
        .add_header(header::COOKIE, cookie.clone())
        .json(&body);
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::NO_CONTENT)?;

    let cond = QueryCond {
        client_id: Some("patched"),
        ..Default::default()
    };
    let get_client = match runtime.block_on(async { routes_state.model.client().get(&cond).await }) {
        Err(e) => return Err(format!("get client error: {}", e)),
        Ok(None) => return Err("client should exist".to_string()),
        Ok(Some(client)) => client,
    };
    expect(get_client.name.as_str()).to_equal("renamed")?;
    expect(get_client.description).to_equal(None)?;
    expect(get_client.redirect_uris).to_equal(vec!["https://new.example.com/cb".to_string()])?;
    expect(get_client.scopes.len()).to_equal(0)?;
    expect(get_client.is_active).to_equal(false)?;
    expect(get_client.client_secret.as_str()).to_equal("patched_secret")?;
    if get_client.modified_at < client.modified_at {
        return Err("modified_at should be updated".to_string());
    }
    Ok(())
}

pub fn patch_invalid(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let client = libs::create_client("patched", "patched_secret", user.user_id.as_str());
    libs::add_client(runtime, routes_state, &client)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;

    let bodies = [
        json!({"data": {}}),
        json!({"data": {"name": " "}}),
        json!({"data": {"redirectUris": []}}),
        json!({"data": {"scopes": ["unknown"]}}),
    ];
    for body in bodies.iter() {
        let req = server
            .patch("/auth/api/v1/client/patched")
            .add_header(header::COOKIE, cookie.clone())
            .json(body);
        let resp = runtime.block_on(async { req.await });
        expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
    }

    let req = server
        .patch(format!("/auth/api/v1/client/{}", CLIENT_ID).as_str())
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({"data": {"name": "hijacked"}}));
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::NOT_FOUND)
}

pub fn delete(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let client = libs::create_client("deleted", "deleted_secret", user.user_id.as_str());
    libs::add_client(runtime, routes_state, &client)?;
    let token = libs::get_default_token(runtime, routes_state, None)?;
    let server = libs::new_server(routes_state)?;
    let cookie = session(runtime, &server)?;
    let client_token = libs::get_token(
        runtime,
        routes_state,
        USER_LOGIN,
        USER_PASSWORD,
        "deleted",
        "deleted_secret",
        None,
    )?;

    let req = server
        .delete(format!("/auth/api/v1/client/{}", CLIENT_ID).as_str())
        .add_header(header::COOKIE, cookie.clone());
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::NOT_FOUND)?;

    let req = server
        .delete("/auth/api/v1/client/deleted")
        .add_header(header::COOKIE, cookie.clone());
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::NO_CONTENT)?;

    let cond = QueryCond {
        client_id: Some("deleted"),
        ..Default::default()
    };
    match runtime.block_on(async { routes_state.model.client().get(&cond).await }) {
        Err(e) => return Err(format!("get client error: {}", e)),
        Ok(Some(_)) => return Err("client should be deleted".to_string()),
        Ok(None) => (),
    }
    let cond = TokenQueryCond {
        access_token: Some(client_token.access_token.as_str()),
        ..Default::default()
    };
    match runtime.block_on(async { routes_state.model.token().get(&cond).await }) {
        Err(e) => return Err(format!("get token error: {}", e)),
        Ok(None) => return Err("token should be kept as revoked".to_string()),
        Ok(Some(token)) => expect(token.revoked).to_equal(true)?,
    }

    // Tokens of other clients are untouched.
    let req = server
        .get("/auth/api/v1/user")
        .add_header(header::AUTHORIZATION, auth(token.access_token.as_str()));
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::OK)
}

pub fn no_session(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let server = libs::new_server(routes_state)?;

    let resp = runtime.block_on(async { server.get("/auth/api/v1/client/list").await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;
    let body: ErrorBody = resp.json();
    expect(body.error.as_str()).to_equal("unauthorized")?;
    let resp = runtime.block_on(async { server.post("/auth/api/v1/client").json(&new_body("app")).await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;
    let resp = runtime.block_on(async { server.delete("/auth/api/v1/client/any").await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;

    let unknown = HeaderValue::from_static("misis_sid=not_exist");
    let req = server
        .get("/auth/api/v1/client/count")
        .add_header(header::COOKIE, unknown);
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;

    let session = LoginSession {
        session_id: "expired_session".to_string(),
        expires_at: Utc::now() - TimeDelta::try_seconds(1).unwrap(),
        user_id: user.user_id,
    };
    if let Err(e) = runtime.block_on(async { routes_state.model.login_session().add(&session).await }) {
        return Err(format!("add session error: {}", e));
    }
    let expired = HeaderValue::from_static("misis_sid=expired_session");
    let req = server
        .get("/auth/api/v1/client/count")
        .add_header(header::COOKIE, expired);
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)
}

pub fn bearer_rejected(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    let user = libs::add_defaults(runtime, routes_state)?;
    let client = libs::create_client("owned", "owned_secret", user.user_id.as_str());
    libs::add_client(runtime, routes_state, &client)?;
    // A token issued to a third-party application on behalf of the user.
    let token = libs::get_default_token(runtime, routes_state, Some("read"))?;
    let server = libs::new_server(routes_state)?;

    let req = server
        .get("/auth/api/v1/client/owned")
        .add_header(header::AUTHORIZATION, auth(token.access_token.as_str()));
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;

    let req = server
        .patch("/auth/api/v1/client/owned")
        .add_header(header::AUTHORIZATION, auth(token.access_token.as_str()))
        .json(&json!({"data": {"redirectUris": ["https://evil.example.com/cb"]}}));
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;

    let req = server
        .post("/auth/api/v1/client")
        .add_header(header::AUTHORIZATION, auth(token.access_token.as_str()))
        .json(&new_body("app"));
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::UNAUTHORIZED)?;

    let cond = QueryCond {
        client_id: Some("owned"),
        ..Default::default()
    };
    match runtime.block_on(async { routes_state.model.client().get(&cond).await }) {
        Err(e) => Err(format!("get client error: {}", e)),
        Ok(None) => Err("client should exist".to_string()),
        Ok(Some(stored)) => {
            expect(stored.redirect_uris).to_equal(vec![crate::TEST_REDIRECT_URI.to_string()])
        }
    }
}

pub fn db_error(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let portal = state.portal.as_ref().unwrap();

    let closed = libs::new_closed_state(runtime, portal)?;
    let server = libs::new_server(&closed)?;

    let cookie = HeaderValue::from_static("misis_sid=any_session");
    let req = server
        .get("/auth/api/v1/client/list")
        .add_header(header::COOKIE, cookie);
    let resp = runtime.block_on(async { req.await });
    expect(resp.status_code()).to_equal(StatusCode::INTERNAL_SERVER_ERROR)?;
    let body: ErrorBody = resp.json();
    expect(body.error.as_str()).to_equal("server_error")?;
    expect(body.error_description.is_none()).to_equal(true)
}

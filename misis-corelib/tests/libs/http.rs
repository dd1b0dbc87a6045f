use axum::{
    Router,
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    routing,
};
use axum_test::TestServer;
use laboratory::{SpecContext, expect};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::runtime::Runtime;

use misis_corelib::{
    constants::ContentType,
    err::ErrResp,
    http::{self, Json, Path, Query},
};

use crate::TestState;

#[derive(Deserialize)]
struct NumQuery {
    n: u32,
}

/// Test [`http::parse_header_auth`].
pub fn parse_header_auth(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let req = Request::builder().body(Body::empty()).unwrap();
    match http::parse_header_auth(&req) {
        Err(e) => return Err(format!("empty Authorization header error: {}", e)),
        Ok(content) => expect(content).to_equal(None)?,
    }

    let req = Request::builder()
        .header(header::AUTHORIZATION, "test")
        .header(header::AUTHORIZATION, "test")
        .body(Body::empty())
        .unwrap();
    if http::parse_header_auth(&req).is_ok() {
        return Err("multiple Authorization header not error".to_string());
    }

    let req = Request::builder()
        .header(header::AUTHORIZATION, "test")
        .body(Body::empty())
        .unwrap();
    match http::parse_header_auth(&req) {
        Err(e) => Err(format!("Authorization header error: {}", e)),
        Ok(content) => expect(content).to_equal(Some("test".to_string())),
    }
}

/// Test [`http::parse_bearer_token`].
pub fn parse_bearer_token(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let mut headers = HeaderMap::new();
    match http::parse_bearer_token(&headers) {
        Err(ErrResp::ErrAuth(_)) => (),
        _ => return Err("missing header should be ErrAuth".to_string()),
    }

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    match http::parse_bearer_token(&headers) {
        Err(ErrResp::ErrAuth(_)) => (),
        _ => return Err("Basic scheme should be ErrAuth".to_string()),
    }

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    match http::parse_bearer_token(&headers) {
        Err(ErrResp::ErrAuth(_)) => (),
        _ => return Err("empty token should be ErrAuth".to_string()),
    }

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer token"));
    match http::parse_bearer_token(&headers) {
        Err(e) => return Err(format!("Bearer token error: {}", e)),
        Ok(token) => expect(token.as_str()).to_equal("token")?,
    }

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer token2"));
    match http::parse_bearer_token(&headers) {
        Err(e) => Err(format!("lowercase bearer token error: {}", e)),
        Ok(token) => expect(token.as_str()).to_equal("token2"),
    }
}

/// Test rejections of [`Json`], [`Query`] and [`Path`].
pub fn extractors(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let runtime = match Runtime::new() {
        Err(e) => return Err(format!("create runtime error: {}", e)),
        Ok(runtime) => runtime,
    };

    let app = Router::new()
        .route(
            "/json",
            routing::post(|Json(body): Json<Map<String, Value>>| async move { Json(body) }),
        )
        .route(
            "/query",
            routing::get(|Query(query): Query<NumQuery>| async move { query.n.to_string() }),
        )
        .route(
            "/path/{n}",
            routing::get(|Path(n): Path<u32>| async move { n.to_string() }),
        );
    let server = match TestServer::new(app) {
        Err(e) => return Err(format!("new server error: {}", e)),
        Ok(server) => server,
    };

    runtime.block_on(async {
        let resp = server
            .post("/json")
            .bytes(Bytes::from("{\"key\":"))
            .content_type(ContentType::JSON)
            .await;
        expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
        let body: Map<String, Value> = resp.json();
        expect(body.get("error")).to_equal(Some(&Value::String("invalid_request".to_string())))?;

        let resp = server
            .post("/json")
            .bytes(Bytes::from("{\"key\":\"value\"}"))
            .content_type(ContentType::JSON)
            .await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        let body: Map<String, Value> = resp.json();
        expect(body.get("key")).to_equal(Some(&Value::String("value".to_string())))?;

        let resp = server.get("/query").add_query_param("n", "abc").await;
        expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
        let resp = server.get("/query").add_query_param("n", "12").await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        expect(resp.text()).to_equal("12".to_string())?;

        let resp = server.get("/path/abc").await;
        expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
        let body: Map<String, Value> = resp.json();
        expect(body.get("error")).to_equal(Some(&Value::String("invalid_request".to_string())))?;
        let resp = server.get("/path/34").await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        expect(resp.text()).to_equal("34".to_string())
    })
}

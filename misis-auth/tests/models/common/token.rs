use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use laboratory::expect;
use tokio::runtime::Runtime;

use misis_auth::models::{
    Model,
    authorization_code::AuthorizationCode,
    login_session::LoginSession,
    token::{QueryCond, RefreshCond, RefreshUpdates, Token},
};

fn new_token(name: &str, client_id: &str, user_id: &str, refresh_expires_at: DateTime<Utc>) -> Token {
    let now = Utc::now().trunc_subsecs(3);
    Token {
        access_token: format!("{}_access", name),
        refresh_token: format!("{}_refresh", name),
        expires_at: now + TimeDelta::try_seconds(60).unwrap(),
        refresh_expires_at,
        scopes: vec!["read".to_string(), "email".to_string()],
        client_id: client_id.to_string(),
        user_id: user_id.to_string(),
        revoked: false,
        created_at: now,
    }
}

fn in_future() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3) + TimeDelta::try_seconds(3600).unwrap()
}

fn get_token(runtime: &Runtime, model: &dyn Model, refresh_token: &str) -> Result<Option<Token>, String> {
    let cond = QueryCond {
        refresh_token: Some(refresh_token),
        ..Default::default()
    };
    match runtime.block_on(async { model.token().get(&cond).await }) {
        Err(e) => Err(format!("model.get() error: {}", e)),
        Ok(token) => Ok(token),
    }
}

/// Test `add()` and `get()`.
pub fn add_get(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let token_model = model.token();

    let token = new_token("get", "client_get", "user_get", in_future());
    if let Err(e) = runtime.block_on(async { token_model.add(&token).await }) {
        return Err(format!("model.add() error: {}", e));
    }
    let cond = QueryCond {
        access_token: Some("get_access"),
        ..Default::default()
    };
    match runtime.block_on(async { token_model.get(&cond).await }) {
        Err(e) => return Err(format!("model.get() by access error: {}", e)),
        Ok(None) => return Err("should get by access token".to_string()),
        Ok(Some(get_token)) => expect(get_token).to_equal(token.clone())?,
    }
    match get_token(runtime, model, "get_refresh")? {
        None => return Err("should get by refresh token".to_string()),
        Some(get_token) => expect(get_token).to_equal(token.clone())?,
    }
    if let Ok(_) = runtime.block_on(async { token_model.add(&token).await }) {
        return Err("model.add() duplicate token should error".to_string());
    }
    match get_token(runtime, model, "not_exist")? {
        None => Ok(()),
        Some(_) => Err("should not get a not-exist one".to_string()),
    }
}

/// Test `refresh()`.
pub fn refresh(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let token_model = model.token();

    let token = new_token("refresh", "client_refresh", "user_refresh", in_future());
    if let Err(e) = runtime.block_on(async { token_model.add(&token).await }) {
        return Err(format!("model.add() error: {}", e));
    }

    let expires_at = Utc::now().trunc_subsecs(3) + TimeDelta::try_seconds(600).unwrap();
    let cond = RefreshCond {
        refresh_token: "refresh_refresh",
        client_id: "client_refresh",
        now: Utc::now(),
    };
    let updates = RefreshUpdates {
        access_token: "refresh_access2",
        expires_at,
    };
    match runtime.block_on(async { token_model.refresh(&cond, &updates).await }) {
        Err(e) => return Err(format!("model.refresh() error: {}", e)),
        Ok(refreshed) => expect(refreshed).to_equal(true)?,
    }
    let get = match get_token(runtime, model, "refresh_refresh")? {
        None => return Err("should get one after refresh".to_string()),
        Some(token) => token,
    };
    expect(get.access_token.as_str()).to_equal("refresh_access2")?;
    expect(get.expires_at).to_equal(expires_at)?;
    expect(get.refresh_expires_at).to_equal(token.refresh_expires_at)?;

    let cond = QueryCond {
        access_token: Some("refresh_access"),
        ..Default::default()
    };
    match runtime.block_on(async { token_model.get(&cond).await }) {
        Err(e) => return Err(format!("model.get() old access error: {}", e)),
        Ok(Some(_)) => return Err("old access token should be replaced".to_string()),
        Ok(None) => (),
    }

    let cond = RefreshCond {
        refresh_token: "refresh_refresh",
        client_id: "client_other",
        now: Utc::now(),
    };
    let updates = RefreshUpdates {
        access_token: "refresh_access3",
        expires_at,
    };
    match runtime.block_on(async { token_model.refresh(&cond, &updates).await }) {
        Err(e) => Err(format!("model.refresh() other client error: {}", e)),
        Ok(refreshed) => expect(refreshed).to_equal(false),
    }
}

/// Test `refresh()` with revoked or expired records.
pub fn refresh_invalid(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let token_model = model.token();

    let mut revoked = new_token("revoked", "client_invalid", "user_invalid", in_future());
    revoked.revoked = true;
    let expired = new_token(
        "expired",
        "client_invalid",
        "user_invalid",
        Utc::now().trunc_subsecs(3) - TimeDelta::try_seconds(1).unwrap(),
    );
    for token in [&revoked, &expired] {
        if let Err(e) = runtime.block_on(async { token_model.add(token).await }) {
            return Err(format!("model.add() error: {}", e));
        }
    }

    for name in ["revoked", "expired", "not_exist"] {
        let refresh_token = format!("{}_refresh", name);
        let access_token = format!("{}_access2", name);
        let cond = RefreshCond {
            refresh_token: refresh_token.as_str(),
            client_id: "client_invalid",
            now: Utc::now(),
        };
        let updates = RefreshUpdates {
            access_token: access_token.as_str(),
            expires_at: in_future(),
        };
        match runtime.block_on(async { token_model.refresh(&cond, &updates).await }) {
            Err(e) => return Err(format!("model.refresh() {} error: {}", name, e)),
            Ok(true) => return Err(format!("model.refresh() {} should not succeed", name)),
            Ok(false) => (),
        }
    }
    Ok(())
}

/// Test `revoke()`.
pub fn revoke(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let token_model = model.token();

    let tokens = [
        new_token("revoke1", "client_revoke", "user_revoke1", in_future()),
        new_token("revoke2", "client_revoke", "user_revoke2", in_future()),
        new_token("revoke3", "client_keep", "user_revoke1", in_future()),
    ];
    for token in tokens.iter() {
        if let Err(e) = runtime.block_on(async { token_model.add(token).await }) {
            return Err(format!("model.add() error: {}", e));
        }
    }

    let cond = QueryCond {
        access_token: Some("revoke1_access"),
        ..Default::default()
    };
    match runtime.block_on(async { token_model.revoke(&cond).await }) {
        Err(e) => return Err(format!("model.revoke() one error: {}", e)),
        Ok(count) => expect(count).to_equal(1)?,
    }
    // Already revoked records are not counted again.
    let cond = QueryCond {
        client_id: Some("client_revoke"),
        ..Default::default()
    };
    match runtime.block_on(async { token_model.revoke(&cond).await }) {
        Err(e) => return Err(format!("model.revoke() client error: {}", e)),
        Ok(count) => expect(count).to_equal(1)?,
    }
    for (name, revoked) in [("revoke1", true), ("revoke2", true), ("revoke3", false)] {
        match get_token(runtime, model, format!("{}_refresh", name).as_str())? {
            None => return Err(format!("should get {}", name)),
            Some(token) => expect(token.revoked).to_equal(revoked)?,
        }
    }
    match runtime.block_on(async { token_model.revoke(&cond).await }) {
        Err(e) => Err(format!("model.revoke() again error: {}", e)),
        Ok(count) => expect(count).to_equal(0),
    }
}

/// Test `del_expired()`.
pub fn del_expired(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let token_model = model.token();

    let now = Utc::now().trunc_subsecs(3);
    let old = new_token("old", "client_expired", "user_expired", now - TimeDelta::try_seconds(1).unwrap());
    let new = new_token("new", "client_expired", "user_expired", now + TimeDelta::try_seconds(60).unwrap());
    for token in [&old, &new] {
        if let Err(e) = runtime.block_on(async { token_model.add(token).await }) {
            return Err(format!("model.add() error: {}", e));
        }
    }
    if let Err(e) = runtime.block_on(async { token_model.del_expired(&now).await }) {
        return Err(format!("model.del_expired() error: {}", e));
    }
    if get_token(runtime, model, "old_refresh")?.is_some() {
        return Err("old token should be deleted".to_string());
    }
    match get_token(runtime, model, "new_refresh")? {
        None => Err("new token should be kept".to_string()),
        Some(_) => Ok(()),
    }
}

/// Test [`Model::purge_expired`] across all expirable items.
pub fn purge_expired(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let now = Utc::now().trunc_subsecs(3);
    let past = now - TimeDelta::try_seconds(1).unwrap();

    let token = new_token("purge", "client_purge", "user_purge", past);
    if let Err(e) = runtime.block_on(async { model.token().add(&token).await }) {
        return Err(format!("add token error: {}", e));
    }
    let code = AuthorizationCode {
        code: "code_purge".to_string(),
        user_id: "user_purge".to_string(),
        client_id: "client_purge".to_string(),
        redirect_uri: crate::TEST_REDIRECT_URI.to_string(),
        scopes: vec![],
        expires_at: past,
        used: false,
        created_at: past,
    };
    if let Err(e) = runtime.block_on(async { model.authorization_code().add(&code).await }) {
        return Err(format!("add code error: {}", e));
    }
    let session = LoginSession {
        session_id: "session_purge".to_string(),
        expires_at: past,
        user_id: "user_purge".to_string(),
    };
    if let Err(e) = runtime.block_on(async { model.login_session().add(&session).await }) {
        return Err(format!("add session error: {}", e));
    }

    if let Err(e) = runtime.block_on(async { model.purge_expired(&now).await }) {
        return Err(format!("purge_expired() error: {}", e));
    }

    if get_token(runtime, model, "purge_refresh")?.is_some() {
        return Err("token should be purged".to_string());
    }
    match runtime.block_on(async { model.authorization_code().get("code_purge").await }) {
        Err(e) => return Err(format!("get code error: {}", e)),
        Ok(Some(_)) => return Err("code should be purged".to_string()),
        Ok(None) => (),
    }
    match runtime.block_on(async { model.login_session().get("session_purge").await }) {
        Err(e) => Err(format!("get session error: {}", e)),
        Ok(Some(_)) => Err("session should be purged".to_string()),
        Ok(None) => Ok(()),
    }
}

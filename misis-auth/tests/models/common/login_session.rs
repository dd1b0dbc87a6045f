use chrono::{SubsecRound, TimeDelta, Utc};
use laboratory::expect;
use tokio::runtime::Runtime;

use misis_auth::models::{
    Model,
    login_session::{LoginSession, QueryCond},
};

/// Test `add()` and `get()`.
pub fn add_get(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let model = model.login_session();

    let session = LoginSession {
        session_id: "session_id_get".to_string(),
        expires_at: Utc::now().trunc_subsecs(3) + TimeDelta::try_seconds(60).unwrap(),
        user_id: "user_id_get".to_string(),
    };
    if let Err(e) = runtime.block_on(async { model.add(&session).await }) {
        return Err(format!("model.add() error: {}", e));
    }
    match runtime.block_on(async { model.get("session_id_get").await }) {
        Err(e) => return Err(format!("model.get() error: {}", e)),
        Ok(None) => return Err("should get one".to_string()),
        Ok(Some(get_session)) => expect(get_session).to_equal(session)?,
    }
    match runtime.block_on(async { model.get("session_id_not_exist").await }) {
        Err(e) => Err(format!("model.get() not exist error: {}", e)),
        Ok(None) => Ok(()),
        Ok(Some(_)) => Err("should not get a not-exist one".to_string()),
    }
}

/// Test `del()` by session ID and by user ID.
pub fn del(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let model = model.login_session();

    let expires_at = Utc::now().trunc_subsecs(3) + TimeDelta::try_seconds(60).unwrap();
    for (session_id, user_id) in [("s1", "user1"), ("s2", "user1"), ("s3", "user2")] {
        let session = LoginSession {
            session_id: session_id.to_string(),
            expires_at,
            user_id: user_id.to_string(),
        };
        if let Err(e) = runtime.block_on(async { model.add(&session).await }) {
            return Err(format!("model.add() {} error: {}", session_id, e));
        }
    }

    let cond = QueryCond {
        session_id: Some("s1"),
        ..Default::default()
    };
    if let Err(e) = runtime.block_on(async { model.del(&cond).await }) {
        return Err(format!("model.del() session error: {}", e));
    }
    match runtime.block_on(async { model.get("s1").await }) {
        Err(e) => return Err(format!("model.get() s1 error: {}", e)),
        Ok(Some(_)) => return Err("s1 should be deleted".to_string()),
        Ok(None) => (),
    }
    match runtime.block_on(async { model.get("s2").await }) {
        Err(e) => return Err(format!("model.get() s2 error: {}", e)),
        Ok(None) => return Err("s2 should be kept".to_string()),
        Ok(Some(_)) => (),
    }

    let cond = QueryCond {
        user_id: Some("user1"),
        ..Default::default()
    };
    if let Err(e) = runtime.block_on(async { model.del(&cond).await }) {
        return Err(format!("model.del() user error: {}", e));
    }
    match runtime.block_on(async { model.get("s2").await }) {
        Err(e) => return Err(format!("model.get() s2 after error: {}", e)),
        Ok(Some(_)) => return Err("s2 should be deleted".to_string()),
        Ok(None) => (),
    }
    match runtime.block_on(async { model.get("s3").await }) {
        Err(e) => Err(format!("model.get() s3 error: {}", e)),
        Ok(None) => Err("s3 should be kept".to_string()),
        Ok(Some(_)) => Ok(()),
    }
}

/// Test `del_expired()`.
pub fn del_expired(runtime: &Runtime, model: &dyn Model) -> Result<(), String> {
    let model = model.login_session();

    let now = Utc::now().trunc_subsecs(3);
    let sessions = [
        ("expired", now - TimeDelta::try_seconds(1).unwrap()),
        ("valid", now + TimeDelta::try_seconds(60).unwrap()),
    ];
    for (session_id, expires_at) in sessions {
        let session = LoginSession {
            session_id: session_id.to_string(),
            expires_at,
            user_id: "user_expired".to_string(),
        };
        if let Err(e) = runtime.block_on(async { model.add(&session).await }) {
            return Err(format!("model.add() {} error: {}", session_id, e));
        }
    }
    if let Err(e) = runtime.block_on(async { model.del_expired(&now).await }) {
        return Err(format!("model.del_expired() error: {}", e));
    }
    match runtime.block_on(async { model.get("expired").await }) {
        Err(e) => return Err(format!("model.get() expired error: {}", e)),
        Ok(Some(_)) => return Err("expired one should be deleted".to_string()),
        Ok(None) => (),
    }
    match runtime.block_on(async { model.get("valid").await }) {
        Err(e) => Err(format!("model.get() valid error: {}", e)),
        Ok(None) => Err("valid one should be kept".to_string()),
        Ok(Some(_)) => Ok(()),
    }
}

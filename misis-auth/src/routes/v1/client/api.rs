use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use log::{error, info};

use misis_corelib::{
    err::ErrResp,
    http::{Json, Path, Query},
    strings::{self, time_str},
};

use super::{
    super::super::{ErrReq, State as AppState},
    request, response,
};
use crate::{
    models::{
        authorization_code::QueryCond as CodeQueryCond,
        client::{Client, ListOptions, ListQueryCond, QueryCond, UpdateQueryCond, Updates},
        token::QueryCond as TokenQueryCond,
        user::User,
    },
    routes::oauth2::primitive::SUPPORTED_SCOPES,
};

const LIST_LIMIT_DEFAULT: u64 = 100;
const LIST_LIMIT_MAX: u64 = 100;
const CLIENT_ID_PREFIX: &'static str = "misis_";
const CLIENT_ID_RAND_LEN: usize = 26;
const CLIENT_ID_RETRY: usize = 3;
const SECRET_LEN: usize = 40;

/// `POST /{base}/api/v1/client`
pub async fn post_client(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<request::PostClientBody>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "post_client";

    let name = body.data.name.trim();
    if name.len() == 0 {
        return Err(ErrResp::ErrParam(Some(
            "`name` must not be empty".to_string(),
        )));
    }
    let redirect_uris = check_redirect_uris(&body.data.redirect_uris)?;
    let scopes = check_scopes(&body.data.scopes)?;

    let cond = ListQueryCond {
        owner_id: Some(user.user_id.as_str()),
    };
    match state.model.client().count(&cond).await {
        Err(e) => {
            error!("[{}] count error: {}", FN_NAME, e);
            return Err(ErrResp::ErrDb(None));
        }
        Ok(count) => {
            if count >= state.max_applications {
                return Err(ErrResp::Custom(
                    ErrReq::APP_LIMIT.0,
                    ErrReq::APP_LIMIT.1,
                    Some(format!(
                        "at most {} applications per user",
                        state.max_applications
                    )),
                ));
            }
        }
    }

    let mut client_id = None;
    for _ in 0..CLIENT_ID_RETRY {
        let id = format!(
            "{}{}",
            CLIENT_ID_PREFIX,
            strings::randomstring(CLIENT_ID_RAND_LEN)
        );
        let cond = QueryCond {
            client_id: Some(id.as_str()),
            ..Default::default()
        };
        match state.model.client().get(&cond).await {
            Err(e) => {
                error!("[{}] get error: {}", FN_NAME, e);
                return Err(ErrResp::ErrDb(None));
            }
            Ok(None) => {
                client_id = Some(id);
                break;
            }
            Ok(Some(_)) => continue,
        }
    }
    let client_id = match client_id {
        None => {
            error!("[{}] generate unique client ID failed", FN_NAME);
            return Err(ErrResp::ErrUnknown(None));
        }
        Some(client_id) => client_id,
    };

    let now = Utc::now();
    let client = Client {
        client_id: client_id.clone(),
        client_secret: strings::randomstring(SECRET_LEN),
        name: name.to_string(),
        description: match body.data.description.as_ref() {
            None => None,
            Some(description) => Some(description.clone()),
        },
        redirect_uris,
        scopes,
        owner_id: user.user_id.clone(),
        is_active: true,
        created_at: now,
        modified_at: now,
    };
    if let Err(e) = state.model.client().add(&client).await {
        error!("[{}] add error: {}", FN_NAME, e);
        return Err(ErrResp::ErrDb(None));
    }
    info!("[{}] client {} created by {}", FN_NAME, client_id, user.user_id);
    Ok(Json(response::PostClient {
        data: response::PostClientData {
            client_id,
            client_secret: client.client_secret,
        },
    }))
}

/// `GET /{base}/api/v1/client/count`
pub async fn get_client_count(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "get_client_count";

    let cond = ListQueryCond {
        owner_id: Some(user.user_id.as_str()),
    };
    match state.model.client().count(&cond).await {
        Err(e) => {
            error!("[{}] count error: {}", FN_NAME, e);
            Err(ErrResp::ErrDb(None))
        }
        Ok(count) => Ok(Json(response::GetClientCount {
            data: response::GetCountData { count },
        })),
    }
}

/// `GET /{base}/api/v1/client/list`
pub async fn get_client_list(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<request::GetClientListQuery>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "get_client_list";

    let cond = ListQueryCond {
        owner_id: Some(user.user_id.as_str()),
    };
    let opts = ListOptions {
        cond: &cond,
        offset: query.offset,
        limit: match query.limit {
            None | Some(0) => Some(LIST_LIMIT_DEFAULT),
            Some(limit) => Some(limit.min(LIST_LIMIT_MAX)),
        },
    };
    match state.model.client().list(&opts).await {
        Err(e) => {
            error!("[{}] list error: {}", FN_NAME, e);
            Err(ErrResp::ErrDb(None))
        }
        Ok(list) => Ok(Json(response::GetClientList {
            data: list.into_iter().map(|c| client_data(c, false)).collect(),
        })),
    }
}

/// `GET /{base}/api/v1/client/{clientId}`
pub async fn get_client(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(param): Path<request::ClientIdPath>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "get_client";

    match get_owned_client(FN_NAME, &state, &user, param.client_id.as_str()).await? {
        None => Err(ErrResp::ErrNotFound(None)),
        Some(client) => Ok(Json(response::GetClient {
            data: client_data(client, true),
        })),
    }
}

/// `PATCH /{base}/api/v1/client/{clientId}`
///
/// The client ID and secret are never changed.
pub async fn patch_client(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(param): Path<request::ClientIdPath>,
    Json(body): Json<request::PatchClientBody>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "patch_client";

    let data = &body.data;
    let name = match data.name.as_ref() {
        None => None,
        Some(name) => match name.trim() {
            "" => {
                return Err(ErrResp::ErrParam(Some(
                    "`name` must not be empty".to_string(),
                )));
            }
            name => Some(name),
        },
    };
    let redirect_uris = match data.redirect_uris.as_ref() {
        None => None,
        Some(uris) => Some(check_redirect_uris(uris)?),
    };
    let scopes = match data.scopes.as_ref() {
        None => None,
        Some(scopes) => Some(check_scopes(scopes)?),
    };
    let updates = Updates {
        modified_at: Some(Utc::now()),
        name,
        description: match data.description.as_ref() {
            None => None,
            Some(description) => Some(description.as_deref()),
        },
        redirect_uris: redirect_uris.as_ref(),
        scopes: scopes.as_ref(),
        is_active: data.is_active,
    };
    if updates.name.is_none()
        && updates.description.is_none()
        && updates.redirect_uris.is_none()
        && updates.scopes.is_none()
        && updates.is_active.is_none()
    {
        return Err(ErrResp::ErrParam(Some(
            "at least one parameter".to_string(),
        )));
    }

    let client_id = param.client_id.as_str();
    if get_owned_client(FN_NAME, &state, &user, client_id)
        .await?
        .is_none()
    {
        return Err(ErrResp::ErrNotFound(None));
    }
    let cond = UpdateQueryCond {
        client_id,
        owner_id: user.user_id.as_str(),
    };
    if let Err(e) = state.model.client().update(&cond, &updates).await {
        error!("[{}] update error: {}", FN_NAME, e);
        return Err(ErrResp::ErrDb(None));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /{base}/api/v1/client/{clientId}`
///
/// Revokes all tokens of the client and removes its authorization codes.
pub async fn delete_client(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(param): Path<request::ClientIdPath>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "delete_client";

    let client_id = param.client_id.as_str();
    if get_owned_client(FN_NAME, &state, &user, client_id)
        .await?
        .is_none()
    {
        return Err(ErrResp::ErrNotFound(None));
    }

    let cond = TokenQueryCond {
        client_id: Some(client_id),
        ..Default::default()
    };
    match state.model.token().revoke(&cond).await {
        Err(e) => {
            error!("[{}] revoke tokens error: {}", FN_NAME, e);
            return Err(ErrResp::ErrDb(None));
        }
        Ok(count) => info!("[{}] {} token(s) of {} revoked", FN_NAME, count, client_id),
    }
    let cond = CodeQueryCond {
        client_id: Some(client_id),
        ..Default::default()
    };
    if let Err(e) = state.model.authorization_code().del(&cond).await {
        error!("[{}] delete codes error: {}", FN_NAME, e);
        return Err(ErrResp::ErrDb(None));
    }
    let cond = QueryCond {
        client_id: Some(client_id),
        owner_id: Some(user.user_id.as_str()),
        ..Default::default()
    };
    if let Err(e) = state.model.client().del(&cond).await {
        error!("[{}] delete error: {}", FN_NAME, e);
        return Err(ErrResp::ErrDb(None));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_owned_client(
    fn_name: &str,
    state: &AppState,
    user: &User,
    client_id: &str,
) -> Result<Option<Client>, ErrResp> {
    let cond = QueryCond {
        client_id: Some(client_id),
        owner_id: Some(user.user_id.as_str()),
        ..Default::default()
    };
    match state.model.client().get(&cond).await {
        Err(e) => {
            error!("[{}] get error: {}", fn_name, e);
            Err(ErrResp::ErrDb(None))
        }
        Ok(client) => Ok(client),
    }
}

/// Absolute http(s) URIs without duplicates. The order is kept.
fn check_redirect_uris(uris: &Vec<String>) -> Result<Vec<String>, ErrResp> {
    if uris.len() == 0 {
        return Err(ErrResp::ErrParam(Some(
            "`redirectUris` must not be empty".to_string(),
        )));
    }
    let mut result: Vec<String> = vec![];
    for uri in uris.iter() {
        if !strings::is_uri(uri.as_str()) {
            return Err(ErrResp::ErrParam(Some(
                "`redirectUris` with invalid item(s)".to_string(),
            )));
        }
        if !result.contains(uri) {
            result.push(uri.clone());
        }
    }
    Ok(result)
}

/// Supported scopes without duplicates.
fn check_scopes(scopes: &Vec<String>) -> Result<Vec<String>, ErrResp> {
    let mut result: Vec<String> = vec![];
    for scope in scopes.iter() {
        if !strings::is_scope(scope.as_str()) || !SUPPORTED_SCOPES.contains(&scope.as_str()) {
            return Err(ErrResp::ErrParam(Some(
                "`scopes` with invalid item(s)".to_string(),
            )));
        }
        if !result.contains(scope) {
            result.push(scope.clone());
        }
    }
    Ok(result)
}

fn client_data(client: Client, with_secret: bool) -> response::GetClientData {
    response::GetClientData {
        client_id: client.client_id,
        client_secret: match with_secret {
            false => None,
            true => Some(client.client_secret),
        },
        name: client.name,
        description: client.description,
        redirect_uris: client.redirect_uris,
        scopes: client.scopes,
        is_active: client.is_active,
        created_at: time_str(&client.created_at),
        modified_at: time_str(&client.modified_at),
    }
}

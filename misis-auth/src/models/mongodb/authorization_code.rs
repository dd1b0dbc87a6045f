use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    Database,
    bson::{DateTime, Document, doc},
};
use serde::{Deserialize, Serialize};

use super::super::authorization_code::{
    AuthorizationCode, AuthorizationCodeModel, ConsumeCond, QueryCond,
};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<Database>,
}

/// MongoDB schema.
#[derive(Deserialize, Serialize)]
struct Schema {
    code: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "clientId")]
    client_id: String,
    #[serde(rename = "redirectUri")]
    redirect_uri: String,
    scopes: Vec<String>,
    #[serde(rename = "expiresAt")]
    expires_at: DateTime,
    used: bool,
    #[serde(rename = "createdAt")]
    created_at: DateTime,
}

const COL_NAME: &'static str = "authorizationCode";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<Database>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl AuthorizationCodeModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let indexes = vec![
            doc! {"name": "code_1", "key": {"code": 1}, "unique": true},
            doc! {"name": "clientId_1", "key": {"clientId": 1}},
            doc! {"name": "userId_1", "key": {"userId": 1}},
            doc! {"name": "ttl_1", "key": {"expiresAt": 1}, "expireAfterSeconds": 0},
        ];
        let command = doc! {
            "createIndexes": COL_NAME,
            "indexes": indexes,
        };
        self.conn.run_command(command).await?;
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<AuthorizationCode>, Box<dyn StdError>> {
        let mut cursor = self
            .conn
            .collection::<Schema>(COL_NAME)
            .find(doc! {"code": code})
            .await?;
        if let Some(item) = cursor.try_next().await? {
            return Ok(Some(AuthorizationCode {
                code: item.code,
                user_id: item.user_id,
                client_id: item.client_id,
                redirect_uri: item.redirect_uri,
                scopes: item.scopes,
                expires_at: item.expires_at.into(),
                used: item.used,
                created_at: item.created_at.into(),
            }));
        }
        Ok(None)
    }

    async fn add(&self, code: &AuthorizationCode) -> Result<(), Box<dyn StdError>> {
        let item = Schema {
            code: code.code.clone(),
            user_id: code.user_id.clone(),
            client_id: code.client_id.clone(),
            redirect_uri: code.redirect_uri.clone(),
            scopes: code.scopes.clone(),
            expires_at: code.expires_at.into(),
            used: code.used,
            created_at: code.created_at.into(),
        };
        self.conn
            .collection::<Schema>(COL_NAME)
            .insert_one(item)
            .await?;
        Ok(())
    }

    async fn del(&self, cond: &QueryCond) -> Result<(), Box<dyn StdError>> {
        let filter = get_query_filter(cond);
        self.conn
            .collection::<Schema>(COL_NAME)
            .delete_many(filter)
            .await?;
        Ok(())
    }

    async fn consume(&self, cond: &ConsumeCond) -> Result<bool, Box<dyn StdError>> {
        let now: DateTime = cond.now.into();
        let filter = doc! {
            "code": cond.code,
            "clientId": cond.client_id,
            "redirectUri": cond.redirect_uri,
            "used": false,
            "expiresAt": {"$gte": now},
        };
        let result = self
            .conn
            .collection::<Schema>(COL_NAME)
            .update_one(filter, doc! {"$set": {"used": true}})
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn del_expired(&self, now: &chrono::DateTime<Utc>) -> Result<(), Box<dyn StdError>> {
        let now: DateTime = (*now).into();
        self.conn
            .collection::<Schema>(COL_NAME)
            .delete_many(doc! {"expiresAt": {"$lt": now}})
            .await?;
        Ok(())
    }
}

/// Transforms query conditions to the MongoDB document.
fn get_query_filter(cond: &QueryCond) -> Document {
    let mut filter = Document::new();
    if let Some(value) = cond.code {
        filter.insert("code", value);
    }
    if let Some(value) = cond.client_id {
        filter.insert("clientId", value);
    }
    if let Some(value) = cond.user_id {
        filter.insert("userId", value);
    }
    filter
}

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    Database,
    bson::{DateTime, Document, doc},
};
use serde::{Deserialize, Serialize};

use super::super::token::{QueryCond, RefreshCond, RefreshUpdates, Token, TokenModel};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<Database>,
}

/// MongoDB schema.
#[derive(Deserialize, Serialize)]
struct Schema {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresAt")]
    expires_at: DateTime,
    #[serde(rename = "refreshExpiresAt")]
    refresh_expires_at: DateTime,
    scopes: Vec<String>,
    #[serde(rename = "clientId")]
    client_id: String,
    #[serde(rename = "userId")]
    user_id: String,
    revoked: bool,
    #[serde(rename = "createdAt")]
    created_at: DateTime,
}

const COL_NAME: &'static str = "token";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<Database>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl TokenModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let indexes = vec![
            doc! {"name": "accessToken_1", "key": {"accessToken": 1}, "unique": true},
            doc! {"name": "refreshToken_1", "key": {"refreshToken": 1}, "unique": true},
            doc! {"name": "clientId_1", "key": {"clientId": 1}},
            doc! {"name": "userId_1", "key": {"userId": 1}},
            doc! {"name": "ttl_1", "key": {"refreshExpiresAt": 1}, "expireAfterSeconds": 0},
        ];
        let command = doc! {
            "createIndexes": COL_NAME,
            "indexes": indexes,
        };
        self.conn.run_command(command).await?;
        Ok(())
    }

    async fn get(&self, cond: &QueryCond) -> Result<Option<Token>, Box<dyn StdError>> {
        let filter = get_query_filter(cond);
        let mut cursor = self
            .conn
            .collection::<Schema>(COL_NAME)
            .find(filter)
            .await?;
        if let Some(item) = cursor.try_next().await? {
            return Ok(Some(Token {
                access_token: item.access_token,
                refresh_token: item.refresh_token,
                expires_at: item.expires_at.into(),
                refresh_expires_at: item.refresh_expires_at.into(),
                scopes: item.scopes,
                client_id: item.client_id,
                user_id: item.user_id,
                revoked: item.revoked,
                created_at: item.created_at.into(),
            }));
        }
        Ok(None)
    }

    async fn add(&self, token: &Token) -> Result<(), Box<dyn StdError>> {
        let item = Schema {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at.into(),
            refresh_expires_at: token.refresh_expires_at.into(),
            scopes: token.scopes.clone(),
            client_id: token.client_id.clone(),
            user_id: token.user_id.clone(),
            revoked: token.revoked,
            created_at: token.created_at.into(),
        };
        self.conn
            .collection::<Schema>(COL_NAME)
            .insert_one(item)
            .await?;
        Ok(())
    }

    async fn refresh(
        &self,
        cond: &RefreshCond,
        updates: &RefreshUpdates,
    ) -> Result<bool, Box<dyn StdError>> {
        let now: DateTime = cond.now.into();
        let expires_at: DateTime = updates.expires_at.into();
        let filter = doc! {
            "refreshToken": cond.refresh_token,
            "clientId": cond.client_id,
            "revoked": false,
            "refreshExpiresAt": {"$gte": now},
        };
        let update = doc! {
            "$set": {
                "accessToken": updates.access_token,
                "expiresAt": expires_at,
            }
        };
        let result = self
            .conn
            .collection::<Schema>(COL_NAME)
            .update_one(filter, update)
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn revoke(&self, cond: &QueryCond) -> Result<u64, Box<dyn StdError>> {
        let mut filter = get_query_filter(cond);
        filter.insert("revoked", false);
        let result = self
            .conn
            .collection::<Schema>(COL_NAME)
            .update_many(filter, doc! {"$set": {"revoked": true}})
            .await?;
        Ok(result.modified_count)
    }

    async fn del_expired(&self, now: &chrono::DateTime<Utc>) -> Result<(), Box<dyn StdError>> {
        let now: DateTime = (*now).into();
        self.conn
            .collection::<Schema>(COL_NAME)
            .delete_many(doc! {"refreshExpiresAt": {"$lt": now}})
            .await?;
        Ok(())
    }
}

/// Transforms query conditions to the MongoDB document.
fn get_query_filter(cond: &QueryCond) -> Document {
    let mut filter = Document::new();
    if let Some(value) = cond.access_token {
        filter.insert("accessToken", value);
    }
    if let Some(value) = cond.refresh_token {
        filter.insert("refreshToken", value);
    }
    if let Some(value) = cond.client_id {
        filter.insert("clientId", value);
    }
    if let Some(value) = cond.user_id {
        filter.insert("userId", value);
    }
    filter
}

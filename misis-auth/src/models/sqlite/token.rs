use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sql_builder::{SqlBuilder, quote};
use sqlx::SqlitePool;

use super::{
    super::token::{QueryCond, RefreshCond, RefreshUpdates, Token, TokenModel},
    split_list,
};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<SqlitePool>,
}

/// SQLite schema.
#[derive(sqlx::FromRow)]
struct Schema {
    access_token: String,
    refresh_token: String,
    /// i64 as time tick from Epoch in milliseconds.
    expires_at: i64,
    /// i64 as time tick from Epoch in milliseconds.
    refresh_expires_at: i64,
    /// Space-separated value such as `read profile`.
    scopes: String,
    client_id: String,
    user_id: String,
    /// 0 or 1.
    revoked: i64,
    /// i64 as time tick from Epoch in milliseconds.
    created_at: i64,
}

const TABLE_NAME: &'static str = "token";
const FIELDS: &'static [&'static str] = &[
    "access_token",
    "refresh_token",
    "expires_at",
    "refresh_expires_at",
    "scopes",
    "client_id",
    "user_id",
    "revoked",
    "created_at",
];
const TABLE_INIT_SQL: &'static str = "\
    CREATE TABLE IF NOT EXISTS token (\
    access_token TEXT NOT NULL UNIQUE,\
    refresh_token TEXT NOT NULL UNIQUE,\
    expires_at INTEGER NOT NULL,\
    refresh_expires_at INTEGER NOT NULL,\
    scopes TEXT NOT NULL,\
    client_id TEXT NOT NULL,\
    user_id TEXT NOT NULL,\
    revoked INTEGER NOT NULL DEFAULT 0,\
    created_at INTEGER NOT NULL,\
    PRIMARY KEY (refresh_token))";
const INDEX_INIT_SQLS: [&'static str; 2] = [
    "CREATE INDEX IF NOT EXISTS token_client_id ON token (client_id)",
    "CREATE INDEX IF NOT EXISTS token_refresh_expires_at ON token (refresh_expires_at)",
];

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<SqlitePool>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl TokenModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let _ = sqlx::query(TABLE_INIT_SQL)
            .execute(self.conn.as_ref())
            .await?;
        for sql in INDEX_INIT_SQLS {
            let _ = sqlx::query(sql).execute(self.conn.as_ref()).await?;
        }
        Ok(())
    }

    async fn get(&self, cond: &QueryCond) -> Result<Option<Token>, Box<dyn StdError>> {
        let sql = build_where(SqlBuilder::select_from(TABLE_NAME).fields(FIELDS), cond).sql()?;

        let row: Schema = match sqlx::query_as(sql.as_str())
            .fetch_one(self.conn.as_ref())
            .await
        {
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(e) => return Err(Box::new(e)),
            Ok(row) => row,
        };
        Ok(Some(Token {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: Utc.timestamp_nanos(row.expires_at * 1000000),
            refresh_expires_at: Utc.timestamp_nanos(row.refresh_expires_at * 1000000),
            scopes: split_list(row.scopes.as_str()),
            client_id: row.client_id,
            user_id: row.user_id,
            revoked: row.revoked != 0,
            created_at: Utc.timestamp_nanos(row.created_at * 1000000),
        }))
    }

    async fn add(&self, token: &Token) -> Result<(), Box<dyn StdError>> {
        let values = vec![
            quote(token.access_token.as_str()),
            quote(token.refresh_token.as_str()),
            token.expires_at.timestamp_millis().to_string(),
            token.refresh_expires_at.timestamp_millis().to_string(),
            quote(token.scopes.join(" ")),
            quote(token.client_id.as_str()),
            quote(token.user_id.as_str()),
            match token.revoked {
                false => "0".to_string(),
                true => "1".to_string(),
            },
            token.created_at.timestamp_millis().to_string(),
        ];
        let sql = SqlBuilder::insert_into(TABLE_NAME)
            .fields(FIELDS)
            .values(&values)
            .sql()?;
        let _ = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }

    async fn refresh(
        &self,
        cond: &RefreshCond,
        updates: &RefreshUpdates,
    ) -> Result<bool, Box<dyn StdError>> {
        let sql = SqlBuilder::update_table(TABLE_NAME)
            .set("access_token", quote(updates.access_token))
            .set("expires_at", updates.expires_at.timestamp_millis())
            .and_where_eq("refresh_token", quote(cond.refresh_token))
            .and_where_eq("client_id", quote(cond.client_id))
            .and_where_eq("revoked", 0)
            .and_where_ge("refresh_expires_at", cond.now.timestamp_millis())
            .sql()?;
        let result = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, cond: &QueryCond) -> Result<u64, Box<dyn StdError>> {
        let sql = build_where(
            SqlBuilder::update_table(TABLE_NAME).set("revoked", 1),
            cond,
        )
        .and_where_eq("revoked", 0)
        .sql()?;
        let result = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(result.rows_affected())
    }

    async fn del_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>> {
        let sql = SqlBuilder::delete_from(TABLE_NAME)
            .and_where_lt("refresh_expires_at", now.timestamp_millis())
            .sql()?;
        let _ = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }
}

/// Transforms query conditions to the SQL builder.
fn build_where<'a>(builder: &'a mut SqlBuilder, cond: &QueryCond<'a>) -> &'a mut SqlBuilder {
    if let Some(value) = cond.access_token {
        builder.and_where_eq("access_token", quote(value));
    }
    if let Some(value) = cond.refresh_token {
        builder.and_where_eq("refresh_token", quote(value));
    }
    if let Some(value) = cond.client_id {
        builder.and_where_eq("client_id", quote(value));
    }
    if let Some(value) = cond.user_id {
        builder.and_where_eq("user_id", quote(value));
    }
    builder
}

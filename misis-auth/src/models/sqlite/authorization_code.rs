use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sql_builder::{SqlBuilder, quote};
use sqlx::SqlitePool;

use super::{
    super::authorization_code::{AuthorizationCode, AuthorizationCodeModel, ConsumeCond, QueryCond},
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
    code: String,
    user_id: String,
    client_id: String,
    redirect_uri: String,
    /// Space-separated value such as `read profile`.
    scopes: String,
    /// i64 as time tick from Epoch in milliseconds.
    expires_at: i64,
    /// 0 or 1.
    used: i64,
    /// i64 as time tick from Epoch in milliseconds.
    created_at: i64,
}

const TABLE_NAME: &'static str = "authorization_code";
const FIELDS: &'static [&'static str] = &[
    "code",
    "user_id",
    "client_id",
    "redirect_uri",
    "scopes",
    "expires_at",
    "used",
    "created_at",
];
const TABLE_INIT_SQL: &'static str = "\
    CREATE TABLE IF NOT EXISTS authorization_code (\
    code TEXT NOT NULL UNIQUE,\
    user_id TEXT NOT NULL,\
    client_id TEXT NOT NULL,\
    redirect_uri TEXT NOT NULL,\
    scopes TEXT NOT NULL,\
    expires_at INTEGER NOT NULL,\
    used INTEGER NOT NULL DEFAULT 0,\
    created_at INTEGER NOT NULL,\
    PRIMARY KEY (code))";
const INDEX_INIT_SQL: &'static str =
    "CREATE INDEX IF NOT EXISTS authorization_code_expires_at ON authorization_code (expires_at)";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<SqlitePool>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl AuthorizationCodeModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let _ = sqlx::query(TABLE_INIT_SQL)
            .execute(self.conn.as_ref())
            .await?;
        let _ = sqlx::query(INDEX_INIT_SQL)
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<AuthorizationCode>, Box<dyn StdError>> {
        let cond = QueryCond {
            code: Some(code),
            ..Default::default()
        };
        let sql = build_where(SqlBuilder::select_from(TABLE_NAME).fields(FIELDS), &cond).sql()?;

        let row: Schema = match sqlx::query_as(sql.as_str())
            .fetch_one(self.conn.as_ref())
            .await
        {
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(e) => return Err(Box::new(e)),
            Ok(row) => row,
        };
        Ok(Some(AuthorizationCode {
            code: row.code,
            user_id: row.user_id,
            client_id: row.client_id,
            redirect_uri: row.redirect_uri,
            scopes: split_list(row.scopes.as_str()),
            expires_at: Utc.timestamp_nanos(row.expires_at * 1000000),
            used: row.used != 0,
            created_at: Utc.timestamp_nanos(row.created_at * 1000000),
        }))
    }

    async fn add(&self, code: &AuthorizationCode) -> Result<(), Box<dyn StdError>> {
        let values = vec![
            quote(code.code.as_str()),
            quote(code.user_id.as_str()),
            quote(code.client_id.as_str()),
            quote(code.redirect_uri.as_str()),
            quote(code.scopes.join(" ")),
            code.expires_at.timestamp_millis().to_string(),
            match code.used {
                false => "0".to_string(),
                true => "1".to_string(),
            },
            code.created_at.timestamp_millis().to_string(),
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

    async fn del(&self, cond: &QueryCond) -> Result<(), Box<dyn StdError>> {
        let sql = build_where(&mut SqlBuilder::delete_from(TABLE_NAME), cond).sql()?;
        let _ = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }

    async fn consume(&self, cond: &ConsumeCond) -> Result<bool, Box<dyn StdError>> {
        let sql = SqlBuilder::update_table(TABLE_NAME)
            .set("used", 1)
            .and_where_eq("code", quote(cond.code))
            .and_where_eq("client_id", quote(cond.client_id))
            .and_where_eq("redirect_uri", quote(cond.redirect_uri))
            .and_where_eq("used", 0)
            .and_where_ge("expires_at", cond.now.timestamp_millis())
            .sql()?;
        let result = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn del_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>> {
        let sql = SqlBuilder::delete_from(TABLE_NAME)
            .and_where_lt("expires_at", now.timestamp_millis())
            .sql()?;
        let _ = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }
}

/// Transforms query conditions to the SQL builder.
fn build_where<'a>(builder: &'a mut SqlBuilder, cond: &QueryCond<'a>) -> &'a mut SqlBuilder {
    if let Some(value) = cond.code {
        builder.and_where_eq("code", quote(value));
    }
    if let Some(value) = cond.client_id {
        builder.and_where_eq("client_id", quote(value));
    }
    if let Some(value) = cond.user_id {
        builder.and_where_eq("user_id", quote(value));
    }
    builder
}

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use sql_builder::{SqlBuilder, quote};
use sqlx::SqlitePool;

use super::{
    super::client::{
        Client, ClientModel, ListOptions, ListQueryCond, QueryCond, UpdateQueryCond, Updates,
    },
    build_limit_offset, split_list,
};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<SqlitePool>,
}

/// SQLite schema.
#[derive(sqlx::FromRow)]
struct Schema {
    client_id: String,
    client_secret: String,
    name: String,
    description: Option<String>,
    /// Space-separated value.
    redirect_uris: String,
    /// Space-separated value such as `read profile`.
    scopes: String,
    owner_id: String,
    /// 0 or 1.
    is_active: i64,
    /// i64 as time tick from Epoch in milliseconds.
    created_at: i64,
    /// i64 as time tick from Epoch in milliseconds.
    modified_at: i64,
}

/// Use "COUNT(*)" instead of "COUNT(fields...)" to simplify the implementation.
#[derive(sqlx::FromRow)]
struct CountSchema {
    #[sqlx(rename = "COUNT(*)")]
    count: i64,
}

const TABLE_NAME: &'static str = "client";
const FIELDS: &'static [&'static str] = &[
    "client_id",
    "client_secret",
    "name",
    "description",
    "redirect_uris",
    "scopes",
    "owner_id",
    "is_active",
    "created_at",
    "modified_at",
];
const TABLE_INIT_SQL: &'static str = "\
    CREATE TABLE IF NOT EXISTS client (\
    client_id TEXT NOT NULL UNIQUE,\
    client_secret TEXT NOT NULL,\
    name TEXT NOT NULL,\
    description TEXT,\
    redirect_uris TEXT NOT NULL,\
    scopes TEXT NOT NULL,\
    owner_id TEXT NOT NULL,\
    is_active INTEGER NOT NULL DEFAULT 1,\
    created_at INTEGER NOT NULL,\
    modified_at INTEGER NOT NULL,\
    PRIMARY KEY (client_id))";
const INDEX_INIT_SQL: &'static str =
    "CREATE INDEX IF NOT EXISTS client_owner_id ON client (owner_id)";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<SqlitePool>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl ClientModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let _ = sqlx::query(TABLE_INIT_SQL)
            .execute(self.conn.as_ref())
            .await?;
        let _ = sqlx::query(INDEX_INIT_SQL)
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }

    async fn count(&self, cond: &ListQueryCond) -> Result<u64, Box<dyn StdError>> {
        let sql = build_list_where(SqlBuilder::select_from(TABLE_NAME).count("*"), cond).sql()?;

        let row: CountSchema = sqlx::query_as(sql.as_str())
            .fetch_one(self.conn.as_ref())
            .await?;
        Ok(row.count as u64)
    }

    async fn list(&self, opts: &ListOptions) -> Result<Vec<Client>, Box<dyn StdError>> {
        let mut builder = SqlBuilder::select_from(TABLE_NAME);
        builder.fields(FIELDS).order_by("created_at", true);
        build_limit_offset(&mut builder, opts.offset, opts.limit);
        let sql = build_list_where(&mut builder, opts.cond).sql()?;

        let mut rows = sqlx::query_as::<_, Schema>(sql.as_str()).fetch(self.conn.as_ref());
        let mut list = vec![];
        while let Some(row) = rows.try_next().await? {
            list.push(to_client(row));
        }
        Ok(list)
    }

    async fn get(&self, cond: &QueryCond) -> Result<Option<Client>, Box<dyn StdError>> {
        let sql = build_where(SqlBuilder::select_from(TABLE_NAME).fields(FIELDS), cond).sql()?;

        let row: Schema = match sqlx::query_as(sql.as_str())
            .fetch_one(self.conn.as_ref())
            .await
        {
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(e) => return Err(Box::new(e)),
            Ok(row) => row,
        };
        Ok(Some(to_client(row)))
    }

    async fn add(&self, client: &Client) -> Result<(), Box<dyn StdError>> {
        let description = match client.description.as_deref() {
            None => "NULL".to_string(),
            Some(value) => quote(value),
        };
        let values = vec![
            quote(client.client_id.as_str()),
            quote(client.client_secret.as_str()),
            quote(client.name.as_str()),
            description,
            quote(client.redirect_uris.join(" ")),
            quote(client.scopes.join(" ")),
            quote(client.owner_id.as_str()),
            match client.is_active {
                false => "0".to_string(),
                true => "1".to_string(),
            },
            client.created_at.timestamp_millis().to_string(),
            client.modified_at.timestamp_millis().to_string(),
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

    async fn update(
        &self,
        cond: &UpdateQueryCond,
        updates: &Updates,
    ) -> Result<(), Box<dyn StdError>> {
        let sql = match build_update_where(&mut SqlBuilder::update_table(TABLE_NAME), cond, updates)
        {
            None => return Ok(()),
            Some(builder) => builder.sql()?,
        };
        let _ = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }
}

fn to_client(row: Schema) -> Client {
    Client {
        client_id: row.client_id,
        client_secret: row.client_secret,
        name: row.name,
        description: row.description,
        redirect_uris: split_list(row.redirect_uris.as_str()),
        scopes: split_list(row.scopes.as_str()),
        owner_id: row.owner_id,
        is_active: row.is_active != 0,
        created_at: Utc.timestamp_nanos(row.created_at * 1000000),
        modified_at: Utc.timestamp_nanos(row.modified_at * 1000000),
    }
}

/// Transforms query conditions to the SQL builder.
fn build_where<'a>(builder: &'a mut SqlBuilder, cond: &QueryCond<'a>) -> &'a mut SqlBuilder {
    if let Some(value) = cond.client_id {
        builder.and_where_eq("client_id", quote(value));
    }
    if let Some(value) = cond.owner_id {
        builder.and_where_eq("owner_id", quote(value));
    }
    if let Some(value) = cond.is_active {
        builder.and_where_eq("is_active", value as i64);
    }
    builder
}

/// Transforms list query conditions to the SQL builder.
fn build_list_where<'a>(
    builder: &'a mut SqlBuilder,
    cond: &ListQueryCond<'a>,
) -> &'a mut SqlBuilder {
    if let Some(value) = cond.owner_id {
        builder.and_where_eq("owner_id", quote(value));
    }
    builder
}

/// Transforms query conditions and the model object to the SQL builder.
fn build_update_where<'a>(
    builder: &'a mut SqlBuilder,
    cond: &UpdateQueryCond<'a>,
    updates: &Updates,
) -> Option<&'a mut SqlBuilder> {
    let mut count = 0;
    if let Some(value) = updates.modified_at.as_ref() {
        builder.set("modified_at", value.timestamp_millis());
        count += 1;
    }
    if let Some(value) = updates.name {
        builder.set("name", quote(value));
        count += 1;
    }
    if let Some(value) = updates.description {
        match value {
            None => builder.set("description", "NULL"),
            Some(value) => builder.set("description", quote(value)),
        };
        count += 1;
    }
    if let Some(value) = updates.redirect_uris {
        builder.set("redirect_uris", quote(value.join(" ")));
        count += 1;
    }
    if let Some(value) = updates.scopes {
        builder.set("scopes", quote(value.join(" ")));
        count += 1;
    }
    if let Some(value) = updates.is_active {
        builder.set("is_active", value as i64);
        count += 1;
    }
    if count == 0 {
        return None;
    }

    builder.and_where_eq("client_id", quote(cond.client_id));
    builder.and_where_eq("owner_id", quote(cond.owner_id));
    Some(builder)
}

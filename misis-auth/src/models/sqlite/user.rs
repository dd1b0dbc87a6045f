use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use sql_builder::{SqlBuilder, quote};
use sqlx::SqlitePool;

use super::{
    super::user::{ListOptions, ListQueryCond, Profile, QueryCond, Updates, User, UserModel},
    build_limit_offset,
};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<SqlitePool>,
}

/// SQLite schema.
#[derive(sqlx::FromRow)]
struct Schema {
    user_id: String,
    login: String,
    email: String,
    password: Option<String>,
    /// JSON string of [`Profile`].
    profile: Option<String>,
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

const TABLE_NAME: &'static str = "user";
const FIELDS: &'static [&'static str] = &[
    "user_id",
    "login",
    "email",
    "password",
    "profile",
    "is_active",
    "created_at",
    "modified_at",
];
const TABLE_INIT_SQL: &'static str = "\
    CREATE TABLE IF NOT EXISTS user (\
    user_id TEXT NOT NULL UNIQUE,\
    login TEXT NOT NULL UNIQUE,\
    email TEXT NOT NULL,\
    password TEXT,\
    profile TEXT,\
    is_active INTEGER NOT NULL DEFAULT 1,\
    created_at INTEGER NOT NULL,\
    modified_at INTEGER NOT NULL,\
    PRIMARY KEY (user_id))";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<SqlitePool>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl UserModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let _ = sqlx::query(TABLE_INIT_SQL)
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

    async fn list(&self, opts: &ListOptions) -> Result<Vec<User>, Box<dyn StdError>> {
        let mut builder = SqlBuilder::select_from(TABLE_NAME);
        builder.fields(FIELDS).order_by("created_at", false);
        build_limit_offset(&mut builder, opts.offset, opts.limit);
        let sql = build_list_where(&mut builder, opts.cond).sql()?;

        let mut rows = sqlx::query_as::<_, Schema>(sql.as_str()).fetch(self.conn.as_ref());
        let mut list = vec![];
        while let Some(row) = rows.try_next().await? {
            list.push(to_user(row)?);
        }
        Ok(list)
    }

    async fn get(&self, cond: &QueryCond) -> Result<Option<User>, Box<dyn StdError>> {
        let sql = build_where(SqlBuilder::select_from(TABLE_NAME).fields(FIELDS), cond).sql()?;

        let row: Schema = match sqlx::query_as(sql.as_str())
            .fetch_one(self.conn.as_ref())
            .await
        {
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(e) => return Err(Box::new(e)),
            Ok(row) => row,
        };
        Ok(Some(to_user(row)?))
    }

    async fn add(&self, user: &User) -> Result<(), Box<dyn StdError>> {
        let password = match user.password.as_deref() {
            None => "NULL".to_string(),
            Some(value) => quote(value),
        };
        let profile = match user.profile.as_ref() {
            None => "NULL".to_string(),
            Some(value) => quote(serde_json::to_string(value)?),
        };
        let values = vec![
            quote(user.user_id.as_str()),
            quote(user.login.as_str()),
            quote(user.email.as_str()),
            password,
            profile,
            match user.is_active {
                false => "0".to_string(),
                true => "1".to_string(),
            },
            user.created_at.timestamp_millis().to_string(),
            user.modified_at.timestamp_millis().to_string(),
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

    async fn update(&self, user_id: &str, updates: &Updates) -> Result<(), Box<dyn StdError>> {
        let mut builder = SqlBuilder::update_table(TABLE_NAME);
        let mut count = 0;
        if let Some(value) = updates.modified_at.as_ref() {
            builder.set("modified_at", value.timestamp_millis());
            count += 1;
        }
        if let Some(value) = updates.email {
            builder.set("email", quote(value));
            count += 1;
        }
        if let Some(value) = updates.password {
            builder.set("password", quote(value));
            count += 1;
        }
        if let Some(value) = updates.profile {
            builder.set("profile", quote(serde_json::to_string(value)?));
            count += 1;
        }
        if let Some(value) = updates.is_active {
            builder.set("is_active", value as i64);
            count += 1;
        }
        if count == 0 {
            return Ok(());
        }
        let sql = builder.and_where_eq("user_id", quote(user_id)).sql()?;
        let _ = sqlx::query(sql.as_str())
            .execute(self.conn.as_ref())
            .await?;
        Ok(())
    }
}

fn to_user(row: Schema) -> Result<User, Box<dyn StdError>> {
    let profile = match row.profile.as_deref() {
        None => None,
        Some(value) => Some(serde_json::from_str::<Profile>(value)?),
    };
    Ok(User {
        user_id: row.user_id,
        login: row.login,
        email: row.email,
        password: row.password,
        profile,
        is_active: row.is_active != 0,
        created_at: Utc.timestamp_nanos(row.created_at * 1000000),
        modified_at: Utc.timestamp_nanos(row.modified_at * 1000000),
    })
}

/// Transforms query conditions to the SQL builder.
fn build_where<'a>(builder: &'a mut SqlBuilder, cond: &QueryCond<'a>) -> &'a mut SqlBuilder {
    if let Some(value) = cond.user_id {
        builder.and_where_eq("user_id", quote(value));
    }
    if let Some(value) = cond.login {
        builder.and_where_eq("login", quote(value));
    }
    builder
}

/// Transforms list query conditions to the SQL builder.
fn build_list_where<'a>(builder: &'a mut SqlBuilder, cond: &ListQueryCond) -> &'a mut SqlBuilder {
    if let Some(value) = cond.has_password {
        match value {
            false => builder.and_where_is_null("password"),
            true => builder.and_where_is_not_null("password"),
        };
    }
    if let Some(value) = cond.is_active {
        builder.and_where_eq("is_active", value as i64);
    }
    builder
}

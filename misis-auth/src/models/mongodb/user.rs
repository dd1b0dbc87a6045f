use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Database,
    bson::{self, DateTime, Document, doc},
};
use serde::{Deserialize, Serialize};

use super::super::user::{
    ListOptions, ListQueryCond, Profile, QueryCond, Updates, User, UserModel,
};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<Database>,
}

/// MongoDB schema.
#[derive(Deserialize, Serialize)]
struct Schema {
    #[serde(rename = "userId")]
    user_id: String,
    login: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<Profile>,
    #[serde(rename = "isActive")]
    is_active: bool,
    #[serde(rename = "createdAt")]
    created_at: DateTime,
    #[serde(rename = "modifiedAt")]
    modified_at: DateTime,
}

const COL_NAME: &'static str = "user";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<Database>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl UserModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let indexes = vec![
            doc! {"name": "userId_1", "key": {"userId": 1}, "unique": true},
            doc! {"name": "login_1", "key": {"login": 1}, "unique": true},
            doc! {"name": "createdAt_1", "key": {"createdAt": 1}},
        ];
        let command = doc! {
            "createIndexes": COL_NAME,
            "indexes": indexes,
        };
        self.conn.run_command(command).await?;
        Ok(())
    }

    async fn count(&self, cond: &ListQueryCond) -> Result<u64, Box<dyn StdError>> {
        let filter = get_list_query_filter(cond);
        let count = self
            .conn
            .collection::<Document>(COL_NAME)
            .count_documents(filter)
            .await?;
        Ok(count)
    }

    async fn list(&self, opts: &ListOptions) -> Result<Vec<User>, Box<dyn StdError>> {
        let filter = get_list_query_filter(opts.cond);
        let collection = self.conn.collection::<Schema>(COL_NAME);
        let mut action = collection.find(filter).sort(doc! {"createdAt": 1});
        if let Some(offset) = opts.offset {
            action = action.skip(offset);
        }
        if let Some(limit) = opts.limit {
            if limit > 0 {
                action = action.limit(limit as i64);
            }
        }
        let mut cursor = action.await?;

        let mut list = vec![];
        while let Some(item) = cursor.try_next().await? {
            list.push(to_user(item));
        }
        Ok(list)
    }

    async fn get(&self, cond: &QueryCond) -> Result<Option<User>, Box<dyn StdError>> {
        let filter = get_query_filter(cond);
        let mut cursor = self
            .conn
            .collection::<Schema>(COL_NAME)
            .find(filter)
            .await?;
        if let Some(item) = cursor.try_next().await? {
            return Ok(Some(to_user(item)));
        }
        Ok(None)
    }

    async fn add(&self, user: &User) -> Result<(), Box<dyn StdError>> {
        let item = Schema {
            user_id: user.user_id.clone(),
            login: user.login.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            profile: user.profile.clone(),
            is_active: user.is_active,
            created_at: user.created_at.into(),
            modified_at: user.modified_at.into(),
        };
        self.conn
            .collection::<Schema>(COL_NAME)
            .insert_one(item)
            .await?;
        Ok(())
    }

    async fn update(&self, user_id: &str, updates: &Updates) -> Result<(), Box<dyn StdError>> {
        let update = match get_update_doc(updates)? {
            None => return Ok(()),
            Some(update) => update,
        };
        self.conn
            .collection::<Schema>(COL_NAME)
            .update_one(doc! {"userId": user_id}, update)
            .await?;
        Ok(())
    }
}

fn to_user(item: Schema) -> User {
    User {
        user_id: item.user_id,
        login: item.login,
        email: item.email,
        password: item.password,
        profile: item.profile,
        is_active: item.is_active,
        created_at: item.created_at.into(),
        modified_at: item.modified_at.into(),
    }
}

/// Transforms query conditions to the MongoDB document.
fn get_query_filter(cond: &QueryCond) -> Document {
    let mut filter = Document::new();
    if let Some(value) = cond.user_id {
        filter.insert("userId", value);
    }
    if let Some(value) = cond.login {
        filter.insert("login", value);
    }
    filter
}

/// Transforms list query conditions to the MongoDB document.
fn get_list_query_filter(cond: &ListQueryCond) -> Document {
    let mut filter = Document::new();
    if let Some(value) = cond.has_password {
        match value {
            false => filter.insert("password", doc! {"$exists": false}),
            true => filter.insert("password", doc! {"$exists": true}),
        };
    }
    if let Some(value) = cond.is_active {
        filter.insert("isActive", value);
    }
    filter
}

/// Transforms the model object to the MongoDB document.
fn get_update_doc(updates: &Updates) -> Result<Option<Document>, Box<dyn StdError>> {
    let mut count = 0;
    let mut document = Document::new();
    if let Some(value) = updates.modified_at.as_ref() {
        document.insert("modifiedAt", DateTime::from_chrono(*value));
        count += 1;
    }
    if let Some(value) = updates.email {
        document.insert("email", value);
        count += 1;
    }
    if let Some(value) = updates.password {
        document.insert("password", value);
        count += 1;
    }
    if let Some(value) = updates.profile {
        document.insert("profile", bson::to_bson(value)?);
        count += 1;
    }
    if let Some(value) = updates.is_active {
        document.insert("isActive", value);
        count += 1;
    }
    if count == 0 {
        return Ok(None);
    }
    Ok(Some(doc! {"$set": document}))
}

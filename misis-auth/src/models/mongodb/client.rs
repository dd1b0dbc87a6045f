use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Database,
    bson::{Bson, DateTime, Document, doc},
};
use serde::{Deserialize, Serialize};

use super::super::client::{
    Client, ClientModel, ListOptions, ListQueryCond, QueryCond, UpdateQueryCond, Updates,
};

/// Model instance.
pub struct Model {
    /// The associated database connection.
    conn: Arc<Database>,
}

/// MongoDB schema.
#[derive(Deserialize, Serialize)]
struct Schema {
    #[serde(rename = "clientId")]
    client_id: String,
    #[serde(rename = "clientSecret")]
    client_secret: String,
    name: String,
    description: Option<String>,
    #[serde(rename = "redirectUris")]
    redirect_uris: Vec<String>,
    scopes: Vec<String>,
    #[serde(rename = "ownerId")]
    owner_id: String,
    #[serde(rename = "isActive")]
    is_active: bool,
    #[serde(rename = "createdAt")]
    created_at: DateTime,
    #[serde(rename = "modifiedAt")]
    modified_at: DateTime,
}

const COL_NAME: &'static str = "client";

impl Model {
    /// To create the model instance with a database connection.
    pub async fn new(conn: Arc<Database>) -> Result<Self, Box<dyn StdError>> {
        let model = Model { conn };
        model.init().await?;
        Ok(model)
    }
}

#[async_trait]
impl ClientModel for Model {
    async fn init(&self) -> Result<(), Box<dyn StdError>> {
        let indexes = vec![
            doc! {"name": "clientId_1", "key": {"clientId": 1}, "unique": true},
            doc! {"name": "ownerId_1", "key": {"ownerId": 1}},
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

    async fn list(&self, opts: &ListOptions) -> Result<Vec<Client>, Box<dyn StdError>> {
        let filter = get_list_query_filter(opts.cond);
        let collection = self.conn.collection::<Schema>(COL_NAME);
        let mut action = collection.find(filter).sort(doc! {"createdAt": -1});
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
            list.push(to_client(item));
        }
        Ok(list)
    }

    async fn get(&self, cond: &QueryCond) -> Result<Option<Client>, Box<dyn StdError>> {
        let filter = get_query_filter(cond);
        let mut cursor = self
            .conn
            .collection::<Schema>(COL_NAME)
            .find(filter)
            .await?;
        if let Some(item) = cursor.try_next().await? {
            return Ok(Some(to_client(item)));
        }
        Ok(None)
    }

    async fn add(&self, client: &Client) -> Result<(), Box<dyn StdError>> {
        let item = Schema {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            name: client.name.clone(),
            description: client.description.clone(),
            redirect_uris: client.redirect_uris.clone(),
            scopes: client.scopes.clone(),
            owner_id: client.owner_id.clone(),
            is_active: client.is_active,
            created_at: client.created_at.into(),
            modified_at: client.modified_at.into(),
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

    async fn update(
        &self,
        cond: &UpdateQueryCond,
        updates: &Updates,
    ) -> Result<(), Box<dyn StdError>> {
        let update = match get_update_doc(updates) {
            None => return Ok(()),
            Some(update) => update,
        };
        let filter = doc! {"clientId": cond.client_id, "ownerId": cond.owner_id};
        self.conn
            .collection::<Schema>(COL_NAME)
            .update_one(filter, update)
            .await?;
        Ok(())
    }
}

fn to_client(item: Schema) -> Client {
    Client {
        client_id: item.client_id,
        client_secret: item.client_secret,
        name: item.name,
        description: item.description,
        redirect_uris: item.redirect_uris,
        scopes: item.scopes,
        owner_id: item.owner_id,
        is_active: item.is_active,
        created_at: item.created_at.into(),
        modified_at: item.modified_at.into(),
    }
}

/// Transforms query conditions to the MongoDB document.
fn get_query_filter(cond: &QueryCond) -> Document {
    let mut filter = Document::new();
    if let Some(value) = cond.client_id {
        filter.insert("clientId", value);
    }
    if let Some(value) = cond.owner_id {
        filter.insert("ownerId", value);
    }
    if let Some(value) = cond.is_active {
        filter.insert("isActive", value);
    }
    filter
}

/// Transforms list query conditions to the MongoDB document.
fn get_list_query_filter(cond: &ListQueryCond) -> Document {
    let mut filter = Document::new();
    if let Some(value) = cond.owner_id {
        filter.insert("ownerId", value);
    }
    filter
}

/// Transforms the model object to the MongoDB document.
fn get_update_doc(updates: &Updates) -> Option<Document> {
    let mut count = 0;
    let mut document = Document::new();
    if let Some(value) = updates.modified_at.as_ref() {
        document.insert("modifiedAt", DateTime::from_chrono(*value));
        count += 1;
    }
    if let Some(value) = updates.name {
        document.insert("name", value);
        count += 1;
    }
    if let Some(value) = updates.description {
        match value {
            None => document.insert("description", Bson::Null),
            Some(value) => document.insert("description", value),
        };
        count += 1;
    }
    if let Some(value) = updates.redirect_uris {
        document.insert("redirectUris", value);
        count += 1;
    }
    if let Some(value) = updates.scopes {
        document.insert("scopes", value);
        count += 1;
    }
    if let Some(value) = updates.is_active {
        document.insert("isActive", value);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(doc! {"$set": document})
}

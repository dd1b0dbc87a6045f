//! Traits and structs for client applications.

use std::error::Error as StdError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The item content.
#[derive(Clone, Debug, PartialEq)]
pub struct Client {
    /// Generated at creation, globally unique and never regenerated.
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub description: Option<String>,
    /// Exact-match redirect URIs.
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    /// The owner user ID.
    pub owner_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// The query condition to get item(s).
#[derive(Default)]
pub struct QueryCond<'a> {
    pub client_id: Option<&'a str>,
    pub owner_id: Option<&'a str>,
    pub is_active: Option<bool>,
}

/// The query condition for the list operation.
#[derive(Default)]
pub struct ListQueryCond<'a> {
    pub owner_id: Option<&'a str>,
}

/// List options. Items are sorted by creation time descending.
pub struct ListOptions<'a> {
    pub cond: &'a ListQueryCond<'a>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// The query condition for the update operation.
#[derive(Default)]
pub struct UpdateQueryCond<'a> {
    pub client_id: &'a str,
    pub owner_id: &'a str,
}

/// The changes to be updated.
#[derive(Default)]
pub struct Updates<'a> {
    pub modified_at: Option<DateTime<Utc>>,
    pub name: Option<&'a str>,
    /// `Some(None)` to clear the description.
    pub description: Option<Option<&'a str>>,
    pub redirect_uris: Option<&'a Vec<String>>,
    pub scopes: Option<&'a Vec<String>>,
    pub is_active: Option<bool>,
}

/// Model operations.
#[async_trait]
pub trait ClientModel: Sync {
    /// To create and initialize the table/collection.
    async fn init(&self) -> Result<(), Box<dyn StdError>>;

    /// To get item count for the query condition.
    async fn count(&self, cond: &ListQueryCond) -> Result<u64, Box<dyn StdError>>;

    /// To get item list.
    async fn list(&self, opts: &ListOptions) -> Result<Vec<Client>, Box<dyn StdError>>;

    /// To get an item.
    async fn get(&self, cond: &QueryCond) -> Result<Option<Client>, Box<dyn StdError>>;

    /// To add an item.
    async fn add(&self, client: &Client) -> Result<(), Box<dyn StdError>>;

    /// To delete one or more items.
    async fn del(&self, cond: &QueryCond) -> Result<(), Box<dyn StdError>>;

    /// To update one or more items.
    async fn update(
        &self,
        cond: &UpdateQueryCond,
        updates: &Updates,
    ) -> Result<(), Box<dyn StdError>>;
}

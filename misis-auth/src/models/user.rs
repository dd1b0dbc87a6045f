//! Traits and structs for users bound to upstream accounts.

use std::error::Error as StdError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The item content.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub user_id: String,
    /// The upstream login handle. Unique and immutable.
    pub login: String,
    pub email: String,
    /// The stored upstream password for silent profile refresh.
    pub password: Option<String>,
    /// The last profile snapshot fetched from the upstream portal.
    pub profile: Option<Profile>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// The normalized profile of the upstream portal.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub full_name: Option<String>,
    pub record_book_number: Option<String>,
    pub study_form: Option<String>,
    pub preparation_level: Option<String>,
    pub specialization: Option<String>,
    pub specialty: Option<String>,
    pub faculty: Option<String>,
    pub course: Option<String>,
    pub group: Option<String>,
    pub financing_form: Option<String>,
    pub dormitory: Option<String>,
    pub end_date: Option<String>,
    pub personal_email: Option<String>,
    pub personal_phone: Option<String>,
    pub corporate_email: Option<String>,
}

/// The query condition to get item(s).
#[derive(Default)]
pub struct QueryCond<'a> {
    pub user_id: Option<&'a str>,
    pub login: Option<&'a str>,
}

/// The query condition for the list operation.
#[derive(Default)]
pub struct ListQueryCond {
    /// To get users with (or without) stored passwords.
    pub has_password: Option<bool>,
    pub is_active: Option<bool>,
}

/// List options. Items are sorted by creation time ascending.
pub struct ListOptions<'a> {
    pub cond: &'a ListQueryCond,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// The changes to be updated.
#[derive(Default)]
pub struct Updates<'a> {
    pub modified_at: Option<DateTime<Utc>>,
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
    pub profile: Option<&'a Profile>,
    pub is_active: Option<bool>,
}

/// Model operations.
#[async_trait]
pub trait UserModel: Sync {
    /// To create and initialize the table/collection.
    async fn init(&self) -> Result<(), Box<dyn StdError>>;

    /// To get item count for the query condition.
    async fn count(&self, cond: &ListQueryCond) -> Result<u64, Box<dyn StdError>>;

    /// To get item list.
    async fn list(&self, opts: &ListOptions) -> Result<Vec<User>, Box<dyn StdError>>;

    /// To get an item.
    async fn get(&self, cond: &QueryCond) -> Result<Option<User>, Box<dyn StdError>>;

    /// To add an item.
    async fn add(&self, user: &User) -> Result<(), Box<dyn StdError>>;

    /// To update one item.
    async fn update(&self, user_id: &str, updates: &Updates) -> Result<(), Box<dyn StdError>>;
}

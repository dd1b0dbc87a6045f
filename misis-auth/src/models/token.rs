//! Traits and structs for access/refresh token pairs.

use std::error::Error as StdError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The persisted record of a token pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiration time of the access token.
    pub expires_at: DateTime<Utc>,
    /// Expiration time of the refresh token.
    pub refresh_expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub client_id: String,
    pub user_id: String,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// The query condition to get item(s).
#[derive(Default)]
pub struct QueryCond<'a> {
    pub access_token: Option<&'a str>,
    pub refresh_token: Option<&'a str>,
    pub client_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

/// The condition of the refresh update.
pub struct RefreshCond<'a> {
    pub refresh_token: &'a str,
    pub client_id: &'a str,
    pub now: DateTime<Utc>,
}

/// The new access token of the refresh update.
pub struct RefreshUpdates<'a> {
    pub access_token: &'a str,
    pub expires_at: DateTime<Utc>,
}

/// Model operations.
#[async_trait]
pub trait TokenModel: Sync {
    /// To create and initialize the table/collection.
    async fn init(&self) -> Result<(), Box<dyn StdError>>;

    /// To get an item.
    async fn get(&self, cond: &QueryCond) -> Result<Option<Token>, Box<dyn StdError>>;

    /// To add an item.
    async fn add(&self, token: &Token) -> Result<(), Box<dyn StdError>>;

    /// To replace the access token of a non-revoked and unexpired record in one conditional
    /// update. Returns `false` if no record matches.
    async fn refresh(
        &self,
        cond: &RefreshCond,
        updates: &RefreshUpdates,
    ) -> Result<bool, Box<dyn StdError>>;

    /// To flip the revoked flag of matched records. Returns the number of affected records.
    async fn revoke(&self, cond: &QueryCond) -> Result<u64, Box<dyn StdError>>;

    /// To delete items that `refresh_expires_at` is before the specified time.
    async fn del_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>>;
}

/// The expiration time of the access token in seconds.
pub const ACCESS_EXPIRES: i64 = 3600;
/// The expiration time of the refresh token in seconds.
pub const REFRESH_EXPIRES: i64 = 30 * 86400;

//! Traits and structs for authorization codes.

use std::error::Error as StdError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The item content.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationCode {
    pub code: String,
    pub user_id: String,
    pub client_id: String,
    /// The redirect URI bound at issuance.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    /// Transitions from `false` to `true` exactly once.
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// The query condition to get item(s).
#[derive(Default)]
pub struct QueryCond<'a> {
    pub code: Option<&'a str>,
    pub client_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

/// The condition to consume (mark used) a code.
pub struct ConsumeCond<'a> {
    pub code: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub now: DateTime<Utc>,
}

/// Model operations.
#[async_trait]
pub trait AuthorizationCodeModel: Sync {
    /// To create and initialize the table/collection.
    async fn init(&self) -> Result<(), Box<dyn StdError>>;

    /// To get an item.
    async fn get(&self, code: &str) -> Result<Option<AuthorizationCode>, Box<dyn StdError>>;

    /// To add an item.
    async fn add(&self, code: &AuthorizationCode) -> Result<(), Box<dyn StdError>>;

    /// To delete one or more items.
    async fn del(&self, cond: &QueryCond) -> Result<(), Box<dyn StdError>>;

    /// To mark a code as used with one conditional update. The code must be unused, unexpired
    /// and match the client and the redirect URI.
    ///
    /// Returns `true` only for the caller that performed the transition.
    async fn consume(&self, cond: &ConsumeCond) -> Result<bool, Box<dyn StdError>>;

    /// To delete items that `expires_at` is before the specified time.
    async fn del_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>>;
}

/// The expiration time of the authorization code in seconds.
pub const EXPIRES: i64 = 600;

//! Traits and implementations for accessing databases.
//!
//! Currently we provide pure MongoDB and pure SQLite implementations. Handlers only depend on the
//! [`Model`] trait so the persistence technology can be switched by configuration.

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod authorization_code;
pub mod client;
pub mod login_session;
pub mod token;
pub mod user;

mod model_mongodb;
mod model_sqlite;
mod mongodb;
mod sqlite;

pub use self::{
    mongodb::conn::{self as mongodb_conn, Options as MongoDbOptions},
    sqlite::conn::{self as sqlite_conn, Options as SqliteOptions},
};
pub use model_mongodb::Model as MongoDbModel;
pub use model_sqlite::Model as SqliteModel;

/// Database connection options for model implementation.
pub enum ConnOptions {
    /// Pure MongoDB model implementation.
    MongoDB(MongoDbOptions),
    /// Pure SQLite model implementation.
    Sqlite(SqliteOptions),
}

/// The top level trait to get all models (tables/collections).
#[async_trait]
pub trait Model: Send + Sync {
    /// Close database connection.
    async fn close(&self) -> Result<(), Box<dyn StdError>>;

    /// To get the user model.
    fn user(&self) -> &dyn user::UserModel;

    /// To get the client model.
    fn client(&self) -> &dyn client::ClientModel;

    /// To get the login session model.
    fn login_session(&self) -> &dyn login_session::LoginSessionModel;

    /// To get the authorization code model.
    fn authorization_code(&self) -> &dyn authorization_code::AuthorizationCodeModel;

    /// To get the access/refresh token model.
    fn token(&self) -> &dyn token::TokenModel;

    /// To physically remove codes, tokens and login sessions that expired before `now`.
    ///
    /// The service calls this periodically because SQLite has no TTL support.
    async fn purge_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>>;
}

/// To create the database model with the specified database implementation.
pub async fn new(opts: &ConnOptions) -> Result<Arc<dyn Model>, Box<dyn StdError>> {
    let model: Arc<dyn Model> = match opts {
        ConnOptions::MongoDB(opts) => Arc::new(MongoDbModel::new(opts).await?),
        ConnOptions::Sqlite(opts) => Arc::new(SqliteModel::new(opts).await?),
    };
    model.user().init().await?;
    model.client().init().await?;
    model.login_session().init().await?;
    model.authorization_code().init().await?;
    model.token().init().await?;
    Ok(model)
}

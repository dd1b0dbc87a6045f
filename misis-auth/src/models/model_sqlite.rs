//! Pure SQLite model.

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sql_builder::SqlBuilder;
use sqlx::SqlitePool;

use super::{
    authorization_code, client, login_session,
    sqlite::{
        authorization_code::Model as AuthorizationCodeModel,
        client::Model as ClientModel,
        conn::{self, Options},
        login_session::Model as LoginSessionModel,
        token::Model as TokenModel,
        user::Model as UserModel,
    },
    token, user,
};

/// Expirable tables and their expiry columns.
const EXPIRABLE: [(&'static str, &'static str); 3] = [
    ("authorization_code", "expires_at"),
    ("token", "refresh_expires_at"),
    ("login_session", "expires_at"),
];

/// Pure SQLite model.
#[derive(Clone)]
pub struct Model {
    conn: Arc<SqlitePool>,
    user: Arc<UserModel>,
    client: Arc<ClientModel>,
    login_session: Arc<LoginSessionModel>,
    authorization_code: Arc<AuthorizationCodeModel>,
    token: Arc<TokenModel>,
}

impl Model {
    /// Create an instance.
    pub async fn new(opts: &Options) -> Result<Self, Box<dyn StdError>> {
        let conn = Arc::new(conn::connect(opts).await?);
        Ok(Model {
            conn: conn.clone(),
            user: Arc::new(UserModel::new(conn.clone()).await?),
            client: Arc::new(ClientModel::new(conn.clone()).await?),
            login_session: Arc::new(LoginSessionModel::new(conn.clone()).await?),
            authorization_code: Arc::new(AuthorizationCodeModel::new(conn.clone()).await?),
            token: Arc::new(TokenModel::new(conn.clone()).await?),
        })
    }

    /// Get the raw database connection ([`SqlitePool`]).
    pub fn get_connection(&self) -> &SqlitePool {
        &self.conn
    }
}

#[async_trait]
impl super::Model for Model {
    async fn close(&self) -> Result<(), Box<dyn StdError>> {
        self.conn.close().await;
        Ok(())
    }

    fn user(&self) -> &dyn user::UserModel {
        self.user.as_ref()
    }

    fn client(&self) -> &dyn client::ClientModel {
        self.client.as_ref()
    }

    fn login_session(&self) -> &dyn login_session::LoginSessionModel {
        self.login_session.as_ref()
    }

    fn authorization_code(&self) -> &dyn authorization_code::AuthorizationCodeModel {
        self.authorization_code.as_ref()
    }

    fn token(&self) -> &dyn token::TokenModel {
        self.token.as_ref()
    }

    async fn purge_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>> {
        let mut tx = self.conn.begin().await?;
        for (table, field) in EXPIRABLE {
            let sql = SqlBuilder::delete_from(table)
                .and_where_lt(field, now.timestamp_millis())
                .sql()?;
            let _ = sqlx::query(sql.as_str()).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

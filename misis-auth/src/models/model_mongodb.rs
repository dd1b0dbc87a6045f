//! Pure MongoDB model.

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::Database;

use super::{
    Model as _, authorization_code, client, login_session,
    mongodb::{
        authorization_code::Model as AuthorizationCodeModel,
        client::Model as ClientModel,
        conn::{self, Options},
        login_session::Model as LoginSessionModel,
        token::Model as TokenModel,
        user::Model as UserModel,
    },
    token, user,
};

/// Pure MongoDB model.
#[derive(Clone)]
pub struct Model {
    conn: Arc<Database>,
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

    /// Get the raw database connection ([`Database`]).
    pub fn get_connection(&self) -> &Database {
        &self.conn
    }
}

#[async_trait]
impl super::Model for Model {
    async fn close(&self) -> Result<(), Box<dyn StdError>> {
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

    /// TTL indexes remove expired documents within about a minute. This removes them at once.
    async fn purge_expired(&self, now: &DateTime<Utc>) -> Result<(), Box<dyn StdError>> {
        self.authorization_code().del_expired(now).await?;
        self.token().del_expired(now).await?;
        self.login_session().del_expired(now).await
    }
}

//! Credential bridging between the sign-in page and upstream accounts.
//!
//! A login is accepted from the locally stored credential when it matches. Otherwise the upstream
//! portal is asked and the local user record is created or refreshed from the fetched profile.

use std::{error::Error as StdError, fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::time;

use misis_corelib::strings;

use super::misis::MisisClient;
use crate::models::{
    Model,
    user::{ListOptions, ListQueryCond, QueryCond, Updates, User},
};

/// The bridge of one service instance.
#[derive(Clone)]
pub struct Bridge {
    model: Arc<dyn Model>,
    misis: MisisClient,
    /// Delay between users of a batch refresh.
    delay: Duration,
}

/// Login failures. Every upstream failure is reported as [`LoginError::Rejected`].
#[derive(Debug)]
pub enum LoginError {
    Rejected,
    Db(String),
}

/// Summary of a batch refresh.
pub struct BatchReport {
    pub total_users: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<BatchResult>,
}

/// Per-user result of a batch refresh.
pub struct BatchResult {
    pub user_id: String,
    pub login: String,
    /// `None` for success.
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

const ID_RAND_LEN: usize = 8;
const DEF_EMAIL_DOMAIN: &'static str = "misis.ru";

impl Bridge {
    pub fn new(model: Arc<dyn Model>, misis: MisisClient, delay: Duration) -> Self {
        Bridge {
            model,
            misis,
            delay,
        }
    }

    /// To authenticate a sign-in attempt and return the local identity.
    pub async fn login(&self, login: &str, password: &str) -> Result<User, LoginError> {
        const FN_NAME: &'static str = "login";

        let login = login.trim();
        if !strings::is_login(login) || password.len() == 0 {
            return Err(LoginError::Rejected);
        }

        let cond = QueryCond {
            login: Some(login),
            ..Default::default()
        };
        let user = match self.model.user().get(&cond).await {
            Err(e) => {
                error!("[{}] get user error: {}", FN_NAME, e);
                return Err(LoginError::Db(e.to_string()));
            }
            Ok(user) => user,
        };
        if let Some(user) = user.as_ref() {
            if !user.is_active {
                warn!("[{}] inactive user {} rejected", FN_NAME, user.user_id);
                return Err(LoginError::Rejected);
            }
            if let Some(stored) = user.password.as_ref() {
                if strings::secure_eq(stored.as_str(), password) {
                    return Ok(user.clone());
                }
            }
        }

        let profile = match self.misis.get_student_info(login, password).await {
            Err(e) => {
                warn!("[{}] upstream login {} failed: {}", FN_NAME, login, e);
                return Err(LoginError::Rejected);
            }
            Ok(profile) => profile,
        };

        let now = Utc::now();
        match user {
            Some(mut user) => {
                let updates = Updates {
                    modified_at: Some(now),
                    password: Some(password),
                    profile: Some(&profile),
                    ..Default::default()
                };
                if let Err(e) = self.model.user().update(user.user_id.as_str(), &updates).await {
                    error!("[{}] update user error: {}", FN_NAME, e);
                    return Err(LoginError::Db(e.to_string()));
                }
                user.modified_at = now;
                user.password = Some(password.to_string());
                user.profile = Some(profile);
                Ok(user)
            }
            None => {
                let email = match profile.personal_email.as_ref() {
                    Some(email) if email.contains('@') => email.to_lowercase(),
                    _ => format!("{}@{}", login, DEF_EMAIL_DOMAIN).to_lowercase(),
                };
                let user = User {
                    user_id: strings::random_id(&now, ID_RAND_LEN),
                    login: login.to_string(),
                    email,
                    password: Some(password.to_string()),
                    profile: Some(profile),
                    is_active: true,
                    created_at: now,
                    modified_at: now,
                };
                if let Err(e) = self.model.user().add(&user).await {
                    error!("[{}] add user error: {}", FN_NAME, e);
                    return Err(LoginError::Db(e.to_string()));
                }
                info!("[{}] user {} created for login {}", FN_NAME, user.user_id, login);
                Ok(user)
            }
        }
    }

    /// To refresh profiles of all active users that have a stored credential.
    ///
    /// Users are processed sequentially with the configured delay between them. A failure of one
    /// user does not stop the batch.
    pub async fn refresh_all(&self) -> Result<BatchReport, Box<dyn StdError>> {
        const FN_NAME: &'static str = "refresh_all";

        let cond = ListQueryCond {
            has_password: Some(true),
            is_active: Some(true),
        };
        let opts = ListOptions {
            cond: &cond,
            offset: None,
            limit: None,
        };
        let users = self.model.user().list(&opts).await?;

        let mut report = BatchReport {
            total_users: users.len(),
            success_count: 0,
            error_count: 0,
            results: vec![],
        };
        for (i, user) in users.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            let error = match self.refresh_user(user).await {
                Err(e) => {
                    warn!("[{}] refresh user {} error: {}", FN_NAME, user.user_id, e);
                    report.error_count += 1;
                    Some(e.to_string())
                }
                Ok(_) => {
                    report.success_count += 1;
                    None
                }
            };
            report.results.push(BatchResult {
                user_id: user.user_id.clone(),
                login: user.login.clone(),
                error,
                updated_at: Utc::now(),
            });
        }
        info!(
            "[{}] done: {} users, {} success, {} error",
            FN_NAME, report.total_users, report.success_count, report.error_count
        );
        Ok(report)
    }

    async fn refresh_user(&self, user: &User) -> Result<(), Box<dyn StdError>> {
        let password = match user.password.as_ref() {
            None => return Err(Box::new(LoginError::Rejected)),
            Some(password) => password,
        };
        let profile = self
            .misis
            .get_student_info(user.login.as_str(), password.as_str())
            .await?;
        let updates = Updates {
            modified_at: Some(Utc::now()),
            profile: Some(&profile),
            ..Default::default()
        };
        self.model
            .user()
            .update(user.user_id.as_str(), &updates)
            .await
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::Rejected => write!(f, "invalid login or password"),
            LoginError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl StdError for LoginError {}

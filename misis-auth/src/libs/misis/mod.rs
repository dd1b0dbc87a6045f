//! Client of the MISIS personal portal (`lk.misis.ru`).
//!
//! The portal has no API. Authentication replays the sign-in form and the profile is scraped from
//! HTML. Every authentication attempt builds its own HTTP client so that cookie jars are never
//! shared between users.

use std::{error::Error as StdError, fmt, time::Duration};

use log::warn;
use reqwest::{
    Client, StatusCode,
    header::{self, HeaderMap, HeaderValue},
    redirect::Policy,
};

use crate::models::user::Profile;

mod parser;

pub use parser::{parse_csrf_token, parse_profile};

/// Options of the upstream client.
#[derive(Clone)]
pub struct Options {
    /// Base URL such as `https://lk.misis.ru`.
    pub base_url: String,
    pub timeout: Duration,
}

/// Upstream client. Holds configuration only; no session state is kept here.
#[derive(Clone)]
pub struct MisisClient {
    base_url: String,
    timeout: Duration,
}

/// An authenticated upstream session. Owns the cookie jar of one sign-in.
pub struct Session {
    client: Client,
    /// The session identifier embedded in the post-login redirect path.
    api_id: String,
}

/// Upstream failures.
#[derive(Debug)]
pub enum MisisError {
    Network(String),
    Timeout,
    /// Unexpected HTTP status.
    Status(u16),
    CsrfNotFound,
    InvalidCredentials,
    SessionExpired,
    ProfileUnavailable,
}

const SIGN_IN_PATH: &'static str = "/ru/users/sign_in";
const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &'static str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &'static str = "ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3";

impl Session {
    pub fn api_id(&self) -> &str {
        self.api_id.as_str()
    }
}

impl MisisClient {
    pub fn new(opts: &Options) -> Self {
        MisisClient {
            base_url: opts.base_url.trim_end_matches('/').to_string(),
            timeout: opts.timeout,
        }
    }

    /// Signs in with the portal credentials.
    ///
    /// Success is detected by a `Location` header pointing into the student area (`/s...`).
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Session, MisisError> {
        const FN_NAME: &'static str = "authenticate";

        let client = self.new_http_client()?;
        let sign_in_url = format!("{}{}", self.base_url, SIGN_IN_PATH);

        let resp = client.get(sign_in_url.as_str()).send().await?;
        if resp.status() != StatusCode::OK {
            warn!("[{}] sign-in page status {}", FN_NAME, resp.status());
            return Err(MisisError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        let csrf_token = match parse_csrf_token(body.as_str()) {
            None => {
                warn!("[{}] CSRF token not found", FN_NAME);
                return Err(MisisError::CsrfNotFound);
            }
            Some(token) => token,
        };

        let form = [
            ("user[login]", login),
            ("user[password]", password),
            ("user[remember_me]", "1"),
            ("commit", "Войти"),
            ("utf8", "✓"),
            ("authenticity_token", csrf_token.as_str()),
        ];
        let resp = client
            .post(sign_in_url.as_str())
            .header(header::REFERER, sign_in_url.as_str())
            .header(header::ORIGIN, self.base_url.as_str())
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            warn!("[{}] sign-in status {}", FN_NAME, status);
            return Err(MisisError::Status(status.as_u16()));
        }
        let location = match resp.headers().get(header::LOCATION) {
            None => return Err(MisisError::InvalidCredentials),
            Some(location) => match location.to_str() {
                Err(_) => return Err(MisisError::InvalidCredentials),
                Ok(location) => location.to_string(),
            },
        };
        match parse_api_id(location.as_str()) {
            None => {
                if !location.contains("sign_in") {
                    warn!("[{}] unexpected redirect {}", FN_NAME, location);
                }
                Err(MisisError::InvalidCredentials)
            }
            Some(api_id) => Ok(Session { client, api_id }),
        }
    }

    /// Fetches and parses the profile page of an authenticated session.
    pub async fn fetch_profile(&self, session: &Session) -> Result<Profile, MisisError> {
        const FN_NAME: &'static str = "fetch_profile";

        let url = format!("{}/ru/{}/profile", self.base_url, session.api_id);
        let resp = session
            .client
            .get(url.as_str())
            .header(
                header::REFERER,
                format!("{}/ru/{}", self.base_url, session.api_id),
            )
            .send()
            .await?;
        let status = resp.status();
        if status.is_redirection() {
            let location = match resp.headers().get(header::LOCATION) {
                None => "",
                Some(location) => location.to_str().unwrap_or(""),
            };
            if location.contains("sign_in") {
                return Err(MisisError::SessionExpired);
            }
            warn!("[{}] unexpected redirect status {}", FN_NAME, status);
            return Err(MisisError::Status(status.as_u16()));
        } else if status != StatusCode::OK {
            warn!("[{}] profile page status {}", FN_NAME, status);
            return Err(MisisError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        match parse_profile(body.as_str()) {
            None => {
                warn!("[{}] no profile field found in page", FN_NAME);
                Err(MisisError::ProfileUnavailable)
            }
            Some(profile) => Ok(profile),
        }
    }

    /// Signs in and fetches the profile with a fresh session.
    pub async fn get_student_info(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Profile, MisisError> {
        let session = self.authenticate(login, password).await?;
        self.fetch_profile(&session).await
    }

    /// Yes/no credential check without fetching the profile.
    pub async fn validate_credentials(&self, login: &str, password: &str) -> bool {
        const FN_NAME: &'static str = "validate_credentials";

        match self.authenticate(login, password).await {
            Err(e) => {
                warn!("[{}] login {} rejected: {}", FN_NAME, login, e);
                false
            }
            Ok(_) => true,
        }
    }

    fn new_http_client(&self) -> Result<Client, MisisError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        match Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()
        {
            Err(e) => Err(MisisError::Network(e.to_string())),
            Ok(client) => Ok(client),
        }
    }
}

impl fmt::Display for MisisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MisisError::Network(e) => write!(f, "network error: {}", e),
            MisisError::Timeout => write!(f, "request timeout"),
            MisisError::Status(status) => write!(f, "unexpected status {}", status),
            MisisError::CsrfNotFound => write!(f, "CSRF token not found"),
            MisisError::InvalidCredentials => write!(f, "invalid login or password"),
            MisisError::SessionExpired => write!(f, "session expired"),
            MisisError::ProfileUnavailable => write!(f, "profile unavailable"),
        }
    }
}

impl StdError for MisisError {}

impl From<reqwest::Error> for MisisError {
    fn from(e: reqwest::Error) -> Self {
        match e.is_timeout() {
            false => MisisError::Network(e.to_string()),
            true => MisisError::Timeout,
        }
    }
}

/// Extracts the session identifier from a post-login location such as `/ru/s12345/...`.
fn parse_api_id(location: &str) -> Option<String> {
    if !location.contains("/s") || location.contains("sign_in") {
        return None;
    }
    let (_, path) = location.split_once("/ru/")?;
    match path.split(['/', '?', '#']).next() {
        None | Some("") => None,
        Some(id) => Some(id.to_string()),
    }
}

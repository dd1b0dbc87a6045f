//! String libraries.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::{Rng, distr::Alphanumeric};
use regex::Regex;
use subtle::ConstantTimeEq;
use url::Url;

/// Visible prefix length of [`redact`].
const REDACT_PREFIX_LEN: usize = 4;

/// To check if the (client) scope is valid.
pub fn is_scope(scope: &str) -> bool {
    match Regex::new(r"^[a-z0-9]+([\._]{1}[a-z0-9]+)*$") {
        Err(_) => false,
        Ok(regex) => regex.is_match(scope),
    }
}

/// To check if the (redirect) URI is valid. Only absolute `http`/`https` URIs are accepted.
pub fn is_uri(uri: &str) -> bool {
    match Url::parse(uri) {
        Err(_) => false,
        Ok(url) => match url.scheme() {
            "http" | "https" => url.has_host(),
            _ => false,
        },
    }
}

/// To check if the upstream login handle is valid: non-empty and without whitespaces.
pub fn is_login(login: &str) -> bool {
    login.len() > 0 && login.len() <= 255 && !login.chars().any(|c| c.is_whitespace())
}

/// To generate item ID in `[timestamp-milliseconds]-[random-alphanumeric]` format.
pub fn random_id(time: &DateTime<Utc>, len: usize) -> String {
    format!("{}-{}", time.timestamp_millis(), randomstring(len))
}

/// To generate random alphanumeric string with the specified length.
///
/// The thread-local generator is a CSPRNG so the result can be used for secrets and codes.
pub fn randomstring(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// To convert time to ISO8601 format with milliseconds precision (`YYYY-MM-DDThh:mm:ss.SSSZ`).
pub fn time_str(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// To mask a credential for logging. Only a short prefix is kept.
pub fn redact(secret: &str) -> String {
    let prefix: String = match secret.chars().count() > REDACT_PREFIX_LEN * 2 {
        false => String::new(),
        true => secret.chars().take(REDACT_PREFIX_LEN).collect(),
    };
    format!("{}***", prefix)
}

/// To compare two secrets in constant time.
pub fn secure_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

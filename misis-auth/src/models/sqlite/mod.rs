//! SQLite model implementation.
//!
//! # Notes
//!
//! - Time values are stored as milliseconds from Epoch.
//! - Lists (scopes, redirect URIs) are stored as space-separated values.

use sql_builder::SqlBuilder;

pub mod authorization_code;
pub mod client;
pub mod conn;
pub mod login_session;
pub mod token;
pub mod user;

/// To split a space-separated value into a list.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(" ")
        .filter_map(|x| match x.len() {
            0 => None,
            _ => Some(x.to_string()),
        })
        .collect()
}

/// Transforms list options to the SQL builder.
fn build_limit_offset(
    builder: &mut SqlBuilder,
    offset: Option<u64>,
    limit: Option<u64>,
) -> &mut SqlBuilder {
    if let Some(value) = limit {
        if value > 0 {
            builder.limit(value);
        }
    }
    if let Some(value) = offset {
        match limit {
            None | Some(0) => builder.limit(-1).offset(value),
            _ => builder.offset(value),
        };
    }
    builder
}

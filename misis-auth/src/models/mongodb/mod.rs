//! MongoDB model implementation.
//!
//! Expired codes, tokens and login sessions are removed by TTL indexes.

pub mod authorization_code;
pub mod client;
pub mod conn;
pub mod login_session;
pub mod token;
pub mod user;

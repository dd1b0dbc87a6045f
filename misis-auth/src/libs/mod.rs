pub mod bridge;
pub mod config;
pub mod jwt;
pub mod misis;

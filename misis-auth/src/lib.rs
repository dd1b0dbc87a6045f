//! An OAuth 2.0 authorization server for applications that sign in users with their MISIS
//! university accounts.
//!
//! This module provides:
//!
//! - OAuth2 authorization with the following grant flows:
//!     - Authorization code
//!     - Refresh token
//! - A sign-in page that verifies credentials against the university portal and keeps the
//!   local user profile up to date.
//! - User info, token introspection and discovery APIs.
//! - Client application management.
//! - A batch endpoint to refresh all stored profiles.
//!
//! # Mount misis-auth in your axum App
//!
//! ```ignore
//! use axum::Router;
//! use clap::Command;
//! use misis_auth::{libs, routes};
//! use std::net::SocketAddr;
//! use tokio::{self, net::TcpListener};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let args = libs::config::reg_args(Command::new("your-project-name")).get_matches();
//!
//!     let conf = libs::config::read_args(&args);
//!     let auth_state = match routes::new_state("/auth", &conf).await {
//!         Err(e) => {
//!             println!("Error: {}", e);
//!             return Ok(());
//!         },
//!         Ok(state) => state,
//!     };
//!     let app = Router::new()
//!         .merge(routes::new_service(&auth_state))
//!         .merge(routes::new_batch_service(&auth_state));
//!     let listener = TcpListener::bind("0.0.0.0:1080").await?;
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
//! }
//! ```
//!
//! Please see `src/bin/misis-auth.rs` to get the real world example.

pub mod libs;
pub mod models;
pub mod routes;

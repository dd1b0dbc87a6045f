pub mod client;
pub mod oauth;
pub mod token;
pub mod user;

//! Common libraries of the MISIS OAuth bridge modules.

pub mod constants;
pub mod err;
pub mod http;
pub mod logger;
pub mod server_config;
pub mod strings;

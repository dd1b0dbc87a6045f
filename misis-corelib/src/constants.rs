//! Common constants for the MISIS OAuth bridge modules.

pub struct ContentType;
pub struct DbEngine;

impl ContentType {
    pub const FORM: &'static str = "application/x-www-form-urlencoded";
    pub const HTML: &'static str = "text/html; charset=utf-8";
    pub const JSON: &'static str = "application/json";
}

impl DbEngine {
    pub const MONGODB: &'static str = "mongodb";
    pub const SQLITE: &'static str = "sqlite";
}

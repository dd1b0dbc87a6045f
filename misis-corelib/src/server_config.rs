//! The top level configuration `server`.

use std::env;

use clap::{Arg, ArgMatches, Command, builder::RangedU64ValueParser};
use serde::Deserialize;

/// Server configuration object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// HTTP port.
    ///
    /// Default is `1080`.
    #[serde(rename = "httpPort")]
    pub http_port: Option<u16>,
    /// HTTPS port.
    ///
    /// Default is `1443`.
    #[serde(rename = "httpsPort")]
    pub https_port: Option<u16>,
    /// HTTPS certificate file path. Missing this to disable HTTPS.
    #[serde(rename = "certFile")]
    pub cert_file: Option<String>,
    /// HTTPS private key file path. Missing this to disable HTTPS.
    #[serde(rename = "keyFile")]
    pub key_file: Option<String>,
    /// Request timeout in seconds for API and OAuth routes. Batch routes are not bounded by it.
    ///
    /// Default is `60`.
    #[serde(rename = "requestTimeout")]
    pub request_timeout: Option<u64>,
}

pub const DEF_HTTP_PORT: u16 = 1080;
pub const DEF_HTTPS_PORT: u16 = 1443;
pub const DEF_REQUEST_TIMEOUT: u64 = 60;

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("server.httpport")
            .long("server.httpport")
            .help("HTTP port")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..=65535)),
    )
    .arg(
        Arg::new("server.httpsport")
            .long("server.httpsport")
            .help("HTTPS port")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..=65535)),
    )
    .arg(
        Arg::new("server.certfile")
            .long("server.certfile")
            .help("HTTPS certificate file")
            .num_args(1),
    )
    .arg(
        Arg::new("server.keyfile")
            .long("server.keyfile")
            .help("HTTPS private key file")
            .num_args(1),
    )
    .arg(
        Arg::new("server.requesttimeout")
            .long("server.requesttimeout")
            .help("request timeout in seconds")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..)),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// This function will call [`apply_default()`] to fill missing values so you do not need call it
/// again.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        http_port: match args.get_one::<u64>("server.httpport") {
            None => match env::var("SERVER_HTTP_PORT") {
                Err(_) => None,
                Ok(v) => v.parse::<u16>().ok(),
            },
            Some(v) => Some(*v as u16),
        },
        https_port: match args.get_one::<u64>("server.httpsport") {
            None => match env::var("SERVER_HTTPS_PORT") {
                Err(_) => None,
                Ok(v) => v.parse::<u16>().ok(),
            },
            Some(v) => Some(*v as u16),
        },
        cert_file: match args.get_one::<String>("server.certfile") {
            None => env::var("SERVER_CERT_FILE").ok(),
            Some(v) => Some(v.clone()),
        },
        key_file: match args.get_one::<String>("server.keyfile") {
            None => env::var("SERVER_KEY_FILE").ok(),
            Some(v) => Some(v.clone()),
        },
        request_timeout: match args.get_one::<u64>("server.requesttimeout") {
            None => match env::var("SERVER_REQUEST_TIMEOUT") {
                Err(_) => None,
                Ok(v) => v.parse::<u64>().ok(),
            },
            Some(v) => Some(*v),
        },
    })
}

/// Fill missing configuration with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        http_port: match config.http_port {
            None | Some(0) => Some(DEF_HTTP_PORT),
            Some(v) => Some(v),
        },
        https_port: match config.https_port {
            None | Some(0) => Some(DEF_HTTPS_PORT),
            Some(v) => Some(v),
        },
        cert_file: config.cert_file.clone(),
        key_file: config.key_file.clone(),
        request_timeout: match config.request_timeout {
            None | Some(0) => Some(DEF_REQUEST_TIMEOUT),
            Some(v) => Some(v),
        },
    }
}

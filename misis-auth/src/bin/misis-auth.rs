use std::{
    error::Error as StdError,
    fs,
    net::{Ipv6Addr, SocketAddr, SocketAddrV6},
    time::Duration,
};

use axum::{Router, routing};
use axum_prometheus::PrometheusMetricLayer;
use axum_server::{self, tls_rustls::RustlsConfig};
use chrono::Utc;
use clap::{Arg as ClapArg, Command};
use json5;
use log::{self, error, info};
use serde::Deserialize;
use tokio::{self, net::TcpListener, time};
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer};

use misis_auth::{libs, models::Model, routes};
use misis_corelib::{
    logger::{self, LoggerLayer},
    server_config,
};

#[derive(Deserialize)]
struct AppConfig {
    log: logger::Config,
    server: server_config::Config,
    auth: libs::config::Config,
}

const PROJ_NAME: &'static str = env!("CARGO_BIN_NAME");
const PROJ_VER: &'static str = env!("CARGO_PKG_VERSION");
const PURGE_INTERVAL: u64 = 3600;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    const FN_NAME: &'static str = "main";

    let conf = match init_config() {
        Err(e) => {
            let conf = &logger::Config {
                ..Default::default()
            };
            logger::init(PROJ_NAME, &conf);
            error!("[{}] read config error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(conf) => conf,
    };

    logger::init(PROJ_NAME, &conf.log);

    let auth_state = match routes::new_state("", &conf.auth).await {
        Err(e) => {
            error!("[{}] new routes state error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(state) => state,
    };

    // SQLite has no TTL index.
    let purge_model = auth_state.model.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(PURGE_INTERVAL));
        loop {
            interval.tick().await;
            if let Err(e) = purge_model.purge_expired(&Utc::now()).await {
                error!("[purge_expired] purge error: {}", e);
            }
        }
    });

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = Router::new()
        .merge(routes::new_service(&auth_state))
        .route("/version", routing::get(routes::get_version))
        .route(
            "/metrics",
            routing::get(|| async move { metric_handle.render() }),
        )
        .layer(routes::new_timeout_layer(
            conf.server
                .request_timeout
                .unwrap_or(server_config::DEF_REQUEST_TIMEOUT),
        ))
        .merge(routes::new_batch_service(&auth_state))
        .layer(CorsLayer::permissive())
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(prometheus_layer)
        .layer(LoggerLayer::new());

    // Serve HTTP.
    let ipv6_addr = Ipv6Addr::from([0u8; 16]);
    let http_addr = match conf.server.http_port {
        None => SocketAddr::V6(SocketAddrV6::new(
            ipv6_addr,
            server_config::DEF_HTTP_PORT,
            0,
            0,
        )),
        Some(port) => SocketAddr::V6(SocketAddrV6::new(ipv6_addr, port, 0, 0)),
    };

    // Serve HTTPS.
    if let Some(cert_file) = conf.server.cert_file.as_ref() {
        if let Some(key_file) = conf.server.key_file.as_ref() {
            if let Err(_e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
                error!("[{}] init crypto error", FN_NAME);
                return Ok(());
            }
            let config = match RustlsConfig::from_pem_file(cert_file, key_file).await {
                Err(e) => {
                    error!("[{}] read cert/key error: {}", FN_NAME, e);
                    return Ok(());
                }
                Ok(config) => config,
            };
            let addr = match conf.server.https_port {
                None => SocketAddr::V6(SocketAddrV6::new(
                    ipv6_addr,
                    server_config::DEF_HTTPS_PORT,
                    0,
                    0,
                )),
                Some(port) => SocketAddr::V6(SocketAddrV6::new(ipv6_addr, port, 0, 0)),
            };
            let http_app = app.clone();
            let http_serv = tokio::spawn(async move {
                if let Err(e) = axum_server::bind(http_addr)
                    .serve(http_app.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                {
                    error!("[main] launch HTTP server error: {}", e);
                }
            });
            let https_serv = tokio::spawn(async move {
                if let Err(e) = axum_server::bind_rustls(addr, config)
                    .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                {
                    error!("[main] launch HTTPS server error: {}", e);
                }
            });
            info!(
                "[{}] running {} service (v{})",
                FN_NAME, PROJ_NAME, PROJ_VER
            );
            let _ = tokio::join!(http_serv, https_serv);
            return Ok(());
        }
    }

    let listener = match TcpListener::bind(http_addr).await {
        Err(e) => {
            error!("[{}] bind addr {} error: {}", FN_NAME, http_addr, e);
            return Ok(());
        }
        Ok(listener) => listener,
    };
    info!(
        "[{}] running {} service (v{})",
        FN_NAME, PROJ_NAME, PROJ_VER
    );
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("[{}] launch server error: {}", FN_NAME, e);
        return Ok(());
    }
    Ok(())
}

fn init_config() -> Result<AppConfig, Box<dyn StdError>> {
    let mut args = Command::new(PROJ_NAME).version(PROJ_VER).arg(
        ClapArg::new("file")
            .short('f')
            .long("file")
            .help("config file")
            .num_args(1),
    );
    args = logger::reg_args(args);
    args = server_config::reg_args(args);
    args = libs::config::reg_args(args);
    let args = args.get_matches();

    if let Some(v) = args.get_one::<String>("file") {
        let conf_str = fs::read_to_string(v)?;
        let conf: AppConfig = json5::from_str(conf_str.as_str())?;
        return Ok(AppConfig {
            log: logger::apply_default(&conf.log),
            server: server_config::apply_default(&conf.server),
            auth: libs::config::apply_default(&conf.auth),
        });
    }

    Ok(AppConfig {
        log: logger::read_args(&args),
        server: server_config::read_args(&args),
        auth: libs::config::read_args(&args),
    })
}

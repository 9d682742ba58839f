//! MediaHub - access control and audit service
//!
//! Serves the project and album API with per-request access resolution and
//! an append-only audit trail.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use config::LogFormat;
use mediahub::{api, config, db, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("MediaHub {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if let Some(pos) = args.iter().position(|arg| arg == "--init-config") {
        let path = args
            .get(pos + 1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.yaml"));
        AppConfig::create_default_config(&path)
            .with_context(|| format!("Failed to write default config to {:?}", path))?;
        println!("Wrote default configuration to {:?}", path);
        return Ok(());
    }

    // Configuration decides the log format, so it loads before logging
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Dropping the guard stops the file writer
    let _log_guard = init_logging(&config);

    info!("MediaHub starting up");

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(config.clone(), db);
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("MediaHub stopped");
    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a non-blocking file writer, rotated daily when configured
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let rotation = if log_config.daily_rotation {
        Rotation::DAILY
    } else {
        Rotation::NEVER
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(rotation.clone())
        .filename_prefix(&log_config.log_prefix)
        .max_log_files(log_config.max_log_files.max(1))
        .build(&log_config.log_dir)
        .unwrap_or_else(|e| {
            eprintln!("Warning: Failed to build rolling log appender: {}", e);
            RollingFileAppender::new(rotation, &log_config.log_dir, &log_config.log_prefix)
        });

    tracing_appender::non_blocking(file_appender)
}

fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true).with_line_number(false))
                .init();
        }
    }
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .with(fmt::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true))
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Ensure the directory holding the SQLite file exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(path) = sqlite_file_path(&config.database.url) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

/// File path of a `sqlite://` URL, without query parameters
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Create the application router with transport layers
fn create_router(state: AppState, config: &AppConfig) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let router = api::app(state)
        .layer(trace_layer)
        .layer(cors_layer(&config.server.cors_origins));

    match config.server.request_timeout_secs {
        Some(secs) => router.layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(
            secs,
        ))),
        None => router,
    }
}

/// Permissive CORS when no origins are configured, otherwise an allow list
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn print_help() {
    println!(
        r#"MediaHub {}

USAGE:
    mediahub [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --init-config [PATH]    Write a default configuration file
                            (default: ./config.yaml) and exit

ENVIRONMENT:
    MEDIAHUB_CONFIG         Path to configuration file
    MEDIAHUB_HOST           Listen address
    MEDIAHUB_PORT           Listen port
    DATABASE_URL            SQLite database URL
    JWT_SECRET              HS256 secret used to validate bearer tokens
    RUST_LOG                Log filter
    MEDIAHUB_LOG_FORMAT     pretty, compact or json

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by MEDIAHUB_CONFIG
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/mediahub/config.yaml
    5. <user config dir>/mediahub/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}

//! Logger module
//!
//! Provides logging utilities for the CDN server including:
//! - Subscriber setup (stdout or file, level from config or `RUST_LOG`)
//! - Server lifecycle logging
//! - Authentication and upload audit events
//! - Access logging with multiple formats

mod format;

pub use format::AccessLogEntry;

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use hyper::Method;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::storage::StoredFile;

const ACCESS_TARGET: &str = "cdn_server::access";

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Initialize the global subscriber from configuration
///
/// Should be called once at application startup. `RUST_LOG` takes precedence
/// over `logging.level`.
pub fn init(config: &LoggingConfig) -> Result<(), LoggerError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let file = config
        .log_file
        .as_deref()
        .map(open_log_file)
        .transpose()?;

    let stdout_layer = file.is_none().then(tracing_subscriber::fmt::layer);
    let file_layer = file.map(|f| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(f))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File, LoggerError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggerError::OpenFile {
            path: path.display().to_string(),
            source,
        })
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    info!("======================================");
    info!("CDN server started successfully");
    info!("Listening on: http://{addr}");
    info!("Upload directory: {}", config.uploads_dir.display());
    info!("Upload route: POST {}", config.upload_route);
    info!("Max upload size: {} bytes", config.max_upload_size);
    info!(
        "Authentication: {}",
        if config.require_auth { "required" } else { "disabled" }
    );
    if let Some(workers) = config.performance.workers {
        info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        info!("Max connections: {max}");
    }
    info!("======================================");
}

pub fn log_upload_dir_contents(dir: &Path, files: &[StoredFile]) {
    if files.is_empty() {
        info!("Upload directory {} is empty", dir.display());
        return;
    }
    info!("Upload directory {} holds {} file(s):", dir.display(), files.len());
    for file in files {
        info!("  - {} ({} bytes)", file.name, file.size);
    }
}

pub fn log_shutdown() {
    info!("Shutdown signal received, no longer accepting connections");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    debug!(peer = %peer_addr, "connection accepted");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    error!("Failed to serve connection: {err:?}");
}

pub fn log_request(method: &Method, path: &str) {
    debug!(%method, path, "received request");
}

pub fn log_auth_outcome(method: &Method, path: &str, success: bool) {
    if success {
        debug!(%method, path, "authentication successful");
    } else {
        warn!(%method, path, "authentication failed");
    }
}

pub fn log_serving_file(path: &str, size: u64) {
    info!(path, size, "serving file");
}

pub fn log_upload_stored(filename: &str, bytes: u64) {
    info!(filename, bytes, "file uploaded successfully");
}

pub fn log_request_failed(method: &Method, path: &str, err: &crate::error::HandlerError) {
    let status = err.status().as_u16();
    if status >= 500 {
        error!(%method, path, status, "request failed: {err}");
    } else {
        warn!(%method, path, status, "request rejected: {err}");
    }
}

pub fn log_error(message: &str) {
    error!("{message}");
}

pub fn log_warning(message: &str) {
    warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

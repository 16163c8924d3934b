// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
///
/// The top level is flat so that the JSON files written for earlier
/// deployments (`port`, `uploads_dir`, `max_upload_size`, ...) load as-is.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding every served and uploaded file
    #[serde(alias = "upload_directory", default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// Upper bound for a single upload request body, in bytes
    pub max_upload_size: u64,
    /// Route accepting multipart uploads
    pub upload_route: String,
    pub require_auth: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_access_log")]
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_log_level() -> String {
    "info".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            access_log: default_access_log(),
            access_log_format: default_access_log_format(),
            log_file: None,
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Tokio worker threads (CPU cores when unset)
    #[serde(default)]
    pub workers: Option<usize>,
    /// Upper bound on the lifetime of one connection, in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: bool,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Seconds to wait for open connections after a shutdown signal
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_connection_timeout() -> u64 {
    300
}

#[allow(clippy::missing_const_for_fn)]
fn default_shutdown_timeout() -> u64 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_keep_alive() -> bool {
    true
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: None,
            connection_timeout: default_connection_timeout(),
            keep_alive: default_keep_alive(),
            max_connections: None,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Credentials view handed to the authentication gate
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings<'a> {
    pub required: bool,
    pub username: &'a str,
    pub password: &'a str,
}

impl Config {
    pub fn auth(&self) -> AuthSettings<'_> {
        AuthSettings {
            required: self.require_auth,
            username: &self.username,
            password: &self.password,
        }
    }
}

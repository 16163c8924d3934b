// Configuration module entry point
// Loads, validates and exposes the immutable server configuration

mod state;
mod types;
mod validation;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{AuthSettings, Config, LoggingConfig, PerformanceConfig};
pub use validation::validate;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from specified file path
    ///
    /// The format follows the file extension (`config.json`, `config.toml`, ...).
    /// `CDN_*` environment variables override file values, with `__` as the
    /// nesting separator (`CDN_LOGGING__LEVEL=debug`).
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .add_source(
                config::Environment::with_prefix("CDN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("max_upload_size", 10_485_760)? // 10MB
            .set_default("upload_route", "/upload")?
            .set_default("require_auth", true)?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid listen address: {e}")))
    }
}

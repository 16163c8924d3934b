//! Semantic checks run once at load time; serde handles the syntax.

use super::types::Config;
use super::ConfigError;

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if config.max_upload_size == 0 {
        problems.push("max_upload_size must be greater than zero".to_string());
    }
    if !config.upload_route.starts_with('/') {
        problems.push(format!(
            "upload_route must start with '/', got '{}'",
            config.upload_route
        ));
    }
    if config.uploads_dir.as_os_str().is_empty() {
        problems.push("uploads_dir must not be empty".to_string());
    }
    if config.require_auth {
        if config.username.is_empty() {
            problems.push("username is required when require_auth is enabled".to_string());
        }
        if config.password.is_empty() {
            problems.push("password is required when require_auth is enabled".to_string());
        }
    }
    if config.performance.connection_timeout == 0 {
        problems.push("performance.connection_timeout must be greater than zero".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems.join(", ")))
    }
}

// Application state module
// Shared, read-only state handed to every request handler

use std::path::Path;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
}

impl AppState {
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Upload directory every request is confined to
    pub fn uploads_dir(&self) -> &Path {
        &self.config.uploads_dir
    }

    /// Maximum upload size as a `usize` for the body limiter
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.config.max_upload_size).unwrap_or(usize::MAX)
    }
}

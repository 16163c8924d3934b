//! Download path
//!
//! Resolves the URL path inside the upload directory and streams the file
//! back without buffering it.

use std::io;

use tokio::fs::{self, File};

use crate::config::AppState;
use crate::error::HandlerError;
use crate::http::{self, mime, ResponseBody};
use crate::logger;
use crate::storage::{self, PathError};
use hyper::Response;

/// Serve the file named by `request_path` from the upload directory
pub async fn serve_file(
    request_path: &str,
    is_head: bool,
    state: &AppState,
) -> Result<Response<ResponseBody>, HandlerError> {
    let root = state.uploads_dir();
    let not_found = || HandlerError::NotFound(request_path.to_string());

    let target = storage::safe_join(root, request_path).map_err(|e| {
        logger::log_warning(&format!("Path traversal attempt blocked: {e}"));
        not_found()
    })?;

    let metadata = match fs::metadata(&target).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(HandlerError::internal(
                format!("stat {}", target.display()),
                e,
            ))
        }
    };
    if !metadata.is_file() {
        return Err(not_found());
    }

    let resolved = match storage::ensure_within(root, &target).await {
        Ok(p) => p,
        Err(e) if e.is_not_found() => return Err(not_found()),
        Err(PathError::Traversal(_)) => {
            logger::log_warning(&format!(
                "Symlink escape blocked: {request_path} -> {}",
                target.display()
            ));
            return Err(not_found());
        }
        Err(PathError::Resolve { path, source }) => {
            return Err(HandlerError::internal(
                format!("resolve {}", path.display()),
                source,
            ))
        }
    };

    let file = match File::open(&resolved).await {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(HandlerError::internal(
                format!("open {}", resolved.display()),
                e,
            ))
        }
    };

    let content_type = mime::get_content_type(target.extension().and_then(|e| e.to_str()));
    logger::log_serving_file(request_path, metadata.len());

    Ok(http::build_file_response(
        file,
        content_type,
        metadata.len(),
        is_head,
    ))
}

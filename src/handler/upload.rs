//! Upload path
//!
//! Accepts one multipart field named `file` and stores it under its
//! sanitized filename. The request body is read through a length limiter, so
//! an oversized upload is cut off at `max_upload_size` bytes.

use std::error::Error as StdError;
use std::io;
use std::path::Path;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Request, Response};
use multer::Multipart;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::config::AppState;
use crate::error::HandlerError;
use crate::http::{self, ResponseBody};
use crate::logger;
use crate::storage::{self, FilenameError};

/// Multipart field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

pub const UPLOAD_SUCCESS: &str = "File uploaded successfully!";

pub async fn handle_upload<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<Response<ResponseBody>, HandlerError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let limit = state.config.max_upload_size;

    // 1. Declared size
    check_declared_length(req.headers(), limit)?;

    // 2. Multipart framing
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandlerError::BadRequest("missing Content-Type".to_string()))
        .and_then(|ct| {
            multer::parse_boundary(ct)
                .map_err(|e| HandlerError::BadRequest(format!("invalid multipart request: {e}")))
        })?;

    let body = Limited::new(req.into_body(), state.max_upload_bytes());
    let mut multipart = Multipart::new(body.into_data_stream(), boundary);

    let mut field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| classify_multipart_error(e, limit))?
        {
            Some(field) if field.name() == Some(FILE_FIELD) => break field,
            Some(_) => {}
            None => {
                return Err(HandlerError::BadRequest(format!(
                    "form field '{FILE_FIELD}' is missing"
                )))
            }
        }
    };

    // 3. Filename
    let raw_name = field
        .file_name()
        .ok_or_else(|| HandlerError::BadRequest("file field carries no filename".to_string()))?
        .to_string();
    let filename = storage::sanitize_filename(&raw_name)?;

    let root = state.uploads_dir();
    let destination = storage::safe_join(root, filename)
        .ok()
        .filter(|p| p.parent() == Some(root))
        .ok_or(HandlerError::InvalidFilename(FilenameError::Reserved))?;

    // 4. Directory
    create_upload_dir(root)
        .await
        .map_err(|e| HandlerError::internal(format!("create {}", root.display()), e))?;

    // An existing symlink would redirect the write wherever it points
    match fs::symlink_metadata(&destination).await {
        Ok(meta) if meta.file_type().is_symlink() => {
            logger::log_warning(&format!(
                "Upload onto symlink refused: {}",
                destination.display()
            ));
            return Err(HandlerError::InvalidFilename(FilenameError::Symlink));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(HandlerError::internal(
                format!("stat {}", destination.display()),
                e,
            ))
        }
    }

    // 5. Stream into place
    let mut file = File::create(&destination)
        .await
        .map_err(|e| HandlerError::internal(format!("create {}", destination.display()), e))?;

    let mut written: u64 = 0;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                file.write_all(&chunk).await.map_err(|e| {
                    HandlerError::internal(format!("write {}", destination.display()), e)
                })?;
                written += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => {
                drop(file);
                discard_partial(&destination).await;
                return Err(classify_multipart_error(e, limit));
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| HandlerError::internal(format!("flush {}", destination.display()), e))?;

    // 6. Done
    logger::log_upload_stored(filename, written);
    Ok(http::build_200_text_response(UPLOAD_SUCCESS))
}

/// Reject up front when `Content-Length` already exceeds the limit
fn check_declared_length(headers: &HeaderMap, limit: u64) -> Result<(), HandlerError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(());
    };
    match value.to_str().ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(size) if size > limit => Err(HandlerError::PayloadTooLarge { limit }),
        Some(_) => Ok(()),
        None => {
            logger::log_warning("Invalid Content-Length value, relying on the body limit");
            Ok(())
        }
    }
}

/// Hitting the body limiter means 413; anything else the parser trips on is
/// the client's malformed form.
fn classify_multipart_error(err: multer::Error, limit: u64) -> HandlerError {
    match err {
        multer::Error::StreamReadFailed(source)
            if source.downcast_ref::<LengthLimitError>().is_some() =>
        {
            HandlerError::PayloadTooLarge { limit }
        }
        multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
            HandlerError::PayloadTooLarge { limit }
        }
        other => HandlerError::BadRequest(other.to_string()),
    }
}

async fn create_upload_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(dir).await
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        logger::log_warning(&format!(
            "Failed to remove partial upload {}: {e}",
            path.display()
        ));
    }
}

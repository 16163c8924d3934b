//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: authentication gate, method
//! dispatch, error-to-response mapping and access logging.

use crate::auth;
use crate::config::AppState;
use crate::error::HandlerError;
use crate::handler::{download, upload};
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
///
/// Generic over the request body so the same path serves hyper's `Incoming`
/// and in-memory bodies.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    logger::log_request(&method, &path);

    let mut access = state.config.logging.access_log.then(|| {
        let mut entry = AccessLogEntry::new(peer_addr.ip().to_string(), method.to_string(), path.clone());
        entry.http_version = version_label(req.version()).to_string();
        entry.user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry
    });

    // 1. Authentication gate
    let settings = state.config.auth();
    let outcome = auth::verify(req.headers(), settings);
    let authenticated = outcome.is_allowed();
    if settings.required {
        logger::log_auth_outcome(&method, &path, authenticated);
    }
    if let (Some(entry), Some(user)) = (access.as_mut(), outcome.username()) {
        entry.user = Some(user.to_string());
    }

    // 2. Method dispatch
    let result = if authenticated {
        dispatch(req, &state).await
    } else {
        Err(HandlerError::Unauthorized)
    };

    let response = result.unwrap_or_else(|err| {
        logger::log_request_failed(&method, &path, &err);
        err.into_response()
    });

    if let Some(mut entry) = access {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route an authenticated request to the download or upload path
async fn dispatch<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<Response<ResponseBody>, HandlerError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let method = req.method().clone();
    match method {
        Method::POST if req.uri().path() == state.config.upload_route => {
            upload::handle_upload(req, state).await
        }
        Method::GET | Method::HEAD => {
            download::serve_file(req.uri().path(), method == Method::HEAD, state).await
        }
        other => Err(HandlerError::MethodNotAllowed(other)),
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

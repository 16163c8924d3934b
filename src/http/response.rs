//! HTTP response building module
//!
//! Provides builders for various HTTP status code responses, decoupled from specific business logic.

use std::io;

use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Body type shared by buffered and streamed responses
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Realm announced on 401 responses
pub const AUTH_REALM: &str = r#"Basic realm="CDN Authentication""#;

/// Wrap an in-memory payload as a response body
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build a plain-text response with the given status and body
fn build_text_response(status: u16, body: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", body.len())
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(full_body(body))
        })
}

/// Build 200 OK plain-text response
pub fn build_200_text_response(body: &'static str) -> Response<ResponseBody> {
    build_text_response(200, body)
}

/// Build 400 Bad Request response
pub fn build_400_response(body: &'static str) -> Response<ResponseBody> {
    build_text_response(400, body)
}

/// Build 401 Unauthorized response with the Basic challenge
pub fn build_401_response() -> Response<ResponseBody> {
    const BODY: &str = "401 Unauthorized\n";
    Response::builder()
        .status(401)
        .header("WWW-Authenticate", AUTH_REALM)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", BODY.len())
        .body(full_body(BODY))
        .unwrap_or_else(|e| {
            log_build_error(401, &e);
            Response::new(full_body(BODY))
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    build_text_response(404, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    const BODY: &str = "405 Method Not Allowed";
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Allow", "GET, HEAD, POST")
        .body(full_body(BODY))
        .unwrap_or_else(|e| {
            log_build_error(405, &e);
            Response::new(full_body(BODY))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<ResponseBody> {
    build_text_response(413, "413 Payload Too Large")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    build_text_response(500, "Internal Server Error")
}

/// Build a 200 response that streams `file` in bounded chunks
///
/// The status line and headers are committed before the first chunk is read,
/// so a read error part-way through can only abort the connection.
pub fn build_file_response(
    file: File,
    content_type: &str,
    content_length: u64,
    is_head: bool,
) -> Response<ResponseBody> {
    let body = if is_head {
        empty_body()
    } else {
        let stream = ReaderStream::new(file)
            .inspect_err(|e| {
                crate::logger::log_error(&format!("File stream aborted mid-response: {e}"));
            })
            .map_ok(Frame::data);
        StreamBody::new(stream).boxed_unsync()
    };

    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error(200, &e);
            build_500_response()
        })
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

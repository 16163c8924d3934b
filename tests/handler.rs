//! End-to-end tests for the request handler against a temporary upload
//! directory, using in-memory request bodies.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cdn_server::config::{AppState, Config, LoggingConfig, PerformanceConfig};
use cdn_server::handler::handle_request;
use futures_util::stream;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Body, Bytes, Frame};
use hyper::header::HeaderMap;
use hyper::{Request, StatusCode};
use tempfile::TempDir;

const BOUNDARY: &str = "----cdnTestBoundary7MA4YWxkTrZu0gW";
const MAX_UPLOAD: u64 = 1_048_576;

fn test_config(dir: &Path, require_auth: bool) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        uploads_dir: dir.to_path_buf(),
        max_upload_size: MAX_UPLOAD,
        upload_route: "/upload".to_string(),
        require_auth,
        username: "admin".to_string(),
        password: "secret".to_string(),
        logging: LoggingConfig {
            access_log: false,
            ..LoggingConfig::default()
        },
        performance: PerformanceConfig::default(),
    }
}

fn state(dir: &TempDir) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(dir.path(), true)))
}

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

fn good_auth() -> String {
    basic("admin", "secret")
}

fn peer() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

/// Build a multipart body with the given `(field, filename, data)` parts
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(auth: Option<&str>, body: Vec<u8>) -> Request<Full<Bytes>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Full::new(Bytes::from(body))).unwrap()
}

fn get_request(path: &str, auth: Option<&str>) -> Request<Full<Bytes>> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

async fn send<B>(req: Request<B>, state: &Arc<AppState>) -> (StatusCode, HeaderMap, Bytes)
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let resp = handle_request(req, Arc::clone(state), peer()).await.unwrap();
    let (parts, body) = resp.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    (parts.status, parts.headers, bytes)
}

async fn upload(state: &Arc<AppState>, filename: &str, data: &[u8]) -> (StatusCode, Bytes) {
    let body = multipart(&[("file", Some(filename), data)]);
    let (status, _, bytes) = send(upload_request(Some(&good_auth()), body), state).await;
    (status, bytes)
}

fn dir_entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn get_without_credentials_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.pdf"), b"%PDF-1.7").unwrap();
    let state = state(&dir);

    let (status, headers, body) = send(get_request("/secret.pdf", None), &state).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        headers["WWW-Authenticate"],
        r#"Basic realm="CDN Authentication""#
    );
    assert_eq!(&body[..], b"401 Unauthorized\n");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), b"png").unwrap();
    let state = state(&dir);

    let (status, _, body) =
        send(get_request("/a.png", Some(&basic("admin", "nope"))), &state).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_ne!(&body[..], b"png");
}

#[tokio::test]
async fn upload_without_credentials_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let body = multipart(&[("file", Some("report.pdf"), &b"data"[..])]);
    let (status, _, _) = send(upload_request(None, body), &state).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(dir_entries(&dir).is_empty());
}

#[tokio::test]
async fn upload_then_download_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);
    let data: Vec<u8> = (0..500 * 1024).map(|i| (i % 251) as u8).collect();

    let (status, body) = upload(&state, "report.pdf", &data).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"File uploaded successfully!");
    assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), data);

    let (status, headers, body) =
        send(get_request("/report.pdf", Some(&good_auth())), &state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["Content-Type"], "application/pdf");
    assert_eq!(headers["Content-Length"], data.len().to_string().as_str());
    assert_eq!(&body[..], &data[..]);
}

#[tokio::test]
async fn download_sets_content_type_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pic.JPEG"), b"jpeg").unwrap();
    std::fs::write(dir.path().join("logo.png"), b"png").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"txt").unwrap();
    let state = state(&dir);

    for (path, expected) in [
        ("/pic.JPEG", "image/jpeg"),
        ("/logo.png", "image/png"),
        ("/notes.txt", "application/octet-stream"),
    ] {
        let (status, headers, _) = send(get_request(path, Some(&good_auth())), &state).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(headers["Content-Type"], expected, "{path}");
    }
}

#[tokio::test]
async fn head_returns_headers_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logo.png"), b"12345").unwrap();
    let state = state(&dir);

    let req = Request::builder()
        .method("HEAD")
        .uri("/logo.png")
        .header("Authorization", good_auth())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (status, headers, body) = send(req, &state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["Content-Length"], "5");
    assert!(body.is_empty());
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let (status, _, _) = send(get_request("/missing.txt", Some(&good_auth())), &state).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn directory_is_not_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    let state = state(&dir);

    for path in ["/", "/nested", "/nested/"] {
        let (status, _, _) = send(get_request(path, Some(&good_auth())), &state).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn traversal_never_escapes_upload_dir() {
    let outer = tempfile::tempdir().unwrap();
    let uploads = outer.path().join("uploads");
    std::fs::create_dir(&uploads).unwrap();
    std::fs::write(outer.path().join("outside.txt"), b"top secret").unwrap();
    let state = Arc::new(AppState::new(test_config(&uploads, true)));

    for path in [
        "/../../etc/passwd",
        "/../outside.txt",
        "/a/../../outside.txt",
        "/..%2foutside.txt",
    ] {
        let (status, _, body) = send(get_request(path, Some(&good_auth())), &state).await;
        assert!(
            status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST,
            "{path} -> {status}"
        );
        assert_ne!(&body[..], b"top secret");
        assert!(!String::from_utf8_lossy(&body).contains("root:"));
    }
}

#[tokio::test]
async fn inner_dotdot_is_collapsed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.pdf"), b"inside").unwrap();
    let state = state(&dir);

    let (status, _, body) = send(get_request("/a/../b.pdf", Some(&good_auth())), &state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"inside");
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_out_of_upload_dir_is_not_followed() {
    let outer = tempfile::tempdir().unwrap();
    let uploads = outer.path().join("uploads");
    std::fs::create_dir(&uploads).unwrap();
    std::fs::write(outer.path().join("outside.txt"), b"top secret").unwrap();
    std::os::unix::fs::symlink(outer.path().join("outside.txt"), uploads.join("link.txt"))
        .unwrap();
    let state = Arc::new(AppState::new(test_config(&uploads, true)));

    let (status, _, body) = send(get_request("/link.txt", Some(&good_auth())), &state).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_ne!(&body[..], b"top secret");
}

#[cfg(unix)]
#[tokio::test]
async fn upload_onto_symlink_does_not_write_through_it() {
    let outer = tempfile::tempdir().unwrap();
    let uploads = outer.path().join("uploads");
    std::fs::create_dir(&uploads).unwrap();
    std::fs::write(outer.path().join("outside.txt"), b"original").unwrap();
    std::os::unix::fs::symlink(outer.path().join("outside.txt"), uploads.join("link.txt"))
        .unwrap();
    let state = Arc::new(AppState::new(test_config(&uploads, true)));

    let (status, body) = upload(&state, "link.txt", b"PWNED").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"Invalid filename");
    assert_eq!(
        std::fs::read(outer.path().join("outside.txt")).unwrap(),
        b"original"
    );
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let body = multipart(&[("comment", None, &b"hello"[..])]);
    let (status, _, _) = send(upload_request(Some(&good_auth()), body), &state).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(dir_entries(&dir).is_empty());
}

#[tokio::test]
async fn upload_with_non_multipart_body_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("Authorization", good_auth())
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from_static(b"{}")))
        .unwrap();
    let (status, _, _) = send(req, &state).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_fields_before_file_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let body = multipart(&[
        ("comment", None, &b"ignored"[..]),
        ("file", Some("notes.bin"), &b"payload"[..]),
    ]);
    let (status, _, _) = send(upload_request(Some(&good_auth()), body), &state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        std::fs::read(dir.path().join("notes.bin")).unwrap(),
        b"payload"
    );
}

#[tokio::test]
async fn invalid_filenames_are_rejected_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    for name in [
        "../evil.txt",
        "sub/dir.txt",
        "with space.png",
        "..",
        "   ",
    ] {
        let (status, body) = upload(&state, name, b"x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name:?}");
        assert_eq!(&body[..], b"Invalid filename", "{name:?}");
    }
    assert!(dir_entries(&dir).is_empty());
}

#[tokio::test]
async fn filename_whitespace_is_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let (status, _) = upload(&state, "  spaced.png ", b"x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dir_entries(&dir), vec!["spaced.png".to_string()]);
}

#[tokio::test]
async fn oversized_declared_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);
    let data = vec![7u8; 2 * MAX_UPLOAD as usize];

    let body = multipart(&[("file", Some("big.bin"), &data[..])]);
    let len = body.len();
    let mut req = upload_request(Some(&good_auth()), body);
    req.headers_mut()
        .insert("Content-Length", len.to_string().parse().unwrap());

    let (status, _, _) = send(req, &state).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(dir_entries(&dir).is_empty());
}

#[tokio::test]
async fn oversized_undeclared_body_is_cut_off() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);
    let data = vec![7u8; MAX_UPLOAD as usize + 1];

    // No Content-Length: only the body limiter can catch this
    let body = multipart(&[("file", Some("big.bin"), &data[..])]);
    let (status, _, _) = send(upload_request(Some(&good_auth()), body), &state).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!dir.path().join("big.bin").exists());
}

#[tokio::test]
async fn limit_crossed_mid_copy_discards_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    // Headers arrive in their own frame so the destination file is opened
    // before the body limiter trips on a later data frame.
    let head = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"partial.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    );
    let chunk = Bytes::from(vec![9u8; 256 * 1024]);
    let mut frames: Vec<Result<Frame<Bytes>, std::convert::Infallible>> =
        vec![Ok(Frame::data(Bytes::from(head)))];
    frames.extend((0..6).map(|_| Ok(Frame::data(chunk.clone()))));
    frames.push(Ok(Frame::data(Bytes::from(format!("\r\n--{BOUNDARY}--\r\n")))));

    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("Authorization", good_auth())
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(StreamBody::new(stream::iter(frames)))
        .unwrap();

    let (status, _, _) = send(req, &state).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!dir.path().join("partial.bin").exists());
}

#[tokio::test]
async fn upload_creates_missing_directory() {
    let outer = tempfile::tempdir().unwrap();
    let uploads = outer.path().join("a").join("b");
    let state = Arc::new(AppState::new(test_config(&uploads, true)));

    let (status, _) = upload(&state, "deep.pdf", b"deep").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(std::fs::read(uploads.join("deep.pdf")).unwrap(), b"deep");
}

#[tokio::test]
async fn reupload_overwrites_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    upload(&state, "doc.pdf", b"first version, longer").await;
    upload(&state, "doc.pdf", b"second").await;
    assert_eq!(std::fs::read(dir.path().join("doc.pdf")).unwrap(), b"second");
}

/// Concurrent uploads to one name are not serialized. The surviving content
/// is whichever writer finished last; no interleaving guarantee beyond that
/// is made, so this only checks that one of the two payloads survived.
#[tokio::test]
async fn concurrent_uploads_to_same_name_race() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);
    let a = vec![b'a'; 64 * 1024];
    let b = vec![b'b'; 64 * 1024];

    let (ra, rb) = tokio::join!(upload(&state, "race.bin", &a), upload(&state, "race.bin", &b));
    assert_eq!(ra.0, StatusCode::OK);
    assert_eq!(rb.0, StatusCode::OK);

    let stored = std::fs::read(dir.path().join("race.bin")).unwrap();
    assert_eq!(stored.len(), 64 * 1024);
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let req = Request::builder()
        .method("DELETE")
        .uri("/report.pdf")
        .header("Authorization", good_auth())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (status, headers, _) = send(req, &state).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers["Allow"], "GET, HEAD, POST");
}

#[tokio::test]
async fn post_outside_upload_route_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let body = multipart(&[("file", Some("x.pdf"), &b"x"[..])]);
    let mut req = upload_request(Some(&good_auth()), body);
    *req.uri_mut() = "/elsewhere".parse().unwrap();
    let (status, _, _) = send(req, &state).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(dir_entries(&dir).is_empty());
}

#[tokio::test]
async fn auth_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("open.png"), b"open").unwrap();
    let state = Arc::new(AppState::new(test_config(dir.path(), false)));

    let (status, _, body) = send(get_request("/open.png", None), &state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"open");
}

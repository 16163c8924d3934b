// Connection handling module
// Accepts a single TCP connection and serves it with the request handler

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `tracker` - Tracks live connection tasks; its length is the active count
/// * `drain` - Flips to `true` once the server starts shutting down
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    tracker: &TaskTracker,
    drain: &watch::Receiver<bool>,
) {
    // Only the accept loop spawns onto the tracker, so the count cannot grow
    // between this check and the spawn below
    let active = tracker.len();

    if let Some(max_conn) = state.config.performance.max_connections {
        if active >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            logger::log_warning(&format!(
                "Max connections reached: {active}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    tracker.spawn(handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        drain.clone(),
    ));
}

/// Serve a single connection until it closes, times out, or drains.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 keep-alive
/// 3. Serves the connection with the request handler
/// 4. On drain, lets the in-flight request finish and then closes
/// 5. Applies the connection timeout
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut drain: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let timeout_duration = Duration::from_secs(state.config.performance.connection_timeout);

    let mut builder = http1::Builder::new();
    builder.keep_alive(state.config.performance.keep_alive);

    let conn = builder.serve_connection(
        io,
        service_fn(move |req| handler::handle_request(req, Arc::clone(&state), peer_addr)),
    );

    let serve = async move {
        tokio::pin!(conn);
        let mut draining = *drain.borrow();
        if draining {
            conn.as_mut().graceful_shutdown();
        }

        loop {
            tokio::select! {
                res = conn.as_mut() => break res,
                changed = drain.changed(), if !draining => {
                    // A closed channel means the loop is gone; drain as well
                    draining = changed.is_err() || *drain.borrow();
                    if draining {
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
        }
    };

    match tokio::time::timeout(timeout_duration, serve).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => {
            logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            ));
        }
    }
}

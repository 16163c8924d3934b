// Server loop module
// Accepts connections until the shutdown future resolves, then drains

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections on `listener` until `shutdown` completes.
///
/// Each connection runs on its own runtime task. After `shutdown` the
/// listener is closed, live connections finish their current request, and
/// the call returns once they are gone or `performance.shutdown_timeout`
/// seconds have passed.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) {
    let tracker = TaskTracker::new();
    let (drain_tx, drain_rx) = watch::channel(false);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &tracker, &drain_rx);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                break;
            }
        }
    }

    drop(listener);
    // Receivers held by connection tasks keep the channel open
    let _ = drain_tx.send(true);
    tracker.close();

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s shutdown grace period; abandoning them",
            tracker.len(),
            grace.as_secs()
        ));
    }
}

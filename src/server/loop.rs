// Server loop module
// Accepts connections until the shutdown signal fires

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::{Duration, Instant};

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept connections until `state.shutdown_signal` is notified.
///
/// Each connection is served in its own task on the runtime. After the
/// signal the listener is closed and in-flight connections are given up to
/// `max(read_timeout, write_timeout)` to finish.
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>) {
    let shutdown = Arc::clone(&state.shutdown_signal);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                drop(listener);
                logger::log_shutdown(state.active_connections.load(Ordering::SeqCst));
                drain_connections(&state).await;
                return;
            }
        }
    }
}

/// Poll the connection counter until it reaches zero or the deadline passes
async fn drain_connections(state: &AppState) {
    let performance = &state.config.performance;
    let deadline = Instant::now()
        + Duration::from_secs(std::cmp::max(performance.read_timeout, performance.write_timeout));

    while state.active_connections.load(Ordering::SeqCst) > 0 {
        if Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown deadline reached with {} connection(s) still open",
                state.active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
    logger::log_info("All connections closed");
}

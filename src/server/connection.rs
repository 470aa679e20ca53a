// Connection handling module
// Accepts TCP connections and serves them over HTTP/1.1

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::signal::SignalHandler;
use crate::api;
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Which request handler a listener feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Greeting requests routed to objects
    App,
    /// Management API
    Management,
}

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `service` - Handler that serves the connection
/// * `shutdown` - Signal that winds the connection down gracefully
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    service: Service,
    shutdown: &Arc<SignalHandler>,
) {
    // Increment first, then check: concurrent accepts cannot both slip under the limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if service == Service::App && limit_reached(prev_count, state.config.performance.max_connections) {
        conn_counter.fetch_sub(1, Ordering::SeqCst);
        logger::log_warning(&format!(
            "Max connections reached: {prev_count}/{}. Connection from {peer_addr} rejected.",
            state.config.performance.max_connections.unwrap_or_default()
        ));
        drop(stream);
        return;
    }

    if state.config.logging.access_log && service == Service::App {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        service,
        Arc::clone(shutdown),
    );
}

fn limit_reached(active: usize, max_connections: Option<u64>) -> bool {
    max_connections.is_some_and(|max| active >= usize::try_from(max).unwrap_or(usize::MAX))
}

/// Serve one connection in a local task.
///
/// Keep-alive follows `performance.keep_alive_timeout`; the whole
/// connection is bounded by the larger of the read and write timeouts.
/// On shutdown the in-flight request finishes and idle keep-alive
/// connections close right away.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    service: Service,
    shutdown: Arc<SignalHandler>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
            performance.read_timeout,
            performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move {
                    match service {
                        Service::App => handler::handle_request(req, state, peer_addr).await,
                        Service::Management => api::handle_api_request(req, state).await,
                    }
                }
            }),
        );

        let mut conn = std::pin::pin!(conn);
        let served = async {
            tokio::select! {
                result = conn.as_mut() => result,
                () = shutdown.wait() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            }
        };

        match tokio::time::timeout(timeout_duration, served).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds ({service:?})",
                    timeout_duration.as_secs(),
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_reached() {
        assert!(!limit_reached(1000, None));
        assert!(!limit_reached(9, Some(10)));
        assert!(limit_reached(10, Some(10)));
        assert!(limit_reached(0, Some(0)));
    }
}

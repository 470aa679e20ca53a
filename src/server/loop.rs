// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::{accept_connection, Service};
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

/// Configuration for server loop behavior
pub struct ServerLoopConfig {
    pub service: Service,
    pub shutdown: Arc<SignalHandler>,
    pub log_prefix: &'static str,
}

/// Accept loop shared by the application and management listeners.
///
/// Returns once shutdown is signalled; the listener is dropped on return
/// so no new connections are queued. Connections already accepted keep
/// running in their own tasks.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) {
    loop {
        // Register interest before checking the flag so a shutdown
        // requested in between is not missed
        let notified = config.shutdown.shutdown.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if config.shutdown.is_shutdown_requested() {
            break;
        }

        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            config.service,
                            &config.shutdown,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!(
                            "{}Failed to accept connection: {e}",
                            config.log_prefix
                        ));
                    }
                }
            }

            () = &mut notified => {
                break;
            }
        }
    }

    let addr = listener
        .local_addr()
        .map_or_else(|_| "<unknown>".to_string(), |a| a.to_string());
    logger::log_info(&format!(
        "{}Listener on {addr} closed ({} connection(s) still active)",
        config.log_prefix,
        active_connections.load(Ordering::SeqCst)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut cfg = Config::load_from("does-not-exist/greeter").unwrap();
                cfg.logging.access_log = false;
                let state = Arc::new(AppState::new(&cfg));
                let listener =
                    create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(SignalHandler::new());

                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    Arc::clone(&state),
                    Arc::new(AtomicUsize::new(0)),
                    ServerLoopConfig {
                        service: Service::App,
                        shutdown: Arc::clone(&shutdown),
                        log_prefix: "",
                    },
                ));

                let response = roundtrip(
                    addr,
                    "GET /greet?signedIn=true&fullName=Bob HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
                assert!(response.ends_with("Hello Bob!"), "{response}");

                let response = roundtrip(
                    addr,
                    "POST /greet?loaded=false HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.ends_with("Loading..."), "{response}");

                shutdown.request_shutdown();
                server.await.unwrap();
                assert_eq!(state.objects.len(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_idle_keep_alive_closes_on_shutdown() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut cfg = Config::load_from("does-not-exist/greeter").unwrap();
                cfg.logging.access_log = false;
                let state = Arc::new(AppState::new(&cfg));
                let listener =
                    create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(SignalHandler::new());
                let connections = Arc::new(AtomicUsize::new(0));

                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    Arc::clone(&state),
                    Arc::clone(&connections),
                    ServerLoopConfig {
                        service: Service::App,
                        shutdown: Arc::clone(&shutdown),
                        log_prefix: "",
                    },
                ));

                let mut stream = TcpStream::connect(addr).await.unwrap();
                stream
                    .write_all(b"GET /greet HTTP/1.1\r\nHost: localhost\r\n\r\n")
                    .await
                    .unwrap();
                let mut received = Vec::new();
                let mut buf = [0u8; 1024];
                while !String::from_utf8_lossy(&received).ends_with("Not signed in") {
                    let n = stream.read(&mut buf).await.unwrap();
                    assert!(n > 0, "connection closed early");
                    received.extend_from_slice(&buf[..n]);
                }
                assert_eq!(connections.load(Ordering::SeqCst), 1);

                shutdown.request_shutdown();
                server.await.unwrap();

                // Well inside the 30s connection timeout
                let mut rest = Vec::new();
                let closed = tokio::time::timeout(
                    std::time::Duration::from_secs(2),
                    stream.read_to_end(&mut rest),
                )
                .await;
                assert!(matches!(closed, Ok(Ok(0))), "{closed:?}");

                tokio::time::timeout(std::time::Duration::from_secs(2), async {
                    while connections.load(Ordering::SeqCst) > 0 {
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                })
                .await
                .unwrap();
            })
            .await;
    }
}

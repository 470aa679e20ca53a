use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

mod api;
mod config;
mod greeting;
mod handler;
mod http;
mod logger;
mod objects;
mod server;

use server::connection::Service;
use server::{ServerLoopConfig, SignalHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path (extension optional)
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_addr = cfg.get_socket_addr()?;
    let api_addr = cfg.get_api_socket_addr()?;

    let app_listener = server::create_reusable_listener(app_addr, cfg.server.backlog)?;
    let api_listener = server::create_reusable_listener(api_addr, cfg.server.backlog)?;

    let state = Arc::new(config::AppState::new(&cfg));
    let shutdown = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    logger::log_server_start(&app_addr, &api_addr, &cfg);

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(run_servers(
            app_listener,
            api_listener,
            Arc::clone(&state),
            shutdown,
        ))
        .await;
    // Dropping the set cancels connections that outlived the grace period,
    // releasing their object stubs
    drop(local);

    logger::log_shutdown_started();
    state.objects.shutdown().await;
    logger::log_shutdown_complete();
    Ok(())
}

/// Run both accept loops until shutdown is signalled
async fn run_servers(
    app_listener: TcpListener,
    api_listener: TcpListener,
    state: Arc<config::AppState>,
    shutdown: Arc<SignalHandler>,
) {
    let app_connections = Arc::new(AtomicUsize::new(0));
    let api_connections = Arc::new(AtomicUsize::new(0));
    let grace = Duration::from_secs(state.config.performance.write_timeout);

    let api_loop = tokio::task::spawn_local(server::start_server_loop(
        api_listener,
        Arc::clone(&state),
        Arc::clone(&api_connections),
        ServerLoopConfig {
            service: Service::Management,
            shutdown: Arc::clone(&shutdown),
            log_prefix: "[API] ",
        },
    ));

    server::start_server_loop(
        app_listener,
        state,
        Arc::clone(&app_connections),
        ServerLoopConfig {
            service: Service::App,
            shutdown,
            log_prefix: "",
        },
    )
    .await;

    if let Err(e) = api_loop.await {
        logger::log_api_error(&format!("API server task failed: {e}"));
    }

    let drained = tokio::time::timeout(grace, async {
        while app_connections.load(Ordering::SeqCst) + api_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        logger::log_warning(&format!(
            "Connections still open after {}s grace period, closing them",
            grace.as_secs()
        ));
    }
}

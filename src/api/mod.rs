// API module entry
// Management endpoints served on the separate API listener

mod handlers;
mod response;
mod types;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http;
use crate::logger;

/// API route handler
///
/// Dispatches to handler functions based on request path and method
pub async fn handle_api_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();

    let response = match (req.method(), path) {
        (&Method::GET, "/healthz" | "/readyz") => handlers::handle_health(&state),
        (&Method::GET, "/v1/objects") => handlers::handle_objects(&state),
        (&Method::GET, "/v1/objects/hello") => handlers::handle_hello(req.uri(), &state).await,
        (&Method::GET, "/v1/config") => handlers::handle_config(&state),
        _ => response::not_found(),
    };

    logger::log_api_request(req.method().as_str(), path, response.status().as_u16());
    Ok(http::with_server_header(
        response,
        &state.config.http.server_name,
    ))
}

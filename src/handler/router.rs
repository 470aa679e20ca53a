//! Request routing dispatch module
//!
//! Entry point for application requests: size check, object resolution by
//! path, greeting, access log.

use crate::config::AppState;
use crate::greeting::GreetingRequest;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::objects::{ObjectError, ObjectId};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode, Uri};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
///
/// Method-agnostic: the request body is never read, only its declared size
/// is checked.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();

    let (response, object_id) = match check_body_size(&req, state.config.http.max_body_size) {
        Some(resp) => (resp, None),
        None => {
            let id = state.objects.id_from_name(req.uri().path());
            let response = route_request(req.uri(), &id, &state).await;
            (response, Some(id))
        }
    };

    if state.config.logging.access_log {
        let mut entry = access_entry(&req, peer_addr);
        entry.status = response.status().as_u16();
        entry.body_bytes = response_length(&response);
        entry.object_id = object_id.map(|id| id.as_str().to_string());
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(http::with_server_header(
        response,
        &state.config.http.server_name,
    ))
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Ask the object for `id` to greet with the parameters in `uri`
async fn route_request(uri: &Uri, id: &ObjectId, state: &AppState) -> Response<Full<Bytes>> {
    let request = GreetingRequest::from_query_string(uri.query().unwrap_or(""));

    match greet(state, id, request).await {
        Ok(greeting) => http::build_text_response(StatusCode::OK, greeting),
        Err(e) => {
            logger::log_error(&format!("Greeting for {} failed: {e}", id.name()));
            http::build_500_response()
        }
    }
}

async fn greet(
    state: &AppState,
    id: &ObjectId,
    request: GreetingRequest,
) -> Result<String, ObjectError> {
    state
        .objects
        .with_object(id, |stub| {
            let request = request.clone();
            async move { stub.get_greeting(request).await }
        })
        .await
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}

fn response_length(response: &Response<Full<Bytes>>) -> usize {
    response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

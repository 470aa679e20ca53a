// API response utility functions module

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::types::{ErrorDetail, ErrorResponse};

/// Endpoints listed in 404 responses
pub const AVAILABLE_ENDPOINTS: [&str; 5] = [
    "/healthz",
    "/readyz",
    "/v1/objects",
    "/v1/objects/hello?name=<path>",
    "/v1/config",
];

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string_pretty(body) {
        Ok(j) => j,
        Err(e) => {
            logger::log_api_error(&format!("Failed to serialize response: {e}"));
            return raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"Internal server error"}"#.to_string(),
            );
        }
    };

    raw_json(status, json)
}

/// Error body with the status code repeated inside
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error_detail: ErrorDetail {
                code: status.as_u16(),
                message: message.to_string(),
            },
        },
    )
}

/// 404 Not Found response
pub fn not_found() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "available_endpoints": AVAILABLE_ENDPOINTS,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

fn raw_json(status: StatusCode, json: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            logger::log_api_error(&format!("Failed to build response: {e}"));
            Response::new(Full::new(Bytes::from("Error")))
        })
}

//! HTTP response building module
//!
//! Builders for the few responses the server produces. A builder failure is
//! logged and degrades to a bare response instead of panicking.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, SERVER};
use hyper::{Response, StatusCode};

/// Content type the application listener answers with
pub const TEXT_PLAIN: &str = "text/plain;charset=UTF-8";

/// Build a plain-text response with the given status
pub fn build_text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let content_length = body.len();

    Response::builder()
        .status(status)
        .header("Content-Type", TEXT_PLAIN)
        .header("Content-Length", content_length)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        "413 Payload Too Large".to_string(),
    )
}

/// Build 500 Internal Server Error response
///
/// The body is deliberately generic; details go to the error log.
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}

/// Stamp the configured `Server` header on an outgoing response
pub fn with_server_header(
    mut response: Response<Full<Bytes>>,
    server_name: &str,
) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(e) => crate::logger::log_error(&format!("Invalid server_name '{server_name}': {e}")),
    }
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_text_response() {
        let resp = build_text_response(StatusCode::OK, "Hello Bob!".to_string());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], TEXT_PLAIN);
        assert_eq!(resp.headers()["content-length"], "10");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Hello Bob!");
    }

    #[test]
    fn test_server_header() {
        let resp = with_server_header(build_500_response(), "greeter-server");
        assert_eq!(resp.headers()["server"], "greeter-server");

        let resp = with_server_header(build_500_response(), "bad\nname");
        assert!(resp.headers().get("server").is_none());
    }

    #[test]
    fn test_error_responses() {
        assert_eq!(build_413_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(build_500_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

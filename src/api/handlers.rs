// Management API handlers module

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode, Uri};

use super::response::{error_response, json_response};
use super::types::{ConfigResponse, HealthResponse, HelloResponse, ObjectListResponse};
use crate::config::AppState;
use crate::handler::params::first_value;
use crate::logger;

/// Liveness and readiness
pub fn handle_health(state: &AppState) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            started_at: state.started_at,
            objects: state.objects.len(),
        },
    )
}

/// List live objects
pub fn handle_objects(state: &AppState) -> Response<Full<Bytes>> {
    let objects = state.objects.list();
    json_response(
        StatusCode::OK,
        &ObjectListResponse {
            count: objects.len(),
            objects,
        },
    )
}

/// Run the static greeting query on the object for `?name=` (default `/`)
pub async fn handle_hello(uri: &Uri, state: &AppState) -> Response<Full<Bytes>> {
    let name = first_value(uri.query().unwrap_or(""), "name")
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let id = state.objects.id_from_name(&name);

    let result = state
        .objects
        .with_object(&id, |stub| async move { stub.say_hello().await })
        .await;

    match result {
        Ok(greeting) => json_response(StatusCode::OK, &HelloResponse { id, greeting }),
        Err(e) => {
            logger::log_api_error(&format!("say_hello on {name} failed: {e}"));
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

/// Effective configuration
pub fn handle_config(state: &AppState) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &ConfigResponse {
            config: &state.config,
        },
    )
}

// Management API types
// Response bodies of the management listener

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::Config;
use crate::objects::{ObjectId, ObjectInfo};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub started_at: DateTime<Local>,
    pub objects: usize,
}

#[derive(Debug, Serialize)]
pub struct ObjectListResponse {
    pub count: usize,
    pub objects: Vec<ObjectInfo>,
}

/// Static greeting read from an object's store
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    #[serde(flatten)]
    pub id: ObjectId,
    pub greeting: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse<'a> {
    pub config: &'a Config,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_detail: ErrorDetail,
}

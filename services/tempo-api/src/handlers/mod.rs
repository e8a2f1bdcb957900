//! HTTP request handlers for the TEMPO API.

pub mod data;
pub mod health;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use tempo_common::{TempoError, TempoResult};

/// JSON error body with the status mapped from the error kind.
pub fn error_response(err: &TempoError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Serve a pipeline result: the JSON body as-is, or the mapped error.
pub fn json_body(result: TempoResult<Bytes>) -> Response {
    match result {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => error_response(&err),
    }
}

//! Response helpers.
//!
//! # Responsibilities
//! - JSON payloads with an explicit status (RPC results and errors)
//!
//! # Design Decisions
//! - Errors are reported as `{ "error": "<message>" }` so generated callers
//!   can always decode the body as JSON

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// A JSON body sent with the given status.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPayload(pub Value, pub StatusCode);

impl JsonPayload {
    pub fn ok(value: Value) -> Self {
        Self(value, StatusCode::OK)
    }

    pub fn error(status: StatusCode, message: impl std::fmt::Display) -> Self {
        Self(json!({ "error": message.to_string() }), status)
    }

    pub fn status(&self) -> StatusCode {
        self.1
    }
}

impl IntoResponse for JsonPayload {
    fn into_response(self) -> Response {
        (self.1, Json(self.0)).into_response()
    }
}

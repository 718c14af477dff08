//! Success envelope shared by all HTTP handlers.
//!
//! Mutating endpoints always return the full current state of the affected
//! resource inside `data`, never a bare acknowledgement, so callers can
//! reconcile their view without a follow-up read.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

/// Wrap `data` in the `{success: true, data}` envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

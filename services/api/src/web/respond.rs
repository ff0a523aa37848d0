//! services/api/src/web/respond.rs
//!
//! The uniform success envelope: `{ "success": true, "data": ... }`.
//! The matching error envelope lives with `ApiError` in `error.rs`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Serialize)]
struct SuccessEnvelope<T> {
    success: bool,
    data: T,
}

/// 200 with the success envelope.
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(SuccessEnvelope {
            success: true,
            data,
        }),
    )
}

/// 201 with the success envelope.
pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(SuccessEnvelope {
            success: true,
            data,
        }),
    )
}

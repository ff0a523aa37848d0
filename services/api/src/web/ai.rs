//! services/api/src/web/ai.rs
//!
//! Handler for AI-generated draft answers. Validation happens up front;
//! the generated markdown is streamed to the client incrementally.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::AiAnswerParams;

#[derive(Deserialize, ToSchema)]
pub struct DraftRequest {
    pub question: String,
    pub content: String,
    #[serde(default)]
    pub user_answer: Option<String>,
}

/// POST /ai/answers - Stream a markdown draft answer for a question.
#[utoipa::path(
    post,
    path = "/ai/answers",
    request_body = DraftRequest,
    responses(
        (status = 200, description = "Markdown draft, streamed as plain text"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn draft_answer_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = AiAnswerParams {
        question: body.question,
        content: body.content,
        user_answer: body.user_answer,
    };
    params.validate().map_err(PortError::from)?;

    let stream = state
        .drafts
        .draft_answer(
            params.question.trim(),
            &params.content,
            params.user_answer.as_deref(),
        )
        .await?;

    let body = Body::from_stream(stream);
    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/markdown; charset=utf-8")
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(response)
}

//! services/api/src/web/answers.rs
//!
//! Handlers for answering questions and listing a question's answers.
//! Creating an answer and bumping the parent question's answer counter
//! happen in one transaction inside the store.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{AnswerDto, AnswerItemDto, PageDto};
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::{CreateAnswerParams, PaginatedQuery};

#[derive(Deserialize, ToSchema)]
pub struct AnswerRequest {
    pub content: String,
}

/// POST /questions/{id}/answers - Answer a question.
#[utoipa::path(
    post,
    path = "/questions/{id}/answers",
    request_body = AnswerRequest,
    responses(
        (status = 201, description = "Answer created", body = AnswerDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Question not found")
    )
)]
pub async fn create_answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(question_id): Path<Uuid>,
    Json(body): Json<AnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = CreateAnswerParams {
        question_id,
        content: body.content,
    };
    params.validate().map_err(PortError::from)?;
    let answer = state
        .store
        .create_answer(caller, params.question_id, &params.content)
        .await?;
    Ok(respond::created(AnswerDto::from(answer)))
}

/// GET /questions/{id}/answers - List a question's answers.
#[utoipa::path(
    get,
    path = "/questions/{id}/answers",
    responses(
        (status = 200, description = "One page of answers")
    )
)]
pub async fn list_answers_handler(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<Uuid>,
    Query(query): Query<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(PortError::from)?;
    let page = state.store.list_answers(question_id, &query).await?;
    Ok(respond::ok(PageDto::map(page, AnswerItemDto::from)))
}

//! services/api/src/web/questions.rs
//!
//! Handlers for asking, editing, reading and listing questions. The create
//! and edit mutations delegate the tag reconciliation to the store, which
//! runs it inside one transaction.

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
use crate::web::dto::{PageDto, QuestionDto, QuestionItemDto, ViewsDto};
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::{AskQuestionParams, PaginatedQuery};

#[derive(Deserialize, ToSchema)]
pub struct QuestionRequest {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl QuestionRequest {
    fn into_params(self) -> AskQuestionParams {
        AskQuestionParams {
            title: self.title,
            content: self.content,
            tags: self.tags,
        }
    }
}

/// POST /questions - Ask a question.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = QuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn create_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Json(body): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = body.into_params();
    params.validate().map_err(PortError::from)?;
    let question = state
        .store
        .create_question(caller, params.title.trim(), &params.content, &params.tags)
        .await?;
    Ok(respond::created(QuestionDto::from(question)))
}

/// PUT /questions/{id} - Edit a question (author only).
#[utoipa::path(
    put,
    path = "/questions/{id}",
    request_body = QuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = QuestionDto),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "Question not found")
    )
)]
pub async fn edit_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(question_id): Path<Uuid>,
    Json(body): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = body.into_params();
    params.validate().map_err(PortError::from)?;
    let question = state
        .store
        .edit_question(
            caller,
            question_id,
            params.title.trim(),
            &params.content,
            &params.tags,
        )
        .await?;
    Ok(respond::ok(QuestionDto::from(question)))
}

/// GET /questions/{id} - Fetch one question with author and tags.
#[utoipa::path(
    get,
    path = "/questions/{id}",
    responses(
        (status = 200, description = "The question", body = QuestionItemDto),
        (status = 404, description = "Question not found")
    )
)]
pub async fn get_question_handler(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.store.get_question(question_id).await?;
    Ok(respond::ok(QuestionItemDto::from(item)))
}

/// POST /questions/{id}/views - Bump the view counter.
#[utoipa::path(
    post,
    path = "/questions/{id}/views",
    responses(
        (status = 200, description = "New view count", body = ViewsDto),
        (status = 404, description = "Question not found")
    )
)]
pub async fn increment_views_handler(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.store.increment_views(question_id).await?;
    Ok(respond::ok(ViewsDto { views }))
}

/// GET /questions - Paginated question list with substring search and
/// newest/oldest/popular/unanswered sorting.
#[utoipa::path(
    get,
    path = "/questions",
    responses(
        (status = 200, description = "One page of questions")
    )
)]
pub async fn list_questions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(PortError::from)?;
    let page = state.store.list_questions(&query).await?;
    Ok(respond::ok(PageDto::map(page, QuestionItemDto::from)))
}

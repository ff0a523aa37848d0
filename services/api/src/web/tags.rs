//! services/api/src/web/tags.rs
//!
//! Handlers for browsing tags and the questions under a tag.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{PageDto, QuestionItemDto, TagDto};
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::PaginatedQuery;

/// GET /tags - Paginated tag list with name filter and
/// name/recent/oldest/popular sorting.
#[utoipa::path(
    get,
    path = "/tags",
    responses(
        (status = 200, description = "One page of tags")
    )
)]
pub async fn list_tags_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(PortError::from)?;
    let page = state.store.list_tags(&query).await?;
    Ok(respond::ok(PageDto::map(page, TagDto::from)))
}

/// GET /tags/{id} - One tag with its question counter.
#[utoipa::path(
    get,
    path = "/tags/{id}",
    responses(
        (status = 200, description = "The tag", body = TagDto),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn get_tag_handler(
    State(state): State<Arc<AppState>>,
    Path(tag_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.store.get_tag(tag_id).await?;
    Ok(respond::ok(TagDto::from(tag)))
}

/// GET /tags/{id}/questions - Questions carrying a tag.
#[utoipa::path(
    get,
    path = "/tags/{id}/questions",
    responses(
        (status = 200, description = "One page of questions"),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn list_tag_questions_handler(
    State(state): State<Arc<AppState>>,
    Path(tag_id): Path<Uuid>,
    Query(query): Query<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(PortError::from)?;
    let page = state.store.list_tag_questions(tag_id, &query).await?;
    Ok(respond::ok(PageDto::map(page, QuestionItemDto::from)))
}

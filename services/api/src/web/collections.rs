//! services/api/src/web/collections.rs
//!
//! Handlers for saving questions to the caller's collection.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{PageDto, QuestionItemDto, SavedStateDto};
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::validation::{CollectionBaseParams, PaginatedQuery};
use devstack_core::ports::PortError;

#[derive(Deserialize, ToSchema)]
pub struct SaveRequest {
    pub question_id: Uuid,
}

/// POST /collections/toggle - Save or unsave a question.
///
/// Idempotent toggle: the second identical call undoes the first.
#[utoipa::path(
    post,
    path = "/collections/toggle",
    request_body = SaveRequest,
    responses(
        (status = 200, description = "New saved state", body = SavedStateDto),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Question not found")
    )
)]
pub async fn toggle_save_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Json(body): Json<SaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state.store.toggle_save(caller, body.question_id).await?;
    Ok(respond::ok(SavedStateDto { saved }))
}

/// GET /collections/status - Whether the caller has saved a question.
#[utoipa::path(
    get,
    path = "/collections/status",
    responses(
        (status = 200, description = "Saved state", body = SavedStateDto),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn saved_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Query(params): Query<CollectionBaseParams>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state.store.has_saved(caller, params.question_id).await?;
    Ok(respond::ok(SavedStateDto { saved }))
}

/// GET /collections - The caller's saved questions.
#[utoipa::path(
    get,
    path = "/collections",
    responses(
        (status = 200, description = "One page of saved questions"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_saved_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Query(query): Query<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(PortError::from)?;
    let page = state.store.list_saved(caller, &query).await?;
    Ok(respond::ok(PageDto::map(page, QuestionItemDto::from)))
}

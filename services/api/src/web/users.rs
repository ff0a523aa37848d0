//! services/api/src/web/users.rs
//!
//! Handlers for browsing the community.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{PageDto, UserDto, UserProfileDto};
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::PaginatedQuery;

/// GET /users - Paginated member list with name/username filter.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "One page of users")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate().map_err(PortError::from)?;
    let page = state.store.list_users(&query).await?;
    Ok(respond::ok(PageDto::map(page, UserDto::from)))
}

/// GET /users/{id} - A member's profile with question/answer counts.
#[utoipa::path(
    get,
    path = "/users/{id}",
    responses(
        (status = 200, description = "The user's profile", body = UserProfileDto),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.store.get_user(user_id).await?;
    let stats = state.store.get_user_stats(user_id).await?;
    Ok(respond::ok(UserProfileDto::new(user, stats)))
}

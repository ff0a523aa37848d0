//! services/api/src/web/votes.rs
//!
//! Handlers for casting votes and reading the caller's vote state. The
//! toggle/flip semantics and the counter maintenance live behind the store's
//! `cast_vote`, which runs them in one transaction.

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
use crate::web::dto::VoteStatusDto;
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::{CreateVoteParams, HasVotedParams};

#[derive(Deserialize, ToSchema)]
pub struct VoteRequest {
    pub target_id: Uuid,
    pub target_type: String,
    pub vote_type: String,
}

/// POST /votes - Cast a vote on a question or answer.
///
/// Casting the same direction twice retracts the vote; casting the opposite
/// direction flips it.
#[utoipa::path(
    post,
    path = "/votes",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote applied"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Target not found")
    )
)]
pub async fn cast_vote_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Json(body): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = CreateVoteParams {
        target_id: body.target_id,
        target_type: body.target_type,
        vote_type: body.vote_type,
    };
    let (target_type, vote_type) = params.validated().map_err(PortError::from)?;
    state
        .store
        .cast_vote(caller, params.target_id, target_type, vote_type)
        .await?;
    Ok(respond::ok(()))
}

/// GET /votes/status - The caller's current vote on a target.
#[utoipa::path(
    get,
    path = "/votes/status",
    responses(
        (status = 200, description = "Vote status", body = VoteStatusDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn vote_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Query(params): Query<HasVotedParams>,
) -> Result<impl IntoResponse, ApiError> {
    let target_type = params.validated().map_err(PortError::from)?;
    let status = state
        .store
        .has_voted(caller, params.target_id, target_type)
        .await?;
    Ok(respond::ok(VoteStatusDto::from(status)))
}

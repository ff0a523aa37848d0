//! services/api/src/web/mod.rs
//!
//! The REST surface: handlers, middleware, shared state, and the OpenAPI
//! master definition.

pub mod ai;
pub mod answers;
pub mod auth;
pub mod collections;
pub mod dto;
pub mod middleware;
pub mod questions;
pub mod respond;
pub mod state;
pub mod tags;
pub mod users;
pub mod votes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;

use crate::web::state::AppState;

pub use middleware::require_auth;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        questions::create_question_handler,
        questions::edit_question_handler,
        questions::get_question_handler,
        questions::increment_views_handler,
        questions::list_questions_handler,
        answers::create_answer_handler,
        answers::list_answers_handler,
        votes::cast_vote_handler,
        votes::vote_status_handler,
        collections::toggle_save_handler,
        collections::saved_status_handler,
        collections::list_saved_handler,
        tags::list_tags_handler,
        tags::get_tag_handler,
        tags::list_tag_questions_handler,
        users::list_users_handler,
        users::get_user_handler,
        ai::draft_answer_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            questions::QuestionRequest,
            answers::AnswerRequest,
            votes::VoteRequest,
            collections::SaveRequest,
            ai::DraftRequest,
            dto::QuestionDto,
            dto::QuestionItemDto,
            dto::AnswerDto,
            dto::AnswerItemDto,
            dto::TagDto,
            dto::AuthorDto,
            dto::UserDto,
            dto::UserProfileDto,
            dto::VoteStatusDto,
            dto::SavedStateDto,
            dto::ViewsDto,
        )
    ),
    tags(
        (name = "devstack API", description = "Question/answer forum endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the API router: public reads and auth endpoints, plus the
/// mutation routes behind `require_auth`.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/questions", get(questions::list_questions_handler))
        .route("/questions/{id}", get(questions::get_question_handler))
        .route("/questions/{id}/views", post(questions::increment_views_handler))
        .route("/questions/{id}/answers", get(answers::list_answers_handler))
        .route("/tags", get(tags::list_tags_handler))
        .route("/tags/{id}", get(tags::get_tag_handler))
        .route("/tags/{id}/questions", get(tags::list_tag_questions_handler))
        .route("/users", get(users::list_users_handler))
        .route("/users/{id}", get(users::get_user_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/questions", post(questions::create_question_handler))
        .route("/questions/{id}", put(questions::edit_question_handler))
        .route("/questions/{id}/answers", post(answers::create_answer_handler))
        .route("/votes", post(votes::cast_vote_handler))
        .route("/votes/status", get(votes::vote_status_handler))
        .route("/collections/toggle", post(collections::toggle_save_handler))
        .route("/collections/status", get(collections::saved_status_handler))
        .route("/collections", get(collections::list_saved_handler))
        .route("/ai/answers", post(ai::draft_answer_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .with_state(app_state)
}

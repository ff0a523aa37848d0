//! crates/devstack_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database and language-model
//! integrations behind them.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::domain::{
    Answer, AnswerItem, Question, QuestionItem, Tag, User, UserCredentials, UserStats, VoteKind,
    VoteStatus, VoteTarget,
};
use crate::validation::{PaginatedQuery, ValidationErrors};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error taxonomy every port operation reports through.
///
/// `Validation` is produced before any transaction opens; everything raised
/// inside a transactional operation aborts that transaction before the error
/// surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl From<ValidationErrors> for PortError {
    fn from(errors: ValidationErrors) -> Self {
        PortError::Validation(errors)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// One page of a listing, with enough information to render pagination.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub is_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, offset: u32) -> Self {
        let is_next = (offset as i64) + (items.len() as i64) < total;
        Self { items, total, is_next }
    }
}

//=========================================================================================
// Store Port
//=========================================================================================

/// The forum's persistence contract.
///
/// Implementations must run every multi-write operation (question create and
/// edit, vote cast, answer create) as one all-or-nothing transaction: either
/// every counter, join row and document change commits together, or none of
/// them is ever observable.
#[async_trait]
pub trait ForumStore: Send + Sync {
    // --- Auth and Users ---

    /// Creates a user together with its "credentials" provider account.
    async fn create_user_with_credentials(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session id to its user, rejecting expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats>;

    async fn list_users(&self, query: &PaginatedQuery) -> PortResult<Page<User>>;

    // --- Questions ---

    /// Creates a question and reconciles its tags (find-or-create by
    /// case-insensitive name, counter +1, join row, ordered attach) in one
    /// transaction.
    async fn create_question(
        &self,
        author: Uuid,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> PortResult<Question>;

    /// Edits a question (author-only) and reconciles its tag set against the
    /// desired names in one transaction.
    async fn edit_question(
        &self,
        caller: Uuid,
        question_id: Uuid,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> PortResult<Question>;

    async fn get_question(&self, question_id: Uuid) -> PortResult<QuestionItem>;

    /// Bumps the view counter, returning the new count.
    async fn increment_views(&self, question_id: Uuid) -> PortResult<i64>;

    async fn list_questions(&self, query: &PaginatedQuery) -> PortResult<Page<QuestionItem>>;

    // --- Answers ---

    /// Inserts the answer and increments the question's answer counter in
    /// one transaction; the two writes are never observed independently.
    async fn create_answer(
        &self,
        author: Uuid,
        question_id: Uuid,
        content: &str,
    ) -> PortResult<Answer>;

    async fn list_answers(
        &self,
        question_id: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<AnswerItem>>;

    // --- Votes ---

    /// Casts a vote: create on first cast, retract on a repeat of the same
    /// direction, flip on the opposite direction — with the matching counter
    /// updates on the target, all in one transaction.
    async fn cast_vote(
        &self,
        author: Uuid,
        target_id: Uuid,
        target_type: VoteTarget,
        vote_type: VoteKind,
    ) -> PortResult<()>;

    /// Read-only; no transaction required.
    async fn has_voted(
        &self,
        author: Uuid,
        target_id: Uuid,
        target_type: VoteTarget,
    ) -> PortResult<VoteStatus>;

    // --- Collections ---

    /// Toggles the saved state, returning the state after the call.
    async fn toggle_save(&self, author: Uuid, question_id: Uuid) -> PortResult<bool>;

    async fn has_saved(&self, author: Uuid, question_id: Uuid) -> PortResult<bool>;

    async fn list_saved(
        &self,
        author: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<QuestionItem>>;

    // --- Tags ---

    async fn list_tags(&self, query: &PaginatedQuery) -> PortResult<Page<Tag>>;

    async fn get_tag(&self, tag_id: Uuid) -> PortResult<Tag>;

    async fn list_tag_questions(
        &self,
        tag_id: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<QuestionItem>>;
}

//=========================================================================================
// Draft Answer Port
//=========================================================================================

/// A stream of generated text chunks.
pub type DraftStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

/// Generates an AI draft answer for a question as an incremental text
/// stream. The core treats the generator as opaque.
#[async_trait]
pub trait DraftAnswerService: Send + Sync {
    async fn draft_answer(
        &self,
        question: &str,
        content: &str,
        user_answer: Option<&str>,
    ) -> PortResult<DraftStream>;
}

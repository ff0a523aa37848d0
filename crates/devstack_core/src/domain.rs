//! crates/devstack_core/src/domain.rs
//!
//! Defines the pure, core data structures for the forum.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered forum member.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub location: Option<String>,
    pub portfolio: Option<String>,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A question with its denormalized counters and ordered tag references.
///
/// `upvotes`, `downvotes`, `answers` and `views` duplicate information
/// derivable from the vote/answer rows; the store keeps them in sync inside
/// the same transaction as the row changes.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: Uuid,
    pub upvotes: i64,
    pub downvotes: i64,
    pub answers: i64,
    pub views: i64,
    pub tag_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// An answer to a question. Immutable after creation except for its
/// vote counters.
#[derive(Debug, Clone)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author: Uuid,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

/// A tag. `questions` counts the join rows that currently reference it.
/// Names are compared case-insensitively; the record persists even when the
/// counter drops back to zero.
#[derive(Debug, Clone)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub questions: i64,
    pub created_at: DateTime<Utc>,
}

/// The caller's current vote on a question or answer. At most one per
/// (author, target_type, target_id).
#[derive(Debug, Clone)]
pub struct Vote {
    pub id: Uuid,
    pub author: Uuid,
    pub target_id: Uuid,
    pub target_type: VoteTarget,
    pub vote_type: VoteKind,
}

/// A saved question. At most one per (author, question_id).
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: Uuid,
    pub author: Uuid,
    pub question_id: Uuid,
}

/// Author attribution attached to listed questions and answers.
#[derive(Debug, Clone)]
pub struct AuthorRef {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

/// A question joined with its author and resolved tags, as the question
/// page and list endpoints render it.
#[derive(Debug, Clone)]
pub struct QuestionItem {
    pub question: Question,
    pub author: AuthorRef,
    pub tags: Vec<Tag>,
}

/// An answer joined with its author.
#[derive(Debug, Clone)]
pub struct AnswerItem {
    pub answer: Answer,
    pub author: AuthorRef,
}

/// Aggregates shown on a user's profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserStats {
    pub questions: i64,
    pub answers: i64,
}

/// The caller's current vote direction on a target. Mutually exclusive;
/// both false when no vote exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteStatus {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

/// What a vote points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Question,
    Answer,
}

impl VoteTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteTarget::Question => "question",
            VoteTarget::Answer => "answer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "question" => Some(VoteTarget::Question),
            "answer" => Some(VoteTarget::Answer),
            _ => None,
        }
    }
}

/// The direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Upvote => "upvote",
            VoteKind::Downvote => "downvote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upvote" => Some(VoteKind::Upvote),
            "downvote" => Some(VoteKind::Downvote),
            _ => None,
        }
    }
}

//! crates/devstack_core/src/validation.rs
//!
//! Typed input parameters for every mutation and query, each paired with its
//! own validator. Validation is pure and synchronous: it runs before any
//! caller opens a transaction, and on failure produces a field -> messages
//! map that is returned to the client verbatim.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{VoteKind, VoteTarget};

//=========================================================================================
// Field-Level Error Map
//=========================================================================================

/// An ordered map of field name -> validation messages.
///
/// Ordered so the serialized error detail is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
        self.fields
    }

    /// Returns `Ok(())` when no message was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

//=========================================================================================
// Shared Shape Checks
//=========================================================================================

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username regex is valid"));

fn check_length(errors: &mut ValidationErrors, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min {
        errors.add(field, format!("Must be at least {} characters", min));
    } else if len > max {
        errors.add(field, format!("Cannot exceed {} characters", max));
    }
}

//=========================================================================================
// Question Mutations
//=========================================================================================

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 100;
pub const TAGS_MAX: usize = 5;
pub const TAG_NAME_MAX: usize = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct AskQuestionParams {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl AskQuestionParams {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_length(&mut errors, "title", self.title.trim(), TITLE_MIN, TITLE_MAX);
        if self.content.trim().is_empty() {
            errors.add("content", "Content is required");
        }
        if self.tags.is_empty() {
            errors.add("tags", "At least one tag is required");
        } else if self.tags.len() > TAGS_MAX {
            errors.add("tags", format!("You can only add up to {} tags", TAGS_MAX));
        }
        for tag in &self.tags {
            let trimmed = tag.trim();
            if trimmed.is_empty() {
                errors.add("tags", "Tags cannot be empty");
            } else if trimmed.chars().count() > TAG_NAME_MAX {
                errors.add(
                    "tags",
                    format!("Tags cannot exceed {} characters", TAG_NAME_MAX),
                );
            }
        }
        errors.into_result()
    }
}

//=========================================================================================
// Answer Mutations
//=========================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnswerParams {
    pub question_id: Uuid,
    pub content: String,
}

impl CreateAnswerParams {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.content.trim().is_empty() {
            errors.add("content", "Content is required");
        }
        errors.into_result()
    }
}

//=========================================================================================
// Vote Mutations and Queries
//=========================================================================================

/// Raw vote input. `target_type` and `vote_type` arrive as strings and are
/// parsed into their enums as part of validation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVoteParams {
    pub target_id: Uuid,
    pub target_type: String,
    pub vote_type: String,
}

impl CreateVoteParams {
    /// Validates and parses the two discriminator fields in one pass.
    pub fn validated(&self) -> Result<(VoteTarget, VoteKind), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let target = VoteTarget::parse(&self.target_type);
        if target.is_none() {
            errors.add("target_type", "Must be either 'question' or 'answer'");
        }
        let kind = VoteKind::parse(&self.vote_type);
        if kind.is_none() {
            errors.add("vote_type", "Must be either 'upvote' or 'downvote'");
        }
        match (target, kind) {
            (Some(target), Some(kind)) => Ok((target, kind)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HasVotedParams {
    pub target_id: Uuid,
    pub target_type: String,
}

impl HasVotedParams {
    pub fn validated(&self) -> Result<VoteTarget, ValidationErrors> {
        VoteTarget::parse(&self.target_type).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.add("target_type", "Must be either 'question' or 'answer'");
            errors
        })
    }
}

//=========================================================================================
// Collection Mutations
//=========================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionBaseParams {
    pub question_id: Uuid,
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpParams {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpParams {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_length(&mut errors, "username", &self.username, 3, 30);
        if !self.username.is_empty() && !USERNAME_RE.is_match(&self.username) {
            errors.add(
                "username",
                "Username can only contain letters, numbers and underscores",
            );
        }

        check_length(&mut errors, "name", self.name.trim(), 1, 50);

        if !EMAIL_RE.is_match(&self.email) {
            errors.add("email", "Please provide a valid email");
        }

        check_length(&mut errors, "password", &self.password, 6, 100);
        if !self.password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.add("password", "Password must contain at least one uppercase letter");
        }
        if !self.password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.add("password", "Password must contain at least one lowercase letter");
        }
        if !self.password.chars().any(|c| c.is_ascii_digit()) {
            errors.add("password", "Password must contain at least one number");
        }
        if self.password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.add("password", "Password must contain at least one special character");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInParams {
    pub email: String,
    pub password: String,
}

impl SignInParams {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !EMAIL_RE.is_match(&self.email) {
            errors.add("email", "Please provide a valid email");
        }
        check_length(&mut errors, "password", &self.password, 6, 100);
        errors.into_result()
    }
}

//=========================================================================================
// AI Draft Answers
//=========================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AiAnswerParams {
    pub question: String,
    pub content: String,
    #[serde(default)]
    pub user_answer: Option<String>,
}

impl AiAnswerParams {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_length(&mut errors, "question", self.question.trim(), TITLE_MIN, 130);
        if self.content.trim().is_empty() {
            errors.add("content", "Content is required");
        }
        errors.into_result()
    }
}

//=========================================================================================
// Paginated Queries
//=========================================================================================

pub const PAGE_SIZE_DEFAULT: u32 = 10;
pub const PAGE_SIZE_MAX: u32 = 100;

/// Common pagination/search envelope shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginatedQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub query: Option<String>,
    pub filter: Option<String>,
}

impl PaginatedQuery {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.page == Some(0) {
            errors.add("page", "Page starts at 1");
        }
        match self.page_size {
            Some(0) => errors.add("page_size", "Page size must be at least 1"),
            Some(size) if size > PAGE_SIZE_MAX => {
                errors.add("page_size", format!("Page size cannot exceed {}", PAGE_SIZE_MAX))
            }
            _ => {}
        }
        errors.into_result()
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(PAGE_SIZE_DEFAULT).clamp(1, PAGE_SIZE_MAX)
    }

    /// Zero-based row offset for the requested page.
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.page_size()
    }
}

//=========================================================================================
// Tests
//=========================================================================================

//! services/api/src/web/dto.rs
//!
//! JSON representations of the domain types, as the REST API exposes them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use devstack_core::domain::{
    Answer, AnswerItem, AuthorRef, Question, QuestionItem, Tag, User, UserStats, VoteStatus,
};
use devstack_core::ports::Page;

#[derive(Serialize, ToSchema)]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub is_next: bool,
}

impl<T> PageDto<T> {
    pub fn map<S>(page: Page<S>, f: impl Fn(S) -> T) -> Self {
        Self {
            items: page.items.into_iter().map(f).collect(),
            total: page.total,
            is_next: page.is_next,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthorDto {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<AuthorRef> for AuthorDto {
    fn from(author: AuthorRef) -> Self {
        Self {
            id: author.id,
            name: author.name,
            avatar: author.avatar,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TagDto {
    pub id: Uuid,
    pub name: String,
    pub questions: i64,
}

impl From<Tag> for TagDto {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            questions: tag.questions,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuestionDto {
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

impl From<Question> for QuestionDto {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            author: question.author,
            upvotes: question.upvotes,
            downvotes: question.downvotes,
            answers: question.answers,
            views: question.views,
            tag_ids: question.tag_ids,
            created_at: question.created_at,
        }
    }
}

/// A question with its author and resolved tags, as lists and the question
/// page render it.
#[derive(Serialize, ToSchema)]
pub struct QuestionItemDto {
    #[serde(flatten)]
    pub question: QuestionDto,
    pub author_info: AuthorDto,
    pub tags: Vec<TagDto>,
}

impl From<QuestionItem> for QuestionItemDto {
    fn from(item: QuestionItem) -> Self {
        Self {
            question: item.question.into(),
            author_info: item.author.into(),
            tags: item.tags.into_iter().map(TagDto::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AnswerDto {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author: Uuid,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Answer> for AnswerDto {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            author: answer.author,
            content: answer.content,
            upvotes: answer.upvotes,
            downvotes: answer.downvotes,
            created_at: answer.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AnswerItemDto {
    #[serde(flatten)]
    pub answer: AnswerDto,
    pub author_info: AuthorDto,
}

impl From<AnswerItem> for AnswerItemDto {
    fn from(item: AnswerItem) -> Self {
        Self {
            answer: item.answer.into(),
            author_info: item.author.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub location: Option<String>,
    pub portfolio: Option<String>,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            bio: user.bio,
            avatar: user.avatar,
            location: user.location,
            portfolio: user.portfolio,
            reputation: user.reputation,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserProfileDto {
    #[serde(flatten)]
    pub user: UserDto,
    pub questions: i64,
    pub answers: i64,
}

impl UserProfileDto {
    pub fn new(user: User, stats: UserStats) -> Self {
        Self {
            user: user.into(),
            questions: stats.questions,
            answers: stats.answers,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct VoteStatusDto {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

impl From<VoteStatus> for VoteStatusDto {
    fn from(status: VoteStatus) -> Self {
        Self {
            has_upvoted: status.has_upvoted,
            has_downvoted: status.has_downvoted,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SavedStateDto {
    pub saved: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ViewsDto {
    pub views: i64,
}

//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `ForumStore` port from the `core` crate. It handles
//! all interactions with PostgreSQL using `sqlx`.
//!
//! Every multi-write operation (question create/edit, vote cast, answer
//! create) runs inside one `sqlx` transaction. An early `?` return drops the
//! transaction, which rolls it back, so no partial counter/join state is
//! ever committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use devstack_core::domain::{
    Answer, AnswerItem, AuthorRef, Question, QuestionItem, Tag, User, UserCredentials, UserStats,
    VoteKind, VoteStatus, VoteTarget,
};
use devstack_core::ports::{ForumStore, Page, PortError, PortResult};
use devstack_core::tags::{plan_tags, AttachedTag};
use devstack_core::validation::{PaginatedQuery, ValidationErrors};
use devstack_core::votes::VoteTransition;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A PostgreSQL adapter that implements the `ForumStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    username: String,
    email: String,
    bio: Option<String>,
    avatar: Option<String>,
    location: Option<String>,
    portfolio: Option<String>,
    reputation: i64,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            username: self.username,
            email: self.email,
            bio: self.bio,
            avatar: self.avatar,
            location: self.location,
            portfolio: self.portfolio,
            reputation: self.reputation,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    title: String,
    content: String,
    author: Uuid,
    upvotes: i64,
    downvotes: i64,
    answers: i64,
    views: i64,
    tag_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl QuestionRecord {
    fn to_domain(self) -> Question {
        Question {
            id: self.id,
            title: self.title,
            content: self.content,
            author: self.author,
            upvotes: self.upvotes,
            downvotes: self.downvotes,
            answers: self.answers,
            views: self.views,
            tag_ids: self.tag_ids,
            created_at: self.created_at,
        }
    }
}

/// A question row joined with its author's display fields.
#[derive(FromRow)]
struct QuestionWithAuthorRecord {
    id: Uuid,
    title: String,
    content: String,
    author: Uuid,
    upvotes: i64,
    downvotes: i64,
    answers: i64,
    views: i64,
    tag_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    author_name: String,
    author_avatar: Option<String>,
}

impl QuestionWithAuthorRecord {
    fn split(self) -> (Question, AuthorRef) {
        let author = AuthorRef {
            id: self.author,
            name: self.author_name,
            avatar: self.author_avatar,
        };
        let question = Question {
            id: self.id,
            title: self.title,
            content: self.content,
            author: self.author,
            upvotes: self.upvotes,
            downvotes: self.downvotes,
            answers: self.answers,
            views: self.views,
            tag_ids: self.tag_ids,
            created_at: self.created_at,
        };
        (question, author)
    }
}

#[derive(FromRow)]
struct AnswerRecord {
    id: Uuid,
    question_id: Uuid,
    author: Uuid,
    content: String,
    upvotes: i64,
    downvotes: i64,
    created_at: DateTime<Utc>,
}

impl AnswerRecord {
    fn to_domain(self) -> Answer {
        Answer {
            id: self.id,
            question_id: self.question_id,
            author: self.author,
            content: self.content,
            upvotes: self.upvotes,
            downvotes: self.downvotes,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AnswerWithAuthorRecord {
    id: Uuid,
    question_id: Uuid,
    author: Uuid,
    content: String,
    upvotes: i64,
    downvotes: i64,
    created_at: DateTime<Utc>,
    author_name: String,
    author_avatar: Option<String>,
}

impl AnswerWithAuthorRecord {
    fn to_item(self) -> AnswerItem {
        AnswerItem {
            answer: Answer {
                id: self.id,
                question_id: self.question_id,
                author: self.author,
                content: self.content,
                upvotes: self.upvotes,
                downvotes: self.downvotes,
                created_at: self.created_at,
            },
            author: AuthorRef {
                id: self.author,
                name: self.author_name,
                avatar: self.author_avatar,
            },
        }
    }
}

#[derive(FromRow)]
struct TagRecord {
    id: Uuid,
    name: String,
    questions: i64,
    created_at: DateTime<Utc>,
}

impl TagRecord {
    fn to_domain(self) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            questions: self.questions,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Transaction-Scoped Helpers
//=========================================================================================

const QUESTION_COLUMNS: &str =
    "id, title, content, author, upvotes, downvotes, answers, views, tag_ids, created_at";

const QUESTION_AUTHOR_COLUMNS: &str = "q.id, q.title, q.content, q.author, q.upvotes, \
     q.downvotes, q.answers, q.views, q.tag_ids, q.created_at, \
     u.name AS author_name, u.avatar AS author_avatar";

impl PgStore {
    /// Locks and returns a question row inside a transaction, or `NotFound`.
    async fn lock_question(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        question_id: Uuid,
    ) -> PortResult<QuestionRecord> {
        sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions WHERE id = $1 FOR UPDATE",
            QUESTION_COLUMNS
        ))
        .bind(question_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Question {} not found", question_id)))
    }

    /// Finds a tag by case-insensitive name, creating it if absent, and
    /// bumps its question counter — one atomic upsert against the
    /// `lower(name)` unique index, so two concurrent creators of "Rust" and
    /// "rust" converge on a single row.
    async fn find_or_create_tag(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> PortResult<TagRecord> {
        sqlx::query_as::<_, TagRecord>(
            "INSERT INTO tags (id, name, questions) VALUES ($1, $2, 1) \
             ON CONFLICT ((lower(name))) \
             DO UPDATE SET questions = tags.questions + 1 \
             RETURNING id, name, questions, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .map_err(unexpected)
    }

    /// Applies the add-side of a tag plan: find-or-create each tag, insert
    /// the join rows, and return the new tag ids in plan order.
    async fn attach_tags(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        question_id: Uuid,
        names: &[String],
    ) -> PortResult<Vec<Uuid>> {
        let mut added = Vec::with_capacity(names.len());
        for name in names {
            let tag = self.find_or_create_tag(tx, name).await?;
            sqlx::query(
                "INSERT INTO tag_questions (id, question_id, tag_id) VALUES ($1, $2, $3)",
            )
            .bind(Uuid::new_v4())
            .bind(question_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await
            .map_err(unexpected)?;
            added.push(tag.id);
        }
        Ok(added)
    }

    /// Applies the remove-side of a tag plan: counter down (floored at
    /// zero), join rows deleted.
    async fn detach_tags(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        question_id: Uuid,
        tag_ids: &[Uuid],
    ) -> PortResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE tags SET questions = GREATEST(questions - 1, 0) WHERE id = ANY($1)")
            .bind(tag_ids)
            .execute(&mut **tx)
            .await
            .map_err(unexpected)?;
        sqlx::query("DELETE FROM tag_questions WHERE question_id = $1 AND tag_id = ANY($2)")
            .bind(question_id)
            .bind(tag_ids)
            .execute(&mut **tx)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    /// Adjusts the up/downvote counter on the vote's target, floored at
    /// zero, or fails `NotFound` when the target does not exist.
    async fn apply_counter_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        target_id: Uuid,
        target_type: VoteTarget,
        kind: VoteKind,
        change: i64,
    ) -> PortResult<()> {
        let table = match target_type {
            VoteTarget::Question => "questions",
            VoteTarget::Answer => "answers",
        };
        let column = match kind {
            VoteKind::Upvote => "upvotes",
            VoteKind::Downvote => "downvotes",
        };
        let result = sqlx::query(&format!(
            "UPDATE {table} SET {column} = GREATEST({column} + $1, 0) WHERE id = $2"
        ))
        .bind(change)
        .bind(target_id)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "{} {} not found",
                target_type.as_str(),
                target_id
            )));
        }
        Ok(())
    }

    /// Resolves the tags referenced by a set of questions and assembles
    /// `QuestionItem`s, preserving each question's attached tag order.
    async fn to_question_items(
        &self,
        records: Vec<QuestionWithAuthorRecord>,
    ) -> PortResult<Vec<QuestionItem>> {
        let mut all_tag_ids: Vec<Uuid> = Vec::new();
        for record in &records {
            for id in &record.tag_ids {
                if !all_tag_ids.contains(id) {
                    all_tag_ids.push(*id);
                }
            }
        }

        let tags: Vec<TagRecord> = if all_tag_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, TagRecord>(
                "SELECT id, name, questions, created_at FROM tags WHERE id = ANY($1)",
            )
            .bind(&all_tag_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
        };
        let tags: Vec<Tag> = tags.into_iter().map(|t| t.to_domain()).collect();

        let items = records
            .into_iter()
            .map(|record| {
                let (question, author) = record.split();
                let question_tags = question
                    .tag_ids
                    .iter()
                    .filter_map(|id| tags.iter().find(|t| t.id == *id).cloned())
                    .collect();
                QuestionItem {
                    question,
                    author,
                    tags: question_tags,
                }
            })
            .collect();
        Ok(items)
    }
}

//=========================================================================================
// `ForumStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ForumStore for PgStore {
    // --- Auth and Users ---

    async fn create_user_with_credentials(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // A duplicate is the caller's mistake, reported per field like any
        // other validation failure.
        let existing: Option<(String, String)> =
            sqlx::query_as("SELECT email, username FROM users WHERE email = $1 OR username = $2")
                .bind(email)
                .bind(username)
                .fetch_optional(&mut *tx)
                .await
                .map_err(unexpected)?;
        if let Some((taken_email, taken_username)) = existing {
            let mut errors = ValidationErrors::new();
            if taken_email == email {
                errors.add("email", "Email is already registered");
            }
            if taken_username == username {
                errors.add("username", "Username is already taken");
            }
            return Err(PortError::Validation(errors));
        }

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, name, username, email) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, username, email, bio, avatar, location, portfolio, \
                       reputation, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(username)
        .bind(email)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO accounts (id, user_id, name, password_hash, provider, provider_account_id) \
             VALUES ($1, $2, $3, $4, 'credentials', $5)",
        )
        .bind(Uuid::new_v4())
        .bind(record.id)
        .bind(name)
        .bind(password_hash)
        .bind(email)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row: Option<(Uuid, String, String)> = sqlx::query_as(
            "SELECT u.id, u.email, a.password_hash \
             FROM users u \
             JOIN accounts a ON a.user_id = u.id AND a.provider = 'credentials' \
             WHERE u.email = $1 AND a.password_hash IS NOT NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        let (user_id, email, password_hash) =
            row.ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;
        Ok(UserCredentials {
            user_id,
            email,
            password_hash,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, username, email, bio, avatar, location, portfolio, \
                    reputation, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(UserRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let questions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE author = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        let answers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE author = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(UserStats { questions, answers })
    }

    async fn list_users(&self, query: &PaginatedQuery) -> PortResult<Page<User>> {
        let pattern = query.query.as_ref().map(|q| format!("%{}%", q));
        let order = match query.filter.as_deref() {
            Some("oldest") => "created_at ASC",
            Some("popular") => "reputation DESC",
            _ => "created_at DESC",
        };

        let filter_clause = if pattern.is_some() {
            "WHERE name ILIKE $1 OR username ILIKE $1"
        } else {
            ""
        };

        let total_sql = format!("SELECT COUNT(*) FROM users {}", filter_clause);
        let list_sql = format!(
            "SELECT id, name, username, email, bio, avatar, location, portfolio, \
                    reputation, created_at \
             FROM users {} ORDER BY {} LIMIT {} OFFSET {}",
            filter_clause,
            order,
            query.page_size(),
            query.offset()
        );

        let (total, records) = match &pattern {
            Some(pattern) => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(pattern)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, UserRecord>(&list_sql)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
            None => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, UserRecord>(&list_sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
        };

        let users = records.into_iter().map(UserRecord::to_domain).collect();
        Ok(Page::new(users, total, query.offset()))
    }

    // --- Questions ---

    async fn create_question(
        &self,
        author: Uuid,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> PortResult<Question> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let question = sqlx::query_as::<_, QuestionRecord>(&format!(
            "INSERT INTO questions (id, title, content, author) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(content)
        .bind(author)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        // Nothing is attached yet, so the plan is purely additive.
        let plan = plan_tags(&[], tags);
        let tag_ids = self.attach_tags(&mut tx, question.id, &plan.to_add).await?;

        let question = sqlx::query_as::<_, QuestionRecord>(&format!(
            "UPDATE questions SET tag_ids = $1 WHERE id = $2 RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(&tag_ids)
        .bind(question.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(question.to_domain())
    }

    async fn edit_question(
        &self,
        caller: Uuid,
        question_id: Uuid,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> PortResult<Question> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let question = self.lock_question(&mut tx, question_id).await?;
        if question.author != caller {
            return Err(PortError::Forbidden(
                "Only the author can edit this question".to_string(),
            ));
        }

        // Resolve the currently attached tags in attach order so the diff
        // and the rewritten tag_ids list stay stable.
        let current_records: Vec<TagRecord> = if question.tag_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, TagRecord>(
                "SELECT id, name, questions, created_at FROM tags WHERE id = ANY($1)",
            )
            .bind(&question.tag_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(unexpected)?
        };
        let current: Vec<AttachedTag> = question
            .tag_ids
            .iter()
            .filter_map(|id| {
                current_records
                    .iter()
                    .find(|t| t.id == *id)
                    .map(|t| AttachedTag {
                        id: t.id,
                        name: t.name.clone(),
                    })
            })
            .collect();

        let plan = plan_tags(&current, tags);
        self.detach_tags(&mut tx, question_id, &plan.to_remove).await?;
        let added = self.attach_tags(&mut tx, question_id, &plan.to_add).await?;

        let mut tag_ids = plan.kept;
        tag_ids.extend(added);

        let question = sqlx::query_as::<_, QuestionRecord>(&format!(
            "UPDATE questions SET title = $1, content = $2, tag_ids = $3 WHERE id = $4 \
             RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(title)
        .bind(content)
        .bind(&tag_ids)
        .bind(question_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(question.to_domain())
    }

    async fn get_question(&self, question_id: Uuid) -> PortResult<QuestionItem> {
        let record = sqlx::query_as::<_, QuestionWithAuthorRecord>(&format!(
            "SELECT {} FROM questions q JOIN users u ON u.id = q.author WHERE q.id = $1",
            QUESTION_AUTHOR_COLUMNS
        ))
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Question {} not found", question_id)))?;

        let mut items = self.to_question_items(vec![record]).await?;
        // to_question_items preserves input length
        items
            .pop()
            .ok_or_else(|| PortError::Unexpected("Question item missing".to_string()))
    }

    async fn increment_views(&self, question_id: Uuid) -> PortResult<i64> {
        let views: Option<i64> =
            sqlx::query_scalar("UPDATE questions SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(question_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        views.ok_or_else(|| PortError::NotFound(format!("Question {} not found", question_id)))
    }

    async fn list_questions(&self, query: &PaginatedQuery) -> PortResult<Page<QuestionItem>> {
        let pattern = query.query.as_ref().map(|q| format!("%{}%", q));
        let mut clauses: Vec<&str> = Vec::new();
        if pattern.is_some() {
            clauses.push("(q.title ILIKE $1 OR q.content ILIKE $1)");
        }
        let order = match query.filter.as_deref() {
            Some("oldest") => "q.created_at ASC",
            Some("popular") => "q.upvotes DESC",
            Some("unanswered") => {
                clauses.push("q.answers = 0");
                "q.created_at DESC"
            }
            _ => "q.created_at DESC",
        };
        let filter_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total_sql = format!("SELECT COUNT(*) FROM questions q {}", filter_clause);
        let list_sql = format!(
            "SELECT {} FROM questions q JOIN users u ON u.id = q.author {} \
             ORDER BY {} LIMIT {} OFFSET {}",
            QUESTION_AUTHOR_COLUMNS,
            filter_clause,
            order,
            query.page_size(),
            query.offset()
        );

        let (total, records) = match &pattern {
            Some(pattern) => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(pattern)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, QuestionWithAuthorRecord>(&list_sql)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
            None => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, QuestionWithAuthorRecord>(&list_sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
        };

        let items = self.to_question_items(records).await?;
        Ok(Page::new(items, total, query.offset()))
    }

    // --- Answers ---

    async fn create_answer(
        &self,
        author: Uuid,
        question_id: Uuid,
        content: &str,
    ) -> PortResult<Answer> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        self.lock_question(&mut tx, question_id).await?;

        let answer = sqlx::query_as::<_, AnswerRecord>(
            "INSERT INTO answers (id, question_id, author, content) VALUES ($1, $2, $3, $4) \
             RETURNING id, question_id, author, content, upvotes, downvotes, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(question_id)
        .bind(author)
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("UPDATE questions SET answers = answers + 1 WHERE id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(answer.to_domain())
    }

    async fn list_answers(
        &self,
        question_id: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<AnswerItem>> {
        let order = match query.filter.as_deref() {
            Some("oldest") => "a.created_at ASC",
            Some("popular") => "a.upvotes DESC",
            _ => "a.created_at DESC",
        };

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE question_id = $1")
            .bind(question_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let records = sqlx::query_as::<_, AnswerWithAuthorRecord>(&format!(
            "SELECT a.id, a.question_id, a.author, a.content, a.upvotes, a.downvotes, \
                    a.created_at, u.name AS author_name, u.avatar AS author_avatar \
             FROM answers a JOIN users u ON u.id = a.author \
             WHERE a.question_id = $1 ORDER BY {} LIMIT {} OFFSET {}",
            order,
            query.page_size(),
            query.offset()
        ))
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let items = records.into_iter().map(AnswerWithAuthorRecord::to_item).collect();
        Ok(Page::new(items, total, query.offset()))
    }

    // --- Votes ---

    async fn cast_vote(
        &self,
        author: Uuid,
        target_id: Uuid,
        target_type: VoteTarget,
        vote_type: VoteKind,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Lock the caller's existing vote row (if any) so two concurrent
        // casts serialize here; a concurrent first-cast pair is resolved by
        // the (author, target_type, target_id) unique index instead.
        let existing: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT id, vote_type FROM votes \
             WHERE author = $1 AND target_type = $2 AND target_id = $3 FOR UPDATE",
        )
        .bind(author)
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        let existing_kind = match &existing {
            Some((_, raw)) => Some(VoteKind::parse(raw).ok_or_else(|| {
                PortError::Unexpected(format!("Unknown vote_type '{}' in store", raw))
            })?),
            None => None,
        };

        let transition = VoteTransition::decide(existing_kind, vote_type);
        match transition {
            VoteTransition::Create => {
                sqlx::query(
                    "INSERT INTO votes (id, author, target_id, target_type, vote_type) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(Uuid::new_v4())
                .bind(author)
                .bind(target_id)
                .bind(target_type.as_str())
                .bind(vote_type.as_str())
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
            }
            VoteTransition::Retract => {
                let (vote_id, _) = existing.as_ref().ok_or_else(|| {
                    PortError::Unexpected("Retract without an existing vote".to_string())
                })?;
                sqlx::query("DELETE FROM votes WHERE id = $1")
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
            }
            VoteTransition::Flip { .. } => {
                let (vote_id, _) = existing.as_ref().ok_or_else(|| {
                    PortError::Unexpected("Flip without an existing vote".to_string())
                })?;
                sqlx::query("UPDATE votes SET vote_type = $1 WHERE id = $2")
                    .bind(vote_type.as_str())
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
            }
        }

        for delta in transition.counter_deltas(vote_type) {
            self.apply_counter_delta(&mut tx, target_id, target_type, delta.kind, delta.change)
                .await?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn has_voted(
        &self,
        author: Uuid,
        target_id: Uuid,
        target_type: VoteTarget,
    ) -> PortResult<VoteStatus> {
        let vote_type: Option<(String,)> = sqlx::query_as(
            "SELECT vote_type FROM votes \
             WHERE author = $1 AND target_type = $2 AND target_id = $3",
        )
        .bind(author)
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(match vote_type.as_ref().map(|(raw,)| raw.as_str()) {
            Some("upvote") => VoteStatus {
                has_upvoted: true,
                has_downvoted: false,
            },
            Some("downvote") => VoteStatus {
                has_upvoted: false,
                has_downvoted: true,
            },
            _ => VoteStatus::default(),
        })
    }

    // --- Collections ---

    async fn toggle_save(&self, author: Uuid, question_id: Uuid) -> PortResult<bool> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        if exists.is_none() {
            return Err(PortError::NotFound(format!(
                "Question {} not found",
                question_id
            )));
        }

        let deleted = sqlx::query("DELETE FROM collections WHERE author = $1 AND question_id = $2")
            .bind(author)
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if deleted.rows_affected() > 0 {
            return Ok(false);
        }

        // ON CONFLICT absorbs a concurrent double-submission: the pair ends
        // saved either way, never with two rows.
        sqlx::query(
            "INSERT INTO collections (id, author, question_id) VALUES ($1, $2, $3) \
             ON CONFLICT (author, question_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(author)
        .bind(question_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(true)
    }

    async fn has_saved(&self, author: Uuid, question_id: Uuid) -> PortResult<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM collections WHERE author = $1 AND question_id = $2")
                .bind(author)
                .bind(question_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(row.is_some())
    }

    async fn list_saved(
        &self,
        author: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<QuestionItem>> {
        let pattern = query.query.as_ref().map(|q| format!("%{}%", q));
        let search_clause = if pattern.is_some() {
            "AND (q.title ILIKE $2 OR q.content ILIKE $2)"
        } else {
            ""
        };
        let order = match query.filter.as_deref() {
            Some("oldest") => "q.created_at ASC",
            Some("mostvoted") => "q.upvotes DESC",
            Some("mostviewed") => "q.views DESC",
            Some("mostanswered") => "q.answers DESC",
            _ => "q.created_at DESC",
        };

        let total_sql = format!(
            "SELECT COUNT(*) FROM collections c \
             JOIN questions q ON q.id = c.question_id \
             WHERE c.author = $1 {}",
            search_clause
        );
        let list_sql = format!(
            "SELECT {} FROM collections c \
             JOIN questions q ON q.id = c.question_id \
             JOIN users u ON u.id = q.author \
             WHERE c.author = $1 {} ORDER BY {} LIMIT {} OFFSET {}",
            QUESTION_AUTHOR_COLUMNS,
            search_clause,
            order,
            query.page_size(),
            query.offset()
        );

        let (total, records) = match &pattern {
            Some(pattern) => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(author)
                    .bind(pattern)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, QuestionWithAuthorRecord>(&list_sql)
                    .bind(author)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
            None => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(author)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, QuestionWithAuthorRecord>(&list_sql)
                    .bind(author)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
        };

        let items = self.to_question_items(records).await?;
        Ok(Page::new(items, total, query.offset()))
    }

    // --- Tags ---

    async fn list_tags(&self, query: &PaginatedQuery) -> PortResult<Page<Tag>> {
        let pattern = query.query.as_ref().map(|q| format!("%{}%", q));
        let filter_clause = if pattern.is_some() { "WHERE name ILIKE $1" } else { "" };
        let order = match query.filter.as_deref() {
            Some("popular") => "questions DESC",
            Some("recent") => "created_at DESC",
            Some("oldest") => "created_at ASC",
            _ => "name ASC",
        };

        let total_sql = format!("SELECT COUNT(*) FROM tags {}", filter_clause);
        let list_sql = format!(
            "SELECT id, name, questions, created_at FROM tags {} ORDER BY {} LIMIT {} OFFSET {}",
            filter_clause,
            order,
            query.page_size(),
            query.offset()
        );

        let (total, records) = match &pattern {
            Some(pattern) => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(pattern)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, TagRecord>(&list_sql)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
            None => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, TagRecord>(&list_sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
        };

        let tags = records.into_iter().map(TagRecord::to_domain).collect();
        Ok(Page::new(tags, total, query.offset()))
    }

    async fn get_tag(&self, tag_id: Uuid) -> PortResult<Tag> {
        sqlx::query_as::<_, TagRecord>(
            "SELECT id, name, questions, created_at FROM tags WHERE id = $1",
        )
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(TagRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Tag {} not found", tag_id)))
    }

    async fn list_tag_questions(
        &self,
        tag_id: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<QuestionItem>> {
        // Tag must exist even when no question references it.
        self.get_tag(tag_id).await?;

        let pattern = query.query.as_ref().map(|q| format!("%{}%", q));
        let search_clause = if pattern.is_some() { "AND q.title ILIKE $2" } else { "" };

        let total_sql = format!(
            "SELECT COUNT(*) FROM questions q WHERE $1 = ANY(q.tag_ids) {}",
            search_clause
        );
        let list_sql = format!(
            "SELECT {} FROM questions q JOIN users u ON u.id = q.author \
             WHERE $1 = ANY(q.tag_ids) {} ORDER BY q.created_at DESC LIMIT {} OFFSET {}",
            QUESTION_AUTHOR_COLUMNS,
            search_clause,
            query.page_size(),
            query.offset()
        );

        let (total, records) = match &pattern {
            Some(pattern) => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(tag_id)
                    .bind(pattern)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, QuestionWithAuthorRecord>(&list_sql)
                    .bind(tag_id)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
            None => {
                let total: i64 = sqlx::query_scalar(&total_sql)
                    .bind(tag_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
                let records = sqlx::query_as::<_, QuestionWithAuthorRecord>(&list_sql)
                    .bind(tag_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unexpected)?;
                (total, records)
            }
        };

        let items = self.to_question_items(records).await?;
        Ok(Page::new(items, total, query.offset()))
    }
}

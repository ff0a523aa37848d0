//! services/api/tests/forum_flow.rs
//!
//! End-to-end tests for the REST surface, driven through the real router
//! with an in-memory `ForumStore`. The store mirrors the transactional
//! contract of the Postgres adapter: every multi-write operation stages its
//! changes on a copy of the state and swaps it in only on success, so a
//! failed operation is never partially observable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use devstack_core::domain::{
    Answer, AnswerItem, AuthSession, Question, QuestionItem, Tag, User, UserCredentials,
    UserStats, Vote, VoteKind, VoteStatus, VoteTarget,
};
use devstack_core::ports::{
    DraftAnswerService, DraftStream, ForumStore, Page, PortError, PortResult,
};
use devstack_core::tags::{plan_tags, AttachedTag};
use devstack_core::validation::{PaginatedQuery, ValidationErrors};
use devstack_core::votes::VoteTransition;

//=========================================================================================
// In-Memory Store
//=========================================================================================

#[derive(Default, Clone)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    credentials: HashMap<String, UserCredentials>,
    sessions: HashMap<String, AuthSession>,
    questions: HashMap<Uuid, Question>,
    answers: HashMap<Uuid, Answer>,
    tags: HashMap<Uuid, Tag>,
    /// (question_id, tag_id) join rows.
    tag_questions: Vec<(Uuid, Uuid)>,
    votes: Vec<Vote>,
    /// (author, question_id) saved pairs.
    collections: Vec<(Uuid, Uuid)>,
}

impl MemoryState {
    fn find_or_create_tag(&mut self, name: &str) -> Uuid {
        let folded = name.to_lowercase();
        if let Some(tag) = self
            .tags
            .values_mut()
            .find(|tag| tag.name.to_lowercase() == folded)
        {
            tag.questions += 1;
            return tag.id;
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            questions: 1,
            created_at: Utc::now(),
        };
        let id = tag.id;
        self.tags.insert(id, tag);
        id
    }

    fn detach_tag(&mut self, question_id: Uuid, tag_id: Uuid) {
        self.tag_questions
            .retain(|&(q, t)| !(q == question_id && t == tag_id));
        if let Some(tag) = self.tags.get_mut(&tag_id) {
            tag.questions = (tag.questions - 1).max(0);
        }
    }

    fn author_ref(&self, user_id: Uuid) -> PortResult<devstack_core::domain::AuthorRef> {
        let user = self
            .users
            .get(&user_id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        Ok(devstack_core::domain::AuthorRef {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        })
    }

    fn question_item(&self, question: &Question) -> PortResult<QuestionItem> {
        let author = self.author_ref(question.author)?;
        let tags = question
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();
        Ok(QuestionItem {
            question: question.clone(),
            author,
            tags,
        })
    }
}

fn paginate<T>(items: Vec<T>, query: &PaginatedQuery) -> Page<T> {
    let total = items.len() as i64;
    let offset = query.offset();
    let items: Vec<T> = items
        .into_iter()
        .skip(offset as usize)
        .take(query.page_size() as usize)
        .collect();
    Page::new(items, total, offset)
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// (counter value, join row count) for a tag name, for invariant checks.
    fn tag_state(&self, name: &str) -> Option<(i64, usize)> {
        let state = self.state.lock().unwrap();
        let folded = name.to_lowercase();
        let tag = state
            .tags
            .values()
            .find(|tag| tag.name.to_lowercase() == folded)?;
        let rows = state
            .tag_questions
            .iter()
            .filter(|&&(_, t)| t == tag.id)
            .count();
        Some((tag.questions, rows))
    }

    fn answer_rows(&self) -> usize {
        self.state.lock().unwrap().answers.len()
    }

    fn vote_rows(&self, target_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .votes
            .iter()
            .filter(|v| v.target_id == target_id)
            .count()
    }
}

#[async_trait]
impl ForumStore for MemoryStore {
    async fn create_user_with_credentials(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        let mut state = self.state.lock().unwrap();
        let mut errors = ValidationErrors::new();
        if state.credentials.contains_key(email) {
            errors.add("email", "Email is already registered");
        }
        if state.users.values().any(|u| u.username == username) {
            errors.add("username", "Username is already taken");
        }
        if !errors.is_empty() {
            return Err(PortError::Validation(errors));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            bio: None,
            avatar: None,
            location: None,
            portfolio: None,
            reputation: 0,
            created_at: Utc::now(),
        };
        state.credentials.insert(
            email.to_string(),
            UserCredentials {
                user_id: user.id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.state
            .lock()
            .unwrap()
            .credentials
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Account not found".to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.state.lock().unwrap().sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let state = self.state.lock().unwrap();
        let session = state
            .sessions
            .get(session_id)
            .ok_or(PortError::Unauthorized)?;
        if session.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(session.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let state = self.state.lock().unwrap();
        Ok(UserStats {
            questions: state
                .questions
                .values()
                .filter(|q| q.author == user_id)
                .count() as i64,
            answers: state
                .answers
                .values()
                .filter(|a| a.author == user_id)
                .count() as i64,
        })
    }

    async fn list_users(&self, query: &PaginatedQuery) -> PortResult<Page<User>> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(users, query))
    }

    async fn create_question(
        &self,
        author: Uuid,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> PortResult<Question> {
        let mut state = self.state.lock().unwrap();
        let mut staged = state.clone();

        let mut question = Question {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            author,
            upvotes: 0,
            downvotes: 0,
            answers: 0,
            views: 0,
            tag_ids: Vec::new(),
            created_at: Utc::now(),
        };
        let plan = plan_tags(&[], tags);
        for name in &plan.to_add {
            let tag_id = staged.find_or_create_tag(name);
            staged.tag_questions.push((question.id, tag_id));
            question.tag_ids.push(tag_id);
        }
        staged.questions.insert(question.id, question.clone());

        *state = staged;
        Ok(question)
    }

    async fn edit_question(
        &self,
        caller: Uuid,
        question_id: Uuid,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> PortResult<Question> {
        let mut state = self.state.lock().unwrap();
        let mut staged = state.clone();

        let current = staged
            .questions
            .get(&question_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Question not found".to_string()))?;
        if current.author != caller {
            return Err(PortError::Forbidden(
                "Only the author can edit this question".to_string(),
            ));
        }

        let attached: Vec<AttachedTag> = current
            .tag_ids
            .iter()
            .filter_map(|id| {
                staged.tags.get(id).map(|tag| AttachedTag {
                    id: tag.id,
                    name: tag.name.clone(),
                })
            })
            .collect();
        let plan = plan_tags(&attached, tags);

        let mut tag_ids = plan.kept.clone();
        for name in &plan.to_add {
            let tag_id = staged.find_or_create_tag(name);
            staged.tag_questions.push((question_id, tag_id));
            tag_ids.push(tag_id);
        }
        for tag_id in &plan.to_remove {
            staged.detach_tag(question_id, *tag_id);
        }

        let question = staged
            .questions
            .get_mut(&question_id)
            .ok_or_else(|| PortError::NotFound("Question not found".to_string()))?;
        question.title = title.to_string();
        question.content = content.to_string();
        question.tag_ids = tag_ids;
        let updated = question.clone();

        *state = staged;
        Ok(updated)
    }

    async fn get_question(&self, question_id: Uuid) -> PortResult<QuestionItem> {
        let state = self.state.lock().unwrap();
        let question = state
            .questions
            .get(&question_id)
            .ok_or_else(|| PortError::NotFound("Question not found".to_string()))?;
        state.question_item(question)
    }

    async fn increment_views(&self, question_id: Uuid) -> PortResult<i64> {
        let mut state = self.state.lock().unwrap();
        let question = state
            .questions
            .get_mut(&question_id)
            .ok_or_else(|| PortError::NotFound("Question not found".to_string()))?;
        question.views += 1;
        Ok(question.views)
    }

    async fn list_questions(&self, query: &PaginatedQuery) -> PortResult<Page<QuestionItem>> {
        let state = self.state.lock().unwrap();
        let mut questions: Vec<Question> = state.questions.values().cloned().collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let items = questions
            .iter()
            .map(|q| state.question_item(q))
            .collect::<PortResult<Vec<_>>>()?;
        Ok(paginate(items, query))
    }

    async fn create_answer(
        &self,
        author: Uuid,
        question_id: Uuid,
        content: &str,
    ) -> PortResult<Answer> {
        let mut state = self.state.lock().unwrap();
        let mut staged = state.clone();

        let question = staged
            .questions
            .get_mut(&question_id)
            .ok_or_else(|| PortError::NotFound("Question not found".to_string()))?;
        question.answers += 1;
        let answer = Answer {
            id: Uuid::new_v4(),
            question_id,
            author,
            content: content.to_string(),
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now(),
        };
        staged.answers.insert(answer.id, answer.clone());

        *state = staged;
        Ok(answer)
    }

    async fn list_answers(
        &self,
        question_id: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<AnswerItem>> {
        let state = self.state.lock().unwrap();
        let mut answers: Vec<Answer> = state
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let items = answers
            .into_iter()
            .map(|answer| {
                let author = state.author_ref(answer.author)?;
                Ok(AnswerItem { answer, author })
            })
            .collect::<PortResult<Vec<_>>>()?;
        Ok(paginate(items, query))
    }

    async fn cast_vote(
        &self,
        author: Uuid,
        target_id: Uuid,
        target_type: VoteTarget,
        vote_type: VoteKind,
    ) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let mut staged = state.clone();

        let target_exists = match target_type {
            VoteTarget::Question => staged.questions.contains_key(&target_id),
            VoteTarget::Answer => staged.answers.contains_key(&target_id),
        };
        if !target_exists {
            return Err(PortError::NotFound("Vote target not found".to_string()));
        }

        let existing = staged.votes.iter().position(|v| {
            v.author == author && v.target_id == target_id && v.target_type == target_type
        });
        let transition =
            VoteTransition::decide(existing.map(|i| staged.votes[i].vote_type), vote_type);
        match transition {
            VoteTransition::Create => staged.votes.push(Vote {
                id: Uuid::new_v4(),
                author,
                target_id,
                target_type,
                vote_type,
            }),
            VoteTransition::Retract => {
                staged.votes.remove(existing.unwrap());
            }
            VoteTransition::Flip { .. } => staged.votes[existing.unwrap()].vote_type = vote_type,
        }

        for delta in transition.counter_deltas(vote_type) {
            let (upvotes, downvotes) = match target_type {
                VoteTarget::Question => {
                    let q = staged.questions.get_mut(&target_id).unwrap();
                    (&mut q.upvotes, &mut q.downvotes)
                }
                VoteTarget::Answer => {
                    let a = staged.answers.get_mut(&target_id).unwrap();
                    (&mut a.upvotes, &mut a.downvotes)
                }
            };
            let counter = match delta.kind {
                VoteKind::Upvote => upvotes,
                VoteKind::Downvote => downvotes,
            };
            *counter = (*counter + delta.change).max(0);
        }

        *state = staged;
        Ok(())
    }

    async fn has_voted(
        &self,
        author: Uuid,
        target_id: Uuid,
        target_type: VoteTarget,
    ) -> PortResult<VoteStatus> {
        let state = self.state.lock().unwrap();
        let vote = state.votes.iter().find(|v| {
            v.author == author && v.target_id == target_id && v.target_type == target_type
        });
        Ok(match vote.map(|v| v.vote_type) {
            Some(VoteKind::Upvote) => VoteStatus {
                has_upvoted: true,
                has_downvoted: false,
            },
            Some(VoteKind::Downvote) => VoteStatus {
                has_upvoted: false,
                has_downvoted: true,
            },
            None => VoteStatus::default(),
        })
    }

    async fn toggle_save(&self, author: Uuid, question_id: Uuid) -> PortResult<bool> {
        let mut state = self.state.lock().unwrap();
        if !state.questions.contains_key(&question_id) {
            return Err(PortError::NotFound("Question not found".to_string()));
        }
        let existing = state
            .collections
            .iter()
            .position(|&(a, q)| a == author && q == question_id);
        match existing {
            Some(index) => {
                state.collections.remove(index);
                Ok(false)
            }
            None => {
                state.collections.push((author, question_id));
                Ok(true)
            }
        }
    }

    async fn has_saved(&self, author: Uuid, question_id: Uuid) -> PortResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .collections
            .iter()
            .any(|&(a, q)| a == author && q == question_id))
    }

    async fn list_saved(
        &self,
        author: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<QuestionItem>> {
        let state = self.state.lock().unwrap();
        let items = state
            .collections
            .iter()
            .filter(|&&(a, _)| a == author)
            .filter_map(|&(_, q)| state.questions.get(&q))
            .map(|q| state.question_item(q))
            .collect::<PortResult<Vec<_>>>()?;
        Ok(paginate(items, query))
    }

    async fn list_tags(&self, query: &PaginatedQuery) -> PortResult<Page<Tag>> {
        let state = self.state.lock().unwrap();
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(tags, query))
    }

    async fn get_tag(&self, tag_id: Uuid) -> PortResult<Tag> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(&tag_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Tag not found".to_string()))
    }

    async fn list_tag_questions(
        &self,
        tag_id: Uuid,
        query: &PaginatedQuery,
    ) -> PortResult<Page<QuestionItem>> {
        let state = self.state.lock().unwrap();
        if !state.tags.contains_key(&tag_id) {
            return Err(PortError::NotFound("Tag not found".to_string()));
        }
        let items = state
            .tag_questions
            .iter()
            .filter(|&&(_, t)| t == tag_id)
            .filter_map(|&(q, _)| state.questions.get(&q))
            .map(|q| state.question_item(q))
            .collect::<PortResult<Vec<_>>>()?;
        Ok(paginate(items, query))
    }
}

//=========================================================================================
// Canned Draft Service
//=========================================================================================

struct CannedDrafts;

#[async_trait]
impl DraftAnswerService for CannedDrafts {
    async fn draft_answer(
        &self,
        _question: &str,
        _content: &str,
        _user_answer: Option<&str>,
    ) -> PortResult<DraftStream> {
        let chunks: Vec<PortResult<String>> =
            vec![Ok("Use ".to_string()), Ok("a slice.".to_string())];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

//=========================================================================================
// Test Harness
//=========================================================================================

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        openai_api_key: None,
        draft_model: "test-model".to_string(),
        draft_idle_timeout_secs: 5,
    });
    let app_state = Arc::new(AppState {
        store: store.clone(),
        drafts: Arc::new(CannedDrafts),
        config,
    });
    (build_router(app_state), store)
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, path: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Signs up a fresh user, returning the session cookie and user id.
async fn signup(router: &Router, username: &str) -> (String, Uuid) {
    let body = json!({
        "username": username,
        "name": "Dev",
        "email": format!("{}@example.com", username),
        "password": "Str0ng!pass1",
    });
    let response = router
        .clone()
        .oneshot(send_json("POST", "/auth/signup", None, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap();
    let user_id = parsed["data"]["user_id"].as_str().unwrap().parse().unwrap();
    (cookie, user_id)
}

/// Creates a question through the API, returning its id.
async fn ask(router: &Router, cookie: &str, title: &str, tags: &[&str]) -> Uuid {
    let body = json!({ "title": title, "content": "A body.", "tags": tags });
    let (status, parsed) = call(router, send_json("POST", "/questions", Some(cookie), &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    parsed["data"]["id"].as_str().unwrap().parse().unwrap()
}

//=========================================================================================
// Auth
//=========================================================================================

#[tokio::test]
async fn login_round_trips_and_rejects_a_wrong_password() {
    let (router, _) = test_app();
    let (_, user_id) = signup(&router, "alice").await;

    let (status, body) = call(
        &router,
        send_json(
            "POST",
            "/auth/login",
            None,
            &json!({ "email": "alice@example.com", "password": "Str0ng!pass1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"].as_str().unwrap(), user_id.to_string());

    let (status, body) = call(
        &router,
        send_json(
            "POST",
            "/auth/login",
            None,
            &json!({ "email": "alice@example.com", "password": "Wr0ng!pass1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn duplicate_signup_reports_field_errors() {
    let (router, _) = test_app();
    signup(&router, "alice").await;

    let body = json!({
        "username": "alice",
        "name": "Dev",
        "email": "alice@example.com",
        "password": "Str0ng!pass1",
    });
    let (status, parsed) = call(&router, send_json("POST", "/auth/signup", None, &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parsed["success"], json!(false));
    let details = parsed["error"]["details"].as_object().unwrap();
    assert!(details.contains_key("email"));
    assert!(details.contains_key("username"));
}

#[tokio::test]
async fn mutations_require_a_session() {
    let (router, _) = test_app();
    let body = json!({ "title": "A valid question title", "content": "body", "tags": ["rust"] });
    let (status, parsed) = call(&router, send_json("POST", "/questions", None, &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(parsed["success"], json!(false));
}

//=========================================================================================
// Questions and Tags
//=========================================================================================

#[tokio::test]
async fn duplicate_case_tags_collapse_to_one_tag() {
    let (router, store) = test_app();
    let (cookie, _) = signup(&router, "alice").await;

    let id = ask(&router, &cookie, "How do generics work?", &["java", "Java", "JAVA"]).await;

    let (status, body) = call(&router, get(&format!("/questions/{}", id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tag_ids"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["tags"][0]["name"], json!("java"));

    // One tag record, counter 1, one join row.
    assert_eq!(store.tag_state("java"), Some((1, 1)));
    let (_, body) = call(&router, get("/tags", None)).await;
    assert_eq!(body["data"]["total"], json!(1));
}

#[tokio::test]
async fn editing_tags_moves_counters_and_join_rows_together() {
    let (router, store) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let id = ask(&router, &cookie, "Which language for scripting?", &["python", "go"]).await;

    let edit = json!({
        "title": "Which language for scripting?",
        "content": "A body.",
        "tags": ["python", "rust"],
    });
    let (status, _) = call(
        &router,
        send_json("PUT", &format!("/questions/{}", id), Some(&cookie), &edit),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The kept tag is untouched, the removed one decremented, the new one
    // created with counter 1 — and every counter equals its join rows.
    assert_eq!(store.tag_state("python"), Some((1, 1)));
    assert_eq!(store.tag_state("go"), Some((0, 0)));
    assert_eq!(store.tag_state("rust"), Some((1, 1)));

    // The attached order is kept tags first, then additions.
    let (_, body) = call(&router, get(&format!("/questions/{}", id), None)).await;
    let names: Vec<&str> = body["data"]["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["python", "rust"]);
}

#[tokio::test]
async fn edit_by_a_non_author_is_forbidden_and_changes_nothing() {
    let (router, store) = test_app();
    let (author_cookie, _) = signup(&router, "alice").await;
    let (intruder_cookie, _) = signup(&router, "mallory").await;
    let id = ask(&router, &author_cookie, "A question to protect", &["python", "go"]).await;

    let edit = json!({
        "title": "Hijacked title here",
        "content": "A body.",
        "tags": ["php"],
    });
    let (status, body) = call(
        &router,
        send_json("PUT", &format!("/questions/{}", id), Some(&intruder_cookie), &edit),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));

    // No partial tag state: the rejected edit left nothing behind.
    assert_eq!(store.tag_state("python"), Some((1, 1)));
    assert_eq!(store.tag_state("go"), Some((1, 1)));
    assert_eq!(store.tag_state("php"), None);
    let (_, body) = call(&router, get(&format!("/questions/{}", id), None)).await;
    assert_eq!(body["data"]["title"], json!("A question to protect"));
}

#[tokio::test]
async fn validation_failures_report_field_details() {
    let (router, _) = test_app();
    let (cookie, _) = signup(&router, "alice").await;

    let body = json!({ "title": "hi", "content": "", "tags": [] });
    let (status, parsed) = call(&router, send_json("POST", "/questions", Some(&cookie), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parsed["success"], json!(false));
    assert_eq!(parsed["error"]["message"], json!("Validation failed"));
    let details = parsed["error"]["details"].as_object().unwrap();
    assert!(details.contains_key("title"));
    assert!(details.contains_key("content"));
    assert!(details.contains_key("tags"));
}

#[tokio::test]
async fn views_accumulate_per_bump() {
    let (router, _) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let id = ask(&router, &cookie, "A question with viewers", &["rust"]).await;

    let path = format!("/questions/{}/views", id);
    let (_, body) = call(&router, send_json("POST", &path, None, &json!({}))).await;
    assert_eq!(body["data"]["views"], json!(1));
    let (_, body) = call(&router, send_json("POST", &path, None, &json!({}))).await;
    assert_eq!(body["data"]["views"], json!(2));
}

//=========================================================================================
// Answers
//=========================================================================================

#[tokio::test]
async fn answering_moves_the_counter_with_the_row() {
    let (router, store) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let id = ask(&router, &cookie, "A question to answer", &["rust"]).await;

    let (status, body) = call(
        &router,
        send_json(
            "POST",
            &format!("/questions/{}/answers", id),
            Some(&cookie),
            &json!({ "content": "Borrow it instead." }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["question_id"].as_str().unwrap(), id.to_string());

    let (_, body) = call(&router, get(&format!("/questions/{}", id), None)).await;
    assert_eq!(body["data"]["answers"], json!(1));
    assert_eq!(store.answer_rows(), 1);

    let (_, body) = call(&router, get(&format!("/questions/{}/answers", id), None)).await;
    assert_eq!(body["data"]["total"], json!(1));
}

#[tokio::test]
async fn answering_a_missing_question_is_rejected_without_a_row() {
    let (router, store) = test_app();
    let (cookie, _) = signup(&router, "alice").await;

    let (status, body) = call(
        &router,
        send_json(
            "POST",
            &format!("/questions/{}/answers", Uuid::new_v4()),
            Some(&cookie),
            &json!({ "content": "An orphan answer." }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(store.answer_rows(), 0);
}

//=========================================================================================
// Votes
//=========================================================================================

#[tokio::test]
async fn voting_toggles_and_flips_with_consistent_counters() {
    let (router, store) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let id = ask(&router, &cookie, "A question to vote on", &["rust"]).await;

    let upvote = json!({ "target_id": id, "target_type": "question", "vote_type": "upvote" });
    let downvote = json!({ "target_id": id, "target_type": "question", "vote_type": "downvote" });
    let question_path = format!("/questions/{}", id);

    // First cast creates.
    let (status, _) = call(&router, send_json("POST", "/votes", Some(&cookie), &upvote)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&router, get(&question_path, None)).await;
    assert_eq!(body["data"]["upvotes"], json!(1));
    assert_eq!(body["data"]["downvotes"], json!(0));

    // The same direction again retracts.
    call(&router, send_json("POST", "/votes", Some(&cookie), &upvote)).await;
    let (_, body) = call(&router, get(&question_path, None)).await;
    assert_eq!(body["data"]["upvotes"], json!(0));
    assert_eq!(body["data"]["downvotes"], json!(0));
    assert_eq!(store.vote_rows(id), 0);

    // Upvote, then the opposite direction flips both counters.
    call(&router, send_json("POST", "/votes", Some(&cookie), &upvote)).await;
    call(&router, send_json("POST", "/votes", Some(&cookie), &downvote)).await;
    let (_, body) = call(&router, get(&question_path, None)).await;
    assert_eq!(body["data"]["upvotes"], json!(0));
    assert_eq!(body["data"]["downvotes"], json!(1));
    assert_eq!(store.vote_rows(id), 1);

    let (_, body) = call(
        &router,
        get(
            &format!("/votes/status?target_id={}&target_type=question", id),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(body["data"]["has_upvoted"], json!(false));
    assert_eq!(body["data"]["has_downvoted"], json!(true));
}

#[tokio::test]
async fn answers_are_votable_targets_too() {
    let (router, _) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let question_id = ask(&router, &cookie, "A question to answer", &["rust"]).await;
    let (_, body) = call(
        &router,
        send_json(
            "POST",
            &format!("/questions/{}/answers", question_id),
            Some(&cookie),
            &json!({ "content": "An answer." }),
        ),
    )
    .await;
    let answer_id = body["data"]["id"].as_str().unwrap().to_string();

    let vote = json!({ "target_id": answer_id, "target_type": "answer", "vote_type": "upvote" });
    let (status, _) = call(&router, send_json("POST", "/votes", Some(&cookie), &vote)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(
        &router,
        get(&format!("/questions/{}/answers", question_id), None),
    )
    .await;
    assert_eq!(body["data"]["items"][0]["upvotes"], json!(1));
}

#[tokio::test]
async fn votes_reject_unknown_discriminators() {
    let (router, _) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let body = json!({ "target_id": Uuid::new_v4(), "target_type": "comment", "vote_type": "sideways" });
    let (status, parsed) = call(&router, send_json("POST", "/votes", Some(&cookie), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = parsed["error"]["details"].as_object().unwrap();
    assert!(details.contains_key("target_type"));
    assert!(details.contains_key("vote_type"));
}

//=========================================================================================
// Collections
//=========================================================================================

#[tokio::test]
async fn save_toggle_is_idempotent_pairwise() {
    let (router, _) = test_app();
    let (cookie, _) = signup(&router, "alice").await;
    let id = ask(&router, &cookie, "A question to save", &["rust"]).await;

    let toggle = json!({ "question_id": id });
    let (_, body) = call(&router, send_json("POST", "/collections/toggle", Some(&cookie), &toggle)).await;
    assert_eq!(body["data"]["saved"], json!(true));

    let (_, body) = call(
        &router,
        get(&format!("/collections/status?question_id={}", id), Some(&cookie)),
    )
    .await;
    assert_eq!(body["data"]["saved"], json!(true));
    let (_, body) = call(&router, get("/collections", Some(&cookie))).await;
    assert_eq!(body["data"]["total"], json!(1));

    // The second toggle undoes the first.
    let (_, body) = call(&router, send_json("POST", "/collections/toggle", Some(&cookie), &toggle)).await;
    assert_eq!(body["data"]["saved"], json!(false));
    let (_, body) = call(&router, get("/collections", Some(&cookie))).await;
    assert_eq!(body["data"]["total"], json!(0));
}

//=========================================================================================
// AI Drafts
//=========================================================================================

#[tokio::test]
async fn draft_answers_stream_markdown() {
    let (router, _) = test_app();
    let (cookie, _) = signup(&router, "alice").await;

    let body = json!({ "question": "How do I borrow twice?", "content": "A body." });
    let response = router
        .clone()
        .oneshot(send_json("POST", "/ai/answers", Some(&cookie), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/markdown; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Use a slice.");
}

//=========================================================================================
// OpenAPI Surface
//=========================================================================================

#[test]
fn openapi_document_describes_every_request_body() {
    use utoipa::OpenApi;

    let doc = api_lib::web::ApiDoc::openapi().to_json().unwrap();
    for schema in [
        "SignupRequest",
        "LoginRequest",
        "QuestionRequest",
        "AnswerRequest",
        "VoteRequest",
        "SaveRequest",
        "DraftRequest",
    ] {
        assert!(doc.contains(schema), "missing schema: {}", schema);
    }
}

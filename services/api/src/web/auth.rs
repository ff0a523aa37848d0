//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::respond;
use crate::web::state::AppState;
use devstack_core::ports::PortError;
use devstack_core::validation::{SignInParams, SignUpParams};

const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

fn session_cookie(session_id: &str, max_age_secs: i64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id, max_age_secs
    )
}

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate before touching the database
    let params = SignUpParams {
        username: body.username,
        name: body.name,
        email: body.email,
        password: body.password,
    };
    params.validate().map_err(PortError::from)?;

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(params.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    // 3. Create the user and its credentials account
    let user = state
        .store
        .create_user_with_credentials(&params.name, &params.username, &params.email, &password_hash)
        .await?;

    // 4. Create the auth session
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .store
        .create_auth_session(&auth_session_id, user.id, expires_at)
        .await?;

    // 5. Return response with session cookie
    let cookie = session_cookie(&auth_session_id, Duration::days(SESSION_DAYS).num_seconds());
    let response = AuthResponse {
        user_id: user.id,
        email: user.email,
    };
    Ok((
        [(header::SET_COOKIE, cookie)],
        respond::created(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = SignInParams {
        email: body.email,
        password: body.password,
    };
    params.validate().map_err(PortError::from)?;

    // 1. Get the stored credentials; any miss reads as bad credentials
    let credentials = state
        .store
        .get_credentials_by_email(&params.email)
        .await
        .map_err(|_| ApiError::Port(PortError::Unauthorized))?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&credentials.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    let valid = Argon2::default()
        .verify_password(params.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(ApiError::Port(PortError::Unauthorized));
    }

    // 3. Create the auth session
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .store
        .create_auth_session(&auth_session_id, credentials.user_id, expires_at)
        .await?;

    // 4. Return response with session cookie
    let cookie = session_cookie(&auth_session_id, Duration::days(SESSION_DAYS).num_seconds());
    let response = AuthResponse {
        user_id: credentials.user_id,
        email: credentials.email,
    };
    Ok(([(header::SET_COOKIE, cookie)], respond::ok(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Extract session cookie
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    // 2. Parse session ID from cookie
    let auth_session_id = cookie_header
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix("session=")
        })
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    // 3. Delete the auth session
    state.store.delete_auth_session(auth_session_id).await?;

    // 4. Clear cookie
    let cookie = session_cookie("", 0);
    Ok(([(header::SET_COOKIE, cookie)], respond::ok(())))
}

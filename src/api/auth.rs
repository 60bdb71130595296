//! Authentication API endpoints
//!
//! - POST /api/register - Create an account (the first one becomes admin)
//! - POST /api/login - Log in, rate limited per email and per IP
//! - POST /api/logout - End the current session
//! - GET /api/auth/me, GET /api/user - Current user
//!
//! `/api/auth/{register,login,logout}` are kept as aliases.
//! - PUT /api/user - Update display name
//! - PUT /api/user/password - Change password

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    clear_session_cookie, extract_client_ip, extract_session_token, session_cookie, ApiError,
    AppState, AuthenticatedUser,
};
use crate::models::User;
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};
use crate::services::validation::normalize_email;

/// Seconds a client should wait after hitting the per-IP limit
const IP_RETRY_AFTER: u64 = 60;
/// Seconds a client should wait after too many failures for one email
const EMAIL_RETRY_AFTER: u64 = 15 * 60;

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Routes reachable without a session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_current_user))
        .route("/user", get(get_current_user).put(update_profile))
        .route("/user/password", put(change_password))
}

/// POST /api/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.register(body).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&session, &state.session_config));

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = extract_client_ip(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!(%ip, "Login rate limit hit for IP");
            return Err(ApiError::rate_limited(
                "Too many requests, please try again later",
                IP_RETRY_AFTER,
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    let email_key = normalize_email(&body.email);
    if state.rate_limiter.is_email_limited(&email_key).await {
        return Err(ApiError::rate_limited(
            "Too many failed attempts, please try again in 15 minutes",
            EMAIL_RETRY_AFTER,
        ));
    }

    let (user, session) = match state.user_service.login(body).await {
        Ok(pair) => pair,
        Err(UserServiceError::AuthenticationError(msg)) => {
            state.rate_limiter.record_failed_attempt(&email_key).await;
            return Err(ApiError::unauthorized(msg));
        }
        Err(e) => return Err(e.into()),
    };
    state.rate_limiter.clear_email_attempts(&email_key).await;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie(&session, &state.session_config));

    Ok((
        response_headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, clear_session_cookie());

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// PUT /api/user
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state.user_service.update_profile(user.0.id, &body.name).await?;
    Ok(Json(updated))
}

/// PUT /api/user/password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .change_password(user.0.id, &body.current_password, &body.new_password)
        .await
        .map_err(|e| match e {
            // A wrong current password is a form error, not a lost session
            UserServiceError::AuthenticationError(msg) => ApiError::validation_error(msg),
            other => other.into(),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};

use super::service::{
    AuthSuccess, LoginRequest, SignupRequest, UpdateEmailRequest, UpdatePasswordRequest,
};
use super::session::{CurrentSession, Identity, AUTH_COOKIE};
use super::tokens::TOKEN_TTL_DAYS;
use crate::errors::AppError;
use crate::state::AppState;

fn session_cookie(token: &str) -> [(HeaderName, String); 1] {
    let max_age = TOKEN_TTL_DAYS * 24 * 60 * 60;
    [(
        SET_COOKIE,
        format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"),
    )]
}

fn cleared_cookie() -> [(HeaderName, String); 1] {
    [(
        SET_COOKIE,
        format!("{AUTH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    )]
}

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let success = state.auth.signup(req).await?;
    Ok((StatusCode::CREATED, session_cookie(&success.token), Json(success)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let success: AuthSuccess = state.auth.login(req).await?;
    Ok((session_cookie(&success.token), Json(success)))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(State(state): State<AppState>) -> impl IntoResponse {
    if state.bypass.is_enabled() {
        tracing::debug!("Logout skipped in development mode");
        return StatusCode::NO_CONTENT.into_response();
    }
    (StatusCode::NO_CONTENT, cleared_cookie()).into_response()
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Identity>, AppError> {
    Ok(Json(state.auth.me(&session)?))
}

/// PUT /api/v1/settings/email
pub async fn handle_update_email(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<UpdateEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let success = state.auth.update_email(&session, req).await?;
    Ok((session_cookie(&success.token), Json(success)))
}

/// PUT /api/v1/settings/password
pub async fn handle_update_password(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.update_password(&session, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

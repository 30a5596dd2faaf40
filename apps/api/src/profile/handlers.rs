use axum::{extract::State, Json};

use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::models::profile::{Profile, ProfileImport, ProfilePatch};
use crate::state::AppState;

/// GET /api/v1/profile
/// `null` for a signed-out caller.
pub async fn handle_get_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Option<Profile>>, AppError> {
    Ok(Json(state.profiles.profile(&session).await?))
}

/// PATCH /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.profiles.update_profile(&session, patch).await?))
}

/// POST /api/v1/profile/import
pub async fn handle_import_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(import): Json<ProfileImport>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.profiles.import_into_profile(&session, import).await?))
}

/// POST /api/v1/profile/reset
pub async fn handle_reset_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.profiles.reset_profile(&session).await?))
}

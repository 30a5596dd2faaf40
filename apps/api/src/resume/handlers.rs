use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::service::{CreateBaseResumeRequest, CreateTailoredResumeRequest, ResumeWithProfile};
use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::models::resume::{Resume, ResumePatch};
use crate::state::AppState;

/// POST /api/v1/resumes
pub async fn handle_create_base_resume(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<CreateBaseResumeRequest>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let resume = state.resumes.create_base_resume(&session, req).await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

/// POST /api/v1/resumes/tailored
pub async fn handle_create_tailored_resume(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<CreateTailoredResumeRequest>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let resume = state.resumes.create_tailored_resume(&session, req).await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/v1/resumes/:id
/// `null` for a signed-out caller.
pub async fn handle_get_resume(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<ResumeWithProfile>>, AppError> {
    Ok(Json(state.resumes.get_resume_by_id(&session, id).await?))
}

/// PATCH /api/v1/resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<ResumePatch>,
) -> Result<Json<Resume>, AppError> {
    Ok(Json(state.resumes.update_resume(&session, id, patch).await?))
}

/// POST /api/v1/resumes/:id/copy
pub async fn handle_copy_resume(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let copy = state.resumes.copy_resume(&session, id).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.resumes.delete_resume(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

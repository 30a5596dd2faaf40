use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::service::{JobListQuery, Pagination};
use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::models::job::{Job, JobListing, JobPage};
use crate::state::AppState;

/// GET /api/v1/jobs
/// Public: lists every active job, not only the caller's.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<JobPage>, AppError> {
    let pagination = Pagination::new(query.page, query.page_size)?;
    Ok(Json(state.jobs.list_jobs(pagination, &query.filter()).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(listing): Json<JobListing>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = state.jobs.create_job(&session, listing).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /api/v1/jobs/empty
pub async fn handle_create_empty_job(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = state.jobs.create_empty_job(&session).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.jobs.delete_job(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/:id/deactivate
pub async fn handle_deactivate_job(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.jobs.deactivate_job(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{extract::State, Json};

use super::service::DashboardData;
use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<DashboardData>, AppError> {
    Ok(Json(state.dashboard.dashboard(&session).await?))
}

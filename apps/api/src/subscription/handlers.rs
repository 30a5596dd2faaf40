use axum::{extract::State, Json};

use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::models::subscription::SubscriptionStatus;
use crate::state::AppState;

/// GET /api/v1/subscription
pub async fn handle_subscription_status(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<SubscriptionStatus>, AppError> {
    Ok(Json(state.subscriptions.subscription_status(&session).await?))
}

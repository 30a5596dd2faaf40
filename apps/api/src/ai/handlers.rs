use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::service::{ApiKeySummary, ApiTestResult, ModelInfo, SaveApiKeyRequest, TestApiKeyRequest};
use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    pub model: Option<String>,
}

/// PUT /api/v1/settings/api-keys/:service
pub async fn handle_save_api_key(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(service): Path<String>,
    Json(req): Json<SaveApiKeyRequest>,
) -> Result<Json<ApiKeySummary>, AppError> {
    let summary = state.ai.save_api_key(&session, &service, &req.api_key).await?;
    Ok(Json(summary))
}

/// POST /api/v1/settings/api-keys/test
pub async fn handle_test_api_key(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<TestApiKeyRequest>,
) -> Result<Json<ApiTestResult>, AppError> {
    Ok(Json(state.ai.test_api_key(&session, &req.service).await?))
}

/// GET /api/v1/ai/model?model=...
pub async fn handle_model_selection(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<ModelQuery>,
) -> Result<Json<ModelInfo>, AppError> {
    let info = state
        .ai
        .model_selection(&session, query.model.as_deref())
        .await?;
    Ok(Json(info))
}

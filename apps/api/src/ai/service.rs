use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::ProviderClient;
use super::provider::{resolve_model, AiProvider, KeySource, ProviderKeys};
use crate::auth::Session;
use crate::bypass::DevBypass;
use crate::errors::AppError;
use crate::invalidation::{self, CacheInvalidator};
use crate::models::user::ApiKey;
use crate::store::RelationalStore;

const DEFAULT_TEST_SERVICE: &str = "google";

#[derive(Debug, Deserialize)]
pub struct SaveApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct TestApiKeyRequest {
    #[serde(default = "default_test_service")]
    pub service: String,
}

fn default_test_service() -> String {
    DEFAULT_TEST_SERVICE.to_string()
}

/// A stored key as shown back to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiKeySummary {
    pub service: String,
    pub masked_key: String,
    pub created_at: DateTime<Utc>,
}

impl ApiKeySummary {
    fn from_key(key: &ApiKey) -> Self {
        Self {
            service: key.service.clone(),
            masked_key: mask(&key.api_key),
            created_at: key.created_at,
        }
    }
}

/// Keeps the last four characters.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}

/// Outcome of a provider key test. Failures are reported here, not as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiTestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiTestResult {
    fn passed(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub provider: AiProvider,
    pub model: String,
    pub key_source: KeySource,
}

#[derive(Clone)]
pub struct AiService {
    store: Arc<dyn RelationalStore>,
    invalidator: Arc<dyn CacheInvalidator>,
    client: ProviderClient,
    env_keys: ProviderKeys,
    bypass: DevBypass,
}

impl AiService {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        invalidator: Arc<dyn CacheInvalidator>,
        client: ProviderClient,
        env_keys: ProviderKeys,
        bypass: DevBypass,
    ) -> Self {
        Self {
            store,
            invalidator,
            client,
            env_keys,
            bypass,
        }
    }

    /// Upserts the caller's key for `service`.
    pub async fn save_api_key(
        &self,
        session: &Session,
        service: &str,
        api_key: &str,
    ) -> Result<ApiKeySummary, AppError> {
        let provider = AiProvider::from_service(service)
            .ok_or_else(|| AppError::Validation(format!("Unsupported service: {service}")))?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::Validation("API key must not be empty".to_string()));
        }

        if self.bypass.is_enabled() {
            debug!(service, "Bypass: API key not persisted");
            return Ok(ApiKeySummary {
                service: provider.service().to_string(),
                masked_key: mask(api_key),
                created_at: Utc::now(),
            });
        }

        let identity = session.require()?;
        let saved = self
            .store
            .save_api_key(identity.user_id, provider.service(), api_key)
            .await
            .map_err(|e| e.into_app_error("save_api_key", "Failed to save API key"))?;

        self.invalidator.invalidate(invalidation::settings());
        Ok(ApiKeySummary::from_key(&saved))
    }

    /// Sends a test prompt to the provider with the caller's stored key for `service`.
    pub async fn test_api_key(
        &self,
        session: &Session,
        service: &str,
    ) -> Result<ApiTestResult, AppError> {
        if self.bypass.is_enabled() {
            return Ok(ApiTestResult::failed(
                "API testing is not available in development mode",
            ));
        }

        let identity = session.require()?;
        let keys = self
            .store
            .fetch_api_keys(identity.user_id)
            .await
            .map_err(|e| e.into_app_error("test_api_key", "Failed to load API keys"))?;

        let Some(key) = keys.iter().find(|k| k.service == service) else {
            return Ok(ApiTestResult::failed(format!(
                "No API key found for {service}"
            )));
        };

        let provider = match AiProvider::from_service(service) {
            Some(p @ (AiProvider::Google | AiProvider::OpenAi)) => p,
            _ => {
                return Ok(ApiTestResult::failed(format!(
                    "API testing not implemented for {service}"
                )))
            }
        };

        match self.client.send_test_prompt(provider, &key.api_key).await {
            Ok(text) => Ok(ApiTestResult::passed(text)),
            Err(e) => {
                warn!(service, error = %e, "API key test failed");
                Ok(ApiTestResult::failed(e.to_string()))
            }
        }
    }

    /// Which provider and key source would serve `model` for this caller.
    /// Signed-out callers and bypass mode see environment keys only.
    pub async fn model_selection(
        &self,
        session: &Session,
        model: Option<&str>,
    ) -> Result<ModelInfo, AppError> {
        let stored = match session.identity() {
            Some(identity) if !self.bypass.is_enabled() => self
                .store
                .fetch_api_keys(identity.user_id)
                .await
                .map_err(|e| e.into_app_error("model_selection", "Failed to load API keys"))?,
            _ => Vec::new(),
        };

        let selection = resolve_model(model, &stored, &self.env_keys).map_err(AppError::Validation)?;
        Ok(ModelInfo {
            provider: selection.provider,
            model: selection.model,
            key_source: selection.key_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::auth::Identity;
    use crate::invalidation::testing::RecordingInvalidator;
    use crate::store::memory::{MemoryStore, PanicStore};

    fn session(user_id: Uuid) -> Session {
        Session::Authenticated(Identity {
            user_id,
            email: "ada@example.com".into(),
        })
    }

    fn unreachable_client() -> ProviderClient {
        ProviderClient::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9").unwrap()
    }

    fn service(store: Arc<MemoryStore>, invalidator: Arc<RecordingInvalidator>) -> AiService {
        AiService::new(
            store,
            invalidator,
            unreachable_client(),
            ProviderKeys::default(),
            DevBypass::disabled(),
        )
    }

    #[test]
    fn test_mask_keeps_last_four() {
        assert_eq!(mask("sk-abcdef1234"), "****1234");
        assert_eq!(mask("ab"), "****ab");
    }

    #[tokio::test]
    async fn test_save_key_upserts_and_masks() {
        let store = Arc::new(MemoryStore::new());
        let invalidator = Arc::new(RecordingInvalidator::default());
        let ai = service(store.clone(), invalidator.clone());
        let user_id = Uuid::new_v4();

        ai.save_api_key(&session(user_id), "openai", "sk-first-0001").await.unwrap();
        let summary = ai
            .save_api_key(&session(user_id), "openai", "  sk-second-0002 ")
            .await
            .unwrap();

        assert_eq!(summary.masked_key, "****0002");
        let keys = store.fetch_api_keys(user_id).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].api_key, "sk-second-0002");
        assert_eq!(invalidator.last(), Some(invalidation::settings()));
    }

    #[tokio::test]
    async fn test_save_key_rejects_bad_input() {
        let ai = service(Arc::new(MemoryStore::new()), Arc::default());
        let caller = session(Uuid::new_v4());

        assert!(matches!(
            ai.save_api_key(&caller, "mistral", "k").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ai.save_api_key(&caller, "google", "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ai.save_api_key(&Session::Unauthenticated, "google", "k").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_reported_in_result() {
        let ai = service(Arc::new(MemoryStore::new()), Arc::default());
        let result = ai.test_api_key(&session(Uuid::new_v4()), "google").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No API key found for google"));
    }

    #[tokio::test]
    async fn test_untestable_service_reported_in_result() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        store.save_api_key(user_id, "anthropic", "sk-ant").await.unwrap();
        let ai = service(store, Arc::default());

        let result = ai.test_api_key(&session(user_id), "anthropic").await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("API testing not implemented for anthropic")
        );
    }

    #[tokio::test]
    async fn test_provider_failure_reported_in_result() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        store.save_api_key(user_id, "google", "g-key").await.unwrap();
        let ai = service(store, Arc::default());

        let result = ai.test_api_key(&session(user_id), "google").await.unwrap();
        assert!(!result.success);
        assert!(result.message.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_model_selection_uses_stored_key() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        store.save_api_key(user_id, "deepseek", "ds-key").await.unwrap();
        let ai = service(store, Arc::default());

        let info = ai
            .model_selection(&session(user_id), Some("deepseek-chat"))
            .await
            .unwrap();
        assert_eq!(info.provider, AiProvider::DeepSeek);
        assert_eq!(info.key_source, KeySource::User);

        match ai.model_selection(&Session::Unauthenticated, Some("deepseek-chat")).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "DeepSeek API key not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bypass_never_touches_store() {
        let ai = AiService::new(
            Arc::new(PanicStore),
            Arc::new(RecordingInvalidator::default()),
            unreachable_client(),
            ProviderKeys {
                google: Some("g-env".into()),
                ..Default::default()
            },
            DevBypass::enabled(),
        );
        let caller = session(Uuid::new_v4());

        let summary = ai.save_api_key(&caller, "google", "g-key-9999").await.unwrap();
        assert_eq!(summary.masked_key, "****9999");
        assert!(!ai.test_api_key(&caller, "google").await.unwrap().success);
        let info = ai.model_selection(&caller, None).await.unwrap();
        assert_eq!(info.model, "gemini-2.5-flash");
    }
}

pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::ai::handlers as ai;
use crate::auth::handlers as auth;
use crate::dashboard::handlers as dashboard;
use crate::jobs::handlers as jobs;
use crate::profile::handlers as profile;
use crate::resume::handlers as resume;
use crate::state::AppState;
use crate::subscription::handlers as subscription;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth & settings
        .route("/api/v1/auth/signup", post(auth::handle_signup))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .route("/api/v1/settings/email", put(auth::handle_update_email))
        .route("/api/v1/settings/password", put(auth::handle_update_password))
        .route(
            "/api/v1/settings/api-keys/test",
            post(ai::handle_test_api_key),
        )
        .route(
            "/api/v1/settings/api-keys/:service",
            put(ai::handle_save_api_key),
        )
        .route("/api/v1/ai/model", get(ai::handle_model_selection))
        // Profile
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).patch(profile::handle_update_profile),
        )
        .route("/api/v1/profile/import", post(profile::handle_import_profile))
        .route("/api/v1/profile/reset", post(profile::handle_reset_profile))
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        // Resumes
        .route("/api/v1/resumes", post(resume::handle_create_base_resume))
        .route(
            "/api/v1/resumes/tailored",
            post(resume::handle_create_tailored_resume),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resume::handle_get_resume)
                .patch(resume::handle_update_resume)
                .delete(resume::handle_delete_resume),
        )
        .route("/api/v1/resumes/:id/copy", post(resume::handle_copy_resume))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/empty", post(jobs::handle_create_empty_job))
        .route("/api/v1/jobs/:id", delete(jobs::handle_delete_job))
        .route(
            "/api/v1/jobs/:id/deactivate",
            post(jobs::handle_deactivate_job),
        )
        .route(
            "/api/v1/subscription",
            get(subscription::handle_subscription_status),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::ai::{ProviderClient, ProviderKeys};
    use crate::auth::TokenManager;
    use crate::bypass::DevBypass;
    use crate::invalidation::testing::RecordingInvalidator;
    use crate::state::Collaborators;
    use crate::store::memory::{MemoryStore, PanicStore};
    use crate::store::{CredentialStore, RelationalStore};

    fn test_router<S>(store: Arc<S>, bypass: DevBypass) -> Router
    where
        S: RelationalStore + CredentialStore + 'static,
    {
        let mut state = AppState::new(Collaborators {
            store,
            invalidator: Arc::new(RecordingInvalidator::default()),
            tokens: TokenManager::new("router-test-secret"),
            provider_client: ProviderClient::with_endpoints(
                "http://127.0.0.1:9",
                "http://127.0.0.1:9",
            )
            .unwrap(),
            provider_keys: ProviderKeys::default(),
            bypass,
        });
        state.auth = state.auth.clone().with_bcrypt_cost(4);
        build_router(state)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_router(Arc::new(MemoryStore::new()), DevBypass::disabled());
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "resume-api");
    }

    #[tokio::test]
    async fn test_write_without_session_is_unauthorized() {
        let app = test_router(Arc::new(MemoryStore::new()), DevBypass::disabled());
        let response = app
            .oneshot(json_request("POST", "/api/v1/jobs/empty", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_signed_out_profile_read_is_null() {
        let app = test_router(Arc::new(MemoryStore::new()), DevBypass::disabled());
        let response = app.oneshot(get_request("/api/v1/profile")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
    }

    #[tokio::test]
    async fn test_signup_cookie_authenticates_later_requests() {
        let app = test_router(Arc::new(MemoryStore::new()), DevBypass::disabled());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/signup",
                json!({"email": "Ada@Example.com", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("auth-token="));

        let me = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(me).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_out_of_range_page_size_is_bad_request() {
        let app = test_router(Arc::new(MemoryStore::new()), DevBypass::disabled());
        let response = app
            .oneshot(get_request("/api/v1/jobs?page=1&page_size=0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bypass_serves_fixtures_without_store() {
        let app = test_router(Arc::new(PanicStore), DevBypass::enabled());

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/dashboard"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["profile"]["first_name"], "John");
        assert_eq!(body["baseResumes"].as_array().map(Vec::len), Some(1));

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/subscription"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["subscription_plan"], "Free");

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/signup",
                json!({"email": "ada@example.com", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}

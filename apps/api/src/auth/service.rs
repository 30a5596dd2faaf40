use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::password::{hash_password, verify_password, BCRYPT_COST};
use super::session::{Identity, Session};
use super::tokens::TokenManager;
use crate::bypass::DevBypass;
use crate::errors::AppError;
use crate::invalidation::{self, CacheInvalidator};
use crate::models::user::User;
use crate::store::{CredentialStore, RelationalStore};

const INVALID_LOGIN: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "An account with this email already exists";

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8 to 72 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEmailRequest {
    #[validate(email(message = "Invalid email address"))]
    pub new_email: String,
    pub current_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8 to 72 characters"))]
    pub new_password: String,
}

/// A signed-in user plus the session token that was issued for it.
#[derive(Debug, Serialize)]
pub struct AuthSuccess {
    pub user: User,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validation_error(err: validator::ValidationErrors) -> AppError {
    AppError::Validation(err.to_string())
}

fn dev_mode(action: &str) -> AppError {
    AppError::DevModeUnavailable(format!("{action} is not available in development mode"))
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    store: Arc<dyn RelationalStore>,
    tokens: TokenManager,
    invalidator: Arc<dyn CacheInvalidator>,
    bypass: DevBypass,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        store: Arc<dyn RelationalStore>,
        tokens: TokenManager,
        invalidator: Arc<dyn CacheInvalidator>,
        bypass: DevBypass,
    ) -> Self {
        Self {
            credentials,
            store,
            tokens,
            invalidator,
            bypass,
            bcrypt_cost: BCRYPT_COST,
        }
    }

    #[cfg(test)]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    fn issue(&self, user: User) -> Result<AuthSuccess, AppError> {
        let token = self
            .tokens
            .issue(user.id, &user.email)
            .map_err(|e| AppError::Internal(anyhow!(e)))?;
        Ok(AuthSuccess { user, token })
    }

    pub async fn signup(&self, mut req: SignupRequest) -> Result<AuthSuccess, AppError> {
        if self.bypass.is_enabled() {
            return Err(dev_mode("Sign up"));
        }
        req.email = normalize_email(&req.email);
        req.validate().map_err(validation_error)?;
        let email = req.email;

        let existing = self
            .credentials
            .find_user_by_email(&email)
            .await
            .map_err(|e| e.into_app_error("signup", "Failed to create account"))?;
        if existing.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let hash = hash_password(req.password, self.bcrypt_cost).await?;
        let user = self
            .credentials
            .create_user(&email, &hash)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    AppError::Conflict(EMAIL_TAKEN.to_string())
                } else {
                    e.into_app_error("signup", "Failed to create account")
                }
            })?;

        // The profile is also created lazily on first read, so a failure here is recoverable.
        if let Err(e) = self.store.insert_profile_if_absent(user.id, Some(&email)).await {
            tracing::warn!(user_id = %user.id, "Could not seed profile at signup: {e}");
        }

        tracing::info!(user_id = %user.id, "User signed up");
        self.issue(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthSuccess, AppError> {
        if self.bypass.is_enabled() {
            return Err(dev_mode("Sign in"));
        }
        let email = normalize_email(&req.email);

        let user = self
            .credentials
            .find_user_by_email(&email)
            .await
            .map_err(|e| e.into_app_error("login", "Failed to sign in"))?
            .ok_or_else(|| AppError::InvalidCredentials(INVALID_LOGIN.to_string()))?;

        if !verify_password(req.password, user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials(INVALID_LOGIN.to_string()));
        }

        tracing::info!(user_id = %user.id, "User signed in");
        self.issue(user.to_user())
    }

    pub fn me(&self, session: &Session) -> Result<Identity, AppError> {
        session.require().cloned()
    }

    pub async fn update_email(
        &self,
        session: &Session,
        mut req: UpdateEmailRequest,
    ) -> Result<AuthSuccess, AppError> {
        if self.bypass.is_enabled() {
            return Err(dev_mode("Changing email"));
        }
        let identity = session.require()?;
        req.new_email = normalize_email(&req.new_email);
        req.validate().map_err(validation_error)?;
        let new_email = req.new_email;
        if new_email == normalize_email(&identity.email) {
            return Err(AppError::Validation(
                "New email must be different from current email".to_string(),
            ));
        }

        let user = self
            .credentials
            .find_user_by_id(identity.user_id)
            .await
            .map_err(|e| e.into_app_error("update_email", "Failed to update email"))?
            .ok_or(AppError::Unauthorized)?;
        if !verify_password(req.current_password, user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials(
                "Current password is incorrect".to_string(),
            ));
        }

        let taken = self
            .credentials
            .find_user_by_email(&new_email)
            .await
            .map_err(|e| e.into_app_error("update_email", "Failed to update email"))?;
        if taken.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        self.credentials
            .update_email(user.id, &new_email)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    AppError::Conflict(EMAIL_TAKEN.to_string())
                } else {
                    e.into_app_error("update_email", "Failed to update email")
                }
            })?;

        self.invalidator.invalidate(invalidation::settings());
        let mut updated = user.to_user();
        updated.email = new_email;
        self.issue(updated)
    }

    pub async fn update_password(
        &self,
        session: &Session,
        req: UpdatePasswordRequest,
    ) -> Result<(), AppError> {
        if self.bypass.is_enabled() {
            return Err(dev_mode("Changing password"));
        }
        let identity = session.require()?;
        req.validate().map_err(validation_error)?;

        let user = self
            .credentials
            .find_user_by_id(identity.user_id)
            .await
            .map_err(|e| e.into_app_error("update_password", "Failed to update password"))?
            .ok_or(AppError::Unauthorized)?;
        if !verify_password(req.current_password, user.password_hash).await? {
            return Err(AppError::InvalidCredentials(
                "Current password is incorrect".to_string(),
            ));
        }

        let hash = hash_password(req.new_password, self.bcrypt_cost).await?;
        self.credentials
            .update_password_hash(user.id, &hash)
            .await
            .map_err(|e| e.into_app_error("update_password", "Failed to update password"))?;

        self.invalidator.invalidate(invalidation::settings());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::testing::RecordingInvalidator;
    use crate::invalidation::StalePath;
    use crate::store::memory::{MemoryStore, PanicStore};

    const SECRET: &str = "auth-service-test-secret-0123456789";

    fn service(store: Arc<MemoryStore>, invalidator: Arc<RecordingInvalidator>) -> AuthService {
        AuthService::new(
            store.clone(),
            store,
            TokenManager::new(SECRET),
            invalidator,
            DevBypass::disabled(),
        )
        .with_bcrypt_cost(4)
    }

    fn signup_req(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    fn session_for(success: &AuthSuccess) -> Session {
        Session::Authenticated(Identity {
            user_id: success.user.id,
            email: success.user.email.clone(),
        })
    }

    #[tokio::test]
    async fn test_signup_seeds_profile_with_email() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone(), Arc::default());

        let success = auth
            .signup(signup_req("Ada@Example.com ", "password123"))
            .await
            .unwrap();

        assert_eq!(success.user.email, "ada@example.com");
        let claims = TokenManager::new(SECRET).verify(&success.token).unwrap();
        assert_eq!(claims.sub, success.user.id.to_string());
        let profile = store.profile(success.user.id).unwrap();
        assert_eq!(profile.contact.email.as_deref(), Some("ada@example.com"));
        assert!(profile.sections.work_experience.is_empty());
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_and_short_password() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store, Arc::default());
        auth.signup(signup_req("ada@example.com", "password123"))
            .await
            .unwrap();

        let dup = auth.signup(signup_req("ADA@example.com", "password123")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let short = auth.signup(signup_req("bob@example.com", "short")).await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let bad_email = auth.signup(signup_req("not-an-email", "password123")).await;
        assert!(matches!(bad_email, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store, Arc::default());
        auth.signup(signup_req("ada@example.com", "password123"))
            .await
            .unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "password124".into(),
            })
            .await;
        let unknown_user = auth
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: "password123".into(),
            })
            .await;

        for result in [wrong_password, unknown_user] {
            match result {
                Err(AppError::InvalidCredentials(msg)) => assert_eq!(msg, INVALID_LOGIN),
                other => panic!("unexpected {other:?}"),
            }
        }

        let ok = auth
            .login(LoginRequest {
                email: "ADA@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_update_email_checks_password_and_invalidates_settings() {
        let store = Arc::new(MemoryStore::new());
        let invalidator = Arc::new(RecordingInvalidator::default());
        let auth = service(store.clone(), invalidator.clone());
        let success = auth
            .signup(signup_req("ada@example.com", "password123"))
            .await
            .unwrap();
        let session = session_for(&success);

        let wrong = auth
            .update_email(
                &session,
                UpdateEmailRequest {
                    new_email: "lovelace@example.com".into(),
                    current_password: "nope-nope".into(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials(_))));

        let same = auth
            .update_email(
                &session,
                UpdateEmailRequest {
                    new_email: "ADA@example.com".into(),
                    current_password: "password123".into(),
                },
            )
            .await;
        assert!(matches!(same, Err(AppError::Validation(_))));
        assert!(invalidator.calls().is_empty());

        let updated = auth
            .update_email(
                &session,
                UpdateEmailRequest {
                    new_email: "  Lovelace@Example.com\n".into(),
                    current_password: "password123".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.user.email, "lovelace@example.com");
        assert_eq!(store.user(success.user.id).unwrap().email, "lovelace@example.com");
        assert_eq!(invalidator.last(), Some(vec![StalePath::layout("/settings")]));
    }

    #[tokio::test]
    async fn test_update_password_rehashes() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store, Arc::default());
        let success = auth
            .signup(signup_req("ada@example.com", "password123"))
            .await
            .unwrap();

        auth.update_password(
            &session_for(&success),
            UpdatePasswordRequest {
                current_password: "password123".into(),
                new_password: "new-password-456".into(),
            },
        )
        .await
        .unwrap();

        let old = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "password123".into(),
            })
            .await;
        assert!(matches!(old, Err(AppError::InvalidCredentials(_))));
        auth.login(LoginRequest {
            email: "ada@example.com".into(),
            password: "new-password-456".into(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_settings_changes_require_session() {
        let auth = service(Arc::new(MemoryStore::new()), Arc::default());
        let result = auth
            .update_password(
                &Session::Unauthenticated,
                UpdatePasswordRequest {
                    current_password: "password123".into(),
                    new_password: "new-password-456".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
        assert!(matches!(
            auth.me(&Session::Unauthenticated),
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_bypass_refuses_credential_operations() {
        let store = Arc::new(PanicStore);
        let auth = AuthService::new(
            store.clone(),
            store,
            TokenManager::new(SECRET),
            Arc::new(RecordingInvalidator::default()),
            DevBypass::enabled(),
        );

        let result = auth.signup(signup_req("ada@example.com", "password123")).await;
        assert!(matches!(result, Err(AppError::DevModeUnavailable(_))));
        let result = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "password123".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::DevModeUnavailable(_))));
    }
}

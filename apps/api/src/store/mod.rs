//! Store boundary: the two external collaborators of the data-access layer.
//!
//! `RelationalStore` holds profiles, resumes, jobs, subscriptions and API keys;
//! `CredentialStore` holds user identities and password hashes. `PgStore`
//! implements both against PostgreSQL. Services hold them as `Arc<dyn …>` so
//! tests can swap in `MemoryStore` or `PanicStore`.

use async_trait::async_trait;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobFilter, NewJob};
use crate::models::profile::{Profile, ProfilePatch};
use crate::models::resume::{NewResume, Resume, ResumePatch};
use crate::models::subscription::SubscriptionStatus;
use crate::models::user::{ApiKey, User, UserCredentials};

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgStore;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the write: constraint violation or malformed value.
    #[error("rejected by store ({code:?}): {message}")]
    Rejected {
        code: Option<String>,
        message: String,
        hint: Option<String>,
    },

    #[error("database error ({code:?}): {message}")]
    Database {
        code: Option<String>,
        message: String,
        hint: Option<String>,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                let message = db.message().to_string();
                let hint = db
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg| pg.hint())
                    .map(String::from);
                // SQLSTATE classes 22 (data exception) and 23 (integrity violation)
                let rejected = code
                    .as_deref()
                    .is_some_and(|c| c.starts_with("22") || c.starts_with("23"));
                if rejected {
                    StoreError::Rejected { code, message, hint }
                } else {
                    StoreError::Database { code, message, hint }
                }
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::Rejected { code: Some(c), .. } if c == UNIQUE_VIOLATION)
    }

    /// Logs full store detail and converts to the caller-facing error with one
    /// generic message for the operation.
    pub fn into_app_error(self, operation: &str, public_message: &str) -> AppError {
        match &self {
            StoreError::Rejected { code, message, hint } => {
                tracing::error!(operation, ?code, ?hint, "Store rejected write: {message}");
                AppError::Validation(public_message.to_string())
            }
            StoreError::Database { code, message, hint } => {
                tracing::error!(operation, ?code, ?hint, "Database error: {message}");
                AppError::Upstream(public_message.to_string())
            }
            StoreError::Unavailable(message) => {
                tracing::error!(operation, "Store unavailable: {message}");
                AppError::Upstream(public_message.to_string())
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RelationalStore: Send + Sync {
    // Profiles
    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    /// Inserts an empty profile unless one exists; returns whichever row survives.
    async fn insert_profile_if_absent(
        &self,
        user_id: Uuid,
        email: Option<&str>,
    ) -> StoreResult<Profile>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> StoreResult<Option<Profile>>;

    // Resumes, always scoped by owner
    async fn fetch_resume(&self, resume_id: Uuid, user_id: Uuid) -> StoreResult<Option<Resume>>;
    async fn list_resumes(&self, user_id: Uuid) -> StoreResult<Vec<Resume>>;
    async fn insert_resume(&self, resume: &NewResume) -> StoreResult<Resume>;
    async fn update_resume(
        &self,
        resume_id: Uuid,
        user_id: Uuid,
        patch: &ResumePatch,
    ) -> StoreResult<Option<Resume>>;
    async fn delete_resume(&self, resume_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn resume_ids_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Uuid>>;

    // Jobs
    async fn insert_job(&self, job: &NewJob) -> StoreResult<Job>;
    async fn delete_job(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn deactivate_job(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn job_exists(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    /// Active jobs matching `filter`, newest first, plus the unpaginated match count.
    async fn list_active_jobs(
        &self,
        filter: &JobFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Job>, i64)>;

    // Subscriptions
    async fn fetch_subscription(&self, user_id: Uuid) -> StoreResult<Option<SubscriptionStatus>>;

    // Provider API keys
    async fn fetch_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>>;
    async fn save_api_key(&self, user_id: Uuid, service: &str, api_key: &str)
        -> StoreResult<ApiKey>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>>;
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserCredentials>>;
    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User>;
    async fn update_email(&self, user_id: Uuid, email: &str) -> StoreResult<()>;
    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()>;
}

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Session;
use crate::bypass::{fixtures, DevBypass};
use crate::errors::AppError;
use crate::invalidation::{self, CacheInvalidator};
use crate::models::job::{
    EmploymentType, Job, JobFilter, JobListing, JobPage, NewJob, WorkLocation,
};
use crate::store::RelationalStore;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

const JOB_NOT_FOUND: &str = "Job not found";

/// Query string of `GET /api/v1/jobs`. `keywords` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub work_location: Option<WorkLocation>,
    pub employment_type: Option<EmploymentType>,
    pub keywords: Option<String>,
}

impl JobListQuery {
    pub fn filter(&self) -> JobFilter {
        let keywords = self
            .keywords
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        JobFilter {
            work_location: self.work_location,
            employment_type: self.employment_type,
            keywords,
        }
    }
}

/// 1-indexed page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn total_pages(&self, total_count: i64) -> u32 {
        let size = i64::from(self.page_size);
        u32::try_from((total_count.max(0) + size - 1) / size).unwrap_or(u32::MAX)
    }
}

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn RelationalStore>,
    invalidator: Arc<dyn CacheInvalidator>,
    bypass: DevBypass,
}

impl JobService {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        invalidator: Arc<dyn CacheInvalidator>,
        bypass: DevBypass,
    ) -> Self {
        Self {
            store,
            invalidator,
            bypass,
        }
    }

    async fn insert(
        &self,
        session: &Session,
        build: impl FnOnce(Uuid) -> NewJob,
    ) -> Result<Job, AppError> {
        if self.bypass.is_enabled() {
            return Ok(fixtures::inserted_job(build(fixtures::DEV_USER_ID)));
        }
        let identity = session.require()?;
        let job = self
            .store
            .insert_job(&build(identity.user_id))
            .await
            .map_err(|e| e.into_app_error("create_job", "Failed to create job"))?;
        self.invalidator.invalidate(invalidation::jobs_changed());
        Ok(job)
    }

    pub async fn create_job(&self, session: &Session, listing: JobListing) -> Result<Job, AppError> {
        self.insert(session, |user_id| NewJob::from_listing(user_id, listing))
            .await
    }

    pub async fn create_empty_job(&self, session: &Session) -> Result<Job, AppError> {
        self.insert(session, NewJob::placeholder).await
    }

    /// Hard delete. Resumes pointing at the job are looked up first so their
    /// pages can be invalidated; the store nulls their `job_id`.
    pub async fn delete_job(&self, session: &Session, job_id: Uuid) -> Result<(), AppError> {
        if self.bypass.is_enabled() {
            tracing::debug!(%job_id, "Job delete short-circuited in development mode");
            return Ok(());
        }
        let identity = session.require()?;

        let referencing = self.store.resume_ids_for_job(job_id).await.unwrap_or_else(|e| {
            tracing::warn!(%job_id, "Could not list resumes referencing job: {e}");
            Vec::new()
        });

        let deleted = self
            .store
            .delete_job(job_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("delete_job", "Failed to delete job"))?;
        if !deleted {
            return Err(AppError::NotFound(JOB_NOT_FOUND.to_string()));
        }

        self.invalidator
            .invalidate(invalidation::job_deleted(&referencing));
        Ok(())
    }

    /// Soft delete: the job drops out of listings but stays linked to its resumes.
    pub async fn deactivate_job(&self, session: &Session, job_id: Uuid) -> Result<(), AppError> {
        if self.bypass.is_enabled() {
            return Ok(());
        }
        let identity = session.require()?;

        let deactivated = self
            .store
            .deactivate_job(job_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("deactivate_job", "Failed to delete job"))?;
        if !deactivated {
            return Err(AppError::NotFound(JOB_NOT_FOUND.to_string()));
        }

        self.invalidator.invalidate(invalidation::jobs_changed());
        Ok(())
    }

    /// Public listing of active jobs, newest first.
    pub async fn list_jobs(
        &self,
        pagination: Pagination,
        filter: &JobFilter,
    ) -> Result<JobPage, AppError> {
        let (jobs, total_count) = if self.bypass.is_enabled() {
            (Vec::new(), 0)
        } else {
            self.store
                .list_active_jobs(filter, pagination.limit(), pagination.offset())
                .await
                .map_err(|e| e.into_app_error("list_jobs", "Failed to fetch job listings"))?
        };

        Ok(JobPage {
            jobs,
            total_count,
            current_page: pagination.page,
            total_pages: pagination.total_pages(total_count),
        })
    }
}

//! Test doubles for the store boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{CredentialStore, RelationalStore, StoreError, StoreResult};
use crate::models::job::{Job, JobFilter, NewJob};
use crate::models::profile::{Profile, ProfilePatch};
use crate::models::resume::{NewResume, Resume, ResumePatch};
use crate::models::subscription::SubscriptionStatus;
use crate::models::user::{ApiKey, User, UserCredentials};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    profiles: HashMap<Uuid, Profile>,
    resumes: HashMap<Uuid, Resume>,
    jobs: HashMap<Uuid, Job>,
    subscriptions: HashMap<Uuid, SubscriptionStatus>,
    api_keys: HashMap<(Uuid, String), ApiKey>,
    sequence: i64,
}

impl Tables {
    /// Strictly increasing timestamps so insertion order is observable in sorts.
    fn next_timestamp(&mut self) -> chrono::DateTime<Utc> {
        self.sequence += 1;
        Utc::now() + Duration::milliseconds(self.sequence)
    }
}

/// In-memory `RelationalStore` + `CredentialStore` with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub fail_job_deletes: AtomicBool,
    pub fail_resume_deletes: AtomicBool,
    pub fail_profile_updates: AtomicBool,
    pub fail_subscription_reads: AtomicBool,
    pub profile_inserts: AtomicUsize,
    pub profile_insert_attempts: AtomicUsize,
    profile_fetch_gate: OnceLock<tokio::sync::Barrier>,
    pub profile_updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every profile read until `callers` reads are in flight, so they
    /// all observe the table before any of them writes.
    pub fn gate_profile_fetches(&self, callers: usize) {
        let _ = self.profile_fetch_gate.set(tokio::sync::Barrier::new(callers));
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    pub fn add_user(&self, email: &str, password_hash: &str) -> UserCredentials {
        let now = Utc::now();
        let user = UserCredentials {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables().users.insert(user.id, user.clone());
        user
    }

    pub fn put_profile(&self, profile: Profile) {
        self.tables().profiles.insert(profile.id, profile);
    }

    pub fn put_subscription(&self, user_id: Uuid, subscription: SubscriptionStatus) {
        self.tables().subscriptions.insert(user_id, subscription);
    }

    pub fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.tables().profiles.get(&user_id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.tables().profiles.len()
    }

    pub fn resume(&self, id: Uuid) -> Option<Resume> {
        self.tables().resumes.get(&id).cloned()
    }

    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.tables().jobs.get(&id).cloned()
    }

    pub fn user(&self, id: Uuid) -> Option<UserCredentials> {
        self.tables().users.get(&id).cloned()
    }
}

fn injected(flag: &AtomicBool, what: &str) -> StoreResult<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(StoreError::Database {
            code: Some("XX000".to_string()),
            message: format!("injected {what} failure"),
            hint: None,
        });
    }
    Ok(())
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let row = self.tables().profiles.get(&user_id).cloned();
        if let Some(gate) = self.profile_fetch_gate.get() {
            gate.wait().await;
        }
        Ok(row)
    }

    async fn insert_profile_if_absent(
        &self,
        user_id: Uuid,
        email: Option<&str>,
    ) -> StoreResult<Profile> {
        self.profile_insert_attempts.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        let profile = tables.profiles.entry(user_id).or_insert_with(|| {
            self.profile_inserts.fetch_add(1, Ordering::SeqCst);
            let mut p = Profile::empty(user_id, now);
            p.contact.email = email.map(String::from);
            p
        });
        Ok(profile.clone())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> StoreResult<Option<Profile>> {
        injected(&self.fail_profile_updates, "profile update")?;
        self.profile_updates.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        Ok(tables.profiles.get_mut(&user_id).map(|p| {
            p.apply(patch);
            p.updated_at = now;
            p.clone()
        }))
    }

    async fn fetch_resume(&self, resume_id: Uuid, user_id: Uuid) -> StoreResult<Option<Resume>> {
        Ok(self
            .tables()
            .resumes
            .get(&resume_id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn list_resumes(&self, user_id: Uuid) -> StoreResult<Vec<Resume>> {
        let mut resumes: Vec<Resume> = self
            .tables()
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(resumes)
    }

    async fn insert_resume(&self, resume: &NewResume) -> StoreResult<Resume> {
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        let stored = resume.clone().into_resume(Uuid::new_v4(), now);
        tables.resumes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_resume(
        &self,
        resume_id: Uuid,
        user_id: Uuid,
        patch: &ResumePatch,
    ) -> StoreResult<Option<Resume>> {
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        Ok(tables
            .resumes
            .get_mut(&resume_id)
            .filter(|r| r.user_id == user_id)
            .map(|r| {
                r.apply(patch);
                r.updated_at = now;
                r.clone()
            }))
    }

    async fn delete_resume(&self, resume_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        injected(&self.fail_resume_deletes, "resume delete")?;
        let mut tables = self.tables();
        let owned = tables
            .resumes
            .get(&resume_id)
            .is_some_and(|r| r.user_id == user_id);
        if owned {
            tables.resumes.remove(&resume_id);
        }
        Ok(owned)
    }

    async fn resume_ids_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .tables()
            .resumes
            .values()
            .filter(|r| r.job_id == Some(job_id))
            .map(|r| r.id)
            .collect())
    }

    async fn insert_job(&self, job: &NewJob) -> StoreResult<Job> {
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        let stored = job.clone().into_job(Uuid::new_v4(), now);
        tables.jobs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_job(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        injected(&self.fail_job_deletes, "job delete")?;
        let mut tables = self.tables();
        let owned = tables.jobs.get(&job_id).is_some_and(|j| j.user_id == user_id);
        if owned {
            tables.jobs.remove(&job_id);
            for resume in tables.resumes.values_mut() {
                if resume.job_id == Some(job_id) {
                    resume.job_id = None;
                }
            }
        }
        Ok(owned)
    }

    async fn job_exists(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .tables()
            .jobs
            .get(&job_id)
            .is_some_and(|j| j.user_id == user_id))
    }

    async fn deactivate_job(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        Ok(match tables.jobs.get_mut(&job_id) {
            Some(job) if job.user_id == user_id => {
                job.is_active = false;
                job.updated_at = now;
                true
            }
            _ => false,
        })
    }

    async fn list_active_jobs(
        &self,
        filter: &JobFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Job>, i64)> {
        let mut matching: Vec<Job> = self
            .tables()
            .jobs
            .values()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn fetch_subscription(&self, user_id: Uuid) -> StoreResult<Option<SubscriptionStatus>> {
        injected(&self.fail_subscription_reads, "subscription read")?;
        Ok(self.tables().subscriptions.get(&user_id).cloned())
    }

    async fn fetch_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>> {
        let mut keys: Vec<ApiKey> = self
            .tables()
            .api_keys
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort_by(|a, b| a.service.cmp(&b.service));
        Ok(keys)
    }

    async fn save_api_key(
        &self,
        user_id: Uuid,
        service: &str,
        api_key: &str,
    ) -> StoreResult<ApiKey> {
        let key = ApiKey {
            service: service.to_string(),
            api_key: api_key.to_string(),
            created_at: Utc::now(),
        };
        self.tables()
            .api_keys
            .insert((user_id, service.to_string()), key.clone());
        Ok(key)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserCredentials>> {
        Ok(self.tables().users.get(&user_id).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let mut tables = self.tables();
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::Rejected {
                code: Some("23505".to_string()),
                message: "duplicate key value violates unique constraint \"users_email_key\""
                    .to_string(),
                hint: None,
            });
        }
        let now = tables.next_timestamp();
        let user = UserCredentials {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user.to_user())
    }

    async fn update_email(&self, user_id: Uuid, email: &str) -> StoreResult<()> {
        if let Some(user) = self.tables().users.get_mut(&user_id) {
            user.email = email.to_string();
        }
        Ok(())
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        if let Some(user) = self.tables().users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}

/// A store that fails the test the moment anything touches it.
pub struct PanicStore;

const UNREACHABLE: &str = "store reached while the development bypass is enabled";

#[async_trait]
impl RelationalStore for PanicStore {
    async fn fetch_profile(&self, _: Uuid) -> StoreResult<Option<Profile>> {
        panic!("{UNREACHABLE}")
    }
    async fn insert_profile_if_absent(&self, _: Uuid, _: Option<&str>) -> StoreResult<Profile> {
        panic!("{UNREACHABLE}")
    }
    async fn update_profile(&self, _: Uuid, _: &ProfilePatch) -> StoreResult<Option<Profile>> {
        panic!("{UNREACHABLE}")
    }
    async fn fetch_resume(&self, _: Uuid, _: Uuid) -> StoreResult<Option<Resume>> {
        panic!("{UNREACHABLE}")
    }
    async fn list_resumes(&self, _: Uuid) -> StoreResult<Vec<Resume>> {
        panic!("{UNREACHABLE}")
    }
    async fn insert_resume(&self, _: &NewResume) -> StoreResult<Resume> {
        panic!("{UNREACHABLE}")
    }
    async fn update_resume(&self, _: Uuid, _: Uuid, _: &ResumePatch) -> StoreResult<Option<Resume>> {
        panic!("{UNREACHABLE}")
    }
    async fn delete_resume(&self, _: Uuid, _: Uuid) -> StoreResult<bool> {
        panic!("{UNREACHABLE}")
    }
    async fn resume_ids_for_job(&self, _: Uuid) -> StoreResult<Vec<Uuid>> {
        panic!("{UNREACHABLE}")
    }
    async fn insert_job(&self, _: &NewJob) -> StoreResult<Job> {
        panic!("{UNREACHABLE}")
    }
    async fn delete_job(&self, _: Uuid, _: Uuid) -> StoreResult<bool> {
        panic!("{UNREACHABLE}")
    }
    async fn deactivate_job(&self, _: Uuid, _: Uuid) -> StoreResult<bool> {
        panic!("{UNREACHABLE}")
    }
    async fn job_exists(&self, _: Uuid, _: Uuid) -> StoreResult<bool> {
        panic!("{UNREACHABLE}")
    }
    async fn list_active_jobs(&self, _: &JobFilter, _: i64, _: i64) -> StoreResult<(Vec<Job>, i64)> {
        panic!("{UNREACHABLE}")
    }
    async fn fetch_subscription(&self, _: Uuid) -> StoreResult<Option<SubscriptionStatus>> {
        panic!("{UNREACHABLE}")
    }
    async fn fetch_api_keys(&self, _: Uuid) -> StoreResult<Vec<ApiKey>> {
        panic!("{UNREACHABLE}")
    }
    async fn save_api_key(&self, _: Uuid, _: &str, _: &str) -> StoreResult<ApiKey> {
        panic!("{UNREACHABLE}")
    }
}

#[async_trait]
impl CredentialStore for PanicStore {
    async fn find_user_by_email(&self, _: &str) -> StoreResult<Option<UserCredentials>> {
        panic!("{UNREACHABLE}")
    }
    async fn find_user_by_id(&self, _: Uuid) -> StoreResult<Option<UserCredentials>> {
        panic!("{UNREACHABLE}")
    }
    async fn create_user(&self, _: &str, _: &str) -> StoreResult<User> {
        panic!("{UNREACHABLE}")
    }
    async fn update_email(&self, _: Uuid, _: &str) -> StoreResult<()> {
        panic!("{UNREACHABLE}")
    }
    async fn update_password_hash(&self, _: Uuid, _: &str) -> StoreResult<()> {
        panic!("{UNREACHABLE}")
    }
}

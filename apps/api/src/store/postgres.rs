use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{CredentialStore, RelationalStore, StoreResult};
use crate::models::job::{EmploymentType, Job, JobFilter, NewJob, WorkLocation};
use crate::models::profile::{Profile, ProfilePatch};
use crate::models::resume::{NewResume, Resume, ResumePatch, SectionConfigs};
use crate::models::sections::{
    Certification, ContactInfo, Education, Project, ResumeSections, SectionKind, Skill,
    WorkExperience,
};
use crate::models::subscription::SubscriptionStatus;
use crate::models::user::{ApiKey, User, UserCredentials};

/// PostgreSQL-backed store. List fields and layout settings live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row types
// ────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    location: Option<String>,
    website: Option<String>,
    linkedin_url: Option<String>,
    github_url: Option<String>,
    work_experience: Json<Vec<WorkExperience>>,
    education: Json<Vec<Education>>,
    skills: Json<Vec<Skill>>,
    projects: Json<Vec<Project>>,
    certifications: Json<Vec<Certification>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            contact: ContactInfo {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone_number: row.phone_number,
                location: row.location,
                website: row.website,
                linkedin_url: row.linkedin_url,
                github_url: row.github_url,
            },
            sections: ResumeSections {
                work_experience: row.work_experience.0,
                education: row.education.0,
                skills: row.skills.0,
                projects: row.projects.0,
                certifications: row.certifications.0,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ResumeRow {
    id: Uuid,
    user_id: Uuid,
    job_id: Option<Uuid>,
    name: String,
    target_role: Option<String>,
    is_base_resume: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    location: Option<String>,
    website: Option<String>,
    linkedin_url: Option<String>,
    github_url: Option<String>,
    work_experience: Json<Vec<WorkExperience>>,
    education: Json<Vec<Education>>,
    skills: Json<Vec<Skill>>,
    projects: Json<Vec<Project>>,
    certifications: Json<Vec<Certification>>,
    has_cover_letter: bool,
    section_order: Json<Vec<SectionKind>>,
    document_settings: Option<Value>,
    section_configs: Option<Json<SectionConfigs>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for Resume {
    fn from(row: ResumeRow) -> Self {
        Resume {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            name: row.name,
            target_role: row.target_role,
            is_base_resume: row.is_base_resume,
            contact: ContactInfo {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone_number: row.phone_number,
                location: row.location,
                website: row.website,
                linkedin_url: row.linkedin_url,
                github_url: row.github_url,
            },
            sections: ResumeSections {
                work_experience: row.work_experience.0,
                education: row.education.0,
                skills: row.skills.0,
                projects: row.projects.0,
                certifications: row.certifications.0,
            },
            has_cover_letter: row.has_cover_letter,
            section_order: row.section_order.0,
            document_settings: row.document_settings,
            section_configs: row.section_configs.map(|c| c.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    user_id: Uuid,
    company_name: Option<String>,
    position_title: Option<String>,
    job_url: Option<String>,
    description: Option<String>,
    location: Option<String>,
    salary_range: Option<String>,
    keywords: Vec<String>,
    work_location: Option<String>,
    employment_type: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            user_id: row.user_id,
            company_name: row.company_name,
            position_title: row.position_title,
            job_url: row.job_url,
            description: row.description,
            location: row.location,
            salary_range: row.salary_range,
            keywords: row.keywords,
            // CHECK constraints keep these columns within the enum domains
            work_location: row.work_location.as_deref().and_then(WorkLocation::parse),
            employment_type: row.employment_type.as_deref().and_then(EmploymentType::parse),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Partial-update helpers
// ────────────────────────────────────────────────────────────────────────────

type SetList<'qb, 'args> = Separated<'qb, 'args, Postgres, &'static str>;

fn set_text<'args>(set: &mut SetList<'_, 'args>, column: &str, value: &Option<Option<String>>) {
    if let Some(v) = value {
        set.push(format!("{column} = "));
        set.push_bind_unseparated(v.clone());
    }
}

fn set_json<'args, T>(set: &mut SetList<'_, 'args>, column: &str, value: &Option<T>)
where
    T: Serialize + Clone + Send + 'args,
{
    if let Some(v) = value {
        set.push(format!("{column} = "));
        set.push_bind_unseparated(Json(v.clone()));
    }
}

fn set_sections<'args>(
    set: &mut SetList<'_, 'args>,
    work_experience: &Option<Vec<WorkExperience>>,
    education: &Option<Vec<Education>>,
    skills: &Option<Vec<Skill>>,
    projects: &Option<Vec<Project>>,
    certifications: &Option<Vec<Certification>>,
) {
    set_json(set, "work_experience", work_experience);
    set_json(set, "education", education);
    set_json(set, "skills", skills);
    set_json(set, "projects", projects);
    set_json(set, "certifications", certifications);
}

fn push_job_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &JobFilter) {
    qb.push(" WHERE is_active = TRUE");
    if let Some(loc) = filter.work_location {
        qb.push(" AND work_location = ").push_bind(loc.as_str());
    }
    if let Some(kind) = filter.employment_type {
        qb.push(" AND employment_type = ").push_bind(kind.as_str());
    }
    if !filter.keywords.is_empty() {
        qb.push(" AND keywords @> ").push_bind(filter.keywords.clone());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RelationalStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RelationalStore for PgStore {
    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Profile::from))
    }

    async fn insert_profile_if_absent(
        &self,
        user_id: Uuid,
        email: Option<&str>,
    ) -> StoreResult<Profile> {
        // Concurrent first calls race here; the PK makes exactly one insert win.
        let inserted = sqlx::query(
            r#"
            INSERT INTO profiles
                (id, email, work_experience, education, skills, projects, certifications)
            VALUES ($1, $2, '[]'::jsonb, '[]'::jsonb, '[]'::jsonb, '[]'::jsonb, '[]'::jsonb)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            debug!("Created profile for user {user_id}");
        }

        let row: ProfileRow = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> StoreResult<Option<Profile>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE profiles SET ");
        {
            let mut set = qb.separated(", ");
            set_text(&mut set, "first_name", &patch.first_name);
            set_text(&mut set, "last_name", &patch.last_name);
            set_text(&mut set, "email", &patch.email);
            set_text(&mut set, "phone_number", &patch.phone_number);
            set_text(&mut set, "location", &patch.location);
            set_text(&mut set, "website", &patch.website);
            set_text(&mut set, "linkedin_url", &patch.linkedin_url);
            set_text(&mut set, "github_url", &patch.github_url);
            set_sections(
                &mut set,
                &patch.work_experience,
                &patch.education,
                &patch.skills,
                &patch.projects,
                &patch.certifications,
            );
            set.push("updated_at = NOW()");
        }
        qb.push(" WHERE id = ").push_bind(user_id).push(" RETURNING *");

        let row = qb.build_query_as::<ProfileRow>().fetch_optional(&self.pool).await?;
        Ok(row.map(Profile::from))
    }

    async fn fetch_resume(&self, resume_id: Uuid, user_id: Uuid) -> StoreResult<Option<Resume>> {
        let row: Option<ResumeRow> =
            sqlx::query_as("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
                .bind(resume_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Resume::from))
    }

    async fn list_resumes(&self, user_id: Uuid) -> StoreResult<Vec<Resume>> {
        let rows: Vec<ResumeRow> =
            sqlx::query_as("SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Resume::from).collect())
    }

    async fn insert_resume(&self, resume: &NewResume) -> StoreResult<Resume> {
        let c = &resume.contact;
        let s = &resume.sections;
        let row: ResumeRow = sqlx::query_as(
            r#"
            INSERT INTO resumes
                (user_id, job_id, name, target_role, is_base_resume,
                 first_name, last_name, email, phone_number, location,
                 website, linkedin_url, github_url,
                 work_experience, education, skills, projects, certifications,
                 has_cover_letter, section_order, document_settings, section_configs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(resume.user_id)
        .bind(resume.job_id)
        .bind(&resume.name)
        .bind(&resume.target_role)
        .bind(resume.is_base_resume)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone_number)
        .bind(&c.location)
        .bind(&c.website)
        .bind(&c.linkedin_url)
        .bind(&c.github_url)
        .bind(Json(&s.work_experience))
        .bind(Json(&s.education))
        .bind(Json(&s.skills))
        .bind(Json(&s.projects))
        .bind(Json(&s.certifications))
        .bind(resume.has_cover_letter)
        .bind(Json(&resume.section_order))
        .bind(&resume.document_settings)
        .bind(resume.section_configs.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_resume(
        &self,
        resume_id: Uuid,
        user_id: Uuid,
        patch: &ResumePatch,
    ) -> StoreResult<Option<Resume>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE resumes SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = &patch.name {
                set.push("name = ");
                set.push_bind_unseparated(name.clone());
            }
            set_text(&mut set, "target_role", &patch.target_role);
            set_text(&mut set, "first_name", &patch.first_name);
            set_text(&mut set, "last_name", &patch.last_name);
            set_text(&mut set, "email", &patch.email);
            set_text(&mut set, "phone_number", &patch.phone_number);
            set_text(&mut set, "location", &patch.location);
            set_text(&mut set, "website", &patch.website);
            set_text(&mut set, "linkedin_url", &patch.linkedin_url);
            set_text(&mut set, "github_url", &patch.github_url);
            set_sections(
                &mut set,
                &patch.work_experience,
                &patch.education,
                &patch.skills,
                &patch.projects,
                &patch.certifications,
            );
            if let Some(v) = patch.has_cover_letter {
                set.push("has_cover_letter = ");
                set.push_bind_unseparated(v);
            }
            set_json(&mut set, "section_order", &patch.section_order);
            if let Some(v) = &patch.document_settings {
                set.push("document_settings = ");
                set.push_bind_unseparated(v.clone());
            }
            if let Some(v) = &patch.section_configs {
                set.push("section_configs = ");
                set.push_bind_unseparated(v.clone().map(Json));
            }
            set.push("updated_at = NOW()");
        }
        qb.push(" WHERE id = ")
            .push_bind(resume_id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING *");

        let row = qb.build_query_as::<ResumeRow>().fetch_optional(&self.pool).await?;
        Ok(row.map(Resume::from))
    }

    async fn delete_resume(&self, resume_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(resume_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn resume_ids_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(
            sqlx::query_scalar("SELECT id FROM resumes WHERE job_id = $1")
                .bind(job_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_job(&self, job: &NewJob) -> StoreResult<Job> {
        let row: JobRow = sqlx::query_as(
            r#"
            INSERT INTO jobs
                (user_id, company_name, position_title, job_url, description, location,
                 salary_range, keywords, work_location, employment_type, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(job.user_id)
        .bind(&job.company_name)
        .bind(&job.position_title)
        .bind(&job.job_url)
        .bind(&job.description)
        .bind(&job.location)
        .bind(&job.salary_range)
        .bind(&job.keywords)
        .bind(job.work_location.map(|w| w.as_str()))
        .bind(job.employment_type.map(|e| e.as_str()))
        .bind(job.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_job(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
            .bind(job_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_job(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(job_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn job_exists(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1 AND user_id = $2)",
        )
        .bind(job_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_active_jobs(
        &self,
        filter: &JobFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Job>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
        push_job_filters(&mut count_qb, filter);

        let mut page_qb = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        push_job_filters(&mut page_qb, filter);
        page_qb
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let (total, rows): (i64, Vec<JobRow>) = tokio::try_join!(
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
            page_qb.build_query_as::<JobRow>().fetch_all(&self.pool),
        )?;

        Ok((rows.into_iter().map(Job::from).collect(), total))
    }

    async fn fetch_subscription(&self, user_id: Uuid) -> StoreResult<Option<SubscriptionStatus>> {
        Ok(sqlx::query_as(
            r#"
            SELECT subscription_plan, subscription_status, current_period_end, trial_end,
                   stripe_customer_id, stripe_subscription_id
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn fetch_api_keys(&self, user_id: Uuid) -> StoreResult<Vec<ApiKey>> {
        Ok(sqlx::query_as(
            "SELECT service, api_key, created_at FROM api_keys WHERE user_id = $1 ORDER BY service",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_api_key(
        &self,
        user_id: Uuid,
        service: &str,
        api_key: &str,
    ) -> StoreResult<ApiKey> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO api_keys (user_id, service, api_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, service)
            DO UPDATE SET api_key = EXCLUDED.api_key, created_at = NOW()
            RETURNING service, api_key, created_at
            "#,
        )
        .bind(user_id)
        .bind(service)
        .bind(api_key)
        .fetch_one(&self.pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CredentialStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        Ok(sqlx::query_as(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM auth.users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserCredentials>> {
        Ok(sqlx::query_as(
            "SELECT id, email, password_hash, created_at, updated_at FROM auth.users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO auth.users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_email(&self, user_id: Uuid, email: &str) -> StoreResult<()> {
        sqlx::query("UPDATE auth.users SET email = $1, updated_at = NOW() WHERE id = $2")
            .bind(email)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE auth.users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

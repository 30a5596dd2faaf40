use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Session;
use crate::bypass::{fixtures, DevBypass};
use crate::errors::AppError;
use crate::invalidation::{self, CacheInvalidator};
use crate::models::profile::Profile;
use crate::models::resume::{ImportOption, NewResume, Resume, ResumePatch, SectionConfigs};
use crate::models::sections::{
    default_section_order, is_section_permutation, ContactInfo, ResumeContent, ResumeSections,
    SectionConfig, SectionKind,
};
use crate::store::RelationalStore;

const RESUME_NOT_FOUND: &str = "Resume not found";

#[derive(Debug, Deserialize)]
pub struct CreateBaseResumeRequest {
    pub name: String,
    #[serde(default)]
    pub import_option: ImportOption,
    #[serde(default)]
    pub selected_content: Option<ResumeContent>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTailoredResumeRequest {
    pub base_resume_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub tailored_content: ResumeContent,
}

/// Resume detail views need the owner's profile alongside the resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeWithProfile {
    pub resume: Resume,
    pub profile: Profile,
}

/// Content sections start visible iff they have entries; certifications start hidden.
pub fn initial_section_configs(sections: &ResumeSections) -> SectionConfigs {
    SectionKind::ALL
        .into_iter()
        .map(|kind| {
            let visible =
                kind != SectionKind::Certifications && !sections.is_section_empty(kind);
            (kind, SectionConfig::visible(visible))
        })
        .collect()
}

/// A new base resume for `user_id` seeded with the given contact and content.
pub fn seed_base_resume(
    user_id: Uuid,
    name: &str,
    contact: ContactInfo,
    sections: ResumeSections,
) -> NewResume {
    NewResume {
        user_id,
        job_id: None,
        name: name.to_string(),
        target_role: Some(name.to_string()),
        is_base_resume: true,
        section_configs: Some(initial_section_configs(&sections)),
        contact,
        sections,
        has_cover_letter: false,
        section_order: default_section_order(),
        document_settings: None,
    }
}

/// Layout and contact come from the base resume; content from the tailoring output.
pub fn derive_tailored_resume(
    base: &Resume,
    job_id: Uuid,
    job_title: &str,
    company_name: &str,
    content: ResumeContent,
) -> NewResume {
    NewResume {
        user_id: base.user_id,
        job_id: Some(job_id),
        name: format!("{job_title} at {company_name}"),
        target_role: content.target_role,
        is_base_resume: false,
        contact: base.contact.clone(),
        sections: content.sections,
        has_cover_letter: false,
        section_order: base.section_order.clone(),
        document_settings: base.document_settings.clone(),
        section_configs: base.section_configs.clone(),
    }
}

pub fn copy_of(source: &Resume) -> NewResume {
    NewResume {
        user_id: source.user_id,
        job_id: source.job_id,
        name: format!("{} (Copy)", source.name),
        target_role: source.target_role.clone(),
        is_base_resume: source.is_base_resume,
        contact: source.contact.clone(),
        sections: source.sections.clone(),
        has_cover_letter: source.has_cover_letter,
        section_order: source.section_order.clone(),
        document_settings: source.document_settings.clone(),
        section_configs: source.section_configs.clone(),
    }
}

fn validate_patch(patch: &ResumePatch) -> Result<(), AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("No resume fields to update".to_string()));
    }
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("Resume name cannot be empty".to_string()));
    }
    if let Some(order) = &patch.section_order {
        if !is_section_permutation(order) {
            return Err(AppError::Validation(
                "section_order must list each section exactly once".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ResumeService {
    store: Arc<dyn RelationalStore>,
    invalidator: Arc<dyn CacheInvalidator>,
    bypass: DevBypass,
}

impl ResumeService {
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

    /// Profile content for an import. A missing or unreadable profile seeds nothing.
    async fn profile_seed(&self, user_id: Uuid) -> (ContactInfo, ResumeSections) {
        if self.bypass.is_enabled() {
            let profile = fixtures::profile();
            return (profile.contact, profile.sections);
        }
        match self.store.fetch_profile(user_id).await {
            Ok(Some(profile)) => (profile.contact, profile.sections),
            Ok(None) => {
                tracing::warn!(%user_id, "No profile to import from, starting empty");
                Default::default()
            }
            Err(e) => {
                tracing::warn!(%user_id, "Profile read failed during import, starting empty: {e}");
                Default::default()
            }
        }
    }

    pub async fn create_base_resume(
        &self,
        session: &Session,
        req: CreateBaseResumeRequest,
    ) -> Result<Resume, AppError> {
        let user_id = if self.bypass.is_enabled() {
            fixtures::DEV_USER_ID
        } else {
            session.require()?.user_id
        };
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Resume name is required".to_string()));
        }

        let (contact, sections) = match req.import_option {
            ImportOption::Fresh => Default::default(),
            ImportOption::ImportProfile => self.profile_seed(user_id).await,
            ImportOption::ImportResume => {
                let content = req.selected_content.ok_or_else(|| {
                    AppError::Validation("selected_content is required to import a resume".into())
                })?;
                (content.contact, content.sections)
            }
        };
        let new_resume = seed_base_resume(user_id, name, contact, sections);

        if self.bypass.is_enabled() {
            let resume = fixtures::inserted_resume(new_resume);
            tracing::debug!(resume_id = %resume.id, "Base resume synthesized in development mode");
            return Ok(resume);
        }

        let resume = self
            .store
            .insert_resume(&new_resume)
            .await
            .map_err(|e| e.into_app_error("create_base_resume", "Failed to create resume"))?;
        self.invalidator.invalidate(invalidation::base_resume_created());
        Ok(resume)
    }

    pub async fn create_tailored_resume(
        &self,
        session: &Session,
        req: CreateTailoredResumeRequest,
    ) -> Result<Resume, AppError> {
        if self.bypass.is_enabled() {
            let base = fixtures::resume_by_id(req.base_resume_id);
            let derived = derive_tailored_resume(
                &base,
                req.job_id,
                &req.job_title,
                &req.company_name,
                req.tailored_content,
            );
            return Ok(fixtures::inserted_resume(derived));
        }

        let identity = session.require()?;
        let base = self
            .store
            .fetch_resume(req.base_resume_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("create_tailored_resume", "Failed to load base resume"))?
            .ok_or_else(|| AppError::NotFound("Base resume not found".to_string()))?;
        let job_owned = self
            .store
            .job_exists(req.job_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("create_tailored_resume", "Failed to load job"))?;
        if !job_owned {
            return Err(AppError::NotFound("Job not found".to_string()));
        }

        let derived = derive_tailored_resume(
            &base,
            req.job_id,
            &req.job_title,
            &req.company_name,
            req.tailored_content,
        );
        let resume = self.store.insert_resume(&derived).await.map_err(|e| {
            e.into_app_error("create_tailored_resume", "Failed to create tailored resume")
        })?;
        self.invalidator.invalidate(invalidation::tailored_resume_created());
        Ok(resume)
    }

    pub async fn update_resume(
        &self,
        session: &Session,
        resume_id: Uuid,
        patch: ResumePatch,
    ) -> Result<Resume, AppError> {
        let identity = if self.bypass.is_enabled() {
            None
        } else {
            Some(session.require()?)
        };
        validate_patch(&patch)?;

        let Some(identity) = identity else {
            tracing::debug!(%resume_id, "Resume update short-circuited in development mode");
            return Ok(fixtures::patched_resume(resume_id, &patch));
        };
        let resume = self
            .store
            .update_resume(resume_id, identity.user_id, &patch)
            .await
            .map_err(|e| e.into_app_error("update_resume", "Failed to update resume"))?
            .ok_or_else(|| AppError::NotFound(RESUME_NOT_FOUND.to_string()))?;
        self.invalidator.invalidate(invalidation::resume_page(resume_id));
        Ok(resume)
    }

    pub async fn copy_resume(&self, session: &Session, resume_id: Uuid) -> Result<Resume, AppError> {
        if self.bypass.is_enabled() {
            return Ok(fixtures::inserted_resume(copy_of(&fixtures::resume_by_id(
                resume_id,
            ))));
        }

        let identity = session.require()?;
        let source = self
            .store
            .fetch_resume(resume_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("copy_resume", "Failed to copy resume"))?
            .ok_or_else(|| AppError::NotFound(RESUME_NOT_FOUND.to_string()))?;

        let copy = self
            .store
            .insert_resume(&copy_of(&source))
            .await
            .map_err(|e| e.into_app_error("copy_resume", "Failed to copy resume"))?;
        self.invalidator.invalidate(invalidation::resume_copied());
        Ok(copy)
    }

    /// Deletes a resume. A tailored resume takes its job with it; failing to
    /// delete the job is logged and does not stop the resume delete.
    pub async fn delete_resume(&self, session: &Session, resume_id: Uuid) -> Result<(), AppError> {
        if self.bypass.is_enabled() {
            tracing::debug!(%resume_id, "Resume delete short-circuited in development mode");
            return Ok(());
        }

        let identity = session.require()?;
        let resume = self
            .store
            .fetch_resume(resume_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("delete_resume", "Failed to delete resume"))?
            .ok_or_else(|| AppError::NotFound(RESUME_NOT_FOUND.to_string()))?;

        if let (false, Some(job_id)) = (resume.is_base_resume, resume.job_id) {
            match self.store.delete_job(job_id, identity.user_id).await {
                Ok(true) => tracing::debug!(%job_id, "Deleted job of tailored resume"),
                Ok(false) => tracing::debug!(%job_id, "Job of tailored resume already gone"),
                Err(e) => tracing::error!(%job_id, %resume_id, "Failed to delete associated job: {e}"),
            }
        }

        let deleted = self
            .store
            .delete_resume(resume_id, identity.user_id)
            .await
            .map_err(|e| e.into_app_error("delete_resume", "Failed to delete resume"))?;
        if !deleted {
            return Err(AppError::NotFound(RESUME_NOT_FOUND.to_string()));
        }

        self.invalidator.invalidate(invalidation::resume_deleted());
        Ok(())
    }

    /// Read path: `None` for a signed-out caller. The resume and profile are
    /// fetched together; either missing is not-found.
    pub async fn get_resume_by_id(
        &self,
        session: &Session,
        resume_id: Uuid,
    ) -> Result<Option<ResumeWithProfile>, AppError> {
        if self.bypass.is_enabled() {
            return Ok(Some(ResumeWithProfile {
                resume: fixtures::resume_by_id(resume_id),
                profile: fixtures::profile(),
            }));
        }
        let Some(identity) = session.identity() else {
            tracing::warn!(%resume_id, "Resume requested without a session");
            return Ok(None);
        };

        let (resume, profile) = tokio::try_join!(
            self.store.fetch_resume(resume_id, identity.user_id),
            self.store.fetch_profile(identity.user_id),
        )
        .map_err(|e| e.into_app_error("get_resume_by_id", "Failed to load resume"))?;

        let resume = resume.ok_or_else(|| AppError::NotFound(RESUME_NOT_FOUND.to_string()))?;
        let profile = profile.ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        Ok(Some(ResumeWithProfile { resume, profile }))
    }
}

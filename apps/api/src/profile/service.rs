use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Session;
use crate::bypass::{fixtures, DevBypass};
use crate::errors::AppError;
use crate::invalidation::{self, CacheInvalidator};
use crate::models::profile::{Profile, ProfileImport, ProfilePatch};
use crate::models::sections::ContactInfo;
use crate::store::RelationalStore;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Fills a contact field only where the existing value is blank.
fn fill_gap(existing: &Option<String>, incoming: &Option<String>) -> Option<Option<String>> {
    if is_blank(existing) && !is_blank(incoming) {
        Some(incoming.clone())
    } else {
        None
    }
}

fn append<T: Clone>(existing: &[T], incoming: &[T]) -> Option<Vec<T>> {
    if incoming.is_empty() {
        return None;
    }
    Some(existing.iter().chain(incoming).cloned().collect())
}

/// The patch an import would apply: contact gaps filled, lists appended in
/// order with no dedup. `None` when the import changes nothing.
pub fn merge_import(existing: &Profile, incoming: &ProfileImport) -> Option<ProfilePatch> {
    let (have, new): (&ContactInfo, &ContactInfo) = (&existing.contact, &incoming.contact);
    let (lists, extra) = (&existing.sections, &incoming.sections);

    let patch = ProfilePatch {
        first_name: fill_gap(&have.first_name, &new.first_name),
        last_name: fill_gap(&have.last_name, &new.last_name),
        email: fill_gap(&have.email, &new.email),
        phone_number: fill_gap(&have.phone_number, &new.phone_number),
        location: fill_gap(&have.location, &new.location),
        website: fill_gap(&have.website, &new.website),
        linkedin_url: fill_gap(&have.linkedin_url, &new.linkedin_url),
        github_url: fill_gap(&have.github_url, &new.github_url),
        work_experience: append(&lists.work_experience, &extra.work_experience),
        education: append(&lists.education, &extra.education),
        skills: append(&lists.skills, &extra.skills),
        projects: append(&lists.projects, &extra.projects),
        certifications: append(&lists.certifications, &extra.certifications),
    };

    (!patch.is_empty()).then_some(patch)
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn RelationalStore>,
    invalidator: Arc<dyn CacheInvalidator>,
    bypass: DevBypass,
}

impl ProfileService {
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

    /// Returns the user's profile, creating an empty one on first access.
    /// Concurrent first calls converge on a single row.
    pub async fn get_or_create_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        if self.bypass.is_enabled() {
            return Ok(fixtures::profile());
        }

        let existing = self
            .store
            .fetch_profile(user_id)
            .await
            .map_err(|e| e.into_app_error("get_or_create_profile", "Failed to load profile"))?;
        if let Some(profile) = existing {
            return Ok(profile);
        }

        tracing::info!(%user_id, "Creating empty profile");
        self.store
            .insert_profile_if_absent(user_id, None)
            .await
            .map_err(|e| e.into_app_error("get_or_create_profile", "Failed to create profile"))
    }

    /// Read path: a signed-out caller gets `None`.
    pub async fn profile(&self, session: &Session) -> Result<Option<Profile>, AppError> {
        if self.bypass.is_enabled() {
            return Ok(Some(fixtures::profile()));
        }
        match session.identity() {
            Some(identity) => self.get_or_create_profile(identity.user_id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, user_id: Uuid, patch: &ProfilePatch) -> Result<Profile, AppError> {
        let updated = self
            .store
            .update_profile(user_id, patch)
            .await
            .map_err(|e| e.into_app_error("update_profile", "Failed to update profile"))?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        self.invalidator.invalidate(invalidation::profile_views());
        Ok(updated)
    }

    pub async fn update_profile(
        &self,
        session: &Session,
        patch: ProfilePatch,
    ) -> Result<Profile, AppError> {
        let identity = if self.bypass.is_enabled() {
            None
        } else {
            Some(session.require()?)
        };
        if patch.is_empty() {
            return Err(AppError::Validation("No profile fields to update".to_string()));
        }

        let Some(identity) = identity else {
            tracing::debug!("Profile update short-circuited in development mode");
            let mut profile = fixtures::profile();
            profile.apply(&patch);
            profile.updated_at = Utc::now();
            return Ok(profile);
        };
        self.write(identity.user_id, &patch).await
    }

    pub async fn import_into_profile(
        &self,
        session: &Session,
        import: ProfileImport,
    ) -> Result<Profile, AppError> {
        if self.bypass.is_enabled() {
            let mut profile = fixtures::profile();
            if let Some(patch) = merge_import(&profile, &import) {
                profile.apply(&patch);
            }
            return Ok(profile);
        }

        let identity = session.require()?;
        let existing = self.get_or_create_profile(identity.user_id).await?;
        match merge_import(&existing, &import) {
            Some(patch) => self.write(identity.user_id, &patch).await,
            None => {
                tracing::debug!(user_id = %identity.user_id, "Import changed nothing");
                Ok(existing)
            }
        }
    }

    pub async fn reset_profile(&self, session: &Session) -> Result<Profile, AppError> {
        if self.bypass.is_enabled() {
            return Ok(Profile::empty(fixtures::DEV_USER_ID, Utc::now()));
        }

        let identity = session.require()?;
        self.write(identity.user_id, &ProfilePatch::reset()).await
    }
}

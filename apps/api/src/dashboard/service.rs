use std::sync::Arc;

use serde::Serialize;

use crate::auth::Session;
use crate::bypass::{fixtures, DevBypass};
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::models::resume::Resume;
use crate::profile::ProfileService;
use crate::store::RelationalStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub profile: Option<Profile>,
    pub base_resumes: Vec<Resume>,
    pub tailored_resumes: Vec<Resume>,
}

impl DashboardData {
    pub fn empty() -> Self {
        Self {
            profile: None,
            base_resumes: Vec::new(),
            tailored_resumes: Vec::new(),
        }
    }

    /// Splits resumes by kind, keeping their order.
    pub fn new(profile: Profile, resumes: Vec<Resume>) -> Self {
        let (base_resumes, tailored_resumes) =
            resumes.into_iter().partition(|r| r.is_base_resume);
        Self {
            profile: Some(profile),
            base_resumes,
            tailored_resumes,
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    profiles: ProfileService,
    store: Arc<dyn RelationalStore>,
    bypass: DevBypass,
}

impl DashboardService {
    pub fn new(
        profiles: ProfileService,
        store: Arc<dyn RelationalStore>,
        bypass: DevBypass,
    ) -> Self {
        Self {
            profiles,
            store,
            bypass,
        }
    }

    pub async fn dashboard(&self, session: &Session) -> Result<DashboardData, AppError> {
        if self.bypass.is_enabled() {
            return Ok(DashboardData::new(fixtures::profile(), fixtures::resumes()));
        }
        let Some(identity) = session.identity() else {
            return Ok(DashboardData::empty());
        };

        let (profile, resumes) = tokio::try_join!(
            self.profiles.get_or_create_profile(identity.user_id),
            async {
                self.store
                    .list_resumes(identity.user_id)
                    .await
                    .map_err(|e| e.into_app_error("dashboard", "Failed to fetch resumes"))
            },
        )?;
        Ok(DashboardData::new(profile, resumes))
    }
}

use std::sync::Arc;

use crate::ai::{AiService, ProviderClient, ProviderKeys};
use crate::auth::{AuthService, SessionResolver, TokenManager};
use crate::bypass::DevBypass;
use crate::dashboard::DashboardService;
use crate::invalidation::CacheInvalidator;
use crate::jobs::JobService;
use crate::profile::ProfileService;
use crate::resume::ResumeService;
use crate::store::{CredentialStore, RelationalStore};
use crate::subscription::SubscriptionService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub bypass: DevBypass,
    pub sessions: SessionResolver,
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub resumes: ResumeService,
    pub jobs: JobService,
    pub subscriptions: SubscriptionService,
    pub dashboard: DashboardService,
    pub ai: AiService,
}

/// Outside collaborators every service is built from.
pub struct Collaborators<S> {
    pub store: Arc<S>,
    pub invalidator: Arc<dyn CacheInvalidator>,
    pub tokens: TokenManager,
    pub provider_client: ProviderClient,
    pub provider_keys: ProviderKeys,
    pub bypass: DevBypass,
}

impl AppState {
    pub fn new<S>(deps: Collaborators<S>) -> Self
    where
        S: RelationalStore + CredentialStore + 'static,
    {
        let Collaborators {
            store,
            invalidator,
            tokens,
            provider_client,
            provider_keys,
            bypass,
        } = deps;
        let relational: Arc<dyn RelationalStore> = store.clone();
        let credentials: Arc<dyn CredentialStore> = store;

        let profiles = ProfileService::new(relational.clone(), invalidator.clone(), bypass);

        Self {
            bypass,
            sessions: SessionResolver::new(tokens.clone(), credentials.clone()),
            auth: AuthService::new(
                credentials,
                relational.clone(),
                tokens,
                invalidator.clone(),
                bypass,
            ),
            dashboard: DashboardService::new(profiles.clone(), relational.clone(), bypass),
            profiles,
            resumes: ResumeService::new(relational.clone(), invalidator.clone(), bypass),
            jobs: JobService::new(relational.clone(), invalidator.clone(), bypass),
            subscriptions: SubscriptionService::new(relational.clone(), bypass),
            ai: AiService::new(
                relational,
                invalidator,
                provider_client,
                provider_keys,
                bypass,
            ),
        }
    }
}

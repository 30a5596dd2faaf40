use std::sync::Arc;

use crate::auth::Session;
use crate::bypass::DevBypass;
use crate::errors::AppError;
use crate::models::subscription::SubscriptionStatus;
use crate::store::RelationalStore;

/// Read-only view of billing state. Checkout and cancellation live with the
/// payment provider.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn RelationalStore>,
    bypass: DevBypass,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn RelationalStore>, bypass: DevBypass) -> Self {
        Self { store, bypass }
    }

    /// No row means the implicit Free plan. A signed-out caller also sees Free.
    pub async fn subscription_status(
        &self,
        session: &Session,
    ) -> Result<SubscriptionStatus, AppError> {
        if self.bypass.is_enabled() {
            return Ok(SubscriptionStatus::free());
        }
        let Some(identity) = session.identity() else {
            return Ok(SubscriptionStatus::free());
        };

        let row = self
            .store
            .fetch_subscription(identity.user_id)
            .await
            .map_err(|e| {
                e.into_app_error("subscription_status", "Failed to fetch subscription status")
            })?;
        Ok(row.unwrap_or_else(SubscriptionStatus::free))
    }
}

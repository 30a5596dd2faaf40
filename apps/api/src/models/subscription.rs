use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Read-only projection of a user's billing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubscriptionStatus {
    pub subscription_plan: String,
    pub subscription_status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl SubscriptionStatus {
    /// The implicit plan of a user with no subscription row.
    pub fn free() -> Self {
        Self {
            subscription_plan: "Free".to_string(),
            subscription_status: "active".to_string(),
            current_period_end: None,
            trial_end: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
        }
    }
}

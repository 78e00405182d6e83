//! Subscription status lookup

use async_trait::async_trait;
use std::sync::Arc;

use super::{CommercePlatform, PlatformError};
use crate::domain::services::SubscriptionStatus;

#[async_trait]
pub trait SubscriptionStatusProvider: Send + Sync {
    async fn status(&self) -> Result<SubscriptionStatus, PlatformError>;
}

/// A shop is on the Pro plan while it has an active recurring charge.
pub struct PlatformSubscriptionProvider {
    platform: Arc<dyn CommercePlatform>,
}

impl PlatformSubscriptionProvider {
    pub fn new(platform: Arc<dyn CommercePlatform>) -> Self { Self { platform } }
}

#[async_trait]
impl SubscriptionStatusProvider for PlatformSubscriptionProvider {
    async fn status(&self) -> Result<SubscriptionStatus, PlatformError> {
        let charges = self.platform.active_recurring_charges().await?;
        Ok(if charges.is_empty() { SubscriptionStatus::free() } else { SubscriptionStatus::pro() })
    }
}

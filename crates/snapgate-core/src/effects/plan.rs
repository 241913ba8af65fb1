//! Plan tier collaborator
//!
//! Billing lives elsewhere; the core only asks which tier a producer is on.

use crate::types::PlanTier;
use async_trait::async_trait;
use std::sync::Arc;

/// Resolve a producer's plan tier
#[async_trait]
pub trait PlanEffects: Send + Sync {
    /// Plan tier for `owner_uid`
    async fn plan_for(&self, owner_uid: &str) -> PlanTier;
}

/// Every producer gets the same tier
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPlan(pub PlanTier);

#[async_trait]
impl PlanEffects for FixedPlan {
    async fn plan_for(&self, _owner_uid: &str) -> PlanTier {
        self.0
    }
}

#[async_trait]
impl<T: PlanEffects + ?Sized> PlanEffects for Arc<T> {
    async fn plan_for(&self, owner_uid: &str) -> PlanTier {
        (**self).plan_for(owner_uid).await
    }
}

use crate::app::ports::{PushSendError, PushTransport};
use crate::domain::PushSubscription;
use crate::error::Result;
use crate::metrics::{PUSH_DELIVERED, PUSH_FAILED, PUSH_PRUNED};
use crate::notifications::PushPayload;
use crate::storage::Storage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushOutcome {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Subscriptions removed because the push service reported them gone.
    pub pruned: usize,
}

/// Fans a payload out to every device a user subscribed.
pub struct PushService {
    storage: Arc<dyn Storage>,
    transport: Arc<dyn PushTransport>,
}

impl PushService {
    pub fn new(storage: Arc<dyn Storage>, transport: Arc<dyn PushTransport>) -> Self {
        Self { storage, transport }
    }

    pub async fn send_to_user(&self, user_id: Uuid, payload: &PushPayload) -> Result<PushOutcome> {
        let subscriptions = self.storage.list_push_subscriptions(user_id).await?;
        let mut outcome = PushOutcome::default();
        if subscriptions.is_empty() {
            debug!("User {} has no push subscriptions", user_id);
            return Ok(outcome);
        }
        let body = payload.to_bytes()?;

        for mut subscription in subscriptions {
            outcome.attempted += 1;
            match self.transport.send(&subscription, &body).await {
                Ok(()) => {
                    outcome.delivered += 1;
                    metrics::counter!(PUSH_DELIVERED).increment(1);
                    subscription.last_success_at = Some(Utc::now());
                    subscription.failure_count = 0;
                    self.storage.update_push_subscription(&subscription).await?;
                }
                Err(PushSendError::Gone) => {
                    outcome.failed += 1;
                    if self.storage.delete_push_subscription(&subscription.endpoint).await? {
                        outcome.pruned += 1;
                        metrics::counter!(PUSH_PRUNED).increment(1);
                    }
                    info!("Removed expired push subscription {}", subscription.id);
                }
                Err(PushSendError::Failed(reason)) => {
                    outcome.failed += 1;
                    metrics::counter!(PUSH_FAILED).increment(1);
                    warn!("Push to subscription {} failed: {}", subscription.id, reason);
                    subscription.failure_count += 1;
                    self.storage.update_push_subscription(&subscription).await?;
                }
            }
        }
        Ok(outcome)
    }

    /// Registers (or refreshes) a browser subscription for `user_id`.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        user_agent: Option<String>,
    ) -> Result<PushSubscription> {
        crate::validation::require_non_empty("endpoint", endpoint)?;
        crate::validation::require_non_empty("p256dh", p256dh)?;
        crate::validation::require_non_empty("auth", auth)?;
        let subscription = PushSubscription {
            id: Uuid::new_v4(),
            user_id,
            endpoint: endpoint.trim().to_string(),
            p256dh: p256dh.to_string(),
            auth: auth.to_string(),
            user_agent,
            last_success_at: None,
            failure_count: 0,
            created_at: Utc::now(),
        };
        self.storage.upsert_push_subscription(&subscription).await?;
        Ok(subscription)
    }

    /// Removes the user's subscription for `endpoint`; returns whether one existed.
    pub async fn unsubscribe(&self, user_id: Uuid, endpoint: &str) -> Result<bool> {
        let owned = self
            .storage
            .list_push_subscriptions(user_id)
            .await?
            .iter()
            .any(|s| s.endpoint == endpoint);
        if !owned {
            return Ok(false);
        }
        self.storage.delete_push_subscription(endpoint).await
    }
}

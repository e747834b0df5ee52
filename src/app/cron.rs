use crate::app::push_service::PushService;
use crate::domain::{Channel, Notification, ScheduledNotification};
use crate::error::Result;
use crate::metrics::{CRON_DURATION, CRON_RUNS, NOTIFICATIONS_FAILED, NOTIFICATIONS_PROCESSED, NOTIFICATIONS_SENT};
use crate::notifications::{url_for, PushPayload};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CronSummary {
    pub fetched: usize,
    pub sent: usize,
    pub failed: usize,
    pub push_delivered: usize,
}

/// Materializes scheduled notifications whose time has come.
pub struct CronUseCase {
    storage: Arc<dyn Storage>,
    push: PushService,
    batch_size: usize,
}

enum Delivery {
    /// Row is done; carries any non-fatal channel errors.
    Sent(Option<String>),
    /// In-app insert failed; row stays queued for the next run.
    Retry(String),
}

impl CronUseCase {
    pub fn new(storage: Arc<dyn Storage>, push: PushService, batch_size: usize) -> Self {
        Self { storage, push, batch_size: batch_size.max(1) }
    }

    /// One pass over at most `batch_size` due rows, oldest first.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<CronSummary> {
        let started = Instant::now();
        metrics::counter!(CRON_RUNS).increment(1);
        let due = self.storage.list_due_notifications(now, self.batch_size).await?;
        let mut summary = CronSummary { fetched: due.len(), ..Default::default() };
        if due.is_empty() {
            debug!("No scheduled notifications due at {}", now);
            return Ok(summary);
        }

        for mut row in due {
            metrics::counter!(NOTIFICATIONS_PROCESSED).increment(1);
            let delivered = match self.deliver(&row, now, &mut summary).await {
                Delivery::Sent(last_error) => {
                    row.sent = true;
                    row.sent_at = Some(now);
                    row.last_error = last_error;
                    true
                }
                Delivery::Retry(reason) => {
                    row.last_error = Some(reason);
                    false
                }
            };
            match self.storage.update_scheduled_notification(&row).await {
                Ok(()) if delivered => {
                    summary.sent += 1;
                    metrics::counter!(NOTIFICATIONS_SENT).increment(1);
                }
                Ok(()) => {
                    summary.failed += 1;
                    metrics::counter!(NOTIFICATIONS_FAILED).increment(1);
                }
                Err(e) => {
                    // Still pending in storage, so the next pass delivers it again.
                    error!("Failed to update scheduled notification {}: {}", row.id, e);
                    summary.failed += 1;
                    metrics::counter!(NOTIFICATIONS_FAILED).increment(1);
                }
            }
        }

        metrics::histogram!(CRON_DURATION).record(started.elapsed().as_secs_f64());
        info!(
            "Processed {} scheduled notifications: {} sent, {} failed, {} push deliveries",
            summary.fetched, summary.sent, summary.failed, summary.push_delivered
        );
        Ok(summary)
    }

    async fn deliver(&self, row: &ScheduledNotification, now: DateTime<Utc>, summary: &mut CronSummary) -> Delivery {
        let mut errors: Vec<String> = Vec::new();
        for channel in &row.channels {
            match channel {
                Channel::InApp => {
                    let notification = Notification {
                        id: Uuid::new_v4(),
                        organization_id: row.organization_id,
                        user_id: row.user_id,
                        notification_type: row.notification_type,
                        title: row.title.clone(),
                        body: row.body.clone(),
                        related_id: row.related_id,
                        url: url_for(row.notification_type, row.related_id),
                        read_at: None,
                        created_at: now,
                    };
                    if let Err(e) = self.storage.create_notification(&notification).await {
                        warn!("In-app notification for {} failed: {}", row.id, e);
                        return Delivery::Retry(format!("in_app: {}", e));
                    }
                }
                Channel::Push => {
                    let payload = PushPayload::new(row.notification_type, &row.title, &row.body, row.related_id);
                    match self.push.send_to_user(row.user_id, &payload).await {
                        Ok(outcome) => {
                            summary.push_delivered += outcome.delivered;
                            if outcome.attempted > 0 && outcome.delivered == 0 {
                                errors.push(format!("push: 0 of {} devices accepted", outcome.attempted));
                            }
                        }
                        Err(e) => errors.push(format!("push: {}", e)),
                    }
                }
                Channel::Email => {
                    debug!("Email delivery is not configured; skipping email for {}", row.id);
                }
            }
        }
        Delivery::Sent((!errors.is_empty()).then(|| errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{PushSendError, PushTransport};
    use crate::domain::{NewScheduledNotification, NotificationType, PushSubscription};
    use crate::storage::InMemoryStorage;
    use async_trait::async_trait;
    use chrono::Duration;

    struct AlwaysDelivers;

    #[async_trait]
    impl PushTransport for AlwaysDelivers {
        async fn send(&self, _s: &PushSubscription, _p: &[u8]) -> std::result::Result<(), PushSendError> {
            Ok(())
        }
    }

    fn cron(storage: Arc<InMemoryStorage>, batch: usize) -> CronUseCase {
        let push = PushService::new(storage.clone(), Arc::new(AlwaysDelivers));
        CronUseCase::new(storage, push, batch)
    }

    async fn queue(storage: &InMemoryStorage, user: Uuid, at: DateTime<Utc>, channels: Vec<Channel>) -> Uuid {
        let row = NewScheduledNotification {
            organization_id: Uuid::new_v4(),
            user_id: user,
            notification_type: NotificationType::PregnancyCheck,
            title: "Pregnancy check: Sow #4".into(),
            body: "Day 28".into(),
            related_id: Some(Uuid::new_v4()),
            scheduled_for: at,
            channels,
        }
        .into_record(at);
        storage.create_scheduled_notification(&row).await.unwrap();
        row.id
    }

    #[tokio::test]
    async fn sends_due_rows_once() {
        let storage = Arc::new(InMemoryStorage::new());
        let user = Uuid::new_v4();
        let now = Utc::now();
        PushService::new(storage.clone(), Arc::new(AlwaysDelivers))
            .subscribe(user, "https://push.test/1", "k", "a", None)
            .await
            .unwrap();
        queue(&storage, user, now - Duration::minutes(5), vec![Channel::InApp, Channel::Push, Channel::Email]).await;
        queue(&storage, user, now + Duration::hours(2), vec![Channel::InApp]).await;

        let cron = cron(storage.clone(), 50);
        let summary = cron.process_due(now).await.unwrap();
        assert_eq!(summary, CronSummary { fetched: 1, sent: 1, failed: 0, push_delivered: 1 });

        let inbox = storage.list_notifications(user, false).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].url.starts_with("/breeding?id="));

        let again = cron.process_due(now).await.unwrap();
        assert_eq!(again.fetched, 0);
    }

    #[tokio::test]
    async fn respects_batch_size() {
        let storage = Arc::new(InMemoryStorage::new());
        let user = Uuid::new_v4();
        let now = Utc::now();
        for minutes in 1..=5 {
            queue(&storage, user, now - Duration::minutes(minutes), vec![Channel::InApp]).await;
        }
        let summary = cron(storage.clone(), 2).process_due(now).await.unwrap();
        assert_eq!(summary.fetched, 2);
        assert_eq!(storage.list_due_notifications(now, 50).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unrecorded_delivery_counts_as_failed() {
        let storage = Arc::new(InMemoryStorage::new());
        let user = Uuid::new_v4();
        let now = Utc::now();
        queue(&storage, user, now - Duration::minutes(1), vec![Channel::InApp]).await;
        storage.fail_operation("update_scheduled_notification");

        let summary = cron(storage.clone(), 50).process_due(now).await.unwrap();
        assert_eq!(summary, CronSummary { fetched: 1, sent: 0, failed: 1, push_delivered: 0 });
        assert_eq!(storage.list_notifications(user, false).await.unwrap().len(), 1);
        assert_eq!(storage.list_due_notifications(now, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn push_without_devices_still_marks_sent() {
        let storage = Arc::new(InMemoryStorage::new());
        let user = Uuid::new_v4();
        let now = Utc::now();
        queue(&storage, user, now, vec![Channel::Push]).await;
        let summary = cron(storage.clone(), 50).process_due(now).await.unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.push_delivered, 0);
        assert!(storage.list_due_notifications(now, 50).await.unwrap().is_empty());
    }
}

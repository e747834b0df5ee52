use crate::domain::{Channel, NewScheduledNotification, NotificationType, OrganizationSettings};
use crate::error::Result;
use crate::gestation;
use crate::storage::Storage;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

/// A dated farm task that should turn into a notification for the team.
#[derive(Debug, Clone)]
pub struct Reminder {
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub related_id: Uuid,
    pub date: NaiveDate,
}

/// Schedules `reminder` for every member who can act on it.
///
/// Nothing is scheduled when the organization turned notifications off or
/// when the reminder time has already passed (back-dated records).
pub async fn schedule(
    storage: &dyn Storage,
    settings: &OrganizationSettings,
    reminder: &Reminder,
    now: DateTime<Utc>,
) -> Result<usize> {
    if !settings.notifications_enabled {
        return Ok(0);
    }
    let scheduled_for = gestation::reminder_time(reminder.date, settings);
    if scheduled_for < now {
        debug!("Skipping past reminder '{}' at {}", reminder.title, scheduled_for);
        return Ok(0);
    }

    let mut count = 0;
    for member in storage.list_memberships(settings.organization_id).await? {
        if !member.role.can_write() {
            continue;
        }
        let row = NewScheduledNotification {
            organization_id: settings.organization_id,
            user_id: member.user_id,
            notification_type: reminder.notification_type,
            title: reminder.title.clone(),
            body: reminder.body.clone(),
            related_id: Some(reminder.related_id),
            scheduled_for,
            channels: vec![Channel::InApp, Channel::Push],
        }
        .into_record(now);
        storage.create_scheduled_notification(&row).await?;
        count += 1;
    }
    debug!("Scheduled {} x '{}' for {}", count, reminder.title, scheduled_for);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Membership, Role};
    use crate::storage::InMemoryStorage;
    use chrono::Duration;

    async fn team(storage: &InMemoryStorage, org: Uuid) {
        for role in [Role::Owner, Role::Worker, Role::Viewer] {
            storage
                .add_membership(&Membership {
                    organization_id: org,
                    user_id: Uuid::new_v4(),
                    role,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
    }

    fn reminder(date: NaiveDate) -> Reminder {
        Reminder {
            notification_type: NotificationType::HeatCheck,
            title: "Heat check".into(),
            body: "Sow #12".into(),
            related_id: Uuid::new_v4(),
            date,
        }
    }

    #[tokio::test]
    async fn schedules_for_members_who_can_write() {
        let storage = InMemoryStorage::new();
        let org = Uuid::new_v4();
        team(&storage, org).await;
        let settings = OrganizationSettings::defaults_for(org);
        let now = Utc::now();
        let date = (now + Duration::days(10)).date_naive();

        let n = schedule(&storage, &settings, &reminder(date), now).await.unwrap();
        assert_eq!(n, 2);
        let rows = storage.list_scheduled_notifications(org).await.unwrap();
        assert!(rows.iter().all(|r| r.scheduled_for == gestation::reminder_time(date, &settings)));
    }

    #[tokio::test]
    async fn skips_past_and_disabled() {
        let storage = InMemoryStorage::new();
        let org = Uuid::new_v4();
        team(&storage, org).await;
        let mut settings = OrganizationSettings::defaults_for(org);
        let now = Utc::now();

        let past = (now - Duration::days(3)).date_naive();
        assert_eq!(schedule(&storage, &settings, &reminder(past), now).await.unwrap(), 0);

        settings.notifications_enabled = false;
        let future = (now + Duration::days(3)).date_naive();
        assert_eq!(schedule(&storage, &settings, &reminder(future), now).await.unwrap(), 0);
    }
}

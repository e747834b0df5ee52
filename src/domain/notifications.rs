use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BreedingReminder,
    HeatCheck,
    PregnancyCheck,
    FarrowingDue,
    WeaningDue,
    HealthFollowUp,
    VaccinationDue,
    ComplianceAlert,
    TeamInvite,
    General,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::BreedingReminder => "breeding_reminder",
            NotificationType::HeatCheck => "heat_check",
            NotificationType::PregnancyCheck => "pregnancy_check",
            NotificationType::FarrowingDue => "farrowing_due",
            NotificationType::WeaningDue => "weaning_due",
            NotificationType::HealthFollowUp => "health_follow_up",
            NotificationType::VaccinationDue => "vaccination_due",
            NotificationType::ComplianceAlert => "compliance_alert",
            NotificationType::TeamInvite => "team_invite",
            NotificationType::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Push,
    Email,
}

/// A notification waiting for the cron processor to materialize it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub related_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub channels: Vec<Channel>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledNotification {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.sent && self.scheduled_for <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewScheduledNotification {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub related_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub channels: Vec<Channel>,
}

impl NewScheduledNotification {
    pub fn into_record(self, now: DateTime<Utc>) -> ScheduledNotification {
        ScheduledNotification {
            id: Uuid::new_v4(),
            organization_id: self.organization_id,
            user_id: self.user_id,
            notification_type: self.notification_type,
            title: self.title,
            body: self.body,
            related_id: self.related_id,
            scheduled_for: self.scheduled_for,
            channels: self.channels,
            sent: false,
            sent_at: None,
            last_error: None,
            created_at: now,
        }
    }
}

/// An in-app notification shown in the user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub related_id: Option<Uuid>,
    pub url: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub failure_count: i32,
    pub created_at: DateTime<Utc>,
}

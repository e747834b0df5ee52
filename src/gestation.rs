//! Pregnancy-date offset arithmetic.
//!
//! Every date here is a calendar day on the farm; times only appear when a
//! milestone is turned into a reminder.

use crate::domain::{NotificationType, OrganizationSettings};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    HeatCheck,
    PregnancyCheck,
    MoveToFarrowing,
    ExpectedFarrowing,
}

impl MilestoneKind {
    pub fn notification_type(self) -> NotificationType {
        match self {
            MilestoneKind::HeatCheck => NotificationType::HeatCheck,
            MilestoneKind::PregnancyCheck => NotificationType::PregnancyCheck,
            MilestoneKind::MoveToFarrowing => NotificationType::BreedingReminder,
            MilestoneKind::ExpectedFarrowing => NotificationType::FarrowingDue,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MilestoneKind::HeatCheck => "Heat check",
            MilestoneKind::PregnancyCheck => "Pregnancy check",
            MilestoneKind::MoveToFarrowing => "Move to farrowing",
            MilestoneKind::ExpectedFarrowing => "Farrowing due",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub date: NaiveDate,
}

pub fn expected_farrowing_date(breeding_date: NaiveDate, settings: &OrganizationSettings) -> NaiveDate {
    breeding_date + Duration::days(settings.gestation_days)
}

/// Post-breeding checkpoints in chronological order.
pub fn milestones(breeding_date: NaiveDate, settings: &OrganizationSettings) -> Vec<Milestone> {
    let expected = expected_farrowing_date(breeding_date, settings);
    let mut out = vec![
        Milestone {
            kind: MilestoneKind::HeatCheck,
            date: breeding_date + Duration::days(settings.heat_check_days),
        },
        Milestone {
            kind: MilestoneKind::PregnancyCheck,
            date: breeding_date + Duration::days(settings.pregnancy_check_days),
        },
        Milestone {
            kind: MilestoneKind::MoveToFarrowing,
            date: expected - Duration::days(settings.farrowing_prep_days),
        },
        Milestone {
            kind: MilestoneKind::ExpectedFarrowing,
            date: expected,
        },
    ];
    out.sort_by_key(|m| m.date);
    out
}

pub fn weaning_date(farrowing_date: NaiveDate, settings: &OrganizationSettings) -> NaiveDate {
    farrowing_date + Duration::days(settings.weaning_age_days)
}

/// Days since breeding; zero on the breeding day, negative for future-dated breedings.
pub fn days_pregnant(breeding_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - breeding_date).num_days()
}

/// Signed distance from `today` to `date`.
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// When the reminder for a milestone on `date` should fire.
pub fn reminder_time(date: NaiveDate, settings: &OrganizationSettings) -> DateTime<Utc> {
    let day = date - Duration::days(settings.reminder_lead_days.max(0));
    let hour = settings.reminder_hour_utc.min(23);
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&day.and_time(time))
}

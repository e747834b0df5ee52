use crate::domain::{BreedingRecord, Farrowing, HealthEvent, OrganizationSettings};
use crate::gestation::{self, MilestoneKind};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CalendarKind {
    Breeding,
    HeatCheck,
    PregnancyCheck,
    MoveToFarrowing,
    ExpectedFarrowing,
    Farrowing,
    Weaning,
    HealthFollowUp,
    WithdrawalEnds,
}

impl From<MilestoneKind> for CalendarKind {
    fn from(kind: MilestoneKind) -> Self {
        match kind {
            MilestoneKind::HeatCheck => CalendarKind::HeatCheck,
            MilestoneKind::PregnancyCheck => CalendarKind::PregnancyCheck,
            MilestoneKind::MoveToFarrowing => CalendarKind::MoveToFarrowing,
            MilestoneKind::ExpectedFarrowing => CalendarKind::ExpectedFarrowing,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub kind: CalendarKind,
    pub title: String,
    pub animal_id: Uuid,
    pub related_id: Uuid,
}

pub struct CalendarSources<'a> {
    pub breedings: &'a [BreedingRecord],
    pub farrowings: &'a [Farrowing],
    pub health: &'a [HealthEvent],
    pub settings: &'a OrganizationSettings,
    /// Ear tag lookup for titles.
    pub label: &'a dyn Fn(Uuid) -> String,
}

/// All farm events between `from` and `to`, inclusive, ordered by date then kind.
pub fn build_calendar(sources: &CalendarSources<'_>, from: NaiveDate, to: NaiveDate) -> Vec<CalendarEntry> {
    let mut entries = Vec::new();
    let in_range = |d: NaiveDate| d >= from && d <= to;

    for b in sources.breedings {
        let sow = (sources.label)(b.sow_id);
        if in_range(b.breeding_date) {
            entries.push(CalendarEntry {
                date: b.breeding_date,
                kind: CalendarKind::Breeding,
                title: format!("{} bred", sow),
                animal_id: b.sow_id,
                related_id: b.id,
            });
        }
        if !b.status.is_open() {
            continue;
        }
        for milestone in gestation::milestones(b.breeding_date, sources.settings) {
            // The farrowing row carries the expected date once it exists.
            if milestone.kind == MilestoneKind::ExpectedFarrowing {
                continue;
            }
            if in_range(milestone.date) {
                entries.push(CalendarEntry {
                    date: milestone.date,
                    kind: milestone.kind.into(),
                    title: format!("{}: {}", milestone.kind.title(), sow),
                    animal_id: b.sow_id,
                    related_id: b.id,
                });
            }
        }
    }

    for f in sources.farrowings {
        let sow = (sources.label)(f.sow_id);
        let (date, kind, title) = match f.actual_date {
            Some(actual) => (actual, CalendarKind::Farrowing, format!("{} farrowed ({} born alive)", sow, f.born_alive.unwrap_or(0))),
            None => (f.expected_date, CalendarKind::ExpectedFarrowing, format!("Farrowing due: {}", sow)),
        };
        if in_range(date) {
            entries.push(CalendarEntry { date, kind, title, animal_id: f.sow_id, related_id: f.id });
        }
        if let Some(actual) = f.actual_date {
            let weaning = f
                .weaning_date
                .unwrap_or_else(|| gestation::weaning_date(actual, sources.settings));
            if in_range(weaning) {
                entries.push(CalendarEntry {
                    date: weaning,
                    kind: CalendarKind::Weaning,
                    title: format!("Weaning: {}", sow),
                    animal_id: f.sow_id,
                    related_id: f.id,
                });
            }
        }
    }

    for h in sources.health {
        let animal = (sources.label)(h.animal_id);
        if let Some(follow_up) = h.follow_up_date.filter(|d| in_range(*d)) {
            entries.push(CalendarEntry {
                date: follow_up,
                kind: CalendarKind::HealthFollowUp,
                title: format!("Follow up: {} ({})", animal, h.description),
                animal_id: h.animal_id,
                related_id: h.id,
            });
        }
        if let Some(ends) = h.withdrawal_ends_on().filter(|d| in_range(*d)) {
            entries.push(CalendarEntry {
                date: ends,
                kind: CalendarKind::WithdrawalEnds,
                title: format!("Withdrawal ends: {}", animal),
                animal_id: h.animal_id,
                related_id: h.id,
            });
        }
    }

    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.kind.cmp(&b.kind)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BreedingMethod, BreedingStatus, HealthEventType};
    use chrono::Utc;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn collects_milestones_farrowings_and_follow_ups() {
        let sow_id = Uuid::new_v4();
        let settings = OrganizationSettings::defaults_for(Uuid::nil());
        let breeding = BreedingRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            sow_id,
            boar_id: None,
            method: BreedingMethod::Artificial,
            breeding_date: date(1, 1),
            expected_farrowing_date: date(4, 25),
            status: BreedingStatus::Bred,
            pregnancy_confirmed_on: None,
            notes: None,
            created_by: Uuid::nil(),
            created_at: Utc::now(),
        };
        let farrowing = Farrowing {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            sow_id,
            breeding_id: Some(breeding.id),
            expected_date: date(4, 25),
            actual_date: None,
            born_alive: None,
            stillborn: None,
            mummified: None,
            weaned_count: None,
            weaning_date: None,
            notes: None,
            created_at: Utc::now(),
        };
        let health = HealthEvent {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            animal_id: sow_id,
            event_type: HealthEventType::Treatment,
            event_date: date(1, 10),
            description: "Lameness".into(),
            medication: Some("Oxytetracycline".into()),
            dosage: None,
            withdrawal_days: Some(28),
            cost: None,
            follow_up_date: Some(date(1, 17)),
            created_at: Utc::now(),
        };
        let label = |_: Uuid| "Sow #A-1".to_string();
        let sources = CalendarSources {
            breedings: &[breeding],
            farrowings: &[farrowing],
            health: &[health],
            settings: &settings,
            label: &label,
        };

        let entries = build_calendar(&sources, date(1, 1), date(4, 30));
        let kinds: Vec<CalendarKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CalendarKind::Breeding,
                CalendarKind::HealthFollowUp,
                CalendarKind::HeatCheck,
                CalendarKind::PregnancyCheck,
                CalendarKind::WithdrawalEnds,
                CalendarKind::MoveToFarrowing,
                CalendarKind::ExpectedFarrowing,
            ]
        );

        let january = build_calendar(&sources, date(1, 15), date(1, 31));
        assert_eq!(january.len(), 3);
    }
}

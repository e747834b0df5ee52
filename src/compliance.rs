//! Prop 12 confinement report for breeding sows.
//!
//! A sow may not be confined (stall or crate) for more than 6 hours in any
//! 24-hour period, nor more than 24 hours in any 30-day period, and must have
//! at least 24 sq ft of usable floor space. Confinement from 5 days before the
//! expected farrowing date until weaning is exempt.

use crate::constants::{
    PROP12_MAX_HOURS_PER_30_DAYS, PROP12_MAX_HOURS_PER_DAY, PROP12_PRE_FARROWING_EXEMPT_DAYS,
};
use crate::domain::{
    Animal, AnimalKind, Farrowing, HousingAssignment, HousingUnit, OrganizationSettings,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub type Interval = (DateTime<Utc>, DateTime<Utc>);

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    DailyConfinement { hours: f64 },
    MonthlyConfinement { hours: f64 },
    InsufficientSpace { unit_id: Uuid, sqft_per_pig: f64 },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SowCompliance {
    pub sow_id: Uuid,
    pub ear_tag: String,
    pub confinement_hours: f64,
    pub max_hours_any_24h: f64,
    pub max_hours_any_30d: f64,
    pub min_space_sqft: Option<f64>,
    pub violations: Vec<Violation>,
    pub compliant: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComplianceReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub sows: Vec<SowCompliance>,
    pub compliant_sows: usize,
    pub compliant: bool,
}

pub struct ComplianceInput<'a> {
    pub animals: &'a [Animal],
    pub units: &'a [HousingUnit],
    pub assignments: &'a [HousingAssignment],
    pub farrowings: &'a [Farrowing],
    pub settings: &'a OrganizationSettings,
}

pub fn build_report(input: &ComplianceInput<'_>, from: DateTime<Utc>, to: DateTime<Utc>) -> ComplianceReport {
    let units: HashMap<Uuid, &HousingUnit> = input.units.iter().map(|u| (u.id, u)).collect();

    let mut sows: Vec<SowCompliance> = input
        .animals
        .iter()
        .filter(|a| a.kind == AnimalKind::Sow)
        .filter(|sow| {
            !sow.status.is_terminal()
                || input
                    .assignments
                    .iter()
                    .any(|a| a.animal_id == sow.id && clip(&span(a, to), from, to).is_some())
        })
        .map(|sow| assess_sow(sow, input, &units, from, to))
        .collect();
    sows.sort_by(|a, b| a.ear_tag.cmp(&b.ear_tag));

    let compliant_sows = sows.iter().filter(|s| s.compliant).count();
    ComplianceReport {
        from,
        to,
        compliant: compliant_sows == sows.len(),
        compliant_sows,
        sows,
    }
}

fn assess_sow(
    sow: &Animal,
    input: &ComplianceInput<'_>,
    units: &HashMap<Uuid, &HousingUnit>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> SowCompliance {
    let exempt = exempt_periods(sow.id, input.farrowings, input.settings);

    let confined: Vec<Interval> = input
        .assignments
        .iter()
        .filter(|a| a.animal_id == sow.id)
        .filter(|a| units.get(&a.unit_id).map_or(false, |u| u.unit_type.is_confinement()))
        .filter_map(|a| clip(&span(a, to), from, to))
        .collect();
    let confined = subtract(merge(confined), &exempt);

    let confinement_hours = confined.iter().map(hours).sum::<f64>();
    let max_24h = max_hours_in_any_window(&confined, Duration::hours(24));
    let max_30d = max_hours_in_any_window(&confined, Duration::days(30));

    let mut violations = Vec::new();
    if max_24h > PROP12_MAX_HOURS_PER_DAY {
        violations.push(Violation::DailyConfinement { hours: round2(max_24h) });
    }
    if max_30d > PROP12_MAX_HOURS_PER_30_DAYS {
        violations.push(Violation::MonthlyConfinement { hours: round2(max_30d) });
    }

    let mut min_space: Option<f64> = None;
    for assignment in input.assignments.iter().filter(|a| a.animal_id == sow.id) {
        let Some(unit) = units.get(&assignment.unit_id) else { continue };
        if unit.unit_type.is_confinement() {
            continue;
        }
        let Some(window) = clip(&span(assignment, to), from, to) else { continue };
        if let Some(sqft) = min_space_in_unit(unit, window, input.assignments, &exempt) {
            min_space = Some(min_space.map_or(sqft, |m: f64| m.min(sqft)));
            if sqft < input.settings.min_space_sqft {
                violations.push(Violation::InsufficientSpace {
                    unit_id: unit.id,
                    sqft_per_pig: round2(sqft),
                });
            }
        }
    }

    SowCompliance {
        sow_id: sow.id,
        ear_tag: sow.ear_tag.clone(),
        confinement_hours: round2(confinement_hours),
        max_hours_any_24h: round2(max_24h),
        max_hours_any_30d: round2(max_30d),
        min_space_sqft: min_space.map(round2),
        compliant: violations.is_empty(),
        violations,
    }
}

/// Periods during which confinement is allowed: 5 days before the expected
/// farrowing date through the end of the weaning day.
pub fn exempt_periods(sow_id: Uuid, farrowings: &[Farrowing], settings: &OrganizationSettings) -> Vec<Interval> {
    let periods = farrowings
        .iter()
        .filter(|f| f.sow_id == sow_id)
        .map(|f| {
            let mut start = f.expected_date - Duration::days(PROP12_PRE_FARROWING_EXEMPT_DAYS);
            if let Some(actual) = f.actual_date {
                start = start.min(actual);
            }
            let born = f.actual_date.unwrap_or(f.expected_date);
            let weaned = f
                .weaning_date
                .unwrap_or_else(|| born + Duration::days(settings.weaning_age_days));
            (midnight(start), midnight(weaned) + Duration::days(1))
        })
        .collect();
    merge(periods)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::default()))
}

/// An open assignment runs until the end of the report.
fn span(a: &HousingAssignment, open_until: DateTime<Utc>) -> Interval {
    (a.start_at, a.end_at.unwrap_or(open_until))
}

fn clip(interval: &Interval, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Interval> {
    let start = interval.0.max(from);
    let end = interval.1.min(to);
    (start < end).then_some((start, end))
}

fn hours(interval: &Interval) -> f64 {
    (interval.1 - interval.0).num_seconds() as f64 / 3600.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Sorts and coalesces overlapping or touching intervals.
fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|i| i.0);
    let mut out: Vec<Interval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        if let Some(last) = out.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        out.push((start, end));
    }
    out
}

/// `intervals` minus `holes`; both must be merged.
fn subtract(intervals: Vec<Interval>, holes: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    for (mut start, end) in intervals {
        for hole in holes {
            if hole.1 <= start || hole.0 >= end {
                continue;
            }
            if hole.0 > start {
                out.push((start, hole.0));
            }
            start = start.max(hole.1);
            if start >= end {
                break;
            }
        }
        if start < end {
            out.push((start, end));
        }
    }
    out
}

fn covered_hours(intervals: &[Interval], window: Interval) -> f64 {
    intervals.iter().filter_map(|i| clip(i, window.0, window.1)).map(|i| hours(&i)).sum()
}

/// Largest confined total over any window of `length`. Some optimal window
/// always starts at an interval start or ends at an interval end, so only those
/// are tried.
pub fn max_hours_in_any_window(intervals: &[Interval], length: Duration) -> f64 {
    intervals
        .iter()
        .flat_map(|(start, end)| [(*start, *start + length), (*end - length, *end)])
        .map(|window| covered_hours(intervals, window))
        .fold(0.0, f64::max)
}

/// Smallest area per pig in `unit` while the sow was there, skipping exempt time.
fn min_space_in_unit(
    unit: &HousingUnit,
    window: Interval,
    assignments: &[HousingAssignment],
    exempt: &[Interval],
) -> Option<f64> {
    let in_unit: Vec<&HousingAssignment> =
        assignments.iter().filter(|a| a.unit_id == unit.id).collect();

    let mut checkpoints: Vec<DateTime<Utc>> = vec![window.0];
    checkpoints.extend(
        in_unit
            .iter()
            .map(|a| a.start_at)
            .filter(|t| *t > window.0 && *t < window.1),
    );

    checkpoints
        .into_iter()
        .filter(|t| !exempt.iter().any(|e| e.0 <= *t && *t < e.1))
        .map(|t| {
            let occupants = in_unit.iter().filter(|a| a.covers(t)).count().max(1);
            unit.area_sqft / occupants as f64
        })
        .reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnimalStatus, HousingUnitType};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn sow(tag: &str) -> Animal {
        Animal {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            kind: AnimalKind::Sow,
            ear_tag: tag.to_string(),
            name: None,
            breed: None,
            sex: None,
            birth_date: None,
            status: AnimalStatus::Bred,
            dam_id: None,
            sire_id: None,
            farrowing_id: None,
            weight_kg: None,
            notes: None,
            created_at: at(1, 0),
            updated_at: at(1, 0),
        }
    }

    fn unit(unit_type: HousingUnitType, area: f64, capacity: i32) -> HousingUnit {
        HousingUnit {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            name: "unit".into(),
            unit_type,
            area_sqft: area,
            capacity,
            created_at: at(1, 0),
        }
    }

    fn assign(unit: &HousingUnit, animal: &Animal, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> HousingAssignment {
        HousingAssignment {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            unit_id: unit.id,
            animal_id: animal.id,
            start_at: start,
            end_at: end,
        }
    }

    #[test]
    fn merges_and_subtracts_intervals() {
        let merged = merge(vec![(at(2, 0), at(2, 5)), (at(2, 4), at(2, 8)), (at(3, 0), at(3, 1))]);
        assert_eq!(merged, vec![(at(2, 0), at(2, 8)), (at(3, 0), at(3, 1))]);

        let left = subtract(merged, &[(at(2, 2), at(2, 3))]);
        assert_eq!(left, vec![(at(2, 0), at(2, 2)), (at(2, 3), at(2, 8)), (at(3, 0), at(3, 1))]);
    }

    #[test]
    fn sliding_window_finds_worst_day() {
        // 3h late on the 2nd plus 5h early on the 3rd: 8h inside one 24h window.
        let intervals = vec![(at(2, 20), at(2, 23)), (at(3, 2), at(3, 7))];
        let worst = max_hours_in_any_window(&intervals, Duration::hours(24));
        assert!((worst - 8.0).abs() < 1e-9);
    }

    #[test]
    fn short_stall_visits_are_compliant() {
        let s = sow("A-1");
        let stall = unit(HousingUnitType::GestationStall, 14.0, 1);
        let pen = unit(HousingUnitType::GroupPen, 240.0, 8);
        let animals = vec![s.clone()];
        let assignments = vec![
            assign(&stall, &s, at(5, 8), Some(at(5, 12))),
            assign(&pen, &s, at(5, 12), None),
        ];
        let settings = OrganizationSettings::defaults_for(Uuid::nil());
        let input = ComplianceInput {
            animals: &animals,
            units: &[stall, pen],
            assignments: &assignments,
            farrowings: &[],
            settings: &settings,
        };

        let report = build_report(&input, at(1, 0), at(31, 0));
        assert!(report.compliant);
        let row = &report.sows[0];
        assert_eq!(row.confinement_hours, 4.0);
        assert_eq!(row.min_space_sqft, Some(240.0));
    }

    #[test]
    fn long_stall_stay_violates_both_limits() {
        let s = sow("A-2");
        let stall = unit(HousingUnitType::GestationStall, 14.0, 1);
        let animals = vec![s.clone()];
        let assignments = vec![assign(&stall, &s, at(2, 0), Some(at(4, 0)))];
        let settings = OrganizationSettings::defaults_for(Uuid::nil());
        let input = ComplianceInput {
            animals: &animals,
            units: &[stall],
            assignments: &assignments,
            farrowings: &[],
            settings: &settings,
        };

        let report = build_report(&input, at(1, 0), at(31, 0));
        let row = &report.sows[0];
        assert!(!report.compliant);
        assert_eq!(row.max_hours_any_24h, 24.0);
        assert_eq!(row.max_hours_any_30d, 48.0);
        assert_eq!(row.violations.len(), 2);
    }

    #[test]
    fn crate_time_around_farrowing_is_exempt() {
        let s = sow("A-3");
        let crate_unit = unit(HousingUnitType::FarrowingCrate, 40.0, 1);
        let animals = vec![s.clone()];
        let assignments = vec![assign(&crate_unit, &s, at(10, 0), Some(at(28, 0)))];
        let farrowing = Farrowing {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            sow_id: s.id,
            breeding_id: None,
            expected_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            actual_date: Some(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()),
            born_alive: Some(11),
            stillborn: None,
            mummified: None,
            weaned_count: None,
            weaning_date: None,
            notes: None,
            created_at: at(1, 0),
        };
        let settings = OrganizationSettings::defaults_for(Uuid::nil());
        let input = ComplianceInput {
            animals: &animals,
            units: &[crate_unit],
            assignments: &assignments,
            farrowings: &[farrowing],
            settings: &settings,
        };

        // Exempt from the 10th (15th - 5 days) through the 4th of April (14th + 21 days).
        let report = build_report(&input, at(1, 0), at(31, 0));
        assert!(report.compliant, "{:?}", report.sows[0].violations);
        assert_eq!(report.sows[0].confinement_hours, 0.0);
    }

    #[test]
    fn crowded_pen_is_flagged() {
        let a = sow("B-1");
        let b = sow("B-2");
        let pen = unit(HousingUnitType::GroupPen, 40.0, 4);
        let animals = vec![a.clone(), b.clone()];
        let assignments = vec![assign(&pen, &a, at(2, 0), None), assign(&pen, &b, at(3, 0), None)];
        let settings = OrganizationSettings::defaults_for(Uuid::nil());
        let input = ComplianceInput {
            animals: &animals,
            units: &[pen],
            assignments: &assignments,
            farrowings: &[],
            settings: &settings,
        };

        let report = build_report(&input, at(1, 0), at(31, 0));
        assert_eq!(report.compliant_sows, 0);
        assert_eq!(report.sows[0].min_space_sqft, Some(20.0));
        assert!(matches!(
            report.sows[1].violations[0],
            Violation::InsufficientSpace { sqft_per_pig, .. } if sqft_per_pig == 20.0
        ));
    }
}

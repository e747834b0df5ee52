use crate::domain::{
    AnimalKind, FarrowingOutcome, NewAnimal, NewBreeding, NewFinancialRecord, NewHealthEvent,
    NewHousingUnit, OrganizationSettings, Weaning,
};
use crate::constants::{MAX_LITTER_COUNT, MAX_WITHDRAWAL_DAYS};
use crate::error::{FarmError, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EAR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,31}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FarmError::validation(field, "is required"));
    }
    Ok(())
}

pub fn require_not_future(field: &str, date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(FarmError::validation(field, "cannot be in the future"));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(FarmError::validation(field, "must not be negative"));
    }
    Ok(())
}

pub fn require_at_most(field: &str, value: i32, max: i32) -> Result<()> {
    if value > max {
        return Err(FarmError::validation(field, format!("must be at most {}", max)));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FarmError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

pub fn validate_ear_tag(ear_tag: &str) -> Result<()> {
    require_non_empty("ear_tag", ear_tag)?;
    if !EAR_TAG.is_match(ear_tag.trim()) {
        return Err(FarmError::validation(
            "ear_tag",
            "use up to 32 letters, digits, '.', '_' or '-'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL.is_match(email.trim()) {
        return Err(FarmError::validation("email", "is not a valid email address"));
    }
    Ok(())
}

pub fn validate_new_animal(animal: &NewAnimal, today: NaiveDate) -> Result<()> {
    validate_ear_tag(&animal.ear_tag)?;
    if let Some(birth_date) = animal.birth_date {
        require_not_future("birth_date", birth_date, today)?;
    }
    if let Some(status) = animal.status {
        if !status.allowed_for(animal.kind) {
            return Err(FarmError::validation(
                "status",
                format!("{:?} is not a valid status for a {}", status, animal.kind.as_str()),
            ));
        }
    }
    if let Some(weight) = animal.weight_kg {
        require_positive("weight_kg", weight)?;
    }
    if animal.kind != AnimalKind::Piglet && (animal.dam_id.is_some() || animal.sire_id.is_some()) {
        // Parentage is only tracked for pigs born on the farm.
        return Err(FarmError::validation("dam_id", "parentage applies to piglets only"));
    }
    Ok(())
}

pub fn validate_breeding(breeding: &NewBreeding, today: NaiveDate) -> Result<()> {
    require_not_future("breeding_date", breeding.breeding_date, today)
}

pub fn validate_farrowing_outcome(
    outcome: &FarrowingOutcome,
    breeding_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<()> {
    require_not_future("actual_date", outcome.actual_date, today)?;
    if let Some(bred) = breeding_date {
        if outcome.actual_date < bred {
            return Err(FarmError::validation("actual_date", "is before the breeding date"));
        }
    }
    for (field, count) in [
        ("born_alive", outcome.born_alive),
        ("stillborn", outcome.stillborn),
        ("mummified", outcome.mummified),
    ] {
        require_non_negative(field, count)?;
        require_at_most(field, count, MAX_LITTER_COUNT)?;
    }
    if outcome.born_alive == 0 && outcome.stillborn == 0 && outcome.mummified == 0 {
        return Err(FarmError::validation("born_alive", "record at least one pig"));
    }
    Ok(())
}

pub fn validate_weaning(
    weaning: &Weaning,
    farrowed_on: NaiveDate,
    born_alive: i32,
    today: NaiveDate,
) -> Result<()> {
    require_not_future("weaning_date", weaning.weaning_date, today)?;
    if weaning.weaning_date < farrowed_on {
        return Err(FarmError::validation("weaning_date", "is before the farrowing date"));
    }
    require_non_negative("weaned_count", weaning.weaned_count)?;
    if weaning.weaned_count > born_alive {
        return Err(FarmError::validation(
            "weaned_count",
            format!("cannot exceed {} born alive", born_alive),
        ));
    }
    Ok(())
}

pub fn validate_housing_unit(unit: &NewHousingUnit) -> Result<()> {
    require_non_empty("name", &unit.name)?;
    require_positive("area_sqft", unit.area_sqft)?;
    if unit.capacity < 1 {
        return Err(FarmError::validation("capacity", "must be at least 1"));
    }
    if unit.unit_type.is_confinement() && unit.capacity != 1 {
        return Err(FarmError::validation("capacity", "stalls and crates hold one sow"));
    }
    Ok(())
}

pub fn validate_health_event(event: &NewHealthEvent, today: NaiveDate) -> Result<()> {
    require_non_empty("description", &event.description)?;
    require_not_future("event_date", event.event_date, today)?;
    if let Some(days) = event.withdrawal_days {
        require_non_negative("withdrawal_days", days)?;
        require_at_most("withdrawal_days", days, MAX_WITHDRAWAL_DAYS)?;
    }
    if let Some(cost) = event.cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(FarmError::validation("cost", "must not be negative"));
        }
    }
    if let Some(follow_up) = event.follow_up_date {
        if follow_up < event.event_date {
            return Err(FarmError::validation("follow_up_date", "is before the event date"));
        }
    }
    Ok(())
}

pub fn validate_financial_record(record: &NewFinancialRecord) -> Result<()> {
    require_non_empty("category", &record.category)?;
    require_positive("amount", record.amount)?;
    if let Some(quantity) = record.quantity {
        require_positive("quantity", quantity)?;
    }
    Ok(())
}

pub fn validate_settings(settings: &OrganizationSettings) -> Result<()> {
    if !(100..=130).contains(&settings.gestation_days) {
        return Err(FarmError::validation("gestation_days", "must be between 100 and 130"));
    }
    if settings.heat_check_days < 1 || settings.heat_check_days >= settings.gestation_days {
        return Err(FarmError::validation("heat_check_days", "must fall within gestation"));
    }
    if settings.pregnancy_check_days < 1 || settings.pregnancy_check_days >= settings.gestation_days {
        return Err(FarmError::validation("pregnancy_check_days", "must fall within gestation"));
    }
    if !(0..=14).contains(&settings.farrowing_prep_days) {
        return Err(FarmError::validation("farrowing_prep_days", "must be between 0 and 14"));
    }
    if !(7..=60).contains(&settings.weaning_age_days) {
        return Err(FarmError::validation("weaning_age_days", "must be between 7 and 60"));
    }
    if !(0..=14).contains(&settings.reminder_lead_days) {
        return Err(FarmError::validation("reminder_lead_days", "must be between 0 and 14"));
    }
    if settings.reminder_hour_utc > 23 {
        return Err(FarmError::validation("reminder_hour_utc", "must be between 0 and 23"));
    }
    if settings.currency.len() != 3 || !settings.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(FarmError::validation("currency", "use a three-letter ISO code"));
    }
    require_positive("min_space_sqft", settings.min_space_sqft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FinancialKind, HealthEventType, HousingUnitType};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn outcome(alive: i32, still: i32, mummies: i32) -> FarrowingOutcome {
        FarrowingOutcome {
            actual_date: NaiveDate::from_ymd_opt(2026, 5, 20).unwrap(),
            born_alive: alive,
            stillborn: still,
            mummified: mummies,
            notes: None,
            create_piglets: false,
        }
    }

    #[test]
    fn ear_tags() {
        assert!(validate_ear_tag("A-102").is_ok());
        assert!(validate_ear_tag("  ").is_err());
        assert!(validate_ear_tag("has space").is_err());
        assert!(validate_ear_tag(&"x".repeat(33)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("hand@farm.example").is_ok());
        assert!(validate_email("nobody").is_err());
    }

    #[test]
    fn farrowing_counts() {
        assert!(validate_farrowing_outcome(&outcome(11, 1, 0), None, today()).is_ok());
        assert!(validate_farrowing_outcome(&outcome(0, 0, 0), None, today()).is_err());
        assert!(validate_farrowing_outcome(&outcome(-1, 3, 0), None, today()).is_err());

        let bred_after = NaiveDate::from_ymd_opt(2026, 5, 21);
        let err = validate_farrowing_outcome(&outcome(10, 0, 0), bred_after, today()).unwrap_err();
        assert!(matches!(err, FarmError::Validation { ref field, .. } if field == "actual_date"));
    }

    #[test]
    fn oversized_litters_are_rejected() {
        let err = validate_farrowing_outcome(&outcome(i32::MAX, 1, 0), None, today()).unwrap_err();
        assert!(matches!(err, FarmError::Validation { ref field, .. } if field == "born_alive"));
        let err = validate_farrowing_outcome(&outcome(12, 0, 41), None, today()).unwrap_err();
        assert!(matches!(err, FarmError::Validation { ref field, .. } if field == "mummified"));
        assert!(validate_farrowing_outcome(&outcome(40, 0, 0), None, today()).is_ok());
    }

    #[test]
    fn withdrawal_is_capped_at_a_year() {
        let mut event = NewHealthEvent {
            animal_id: Uuid::new_v4(),
            event_type: HealthEventType::Treatment,
            event_date: today(),
            description: "Penicillin".into(),
            medication: None,
            dosage: None,
            withdrawal_days: Some(2_000_000_000),
            cost: None,
            follow_up_date: None,
        };
        let err = validate_health_event(&event, today()).unwrap_err();
        assert!(matches!(err, FarmError::Validation { ref field, .. } if field == "withdrawal_days"));
        event.withdrawal_days = Some(28);
        assert!(validate_health_event(&event, today()).is_ok());
    }

    #[test]
    fn weaning_cannot_exceed_live_born() {
        let farrowed = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let weaning = Weaning {
            weaning_date: NaiveDate::from_ymd_opt(2026, 5, 22).unwrap(),
            weaned_count: 12,
        };
        assert!(validate_weaning(&weaning, farrowed, 11, today()).is_err());
        assert!(validate_weaning(&weaning, farrowed, 12, today()).is_ok());
    }

    #[test]
    fn stalls_hold_one_sow() {
        let unit = NewHousingUnit {
            name: "Stall 4".into(),
            unit_type: HousingUnitType::GestationStall,
            area_sqft: 14.0,
            capacity: 2,
        };
        assert!(validate_housing_unit(&unit).is_err());
    }

    #[test]
    fn financial_amount_must_be_positive() {
        let record = NewFinancialRecord {
            kind: FinancialKind::Feed,
            record_date: today(),
            category: "Gestation ration".into(),
            description: None,
            amount: 0.0,
            quantity: None,
            unit: None,
            animal_id: None,
        };
        assert!(validate_financial_record(&record).is_err());
    }

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&OrganizationSettings::defaults_for(Uuid::nil())).is_ok());
        let mut s = OrganizationSettings::defaults_for(Uuid::nil());
        s.currency = "usd".into();
        assert!(validate_settings(&s).is_err());
    }
}

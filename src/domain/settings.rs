use crate::constants;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-organization husbandry and notification settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationSettings {
    pub organization_id: Uuid,
    pub gestation_days: i64,
    pub heat_check_days: i64,
    pub pregnancy_check_days: i64,
    pub farrowing_prep_days: i64,
    pub weaning_age_days: i64,
    pub reminder_lead_days: i64,
    pub reminder_hour_utc: u32,
    pub notifications_enabled: bool,
    pub currency: String,
    pub min_space_sqft: f64,
}

impl OrganizationSettings {
    pub fn defaults_for(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            gestation_days: constants::GESTATION_DAYS,
            heat_check_days: constants::HEAT_CHECK_DAYS,
            pregnancy_check_days: constants::PREGNANCY_CHECK_DAYS,
            farrowing_prep_days: constants::FARROWING_PREP_DAYS,
            weaning_age_days: constants::WEANING_AGE_DAYS,
            reminder_lead_days: constants::REMINDER_LEAD_DAYS,
            reminder_hour_utc: constants::REMINDER_HOUR_UTC,
            notifications_enabled: true,
            currency: "USD".to_string(),
            min_space_sqft: constants::PROP12_MIN_SPACE_SQFT,
        }
    }
}

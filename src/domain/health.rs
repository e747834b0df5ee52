use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthEventType {
    Vaccination,
    Treatment,
    Illness,
    Injury,
    Checkup,
    Death,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthEvent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub animal_id: Uuid,
    pub event_type: HealthEventType,
    pub event_date: NaiveDate,
    pub description: String,
    pub medication: Option<String>,
    pub dosage: Option<String>,
    pub withdrawal_days: Option<i32>,
    pub cost: Option<f64>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl HealthEvent {
    /// Last day the animal may not go to slaughter after a treatment.
    /// `None` when there is no withdrawal or the date is out of range.
    pub fn withdrawal_ends_on(&self) -> Option<NaiveDate> {
        let days = u64::try_from(self.withdrawal_days?).ok().filter(|d| *d > 0)?;
        self.event_date.checked_add_days(Days::new(days))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHealthEvent {
    pub animal_id: Uuid,
    pub event_type: HealthEventType,
    pub event_date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub withdrawal_days: Option<i32>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreedingMethod {
    Natural,
    Artificial,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreedingStatus {
    Bred,
    Confirmed,
    NotPregnant,
    Farrowed,
    Aborted,
}

impl BreedingStatus {
    /// A breeding is still expected to produce a litter.
    pub fn is_open(self) -> bool {
        matches!(self, BreedingStatus::Bred | BreedingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreedingRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sow_id: Uuid,
    pub boar_id: Option<Uuid>,
    pub method: BreedingMethod,
    pub breeding_date: NaiveDate,
    pub expected_farrowing_date: NaiveDate,
    pub status: BreedingStatus,
    pub pregnancy_confirmed_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBreeding {
    pub sow_id: Uuid,
    #[serde(default)]
    pub boar_id: Option<Uuid>,
    pub method: BreedingMethod,
    pub breeding_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Farrowing {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sow_id: Uuid,
    pub breeding_id: Option<Uuid>,
    pub expected_date: NaiveDate,
    pub actual_date: Option<NaiveDate>,
    pub born_alive: Option<i32>,
    pub stillborn: Option<i32>,
    pub mummified: Option<i32>,
    pub weaned_count: Option<i32>,
    pub weaning_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Farrowing {
    pub fn total_born(&self) -> i32 {
        self.born_alive
            .unwrap_or(0)
            .saturating_add(self.stillborn.unwrap_or(0))
            .saturating_add(self.mummified.unwrap_or(0))
    }

    pub fn is_pending(&self) -> bool {
        self.actual_date.is_none()
    }
}

/// Body of `POST /farrowings/:id/outcome`.
#[derive(Debug, Clone, Deserialize)]
pub struct FarrowingOutcome {
    pub actual_date: NaiveDate,
    pub born_alive: i32,
    #[serde(default)]
    pub stillborn: i32,
    #[serde(default)]
    pub mummified: i32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Create one piglet record per live-born pig.
    #[serde(default)]
    pub create_piglets: bool,
}

/// Body of `POST /farrowings/:id/weaning`.
#[derive(Debug, Clone, Deserialize)]
pub struct Weaning {
    pub weaning_date: NaiveDate,
    pub weaned_count: i32,
}

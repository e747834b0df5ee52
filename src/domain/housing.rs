use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HousingUnitType {
    GestationStall,
    FarrowingCrate,
    GroupPen,
    Nursery,
    Finisher,
    Pasture,
}

impl HousingUnitType {
    /// Stalls and crates are the enclosures Prop 12 counts as confinement.
    pub fn is_confinement(self) -> bool {
        matches!(self, HousingUnitType::GestationStall | HousingUnitType::FarrowingCrate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HousingUnit {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub unit_type: HousingUnitType,
    pub area_sqft: f64,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHousingUnit {
    pub name: String,
    pub unit_type: HousingUnitType,
    pub area_sqft: f64,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HousingAssignment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub unit_id: Uuid,
    pub animal_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
}

impl HousingAssignment {
    pub fn is_open(&self) -> bool {
        self.end_at.is_none()
    }

    /// Whether the animal was in the unit at `at`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_at <= at && self.end_at.map_or(true, |end| at < end)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub unit_id: Uuid,
    pub animal_id: Uuid,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
}

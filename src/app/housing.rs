use crate::app::require_animal;
use crate::domain::{HousingAssignment, HousingUnit, NewAssignment, NewHousingUnit};
use crate::error::{FarmError, Result};
use crate::storage::Storage;
use crate::validation;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitOccupancy {
    #[serde(flatten)]
    pub unit: HousingUnit,
    pub occupants: usize,
    /// Usable area per pig right now; `None` when the unit is empty.
    pub sqft_per_pig: Option<f64>,
}

pub struct HousingUseCase {
    storage: Arc<dyn Storage>,
}

impl HousingUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create_unit(&self, organization_id: Uuid, new: NewHousingUnit) -> Result<HousingUnit> {
        validation::validate_housing_unit(&new)?;
        let name = new.name.trim().to_string();
        let units = self.storage.list_housing_units(organization_id).await?;
        if units.iter().any(|u| u.name.eq_ignore_ascii_case(&name)) {
            return Err(FarmError::Conflict(format!("a unit named {} already exists", name)));
        }
        let unit = HousingUnit {
            id: Uuid::new_v4(),
            organization_id,
            name,
            unit_type: new.unit_type,
            area_sqft: new.area_sqft,
            capacity: new.capacity,
            created_at: Utc::now(),
        };
        self.storage.create_housing_unit(&unit).await?;
        info!("Created housing unit {} ({:?})", unit.name, unit.unit_type);
        Ok(unit)
    }

    pub async fn list_units(&self, organization_id: Uuid) -> Result<Vec<UnitOccupancy>> {
        let units = self.storage.list_housing_units(organization_id).await?;
        let open = self.storage.list_assignments(Some(organization_id), true).await?;
        Ok(units
            .into_iter()
            .map(|unit| {
                let occupants = open.iter().filter(|a| a.unit_id == unit.id).count();
                let sqft_per_pig = (occupants > 0).then(|| unit.area_sqft / occupants as f64);
                UnitOccupancy { unit, occupants, sqft_per_pig }
            })
            .collect())
    }

    pub async fn list_assignments(&self, organization_id: Uuid, open_only: bool) -> Result<Vec<HousingAssignment>> {
        self.storage.list_assignments(Some(organization_id), open_only).await
    }

    /// Moves an animal into a unit. Its current assignment, if any, ends at
    /// the new start time.
    pub async fn assign(&self, organization_id: Uuid, new: NewAssignment) -> Result<HousingAssignment> {
        let storage = self.storage.as_ref();
        let now = Utc::now();
        let unit = storage
            .get_housing_unit(organization_id, new.unit_id)
            .await?
            .ok_or_else(|| FarmError::not_found("housing unit", new.unit_id))?;
        let animal = require_animal(storage, organization_id, new.animal_id).await?;
        if animal.status.is_terminal() {
            return Err(FarmError::validation("animal_id", format!("{} is no longer on the farm", animal.label())));
        }
        let start_at = new.start_at.unwrap_or(now);
        if start_at > now {
            return Err(FarmError::validation("start_at", "cannot be in the future"));
        }

        let open = storage.list_assignments(Some(organization_id), true).await?;
        let current: Vec<&HousingAssignment> = open.iter().filter(|a| a.animal_id == animal.id).collect();
        if current.iter().any(|a| a.unit_id == unit.id) {
            return Err(FarmError::Conflict(format!("{} is already in {}", animal.label(), unit.name)));
        }
        let occupants = open.iter().filter(|a| a.unit_id == unit.id).count();
        if occupants >= unit.capacity.max(0) as usize {
            return Err(FarmError::Conflict(format!(
                "{} is full ({} of {})",
                unit.name, occupants, unit.capacity
            )));
        }
        if let Some(late) = current.iter().find(|a| a.start_at > start_at) {
            return Err(FarmError::validation(
                "start_at",
                format!("is before the current assignment started ({})", late.start_at),
            ));
        }

        for previous in current {
            let mut ended = previous.clone();
            ended.end_at = Some(start_at);
            storage.update_assignment(&ended).await?;
        }
        let assignment = HousingAssignment {
            id: Uuid::new_v4(),
            organization_id,
            unit_id: unit.id,
            animal_id: animal.id,
            start_at,
            end_at: None,
        };
        storage.create_assignment(&assignment).await?;
        info!("Moved {} into {}", animal.label(), unit.name);
        Ok(assignment)
    }

    pub async fn end_assignment(&self, organization_id: Uuid, id: Uuid, end_at: Option<DateTime<Utc>>) -> Result<HousingAssignment> {
        let mut assignment = self
            .storage
            .get_assignment(organization_id, id)
            .await?
            .ok_or_else(|| FarmError::not_found("housing assignment", id))?;
        if !assignment.is_open() {
            return Err(FarmError::Conflict("assignment has already ended".into()));
        }
        let end = end_at.unwrap_or_else(Utc::now);
        if end < assignment.start_at {
            return Err(FarmError::validation("end_at", "is before the assignment started"));
        }
        assignment.end_at = Some(end);
        self.storage.update_assignment(&assignment).await?;
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::animals::AnimalsUseCase;
    use crate::domain::{AnimalKind, HousingUnitType, NewAnimal};
    use crate::storage::InMemoryStorage;
    use chrono::Duration;

    async fn sow(storage: Arc<InMemoryStorage>, org: Uuid, tag: &str) -> Uuid {
        AnimalsUseCase::new(storage)
            .create(
                org,
                NewAnimal {
                    kind: AnimalKind::Sow,
                    ear_tag: tag.into(),
                    name: None,
                    breed: None,
                    sex: None,
                    birth_date: None,
                    status: None,
                    dam_id: None,
                    sire_id: None,
                    weight_kg: None,
                    notes: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn unit(name: &str, unit_type: HousingUnitType, capacity: i32) -> NewHousingUnit {
        NewHousingUnit { name: name.into(), unit_type, area_sqft: 14.0 * capacity as f64, capacity }
    }

    #[tokio::test]
    async fn moving_ends_previous_assignment() {
        let storage = Arc::new(InMemoryStorage::new());
        let org = Uuid::new_v4();
        let housing = HousingUseCase::new(storage.clone());
        let stall = housing.create_unit(org, unit("Stall 1", HousingUnitType::GestationStall, 1)).await.unwrap();
        let pen = housing.create_unit(org, unit("Pen A", HousingUnitType::GroupPen, 4)).await.unwrap();
        let sow = sow(storage.clone(), org, "S-1").await;

        let first_start = Utc::now() - Duration::hours(5);
        let first = housing
            .assign(org, NewAssignment { unit_id: stall.id, animal_id: sow, start_at: Some(first_start) })
            .await
            .unwrap();
        let moved_at = Utc::now() - Duration::hours(1);
        housing
            .assign(org, NewAssignment { unit_id: pen.id, animal_id: sow, start_at: Some(moved_at) })
            .await
            .unwrap();

        let ended = storage.get_assignment(org, first.id).await.unwrap().unwrap();
        assert_eq!(ended.end_at, Some(moved_at));
        let open = housing.list_assignments(org, true).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].unit_id, pen.id);
    }

    #[tokio::test]
    async fn full_units_refuse_new_animals() {
        let storage = Arc::new(InMemoryStorage::new());
        let org = Uuid::new_v4();
        let housing = HousingUseCase::new(storage.clone());
        let crate_unit = housing.create_unit(org, unit("Crate 3", HousingUnitType::FarrowingCrate, 1)).await.unwrap();
        let a = sow(storage.clone(), org, "S-1").await;
        let b = sow(storage.clone(), org, "S-2").await;

        housing
            .assign(org, NewAssignment { unit_id: crate_unit.id, animal_id: a, start_at: None })
            .await
            .unwrap();
        let full = housing
            .assign(org, NewAssignment { unit_id: crate_unit.id, animal_id: b, start_at: None })
            .await;
        assert!(matches!(full, Err(FarmError::Conflict(_))));

        let units = housing.list_units(org).await.unwrap();
        assert_eq!(units[0].occupants, 1);
        assert_eq!(units[0].sqft_per_pig, Some(14.0));
    }

    #[tokio::test]
    async fn end_assignment_is_not_repeatable() {
        let storage = Arc::new(InMemoryStorage::new());
        let org = Uuid::new_v4();
        let housing = HousingUseCase::new(storage.clone());
        let pen = housing.create_unit(org, unit("Pen B", HousingUnitType::GroupPen, 2)).await.unwrap();
        let a = sow(storage.clone(), org, "S-1").await;
        let assignment = housing
            .assign(org, NewAssignment { unit_id: pen.id, animal_id: a, start_at: None })
            .await
            .unwrap();
        housing.end_assignment(org, assignment.id, None).await.unwrap();
        assert!(matches!(
            housing.end_assignment(org, assignment.id, None).await,
            Err(FarmError::Conflict(_))
        ));
    }
}

use crate::app::{require_animal, require_live_animal};
use crate::domain::{Animal, AnimalKind, AnimalUpdate, NewAnimal};
use crate::error::{FarmError, Result};
use crate::storage::Storage;
use crate::validation;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct AnimalsUseCase {
    storage: Arc<dyn Storage>,
}

impl AnimalsUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn ensure_unique_tag(&self, organization_id: Uuid, kind: AnimalKind, ear_tag: &str, except: Option<Uuid>) -> Result<()> {
        let clash = self
            .storage
            .list_animals(organization_id, Some(kind))
            .await?
            .into_iter()
            .any(|a| Some(a.id) != except && a.ear_tag.eq_ignore_ascii_case(ear_tag));
        if clash {
            return Err(FarmError::Conflict(format!(
                "a {} with ear tag {} already exists",
                kind.as_str(),
                ear_tag
            )));
        }
        Ok(())
    }

    pub async fn create(&self, organization_id: Uuid, new: NewAnimal) -> Result<Animal> {
        let now = Utc::now();
        validation::validate_new_animal(&new, now.date_naive())?;
        let ear_tag = new.ear_tag.trim().to_string();
        self.ensure_unique_tag(organization_id, new.kind, &ear_tag, None).await?;
        if let Some(dam) = new.dam_id {
            require_animal(self.storage.as_ref(), organization_id, dam)
                .await
                .and_then(|a| expect_kind(a, AnimalKind::Sow, "dam_id"))?;
        }
        if let Some(sire) = new.sire_id {
            require_animal(self.storage.as_ref(), organization_id, sire)
                .await
                .and_then(|a| expect_kind(a, AnimalKind::Boar, "sire_id"))?;
        }

        let animal = Animal {
            id: Uuid::new_v4(),
            organization_id,
            kind: new.kind,
            ear_tag,
            name: new.name,
            breed: new.breed,
            sex: new.sex,
            birth_date: new.birth_date,
            status: new.status.unwrap_or_else(|| new.kind.default_status()),
            dam_id: new.dam_id,
            sire_id: new.sire_id,
            farrowing_id: None,
            weight_kg: new.weight_kg,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_animal(&animal).await?;
        info!("Added {} to organization {}", animal.label(), organization_id);
        Ok(animal)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Animal> {
        require_animal(self.storage.as_ref(), organization_id, id).await
    }

    pub async fn list(&self, organization_id: Uuid, kind: Option<AnimalKind>) -> Result<Vec<Animal>> {
        self.storage.list_animals(organization_id, kind).await
    }

    pub async fn update(&self, organization_id: Uuid, id: Uuid, update: AnimalUpdate) -> Result<Animal> {
        let mut animal = require_animal(self.storage.as_ref(), organization_id, id).await?;
        let was_terminal = animal.status.is_terminal();
        let now = Utc::now();
        update.apply(&mut animal);

        validation::validate_ear_tag(&animal.ear_tag)?;
        if !animal.status.allowed_for(animal.kind) {
            return Err(FarmError::validation(
                "status",
                format!("{:?} is not a valid status for a {}", animal.status, animal.kind.as_str()),
            ));
        }
        if let Some(birth_date) = animal.birth_date {
            validation::require_not_future("birth_date", birth_date, now.date_naive())?;
        }
        if let Some(weight) = animal.weight_kg {
            validation::require_positive("weight_kg", weight)?;
        }
        self.ensure_unique_tag(organization_id, animal.kind, &animal.ear_tag, Some(animal.id))
            .await?;

        animal.updated_at = now;
        self.storage.update_animal(&animal).await?;
        if animal.status.is_terminal() && !was_terminal {
            close_open_assignments(self.storage.as_ref(), organization_id, animal.id, now).await?;
        }
        Ok(animal)
    }

    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> Result<()> {
        if !self.storage.delete_animal(organization_id, id).await? {
            return Err(FarmError::not_found("animal", id));
        }
        info!("Deleted animal {} from organization {}", id, organization_id);
        Ok(())
    }

    /// Sets a status on a live animal of `kind`, e.g. a sow moving from Bred to Pregnant.
    pub(crate) async fn set_status(
        storage: &dyn Storage,
        organization_id: Uuid,
        id: Uuid,
        kind: AnimalKind,
        status: crate::domain::AnimalStatus,
    ) -> Result<Animal> {
        let mut animal = require_live_animal(storage, organization_id, id, kind, "animal_id").await?;
        animal.status = status;
        animal.updated_at = Utc::now();
        storage.update_animal(&animal).await?;
        Ok(animal)
    }
}

fn expect_kind(animal: Animal, kind: AnimalKind, field: &str) -> Result<Animal> {
    if animal.kind != kind {
        return Err(FarmError::validation(field, format!("{} is not a {}", animal.ear_tag, kind.as_str())));
    }
    Ok(animal)
}

/// Ends every open housing assignment of an animal that left the farm.
pub(crate) async fn close_open_assignments(
    storage: &dyn Storage,
    organization_id: Uuid,
    animal_id: Uuid,
    at: DateTime<Utc>,
) -> Result<usize> {
    let mut closed = 0;
    for mut assignment in storage.list_assignments(Some(organization_id), true).await? {
        if assignment.animal_id != animal_id {
            continue;
        }
        assignment.end_at = Some(at.max(assignment.start_at));
        storage.update_assignment(&assignment).await?;
        closed += 1;
    }
    Ok(closed)
}

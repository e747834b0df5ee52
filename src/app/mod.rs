pub mod ports;
pub mod organizations;
pub mod invites;
pub mod animals;
pub mod breeding;
pub mod farrowing;
pub mod housing;
pub mod health;
pub mod finance;
pub mod settings;
pub mod reports;
pub mod reminders;
pub mod push_service;
pub mod cron;

use crate::domain::{Animal, AnimalKind, OrganizationSettings};
use crate::error::{FarmError, Result};
use crate::storage::Storage;
use uuid::Uuid;

/// Stored settings, or the farm defaults when the organization never saved any.
pub async fn settings_or_default(storage: &dyn Storage, organization_id: Uuid) -> Result<OrganizationSettings> {
    Ok(storage
        .get_settings(organization_id)
        .await?
        .unwrap_or_else(|| OrganizationSettings::defaults_for(organization_id)))
}

pub async fn require_animal(storage: &dyn Storage, organization_id: Uuid, id: Uuid) -> Result<Animal> {
    storage
        .get_animal(organization_id, id)
        .await?
        .ok_or_else(|| FarmError::not_found("animal", id))
}

/// Loads an animal and checks it is of `kind` and still on the farm.
pub async fn require_live_animal(
    storage: &dyn Storage,
    organization_id: Uuid,
    id: Uuid,
    kind: AnimalKind,
    field: &str,
) -> Result<Animal> {
    let animal = require_animal(storage, organization_id, id).await?;
    if animal.kind != kind {
        return Err(FarmError::validation(field, format!("{} is not a {}", animal.ear_tag, kind.as_str())));
    }
    if animal.status.is_terminal() {
        return Err(FarmError::validation(field, format!("{} is no longer on the farm", animal.ear_tag)));
    }
    Ok(animal)
}

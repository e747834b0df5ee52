use crate::app::animals::AnimalsUseCase;
use crate::app::reminders::{self, Reminder};
use crate::app::{require_animal, settings_or_default};
use crate::domain::{
    Animal, AnimalKind, AnimalStatus, BreedingStatus, Farrowing, FarrowingOutcome, NotificationType, Weaning,
};
use crate::error::{FarmError, Result};
use crate::gestation;
use crate::storage::Storage;
use crate::validation;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct FarrowingUseCase {
    storage: Arc<dyn Storage>,
}

impl FarrowingUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn require(&self, organization_id: Uuid, id: Uuid) -> Result<Farrowing> {
        self.storage
            .get_farrowing(organization_id, id)
            .await?
            .ok_or_else(|| FarmError::not_found("farrowing", id))
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<Farrowing>> {
        self.storage.list_farrowings(organization_id).await
    }

    /// Records the litter: the breeding becomes Farrowed, the sow Lactating,
    /// and optionally one piglet per live-born pig is added.
    pub async fn record_outcome(&self, organization_id: Uuid, id: Uuid, outcome: FarrowingOutcome) -> Result<Farrowing> {
        let storage = self.storage.as_ref();
        let now = Utc::now();
        let mut farrowing = self.require(organization_id, id).await?;
        if !farrowing.is_pending() {
            return Err(FarmError::Conflict("farrowing outcome was already recorded".into()));
        }
        let breeding = match farrowing.breeding_id {
            Some(breeding_id) => storage.get_breeding(organization_id, breeding_id).await?,
            None => None,
        };
        validation::validate_farrowing_outcome(&outcome, breeding.as_ref().map(|b| b.breeding_date), now.date_naive())?;
        let sow = require_animal(storage, organization_id, farrowing.sow_id).await?;

        let piglet_tags: Vec<String> = if outcome.create_piglets {
            (1..=outcome.born_alive).map(|n| format!("{}-{}", sow.ear_tag, n)).collect()
        } else {
            Vec::new()
        };
        if !piglet_tags.is_empty() {
            for tag in &piglet_tags {
                validation::validate_ear_tag(tag)?;
            }
            let existing = storage.list_animals(organization_id, Some(AnimalKind::Piglet)).await?;
            if let Some(clash) = existing
                .iter()
                .find(|a| piglet_tags.iter().any(|t| t.eq_ignore_ascii_case(&a.ear_tag)))
            {
                return Err(FarmError::Conflict(format!("piglet {} already exists", clash.ear_tag)));
            }
        }

        farrowing.actual_date = Some(outcome.actual_date);
        farrowing.born_alive = Some(outcome.born_alive);
        farrowing.stillborn = Some(outcome.stillborn);
        farrowing.mummified = Some(outcome.mummified);
        if outcome.notes.is_some() {
            farrowing.notes = outcome.notes;
        }
        storage.update_farrowing(&farrowing).await?;

        let sire_id = breeding.as_ref().and_then(|b| b.boar_id);
        if let Some(mut breeding) = breeding {
            breeding.status = BreedingStatus::Farrowed;
            storage.update_breeding(&breeding).await?;
            // Pre-farrowing reminders are moot once she has farrowed.
            storage.delete_pending_notifications_for(breeding.id).await?;
        }
        if !sow.status.is_terminal() {
            AnimalsUseCase::set_status(storage, organization_id, sow.id, AnimalKind::Sow, AnimalStatus::Lactating)
                .await?;
        }

        for tag in piglet_tags {
            let piglet = Animal {
                id: Uuid::new_v4(),
                organization_id,
                kind: AnimalKind::Piglet,
                ear_tag: tag,
                name: None,
                breed: sow.breed.clone(),
                sex: None,
                birth_date: Some(outcome.actual_date),
                status: AnimalStatus::Nursing,
                dam_id: Some(sow.id),
                sire_id,
                farrowing_id: Some(farrowing.id),
                weight_kg: None,
                notes: None,
                created_at: now,
                updated_at: now,
            };
            storage.create_animal(&piglet).await?;
        }

        let settings = settings_or_default(storage, organization_id).await?;
        let weaning = gestation::weaning_date(outcome.actual_date, &settings);
        let reminder = Reminder {
            notification_type: NotificationType::WeaningDue,
            title: format!("Weaning due: {}", sow.label()),
            body: format!(
                "{} farrowed {} with {} born alive; weaning planned for {}.",
                sow.label(),
                outcome.actual_date,
                outcome.born_alive,
                weaning
            ),
            related_id: farrowing.id,
            date: weaning,
        };
        reminders::schedule(storage, &settings, &reminder, now).await?;
        info!(
            "Recorded farrowing {} for {}: {} alive, {} total",
            farrowing.id,
            sow.label(),
            outcome.born_alive,
            farrowing.total_born()
        );
        Ok(farrowing)
    }

    /// Records weaning: the sow returns to Open and her nursing piglets become Weaned.
    pub async fn record_weaning(&self, organization_id: Uuid, id: Uuid, weaning: Weaning) -> Result<Farrowing> {
        let storage = self.storage.as_ref();
        let now = Utc::now();
        let mut farrowing = self.require(organization_id, id).await?;
        let farrowed_on = farrowing
            .actual_date
            .ok_or_else(|| FarmError::validation("weaning_date", "record the farrowing first"))?;
        if farrowing.weaning_date.is_some() {
            return Err(FarmError::Conflict("litter was already weaned".into()));
        }
        validation::validate_weaning(&weaning, farrowed_on, farrowing.born_alive.unwrap_or(0), now.date_naive())?;

        farrowing.weaning_date = Some(weaning.weaning_date);
        farrowing.weaned_count = Some(weaning.weaned_count);
        storage.update_farrowing(&farrowing).await?;

        match AnimalsUseCase::set_status(storage, organization_id, farrowing.sow_id, AnimalKind::Sow, AnimalStatus::Open)
            .await
        {
            Ok(_) => {}
            Err(FarmError::Validation { .. }) => warn!("Sow {} is no longer on the farm", farrowing.sow_id),
            Err(e) => return Err(e),
        }

        let mut weaned = 0;
        for mut piglet in storage.list_animals(organization_id, Some(AnimalKind::Piglet)).await? {
            if piglet.farrowing_id == Some(farrowing.id) && piglet.status == AnimalStatus::Nursing {
                piglet.status = AnimalStatus::Weaned;
                piglet.updated_at = now;
                storage.update_animal(&piglet).await?;
                weaned += 1;
            }
        }
        storage.delete_pending_notifications_for(farrowing.id).await?;
        info!("Weaned litter {} ({} piglet records updated)", farrowing.id, weaned);
        Ok(farrowing)
    }
}

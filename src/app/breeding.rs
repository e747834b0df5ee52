use crate::app::animals::AnimalsUseCase;
use crate::app::reminders::{self, Reminder};
use crate::app::{require_live_animal, settings_or_default};
use crate::domain::{
    Animal, AnimalKind, AnimalStatus, BreedingMethod, BreedingRecord, BreedingStatus, Farrowing, NewBreeding,
    OrganizationSettings,
};
use crate::error::{FarmError, Result};
use crate::gestation;
use crate::storage::Storage;
use crate::validation;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Use case for recording services and tracking the resulting pregnancy
pub struct BreedingUseCase {
    storage: Arc<dyn Storage>,
}

impl BreedingUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn require(&self, organization_id: Uuid, id: Uuid) -> Result<BreedingRecord> {
        self.storage
            .get_breeding(organization_id, id)
            .await?
            .ok_or_else(|| FarmError::not_found("breeding record", id))
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<BreedingRecord>> {
        self.storage.list_breedings(organization_id).await
    }

    /// Records a service, opens the pending farrowing and schedules the
    /// gestation reminders.
    pub async fn record(&self, organization_id: Uuid, new: NewBreeding, created_by: Uuid) -> Result<BreedingRecord> {
        let storage = self.storage.as_ref();
        let now = Utc::now();
        validation::validate_breeding(&new, now.date_naive())?;
        let sow = require_live_animal(storage, organization_id, new.sow_id, AnimalKind::Sow, "sow_id").await?;
        match new.boar_id {
            Some(boar) => {
                require_live_animal(storage, organization_id, boar, AnimalKind::Boar, "boar_id").await?;
            }
            None if new.method == BreedingMethod::Natural => {
                return Err(FarmError::validation("boar_id", "natural service needs a boar"));
            }
            None => {}
        }
        let open = storage
            .list_breedings(organization_id)
            .await?
            .into_iter()
            .any(|b| b.sow_id == sow.id && b.status.is_open());
        if open {
            return Err(FarmError::Conflict(format!("{} already has an open breeding", sow.label())));
        }

        let settings = settings_or_default(storage, organization_id).await?;
        let expected = gestation::expected_farrowing_date(new.breeding_date, &settings);
        let record = BreedingRecord {
            id: Uuid::new_v4(),
            organization_id,
            sow_id: sow.id,
            boar_id: new.boar_id,
            method: new.method,
            breeding_date: new.breeding_date,
            expected_farrowing_date: expected,
            status: BreedingStatus::Bred,
            pregnancy_confirmed_on: None,
            notes: new.notes,
            created_by,
            created_at: now,
        };
        storage.create_breeding(&record).await?;
        if let Err(e) = self.open_pregnancy(&record, &sow, &settings, now).await {
            warn!("Recording breeding {} failed, rolling back: {}", record.id, e);
            self.undo_breeding(&record).await;
            return Err(e);
        }
        info!("Recorded breeding {} for {} (due {})", record.id, sow.label(), expected);
        Ok(record)
    }

    /// Opens the pending farrowing, schedules reminders and marks the sow
    /// Bred. The sow is touched last so a failure leaves her status alone.
    async fn open_pregnancy(
        &self,
        record: &BreedingRecord,
        sow: &Animal,
        settings: &OrganizationSettings,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let storage = self.storage.as_ref();
        storage
            .create_farrowing(&Farrowing {
                id: Uuid::new_v4(),
                organization_id: record.organization_id,
                sow_id: sow.id,
                breeding_id: Some(record.id),
                expected_date: record.expected_farrowing_date,
                actual_date: None,
                born_alive: None,
                stillborn: None,
                mummified: None,
                weaned_count: None,
                weaning_date: None,
                notes: None,
                created_at: now,
            })
            .await?;

        let label = sow.label();
        for milestone in gestation::milestones(record.breeding_date, settings) {
            let reminder = Reminder {
                notification_type: milestone.kind.notification_type(),
                title: format!("{}: {}", milestone.kind.title(), label),
                body: format!(
                    "{} was bred on {}; farrowing expected {}.",
                    label, record.breeding_date, record.expected_farrowing_date
                ),
                related_id: record.id,
                date: milestone.date,
            };
            reminders::schedule(storage, settings, &reminder, now).await?;
        }
        AnimalsUseCase::set_status(storage, record.organization_id, sow.id, AnimalKind::Sow, AnimalStatus::Bred).await?;
        Ok(())
    }

    /// Best-effort removal of everything `record` created.
    async fn undo_breeding(&self, record: &BreedingRecord) {
        let storage = self.storage.as_ref();
        if let Err(e) = storage.delete_pending_notifications_for(record.id).await {
            error!("Rollback of reminders for breeding {} failed: {}", record.id, e);
        }
        match storage.get_farrowing_for_breeding(record.id).await {
            Ok(Some(farrowing)) => {
                if let Err(e) = storage.delete_farrowing(record.organization_id, farrowing.id).await {
                    error!("Rollback of farrowing {} failed: {}", farrowing.id, e);
                }
            }
            Ok(None) => {}
            Err(e) => error!("Rollback lookup for breeding {} failed: {}", record.id, e),
        }
        if let Err(e) = storage.delete_breeding(record.organization_id, record.id).await {
            error!("Rollback of breeding {} failed: {}", record.id, e);
        }
    }

    pub async fn confirm_pregnancy(&self, organization_id: Uuid, id: Uuid) -> Result<BreedingRecord> {
        let mut record = self.require(organization_id, id).await?;
        match record.status {
            BreedingStatus::Confirmed => return Ok(record),
            BreedingStatus::Bred => {}
            other => {
                return Err(FarmError::Conflict(format!("breeding is {:?} and cannot be confirmed", other)));
            }
        }
        record.status = BreedingStatus::Confirmed;
        record.pregnancy_confirmed_on = Some(Utc::now().date_naive());
        self.storage.update_breeding(&record).await?;
        AnimalsUseCase::set_status(
            self.storage.as_ref(),
            organization_id,
            record.sow_id,
            AnimalKind::Sow,
            AnimalStatus::Pregnant,
        )
        .await?;
        Ok(record)
    }

    /// Closes a breeding that did not take: the sow goes back to Open and
    /// the pending farrowing and unsent reminders are removed.
    pub async fn mark_not_pregnant(&self, organization_id: Uuid, id: Uuid) -> Result<BreedingRecord> {
        let storage = self.storage.as_ref();
        let mut record = self.require(organization_id, id).await?;
        if !record.status.is_open() {
            return Err(FarmError::Conflict(format!("breeding is already {:?}", record.status)));
        }
        record.status = BreedingStatus::NotPregnant;
        storage.update_breeding(&record).await?;

        if let Some(farrowing) = storage.get_farrowing_for_breeding(record.id).await? {
            if farrowing.is_pending() {
                storage.delete_farrowing(organization_id, farrowing.id).await?;
            }
        }
        let removed = storage.delete_pending_notifications_for(record.id).await?;
        if let Err(e) =
            AnimalsUseCase::set_status(storage, organization_id, record.sow_id, AnimalKind::Sow, AnimalStatus::Open).await
        {
            warn!("Could not reopen sow {}: {}", record.sow_id, e);
        }
        info!("Breeding {} marked not pregnant; {} reminders cancelled", record.id, removed);
        Ok(record)
    }
}

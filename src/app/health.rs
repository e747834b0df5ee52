use crate::app::animals::close_open_assignments;
use crate::app::reminders::{self, Reminder};
use crate::app::{require_animal, settings_or_default};
use crate::domain::{AnimalStatus, HealthEvent, HealthEventType, NewHealthEvent, NotificationType};
use crate::error::{FarmError, Result};
use crate::storage::Storage;
use crate::validation;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct HealthUseCase {
    storage: Arc<dyn Storage>,
}

impl HealthUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Records a health event. A death retires the animal and vacates its
    /// housing; a follow-up date schedules a reminder.
    pub async fn record(&self, organization_id: Uuid, new: NewHealthEvent) -> Result<HealthEvent> {
        let storage = self.storage.as_ref();
        let now = Utc::now();
        validation::validate_health_event(&new, now.date_naive())?;
        let mut animal = require_animal(storage, organization_id, new.animal_id).await?;
        if animal.status.is_terminal() {
            return Err(FarmError::validation("animal_id", format!("{} is no longer on the farm", animal.label())));
        }

        let event = HealthEvent {
            id: Uuid::new_v4(),
            organization_id,
            animal_id: animal.id,
            event_type: new.event_type,
            event_date: new.event_date,
            description: new.description.trim().to_string(),
            medication: new.medication,
            dosage: new.dosage,
            withdrawal_days: new.withdrawal_days,
            cost: new.cost,
            follow_up_date: new.follow_up_date,
            created_at: now,
        };
        storage.create_health_event(&event).await?;

        if event.event_type == HealthEventType::Death {
            animal.status = AnimalStatus::Deceased;
            animal.updated_at = now;
            storage.update_animal(&animal).await?;
            let closed = close_open_assignments(storage, organization_id, animal.id, now).await?;
            info!("{} recorded as deceased; {} housing assignments closed", animal.label(), closed);
            return Ok(event);
        }

        if let Some(follow_up) = event.follow_up_date {
            let settings = settings_or_default(storage, organization_id).await?;
            let notification_type = match event.event_type {
                HealthEventType::Vaccination => NotificationType::VaccinationDue,
                _ => NotificationType::HealthFollowUp,
            };
            let reminder = Reminder {
                notification_type,
                title: format!("Follow up: {}", animal.label()),
                body: event.description.clone(),
                related_id: event.id,
                date: follow_up,
            };
            reminders::schedule(storage, &settings, &reminder, now).await?;
        }
        Ok(event)
    }

    pub async fn list(&self, organization_id: Uuid, animal_id: Option<Uuid>) -> Result<Vec<HealthEvent>> {
        self.storage.list_health_events(organization_id, animal_id).await
    }

    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> Result<()> {
        if !self.storage.delete_health_event(organization_id, id).await? {
            return Err(FarmError::not_found("health event", id));
        }
        self.storage.delete_pending_notifications_for(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::animals::AnimalsUseCase;
    use crate::app::housing::HousingUseCase;
    use crate::domain::{AnimalKind, HousingUnitType, Membership, NewAnimal, NewAssignment, NewHousingUnit, Role};
    use crate::storage::InMemoryStorage;
    use chrono::Duration;

    async fn setup() -> (Arc<InMemoryStorage>, Uuid, Uuid) {
        let storage = Arc::new(InMemoryStorage::new());
        let org = Uuid::new_v4();
        storage
            .add_membership(&Membership {
                organization_id: org,
                user_id: Uuid::new_v4(),
                role: Role::Worker,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let boar = AnimalsUseCase::new(storage.clone())
            .create(
                org,
                NewAnimal {
                    kind: AnimalKind::Boar,
                    ear_tag: "B-4".into(),
                    name: Some("Hamlet".into()),
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
            .unwrap();
        (storage, org, boar.id)
    }

    fn event(animal_id: Uuid, event_type: HealthEventType) -> NewHealthEvent {
        NewHealthEvent {
            animal_id,
            event_type,
            event_date: Utc::now().date_naive(),
            description: "Lame on rear left".into(),
            medication: None,
            dosage: None,
            withdrawal_days: None,
            cost: Some(45.0),
            follow_up_date: None,
        }
    }

    #[tokio::test]
    async fn death_retires_animal_and_vacates_housing() {
        let (storage, org, boar) = setup().await;
        let housing = HousingUseCase::new(storage.clone());
        let pen = housing
            .create_unit(org, NewHousingUnit { name: "Boar pen".into(), unit_type: HousingUnitType::GroupPen, area_sqft: 80.0, capacity: 1 })
            .await
            .unwrap();
        housing
            .assign(org, NewAssignment { unit_id: pen.id, animal_id: boar, start_at: None })
            .await
            .unwrap();

        HealthUseCase::new(storage.clone())
            .record(org, event(boar, HealthEventType::Death))
            .await
            .unwrap();
        let animal = storage.get_animal(org, boar).await.unwrap().unwrap();
        assert_eq!(animal.status, AnimalStatus::Deceased);
        assert!(storage.list_assignments(Some(org), true).await.unwrap().is_empty());

        let after = HealthUseCase::new(storage.clone())
            .record(org, event(boar, HealthEventType::Checkup))
            .await;
        assert!(after.is_err());
    }

    #[tokio::test]
    async fn follow_up_schedules_reminder_until_deleted() {
        let (storage, org, boar) = setup().await;
        let use_case = HealthUseCase::new(storage.clone());
        let mut new = event(boar, HealthEventType::Treatment);
        new.follow_up_date = Some(Utc::now().date_naive() + Duration::days(7));
        let recorded = use_case.record(org, new).await.unwrap();

        let scheduled = storage.list_scheduled_notifications(org).await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].notification_type, NotificationType::HealthFollowUp);

        use_case.delete(org, recorded.id).await.unwrap();
        assert!(storage.list_scheduled_notifications(org).await.unwrap().is_empty());
        assert!(matches!(use_case.delete(org, recorded.id).await, Err(FarmError::NotFound { .. })));
    }
}

use crate::domain::*;
use crate::error::{FarmError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Storage port for every farm record. Organization-scoped reads take the
/// organization id so a record from another tenant is never returned.
#[async_trait]
pub trait Storage: Send + Sync {
    // Organizations and team
    async fn create_organization(&self, org: &Organization) -> Result<()>;
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>>;
    async fn list_organizations_for_user(&self, user_id: Uuid) -> Result<Vec<(Organization, Role)>>;
    async fn slugs_with_prefix(&self, prefix: &str) -> Result<HashSet<String>>;
    async fn add_membership(&self, membership: &Membership) -> Result<()>;
    async fn get_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<Membership>>;
    async fn list_memberships(&self, organization_id: Uuid) -> Result<Vec<Membership>>;
    async fn create_invite(&self, invite: &TeamInvite) -> Result<()>;
    async fn get_invite_by_token_hash(&self, token_hash: &str) -> Result<Option<TeamInvite>>;
    async fn list_invites(&self, organization_id: Option<Uuid>) -> Result<Vec<TeamInvite>>;
    async fn update_invite(&self, invite: &TeamInvite) -> Result<()>;
    async fn delete_invite(&self, id: Uuid) -> Result<bool>;

    // Animals
    async fn create_animal(&self, animal: &Animal) -> Result<()>;
    async fn get_animal(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Animal>>;
    async fn list_animals(&self, organization_id: Uuid, kind: Option<AnimalKind>) -> Result<Vec<Animal>>;
    async fn update_animal(&self, animal: &Animal) -> Result<()>;
    async fn delete_animal(&self, organization_id: Uuid, id: Uuid) -> Result<bool>;

    // Breeding and farrowing
    async fn create_breeding(&self, record: &BreedingRecord) -> Result<()>;
    async fn get_breeding(&self, organization_id: Uuid, id: Uuid) -> Result<Option<BreedingRecord>>;
    async fn list_breedings(&self, organization_id: Uuid) -> Result<Vec<BreedingRecord>>;
    async fn update_breeding(&self, record: &BreedingRecord) -> Result<()>;
    async fn delete_breeding(&self, organization_id: Uuid, id: Uuid) -> Result<bool>;
    async fn create_farrowing(&self, farrowing: &Farrowing) -> Result<()>;
    async fn get_farrowing(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Farrowing>>;
    async fn get_farrowing_for_breeding(&self, breeding_id: Uuid) -> Result<Option<Farrowing>>;
    async fn list_farrowings(&self, organization_id: Uuid) -> Result<Vec<Farrowing>>;
    async fn update_farrowing(&self, farrowing: &Farrowing) -> Result<()>;
    async fn delete_farrowing(&self, organization_id: Uuid, id: Uuid) -> Result<bool>;

    // Housing
    async fn create_housing_unit(&self, unit: &HousingUnit) -> Result<()>;
    async fn get_housing_unit(&self, organization_id: Uuid, id: Uuid) -> Result<Option<HousingUnit>>;
    async fn list_housing_units(&self, organization_id: Uuid) -> Result<Vec<HousingUnit>>;
    async fn create_assignment(&self, assignment: &HousingAssignment) -> Result<()>;
    async fn get_assignment(&self, organization_id: Uuid, id: Uuid) -> Result<Option<HousingAssignment>>;
    /// `None` lists across all organizations (maintenance only).
    async fn list_assignments(&self, organization_id: Option<Uuid>, open_only: bool) -> Result<Vec<HousingAssignment>>;
    async fn update_assignment(&self, assignment: &HousingAssignment) -> Result<()>;

    // Health
    async fn create_health_event(&self, event: &HealthEvent) -> Result<()>;
    async fn list_health_events(&self, organization_id: Uuid, animal_id: Option<Uuid>) -> Result<Vec<HealthEvent>>;
    async fn delete_health_event(&self, organization_id: Uuid, id: Uuid) -> Result<bool>;

    // Finance
    async fn create_financial_record(&self, record: &FinancialRecord) -> Result<()>;
    async fn list_financial_records(
        &self,
        organization_id: Uuid,
        kind: Option<FinancialKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<FinancialRecord>>;
    async fn delete_financial_record(&self, organization_id: Uuid, id: Uuid) -> Result<bool>;

    // Scheduled notifications
    async fn create_scheduled_notification(&self, notification: &ScheduledNotification) -> Result<()>;
    /// Unsent rows due at `now`, oldest first.
    async fn list_due_notifications(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<ScheduledNotification>>;
    async fn list_scheduled_notifications(&self, organization_id: Uuid) -> Result<Vec<ScheduledNotification>>;
    async fn update_scheduled_notification(&self, notification: &ScheduledNotification) -> Result<()>;
    async fn delete_pending_notifications_for(&self, related_id: Uuid) -> Result<usize>;
    async fn delete_sent_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    // In-app notifications
    async fn create_notification(&self, notification: &Notification) -> Result<()>;
    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    // Push subscriptions
    async fn upsert_push_subscription(&self, subscription: &PushSubscription) -> Result<()>;
    async fn list_push_subscriptions(&self, user_id: Uuid) -> Result<Vec<PushSubscription>>;
    async fn update_push_subscription(&self, subscription: &PushSubscription) -> Result<()>;
    async fn delete_push_subscription(&self, endpoint: &str) -> Result<bool>;

    // Settings
    async fn get_settings(&self, organization_id: Uuid) -> Result<Option<OrganizationSettings>>;
    async fn upsert_settings(&self, settings: &OrganizationSettings) -> Result<()>;
}

type Table<T> = RwLock<HashMap<Uuid, T>>;

/// In-memory storage implementation for development/testing
#[derive(Default)]
pub struct InMemoryStorage {
    organizations: Table<Organization>,
    memberships: RwLock<HashMap<(Uuid, Uuid), Membership>>,
    invites: Table<TeamInvite>,
    animals: Table<Animal>,
    breedings: Table<BreedingRecord>,
    farrowings: Table<Farrowing>,
    housing_units: Table<HousingUnit>,
    assignments: Table<HousingAssignment>,
    health_events: Table<HealthEvent>,
    financial_records: Table<FinancialRecord>,
    scheduled: Table<ScheduledNotification>,
    notifications: Table<Notification>,
    push_subscriptions: Table<PushSubscription>,
    settings: Table<OrganizationSettings>,
    failing: std::sync::Mutex<HashSet<&'static str>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named storage operation fail with a backend error from now on.
    pub fn fail_operation(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation);
        }
    }

    fn injected(&self, operation: &'static str) -> Result<()> {
        let fails = self.failing.lock().map(|f| f.contains(operation)).unwrap_or(false);
        if fails {
            return Err(FarmError::Backend { status: 503, message: format!("{} unavailable", operation) });
        }
        Ok(())
    }
}

async fn insert_new<T: Clone>(table: &Table<T>, id: Uuid, row: &T, entity: &str) -> Result<()> {
    let mut rows = table.write().await;
    if rows.contains_key(&id) {
        return Err(FarmError::Conflict(format!("{} {} already exists", entity, id)));
    }
    rows.insert(id, row.clone());
    debug!("Created {} with id {}", entity, id);
    Ok(())
}

async fn replace<T: Clone>(table: &Table<T>, id: Uuid, row: &T, entity: &'static str) -> Result<()> {
    let mut rows = table.write().await;
    match rows.get_mut(&id) {
        Some(existing) => {
            *existing = row.clone();
            debug!("Updated {} with id {}", entity, id);
            Ok(())
        }
        None => Err(FarmError::not_found(entity, id)),
    }
}

async fn scoped<T, F>(table: &Table<T>, filter: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    table.read().await.values().filter(|r| filter(r)).cloned().collect()
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_organization(&self, org: &Organization) -> Result<()> {
        if self.organizations.read().await.values().any(|o| o.slug == org.slug) {
            return Err(FarmError::Conflict(format!("slug '{}' is taken", org.slug)));
        }
        insert_new(&self.organizations, org.id, org, "organization").await
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.organizations.read().await.get(&id).cloned())
    }

    async fn list_organizations_for_user(&self, user_id: Uuid) -> Result<Vec<(Organization, Role)>> {
        let memberships = self.memberships.read().await;
        let orgs = self.organizations.read().await;
        let mut out: Vec<(Organization, Role)> = memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| orgs.get(&m.organization_id).map(|o| (o.clone(), m.role)))
            .collect();
        out.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(out)
    }

    async fn slugs_with_prefix(&self, prefix: &str) -> Result<HashSet<String>> {
        Ok(self
            .organizations
            .read()
            .await
            .values()
            .filter(|o| o.slug.starts_with(prefix))
            .map(|o| o.slug.clone())
            .collect())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<()> {
        let key = (membership.organization_id, membership.user_id);
        let mut memberships = self.memberships.write().await;
        if memberships.contains_key(&key) {
            return Err(FarmError::Conflict("user is already a member".into()));
        }
        memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn get_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<Membership>> {
        Ok(self.memberships.read().await.get(&(organization_id, user_id)).cloned())
    }

    async fn list_memberships(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
        let mut out: Vec<Membership> = self
            .memberships
            .read()
            .await
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    async fn create_invite(&self, invite: &TeamInvite) -> Result<()> {
        insert_new(&self.invites, invite.id, invite, "invite").await
    }

    async fn get_invite_by_token_hash(&self, token_hash: &str) -> Result<Option<TeamInvite>> {
        Ok(self
            .invites
            .read()
            .await
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn list_invites(&self, organization_id: Option<Uuid>) -> Result<Vec<TeamInvite>> {
        let mut out = scoped(&self.invites, |i| organization_id.map_or(true, |o| i.organization_id == o)).await;
        out.sort_by_key(|i| i.created_at);
        Ok(out)
    }

    async fn update_invite(&self, invite: &TeamInvite) -> Result<()> {
        replace(&self.invites, invite.id, invite, "invite").await
    }

    async fn delete_invite(&self, id: Uuid) -> Result<bool> {
        Ok(self.invites.write().await.remove(&id).is_some())
    }

    async fn create_animal(&self, animal: &Animal) -> Result<()> {
        insert_new(&self.animals, animal.id, animal, "animal").await
    }

    async fn get_animal(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Animal>> {
        Ok(self
            .animals
            .read()
            .await
            .get(&id)
            .filter(|a| a.organization_id == organization_id)
            .cloned())
    }

    async fn list_animals(&self, organization_id: Uuid, kind: Option<AnimalKind>) -> Result<Vec<Animal>> {
        let mut out = scoped(&self.animals, |a| {
            a.organization_id == organization_id && kind.map_or(true, |k| a.kind == k)
        })
        .await;
        out.sort_by(|a, b| a.ear_tag.cmp(&b.ear_tag));
        Ok(out)
    }

    async fn update_animal(&self, animal: &Animal) -> Result<()> {
        self.injected("update_animal")?;
        replace(&self.animals, animal.id, animal, "animal").await
    }

    async fn delete_animal(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        let mut animals = self.animals.write().await;
        if animals.get(&id).map_or(false, |a| a.organization_id == organization_id) {
            animals.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn create_breeding(&self, record: &BreedingRecord) -> Result<()> {
        insert_new(&self.breedings, record.id, record, "breeding record").await
    }

    async fn get_breeding(&self, organization_id: Uuid, id: Uuid) -> Result<Option<BreedingRecord>> {
        Ok(self
            .breedings
            .read()
            .await
            .get(&id)
            .filter(|b| b.organization_id == organization_id)
            .cloned())
    }

    async fn list_breedings(&self, organization_id: Uuid) -> Result<Vec<BreedingRecord>> {
        let mut out = scoped(&self.breedings, |b| b.organization_id == organization_id).await;
        out.sort_by(|a, b| b.breeding_date.cmp(&a.breeding_date));
        Ok(out)
    }

    async fn update_breeding(&self, record: &BreedingRecord) -> Result<()> {
        replace(&self.breedings, record.id, record, "breeding record").await
    }

    async fn delete_breeding(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        let mut breedings = self.breedings.write().await;
        if breedings.get(&id).map_or(false, |b| b.organization_id == organization_id) {
            breedings.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn create_farrowing(&self, farrowing: &Farrowing) -> Result<()> {
        self.injected("create_farrowing")?;
        insert_new(&self.farrowings, farrowing.id, farrowing, "farrowing").await
    }

    async fn get_farrowing(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Farrowing>> {
        Ok(self
            .farrowings
            .read()
            .await
            .get(&id)
            .filter(|f| f.organization_id == organization_id)
            .cloned())
    }

    async fn get_farrowing_for_breeding(&self, breeding_id: Uuid) -> Result<Option<Farrowing>> {
        Ok(self
            .farrowings
            .read()
            .await
            .values()
            .find(|f| f.breeding_id == Some(breeding_id))
            .cloned())
    }

    async fn list_farrowings(&self, organization_id: Uuid) -> Result<Vec<Farrowing>> {
        let mut out = scoped(&self.farrowings, |f| f.organization_id == organization_id).await;
        out.sort_by(|a, b| b.expected_date.cmp(&a.expected_date));
        Ok(out)
    }

    async fn update_farrowing(&self, farrowing: &Farrowing) -> Result<()> {
        replace(&self.farrowings, farrowing.id, farrowing, "farrowing").await
    }

    async fn delete_farrowing(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        let mut farrowings = self.farrowings.write().await;
        if farrowings.get(&id).map_or(false, |f| f.organization_id == organization_id) {
            farrowings.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn create_housing_unit(&self, unit: &HousingUnit) -> Result<()> {
        insert_new(&self.housing_units, unit.id, unit, "housing unit").await
    }

    async fn get_housing_unit(&self, organization_id: Uuid, id: Uuid) -> Result<Option<HousingUnit>> {
        Ok(self
            .housing_units
            .read()
            .await
            .get(&id)
            .filter(|u| u.organization_id == organization_id)
            .cloned())
    }

    async fn list_housing_units(&self, organization_id: Uuid) -> Result<Vec<HousingUnit>> {
        let mut out = scoped(&self.housing_units, |u| u.organization_id == organization_id).await;
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn create_assignment(&self, assignment: &HousingAssignment) -> Result<()> {
        insert_new(&self.assignments, assignment.id, assignment, "housing assignment").await
    }

    async fn get_assignment(&self, organization_id: Uuid, id: Uuid) -> Result<Option<HousingAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .get(&id)
            .filter(|a| a.organization_id == organization_id)
            .cloned())
    }

    async fn list_assignments(&self, organization_id: Option<Uuid>, open_only: bool) -> Result<Vec<HousingAssignment>> {
        let mut out = scoped(&self.assignments, |a| {
            organization_id.map_or(true, |o| a.organization_id == o) && (!open_only || a.is_open())
        })
        .await;
        out.sort_by_key(|a| a.start_at);
        Ok(out)
    }

    async fn update_assignment(&self, assignment: &HousingAssignment) -> Result<()> {
        replace(&self.assignments, assignment.id, assignment, "housing assignment").await
    }

    async fn create_health_event(&self, event: &HealthEvent) -> Result<()> {
        insert_new(&self.health_events, event.id, event, "health event").await
    }

    async fn list_health_events(&self, organization_id: Uuid, animal_id: Option<Uuid>) -> Result<Vec<HealthEvent>> {
        let mut out = scoped(&self.health_events, |e| {
            e.organization_id == organization_id && animal_id.map_or(true, |a| e.animal_id == a)
        })
        .await;
        out.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(out)
    }

    async fn delete_health_event(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        let mut events = self.health_events.write().await;
        if events.get(&id).map_or(false, |e| e.organization_id == organization_id) {
            events.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn create_financial_record(&self, record: &FinancialRecord) -> Result<()> {
        insert_new(&self.financial_records, record.id, record, "financial record").await
    }

    async fn list_financial_records(
        &self,
        organization_id: Uuid,
        kind: Option<FinancialKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<FinancialRecord>> {
        let mut out = scoped(&self.financial_records, |r| {
            r.organization_id == organization_id
                && kind.map_or(true, |k| r.kind == k)
                && from.map_or(true, |f| r.record_date >= f)
                && to.map_or(true, |t| r.record_date <= t)
        })
        .await;
        out.sort_by(|a, b| b.record_date.cmp(&a.record_date));
        Ok(out)
    }

    async fn delete_financial_record(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        let mut records = self.financial_records.write().await;
        if records.get(&id).map_or(false, |r| r.organization_id == organization_id) {
            records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn create_scheduled_notification(&self, notification: &ScheduledNotification) -> Result<()> {
        self.injected("create_scheduled_notification")?;
        insert_new(&self.scheduled, notification.id, notification, "scheduled notification").await
    }

    async fn list_due_notifications(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<ScheduledNotification>> {
        let mut due = scoped(&self.scheduled, |n| n.is_due(now)).await;
        due.sort_by_key(|n| (n.scheduled_for, n.created_at));
        due.truncate(limit);
        Ok(due)
    }

    async fn list_scheduled_notifications(&self, organization_id: Uuid) -> Result<Vec<ScheduledNotification>> {
        let mut out = scoped(&self.scheduled, |n| n.organization_id == organization_id).await;
        out.sort_by_key(|n| n.scheduled_for);
        Ok(out)
    }

    async fn update_scheduled_notification(&self, notification: &ScheduledNotification) -> Result<()> {
        self.injected("update_scheduled_notification")?;
        replace(&self.scheduled, notification.id, notification, "scheduled notification").await
    }

    async fn delete_pending_notifications_for(&self, related_id: Uuid) -> Result<usize> {
        let mut rows = self.scheduled.write().await;
        let before = rows.len();
        rows.retain(|_, n| n.sent || n.related_id != Some(related_id));
        Ok(before - rows.len())
    }

    async fn delete_sent_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.scheduled.write().await;
        let before = rows.len();
        rows.retain(|_, n| !(n.sent && n.sent_at.map_or(false, |at| at < cutoff)));
        Ok(before - rows.len())
    }

    async fn create_notification(&self, notification: &Notification) -> Result<()> {
        insert_new(&self.notifications, notification.id, notification, "notification").await
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
        let mut out = scoped(&self.notifications, |n| {
            n.user_id == user_id && (!unread_only || n.read_at.is_none())
        })
        .await;
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut rows = self.notifications.write().await;
        match rows.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read_at.get_or_insert(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_push_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        let mut rows = self.push_subscriptions.write().await;
        // Endpoints are unique; a re-subscribe replaces the keys and owner.
        let existing = rows
            .values()
            .find(|s| s.endpoint == subscription.endpoint)
            .map(|s| s.id);
        match existing {
            Some(id) => {
                let mut updated = subscription.clone();
                updated.id = id;
                rows.insert(id, updated);
            }
            None => {
                rows.insert(subscription.id, subscription.clone());
            }
        }
        Ok(())
    }

    async fn list_push_subscriptions(&self, user_id: Uuid) -> Result<Vec<PushSubscription>> {
        let mut out = scoped(&self.push_subscriptions, |s| s.user_id == user_id).await;
        out.sort_by_key(|s| s.created_at);
        Ok(out)
    }

    async fn update_push_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        replace(&self.push_subscriptions, subscription.id, subscription, "push subscription").await
    }

    async fn delete_push_subscription(&self, endpoint: &str) -> Result<bool> {
        let mut rows = self.push_subscriptions.write().await;
        let before = rows.len();
        rows.retain(|_, s| s.endpoint != endpoint);
        Ok(rows.len() < before)
    }

    async fn get_settings(&self, organization_id: Uuid) -> Result<Option<OrganizationSettings>> {
        Ok(self.settings.read().await.get(&organization_id).cloned())
    }

    async fn upsert_settings(&self, settings: &OrganizationSettings) -> Result<()> {
        self.settings
            .write()
            .await
            .insert(settings.organization_id, settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scheduled(org: Uuid, at: DateTime<Utc>, sent: bool) -> ScheduledNotification {
        let mut row = NewScheduledNotification {
            organization_id: org,
            user_id: Uuid::new_v4(),
            notification_type: NotificationType::General,
            title: "t".into(),
            body: "b".into(),
            related_id: None,
            scheduled_for: at,
            channels: vec![Channel::InApp],
        }
        .into_record(at);
        if sent {
            row.sent = true;
            row.sent_at = Some(at);
        }
        row
    }

    #[tokio::test]
    async fn due_notifications_are_oldest_first_and_limited() {
        let storage = InMemoryStorage::new();
        let org = Uuid::new_v4();
        let now = Utc::now();
        for offset in [3, 1, 2] {
            storage
                .create_scheduled_notification(&scheduled(org, now - Duration::hours(offset), false))
                .await
                .unwrap();
        }
        storage
            .create_scheduled_notification(&scheduled(org, now + Duration::hours(1), false))
            .await
            .unwrap();
        storage
            .create_scheduled_notification(&scheduled(org, now - Duration::hours(5), true))
            .await
            .unwrap();

        let due = storage.list_due_notifications(now, 2).await.unwrap();
        assert_eq!(due.len(), 2);
        assert!(due[0].scheduled_for < due[1].scheduled_for);
        assert_eq!(due[0].scheduled_for, now - Duration::hours(3));
    }

    #[tokio::test]
    async fn reads_are_scoped_to_organization() {
        let storage = InMemoryStorage::new();
        let org = Uuid::new_v4();
        let unit = HousingUnit {
            id: Uuid::new_v4(),
            organization_id: org,
            name: "Pen 1".into(),
            unit_type: HousingUnitType::GroupPen,
            area_sqft: 200.0,
            capacity: 6,
            created_at: Utc::now(),
        };
        storage.create_housing_unit(&unit).await.unwrap();

        assert!(storage.get_housing_unit(org, unit.id).await.unwrap().is_some());
        assert!(storage.get_housing_unit(Uuid::new_v4(), unit.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resubscribing_an_endpoint_keeps_one_row() {
        let storage = InMemoryStorage::new();
        let user = Uuid::new_v4();
        let sub = PushSubscription {
            id: Uuid::new_v4(),
            user_id: user,
            endpoint: "https://push.example/abc".into(),
            p256dh: "key-1".into(),
            auth: "auth-1".into(),
            user_agent: None,
            last_success_at: None,
            failure_count: 0,
            created_at: Utc::now(),
        };
        storage.upsert_push_subscription(&sub).await.unwrap();
        let mut again = sub.clone();
        again.id = Uuid::new_v4();
        again.p256dh = "key-2".into();
        storage.upsert_push_subscription(&again).await.unwrap();

        let subs = storage.list_push_subscriptions(user).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].p256dh, "key-2");
        assert_eq!(subs[0].id, sub.id);
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_sent_rows() {
        let storage = InMemoryStorage::new();
        let org = Uuid::new_v4();
        let now = Utc::now();
        storage
            .create_scheduled_notification(&scheduled(org, now - Duration::days(40), true))
            .await
            .unwrap();
        storage
            .create_scheduled_notification(&scheduled(org, now - Duration::days(40), false))
            .await
            .unwrap();
        storage
            .create_scheduled_notification(&scheduled(org, now - Duration::days(2), true))
            .await
            .unwrap();

        let removed = storage
            .delete_sent_notifications_before(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.list_scheduled_notifications(org).await.unwrap().len(), 2);
    }
}

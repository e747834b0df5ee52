use crate::domain::*;
use crate::error::{FarmError, Result};
use crate::infra::supabase_client::{Query, SupabaseClient};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

const ORGANIZATIONS: &str = "organizations";
const MEMBERS: &str = "organization_members";
const INVITES: &str = "team_invites";
const ANIMALS: &str = "animals";
const BREEDINGS: &str = "breeding_records";
const FARROWINGS: &str = "farrowings";
const HOUSING_UNITS: &str = "housing_units";
const ASSIGNMENTS: &str = "housing_assignments";
const HEALTH: &str = "health_events";
const FINANCE: &str = "financial_records";
const SCHEDULED: &str = "scheduled_notifications";
const NOTIFICATIONS: &str = "notifications";
const PUSH_SUBSCRIPTIONS: &str = "push_subscriptions";
const SETTINGS: &str = "organization_settings";

/// Production storage backed by Supabase's PostgREST API.
pub struct SupabaseStorage {
    client: SupabaseClient,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn by_id(id: Uuid) -> Query {
        Query::new().eq("id", id)
    }

    fn scoped(organization_id: Uuid, id: Uuid) -> Query {
        Query::new().eq("organization_id", organization_id).eq("id", id)
    }

    fn org(organization_id: Uuid) -> Query {
        Query::new().eq("organization_id", organization_id)
    }

    async fn replace<T: serde::Serialize + Sync>(&self, table: &str, id: Uuid, row: &T, entity: &'static str) -> Result<()> {
        let updated = self.client.update(table, &Self::by_id(id), row).await?;
        if updated == 0 {
            return Err(FarmError::not_found(entity, id));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct MemberOrgRow {
    role: Role,
    organizations: Organization,
}

#[derive(Deserialize)]
struct SlugRow {
    slug: String,
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

#[async_trait]
impl Storage for SupabaseStorage {
    async fn create_organization(&self, org: &Organization) -> Result<()> {
        self.client.insert(ORGANIZATIONS, org).await
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        self.client.select_one(ORGANIZATIONS, Self::by_id(id)).await
    }

    async fn list_organizations_for_user(&self, user_id: Uuid) -> Result<Vec<(Organization, Role)>> {
        let rows: Vec<MemberOrgRow> = self
            .client
            .select(MEMBERS, &Query::new().select("role,organizations(*)").eq("user_id", user_id))
            .await?;
        let mut out: Vec<(Organization, Role)> = rows.into_iter().map(|r| (r.organizations, r.role)).collect();
        out.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(out)
    }

    async fn slugs_with_prefix(&self, prefix: &str) -> Result<HashSet<String>> {
        let rows: Vec<SlugRow> = self
            .client
            .select(ORGANIZATIONS, &Query::new().select("slug").like("slug", &format!("{}*", prefix)))
            .await?;
        Ok(rows.into_iter().map(|r| r.slug).collect())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<()> {
        self.client.insert(MEMBERS, membership).await
    }

    async fn get_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<Membership>> {
        self.client
            .select_one(MEMBERS, Self::org(organization_id).eq("user_id", user_id))
            .await
    }

    async fn list_memberships(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
        self.client
            .select(MEMBERS, &Self::org(organization_id).order("created_at", true))
            .await
    }

    async fn create_invite(&self, invite: &TeamInvite) -> Result<()> {
        self.client.insert(INVITES, invite).await
    }

    async fn get_invite_by_token_hash(&self, token_hash: &str) -> Result<Option<TeamInvite>> {
        self.client
            .select_one(INVITES, Query::new().eq("token_hash", token_hash))
            .await
    }

    async fn list_invites(&self, organization_id: Option<Uuid>) -> Result<Vec<TeamInvite>> {
        let query = match organization_id {
            Some(org) => Self::org(org),
            None => Query::new(),
        };
        self.client.select(INVITES, &query.order("created_at", true)).await
    }

    async fn update_invite(&self, invite: &TeamInvite) -> Result<()> {
        self.replace(INVITES, invite.id, invite, "invite").await
    }

    async fn delete_invite(&self, id: Uuid) -> Result<bool> {
        Ok(self.client.delete(INVITES, &Self::by_id(id)).await? > 0)
    }

    async fn create_animal(&self, animal: &Animal) -> Result<()> {
        self.client.insert(ANIMALS, animal).await
    }

    async fn get_animal(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Animal>> {
        self.client.select_one(ANIMALS, Self::scoped(organization_id, id)).await
    }

    async fn list_animals(&self, organization_id: Uuid, kind: Option<AnimalKind>) -> Result<Vec<Animal>> {
        let mut query = Self::org(organization_id);
        if let Some(kind) = kind {
            query = query.eq("kind", kind.as_str());
        }
        self.client.select(ANIMALS, &query.order("ear_tag", true)).await
    }

    async fn update_animal(&self, animal: &Animal) -> Result<()> {
        self.replace(ANIMALS, animal.id, animal, "animal").await
    }

    async fn delete_animal(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.client.delete(ANIMALS, &Self::scoped(organization_id, id)).await? > 0)
    }

    async fn create_breeding(&self, record: &BreedingRecord) -> Result<()> {
        self.client.insert(BREEDINGS, record).await
    }

    async fn get_breeding(&self, organization_id: Uuid, id: Uuid) -> Result<Option<BreedingRecord>> {
        self.client.select_one(BREEDINGS, Self::scoped(organization_id, id)).await
    }

    async fn list_breedings(&self, organization_id: Uuid) -> Result<Vec<BreedingRecord>> {
        self.client
            .select(BREEDINGS, &Self::org(organization_id).order("breeding_date", false))
            .await
    }

    async fn update_breeding(&self, record: &BreedingRecord) -> Result<()> {
        self.replace(BREEDINGS, record.id, record, "breeding record").await
    }

    async fn delete_breeding(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.client.delete(BREEDINGS, &Self::scoped(organization_id, id)).await? > 0)
    }

    async fn create_farrowing(&self, farrowing: &Farrowing) -> Result<()> {
        self.client.insert(FARROWINGS, farrowing).await
    }

    async fn get_farrowing(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Farrowing>> {
        self.client.select_one(FARROWINGS, Self::scoped(organization_id, id)).await
    }

    async fn get_farrowing_for_breeding(&self, breeding_id: Uuid) -> Result<Option<Farrowing>> {
        self.client
            .select_one(FARROWINGS, Query::new().eq("breeding_id", breeding_id))
            .await
    }

    async fn list_farrowings(&self, organization_id: Uuid) -> Result<Vec<Farrowing>> {
        self.client
            .select(FARROWINGS, &Self::org(organization_id).order("expected_date", false))
            .await
    }

    async fn update_farrowing(&self, farrowing: &Farrowing) -> Result<()> {
        self.replace(FARROWINGS, farrowing.id, farrowing, "farrowing").await
    }

    async fn delete_farrowing(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.client.delete(FARROWINGS, &Self::scoped(organization_id, id)).await? > 0)
    }

    async fn create_housing_unit(&self, unit: &HousingUnit) -> Result<()> {
        self.client.insert(HOUSING_UNITS, unit).await
    }

    async fn get_housing_unit(&self, organization_id: Uuid, id: Uuid) -> Result<Option<HousingUnit>> {
        self.client.select_one(HOUSING_UNITS, Self::scoped(organization_id, id)).await
    }

    async fn list_housing_units(&self, organization_id: Uuid) -> Result<Vec<HousingUnit>> {
        self.client
            .select(HOUSING_UNITS, &Self::org(organization_id).order("name", true))
            .await
    }

    async fn create_assignment(&self, assignment: &HousingAssignment) -> Result<()> {
        self.client.insert(ASSIGNMENTS, assignment).await
    }

    async fn get_assignment(&self, organization_id: Uuid, id: Uuid) -> Result<Option<HousingAssignment>> {
        self.client.select_one(ASSIGNMENTS, Self::scoped(organization_id, id)).await
    }

    async fn list_assignments(&self, organization_id: Option<Uuid>, open_only: bool) -> Result<Vec<HousingAssignment>> {
        let mut query = match organization_id {
            Some(org) => Self::org(org),
            None => Query::new(),
        };
        if open_only {
            query = query.is_null("end_at");
        }
        self.client.select(ASSIGNMENTS, &query.order("start_at", true)).await
    }

    async fn update_assignment(&self, assignment: &HousingAssignment) -> Result<()> {
        self.replace(ASSIGNMENTS, assignment.id, assignment, "housing assignment").await
    }

    async fn create_health_event(&self, event: &HealthEvent) -> Result<()> {
        self.client.insert(HEALTH, event).await
    }

    async fn list_health_events(&self, organization_id: Uuid, animal_id: Option<Uuid>) -> Result<Vec<HealthEvent>> {
        let mut query = Self::org(organization_id);
        if let Some(animal) = animal_id {
            query = query.eq("animal_id", animal);
        }
        self.client.select(HEALTH, &query.order("event_date", false)).await
    }

    async fn delete_health_event(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.client.delete(HEALTH, &Self::scoped(organization_id, id)).await? > 0)
    }

    async fn create_financial_record(&self, record: &FinancialRecord) -> Result<()> {
        self.client.insert(FINANCE, record).await
    }

    async fn list_financial_records(
        &self,
        organization_id: Uuid,
        kind: Option<FinancialKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<FinancialRecord>> {
        let mut query = Self::org(organization_id);
        if let Some(kind) = kind {
            query = query.eq("kind", kind.as_str());
        }
        if let Some(from) = from {
            query = query.gte("record_date", from);
        }
        if let Some(to) = to {
            query = query.lte("record_date", to);
        }
        self.client.select(FINANCE, &query.order("record_date", false)).await
    }

    async fn delete_financial_record(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.client.delete(FINANCE, &Self::scoped(organization_id, id)).await? > 0)
    }

    async fn create_scheduled_notification(&self, notification: &ScheduledNotification) -> Result<()> {
        self.client.insert(SCHEDULED, notification).await
    }

    async fn list_due_notifications(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<ScheduledNotification>> {
        let query = Query::new()
            .eq("sent", false)
            .lte("scheduled_for", ts(now))
            .order("scheduled_for", true)
            .limit(limit);
        self.client.select(SCHEDULED, &query).await
    }

    async fn list_scheduled_notifications(&self, organization_id: Uuid) -> Result<Vec<ScheduledNotification>> {
        self.client
            .select(SCHEDULED, &Self::org(organization_id).order("scheduled_for", true))
            .await
    }

    async fn update_scheduled_notification(&self, notification: &ScheduledNotification) -> Result<()> {
        self.replace(SCHEDULED, notification.id, notification, "scheduled notification").await
    }

    async fn delete_pending_notifications_for(&self, related_id: Uuid) -> Result<usize> {
        let query = Query::new().eq("related_id", related_id).eq("sent", false);
        self.client.delete(SCHEDULED, &query).await
    }

    async fn delete_sent_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let query = Query::new().eq("sent", true).lt("sent_at", ts(cutoff));
        self.client.delete(SCHEDULED, &query).await
    }

    async fn create_notification(&self, notification: &Notification) -> Result<()> {
        self.client.insert(NOTIFICATIONS, notification).await
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
        let mut query = Query::new().eq("user_id", user_id);
        if unread_only {
            query = query.is_null("read_at");
        }
        self.client
            .select(NOTIFICATIONS, &query.order("created_at", false))
            .await
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let query = Self::by_id(id).eq("user_id", user_id).is_null("read_at");
        let updated = self
            .client
            .update(NOTIFICATIONS, &query, &serde_json::json!({ "read_at": at }))
            .await?;
        if updated > 0 {
            return Ok(true);
        }
        // Already read counts as success as long as the row is the user's.
        let existing: Option<Notification> = self
            .client
            .select_one(NOTIFICATIONS, Self::by_id(id).eq("user_id", user_id))
            .await?;
        Ok(existing.is_some())
    }

    async fn upsert_push_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        let row = serde_json::json!({
            "user_id": subscription.user_id,
            "endpoint": subscription.endpoint,
            "p256dh": subscription.p256dh,
            "auth": subscription.auth,
            "user_agent": subscription.user_agent,
            "failure_count": subscription.failure_count,
        });
        self.client.upsert(PUSH_SUBSCRIPTIONS, &row, "endpoint").await
    }

    async fn list_push_subscriptions(&self, user_id: Uuid) -> Result<Vec<PushSubscription>> {
        self.client
            .select(
                PUSH_SUBSCRIPTIONS,
                &Query::new().eq("user_id", user_id).order("created_at", true),
            )
            .await
    }

    async fn update_push_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        self.replace(PUSH_SUBSCRIPTIONS, subscription.id, subscription, "push subscription").await
    }

    async fn delete_push_subscription(&self, endpoint: &str) -> Result<bool> {
        let deleted = self
            .client
            .delete(PUSH_SUBSCRIPTIONS, &Query::new().eq("endpoint", endpoint))
            .await?;
        Ok(deleted > 0)
    }

    async fn get_settings(&self, organization_id: Uuid) -> Result<Option<OrganizationSettings>> {
        self.client.select_one(SETTINGS, Self::org(organization_id)).await
    }

    async fn upsert_settings(&self, settings: &OrganizationSettings) -> Result<()> {
        self.client.upsert(SETTINGS, settings, "organization_id").await
    }
}

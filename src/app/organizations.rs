use crate::domain::{AuthUser, Membership, Organization, OrganizationSettings, Role};
use crate::error::Result;
use crate::slug;
use crate::storage::Storage;
use crate::validation;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrganizationWithRole {
    #[serde(flatten)]
    pub organization: Organization,
    pub role: Role,
}

/// Use case for creating farms and listing who belongs to them
pub struct OrganizationsUseCase {
    storage: Arc<dyn Storage>,
}

impl OrganizationsUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates the organization with a unique slug, makes `user` its owner
    /// and stores default settings.
    pub async fn create(&self, name: &str, user: &AuthUser) -> Result<Organization> {
        validation::require_non_empty("name", name)?;
        let base = slug::slugify(name);
        let taken = self.storage.slugs_with_prefix(&base).await?;
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            slug: slug::unique_slug(&base, &taken),
            created_by: user.id,
            created_at: now,
        };
        self.storage.create_organization(&org).await?;
        self.storage
            .add_membership(&Membership {
                organization_id: org.id,
                user_id: user.id,
                role: Role::Owner,
                created_at: now,
            })
            .await?;
        self.storage
            .upsert_settings(&OrganizationSettings::defaults_for(org.id))
            .await?;
        info!("Created organization '{}' ({}) for user {}", org.slug, org.id, user.id);
        Ok(org)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrganizationWithRole>> {
        Ok(self
            .storage
            .list_organizations_for_user(user_id)
            .await?
            .into_iter()
            .map(|(organization, role)| OrganizationWithRole { organization, role })
            .collect())
    }

    pub async fn members(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
        self.storage.list_memberships(organization_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn user() -> AuthUser {
        AuthUser { id: Uuid::new_v4(), email: Some("owner@farm.test".into()) }
    }

    #[tokio::test]
    async fn creator_becomes_owner_with_default_settings() {
        let storage = Arc::new(InMemoryStorage::new());
        let use_case = OrganizationsUseCase::new(storage.clone());
        let owner = user();

        let org = use_case.create("Green Acres Farm", &owner).await.unwrap();
        assert_eq!(org.slug, "green-acres-farm");

        let membership = storage.get_membership(org.id, owner.id).await.unwrap().unwrap();
        assert_eq!(membership.role, Role::Owner);
        assert!(storage.get_settings(org.id).await.unwrap().is_some());

        let listed = use_case.list_for_user(owner.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].role, Role::Owner);
    }

    #[tokio::test]
    async fn duplicate_names_get_numbered_slugs() {
        let storage = Arc::new(InMemoryStorage::new());
        let use_case = OrganizationsUseCase::new(storage);
        let a = use_case.create("Hill Farm", &user()).await.unwrap();
        let b = use_case.create("Hill  Farm!", &user()).await.unwrap();
        assert_eq!(a.slug, "hill-farm");
        assert_eq!(b.slug, "hill-farm-2");
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let use_case = OrganizationsUseCase::new(Arc::new(InMemoryStorage::new()));
        assert!(use_case.create("   ", &user()).await.is_err());
    }
}

use crate::app::settings_or_default;
use crate::domain::OrganizationSettings;
use crate::error::Result;
use crate::storage::Storage;
use crate::validation;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct SettingsUseCase {
    storage: Arc<dyn Storage>,
}

impl SettingsUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn get(&self, organization_id: Uuid) -> Result<OrganizationSettings> {
        settings_or_default(self.storage.as_ref(), organization_id).await
    }

    /// Replaces the settings; the organization id in the path always wins.
    pub async fn update(&self, organization_id: Uuid, mut settings: OrganizationSettings) -> Result<OrganizationSettings> {
        settings.organization_id = organization_id;
        settings.currency = settings.currency.trim().to_uppercase();
        validation::validate_settings(&settings)?;
        self.storage.upsert_settings(&settings).await?;
        info!("Updated settings for organization {}", organization_id);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[tokio::test]
    async fn falls_back_to_defaults_and_validates_updates() {
        let use_case = SettingsUseCase::new(Arc::new(InMemoryStorage::new()));
        let org = Uuid::new_v4();
        let mut settings = use_case.get(org).await.unwrap();
        assert_eq!(settings.gestation_days, 114);

        settings.gestation_days = 116;
        settings.currency = " cad ".into();
        let saved = use_case.update(org, settings.clone()).await.unwrap();
        assert_eq!(saved.currency, "CAD");
        assert_eq!(use_case.get(org).await.unwrap().gestation_days, 116);

        settings.gestation_days = 40;
        assert!(use_case.update(org, settings).await.is_err());
    }
}

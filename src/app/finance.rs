use crate::app::require_animal;
use crate::domain::{FinancialKind, FinancialRecord, NewFinancialRecord};
use crate::error::{FarmError, Result};
use crate::finance::{self, FinancialSummary};
use crate::storage::Storage;
use crate::validation;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Query filter for listing and summarizing records.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FinanceFilter {
    pub kind: Option<FinancialKind>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub struct FinanceUseCase {
    storage: Arc<dyn Storage>,
}

impl FinanceUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn record(&self, organization_id: Uuid, new: NewFinancialRecord) -> Result<FinancialRecord> {
        validation::validate_financial_record(&new)?;
        if let Some(animal_id) = new.animal_id {
            require_animal(self.storage.as_ref(), organization_id, animal_id).await?;
        }
        let record = FinancialRecord {
            id: Uuid::new_v4(),
            organization_id,
            kind: new.kind,
            record_date: new.record_date,
            category: new.category.trim().to_string(),
            description: new.description,
            amount: new.amount,
            quantity: new.quantity,
            unit: new.unit,
            animal_id: new.animal_id,
            created_at: Utc::now(),
        };
        self.storage.create_financial_record(&record).await?;
        Ok(record)
    }

    pub async fn list(&self, organization_id: Uuid, filter: FinanceFilter) -> Result<Vec<FinancialRecord>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(FarmError::validation("from", "must not be after 'to'"));
            }
        }
        self.storage
            .list_financial_records(organization_id, filter.kind, filter.from, filter.to)
            .await
    }

    pub async fn summary(&self, organization_id: Uuid, filter: FinanceFilter) -> Result<FinancialSummary> {
        let records = self.list(organization_id, filter).await?;
        Ok(finance::summarize(&records))
    }

    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> Result<()> {
        if !self.storage.delete_financial_record(organization_id, id).await? {
            return Err(FarmError::not_found("financial record", id));
        }
        Ok(())
    }
}

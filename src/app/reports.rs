use crate::app::settings_or_default;
use crate::calendar::{self, CalendarEntry, CalendarSources};
use crate::compliance::{self, ComplianceInput, ComplianceReport};
use crate::csv_export;
use crate::domain::{AnimalKind, Animal};
use crate::error::{FarmError, Result};
use crate::storage::Storage;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Longest calendar or compliance range served in one request.
const MAX_REPORT_DAYS: i64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDataset {
    Animals,
    Finance,
    Breeding,
    Health,
}

impl ExportDataset {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportDataset::Animals => "animals.csv",
            ExportDataset::Finance => "finance.csv",
            ExportDataset::Breeding => "breeding.csv",
            ExportDataset::Health => "health.csv",
        }
    }
}

impl FromStr for ExportDataset {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_end_matches(".csv") {
            "animals" => Ok(ExportDataset::Animals),
            "finance" => Ok(ExportDataset::Finance),
            "breeding" => Ok(ExportDataset::Breeding),
            "health" => Ok(ExportDataset::Health),
            other => Err(FarmError::NotFound { entity: "export", id: other.to_string() }),
        }
    }
}

/// Read-only views across the herd: calendar, Prop 12 compliance and CSV exports.
pub struct ReportsUseCase {
    storage: Arc<dyn Storage>,
}

impl ReportsUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn calendar(&self, organization_id: Uuid, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEntry>> {
        if to < from {
            return Err(FarmError::validation("to", "must not be before 'from'"));
        }
        if (to - from).num_days() > MAX_REPORT_DAYS {
            return Err(FarmError::validation("to", format!("range is limited to {} days", MAX_REPORT_DAYS)));
        }
        let storage = self.storage.as_ref();
        let settings = settings_or_default(storage, organization_id).await?;
        let animals = storage.list_animals(organization_id, None).await?;
        let breedings = storage.list_breedings(organization_id).await?;
        let farrowings = storage.list_farrowings(organization_id).await?;
        let health = storage.list_health_events(organization_id, None).await?;

        let labels: HashMap<Uuid, String> = animals.iter().map(|a| (a.id, a.label())).collect();
        let label = |id: Uuid| labels.get(&id).cloned().unwrap_or_else(|| "Unknown animal".to_string());
        let sources = CalendarSources {
            breedings: &breedings,
            farrowings: &farrowings,
            health: &health,
            settings: &settings,
            label: &label,
        };
        Ok(calendar::build_calendar(&sources, from, to))
    }

    /// Prop 12 report for the window `[from, to)`; defaults to the 30 days before now.
    pub async fn compliance(
        &self,
        organization_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<ComplianceReport> {
        let to = to.unwrap_or_else(Utc::now);
        let from = match from {
            Some(from) => from,
            None => to
                .checked_sub_signed(Duration::days(30))
                .ok_or_else(|| FarmError::validation("to", "is out of range"))?,
        };
        if to <= from {
            return Err(FarmError::validation("to", "must be after 'from'"));
        }
        if (to - from).num_days() > MAX_REPORT_DAYS {
            return Err(FarmError::validation("from", format!("range is limited to {} days", MAX_REPORT_DAYS)));
        }
        let storage = self.storage.as_ref();
        let settings = settings_or_default(storage, organization_id).await?;
        let animals = storage.list_animals(organization_id, Some(AnimalKind::Sow)).await?;
        let units = storage.list_housing_units(organization_id).await?;
        let assignments = storage.list_assignments(Some(organization_id), false).await?;
        let farrowings = storage.list_farrowings(organization_id).await?;

        let report = compliance::build_report(
            &ComplianceInput {
                animals: &animals,
                units: &units,
                assignments: &assignments,
                farrowings: &farrowings,
                settings: &settings,
            },
            from,
            to,
        );
        info!(
            "Compliance report for {}: {}/{} sows compliant",
            organization_id,
            report.compliant_sows,
            report.sows.len()
        );
        Ok(report)
    }

    pub async fn export(&self, organization_id: Uuid, dataset: ExportDataset) -> Result<String> {
        let storage = self.storage.as_ref();
        let csv = match dataset {
            ExportDataset::Animals => csv_export::animals_csv(&storage.list_animals(organization_id, None).await?),
            ExportDataset::Finance => csv_export::financial_csv(
                &storage.list_financial_records(organization_id, None, None, None).await?,
            ),
            ExportDataset::Breeding => {
                let sows = storage.list_animals(organization_id, Some(AnimalKind::Sow)).await?;
                csv_export::breeding_csv(&storage.list_breedings(organization_id).await?, &ear_tags(&sows))
            }
            ExportDataset::Health => csv_export::health_csv(&storage.list_health_events(organization_id, None).await?),
        };
        Ok(csv)
    }
}

fn ear_tags(animals: &[Animal]) -> HashMap<Uuid, String> {
    animals.iter().map(|a| (a.id, a.ear_tag.clone())).collect()
}

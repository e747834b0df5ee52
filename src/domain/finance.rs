use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FinancialKind {
    Feed,
    Income,
    Expense,
}

impl FinancialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FinancialKind::Feed => "feed",
            FinancialKind::Income => "income",
            FinancialKind::Expense => "expense",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub kind: FinancialKind,
    pub record_date: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub amount: f64,
    /// Feed quantity (or head count for sales) with its unit.
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub animal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFinancialRecord {
    pub kind: FinancialKind,
    pub record_date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub animal_id: Option<Uuid>,
}

use crate::domain::{FinancialKind, FinancialRecord};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FinancialSummary {
    pub feed: f64,
    pub income: f64,
    pub expense: f64,
    /// Income minus feed and other expenses.
    pub net: f64,
    pub by_category: BTreeMap<String, f64>,
    pub record_count: usize,
}

pub fn summarize(records: &[FinancialRecord]) -> FinancialSummary {
    let mut summary = FinancialSummary::default();
    for record in records {
        match record.kind {
            FinancialKind::Feed => summary.feed += record.amount,
            FinancialKind::Income => summary.income += record.amount,
            FinancialKind::Expense => summary.expense += record.amount,
        }
        let key = format!("{}:{}", record.kind.as_str(), record.category.trim());
        *summary.by_category.entry(key).or_insert(0.0) += record.amount;
        summary.record_count += 1;
    }
    summary.net = summary.income - summary.feed - summary.expense;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn record(kind: FinancialKind, category: &str, amount: f64) -> FinancialRecord {
        FinancialRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            kind,
            record_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            category: category.to_string(),
            description: None,
            amount,
            quantity: None,
            unit: None,
            animal_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn nets_income_against_costs() {
        let summary = summarize(&[
            record(FinancialKind::Income, "Market hogs", 5200.0),
            record(FinancialKind::Feed, "Lactation ration", 1800.0),
            record(FinancialKind::Feed, "Lactation ration", 200.0),
            record(FinancialKind::Expense, "Vet", 350.0),
        ]);
        assert_eq!(summary.net, 2850.0);
        assert_eq!(summary.by_category["feed:Lactation ration"], 2000.0);
        assert_eq!(summary.record_count, 4);
    }
}

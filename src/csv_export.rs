//! CSV exports of farm records.

use crate::domain::{Animal, BreedingRecord, FinancialRecord, HealthEvent};
use serde::Serialize;

/// Quote a field when it would otherwise break the row. Text a spreadsheet
/// would evaluate as a formula gets a leading `'`; plain numbers pass through.
pub fn escape_field(value: &str) -> String {
    let value = if looks_like_formula(value) {
        format!("'{}", value)
    } else {
        value.to_string()
    };
    let needs_quotes = value.contains(|c: char| matches!(c, ',' | '"' | '\r' | '\n'))
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

fn looks_like_formula(value: &str) -> bool {
    value.starts_with(|c: char| matches!(c, '=' | '+' | '-' | '@' | '\t' | '\r')) && value.parse::<f64>().is_err()
}

pub fn to_csv<R>(headers: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut out = String::new();
    push_row(&mut out, headers.iter().map(|h| h.to_string()));
    for row in rows {
        push_row(&mut out, row);
    }
    out
}

fn push_row<I: IntoIterator<Item = String>>(out: &mut String, fields: I) {
    let line: Vec<String> = fields.into_iter().map(|f| escape_field(&f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Enum values as they appear in the API, e.g. `not_pregnant`.
fn wire<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

pub fn animals_csv(animals: &[Animal]) -> String {
    to_csv(
        &["ear_tag", "kind", "name", "breed", "sex", "birth_date", "status", "weight_kg", "notes"],
        animals.iter().map(|a| {
            vec![
                a.ear_tag.clone(),
                a.kind.as_str().to_string(),
                opt(&a.name),
                opt(&a.breed),
                a.sex.as_ref().map(wire).unwrap_or_default(),
                opt(&a.birth_date),
                wire(&a.status),
                opt(&a.weight_kg),
                opt(&a.notes),
            ]
        }),
    )
}

pub fn financial_csv(records: &[FinancialRecord]) -> String {
    to_csv(
        &["date", "kind", "category", "description", "amount", "quantity", "unit"],
        records.iter().map(|r| {
            vec![
                r.record_date.to_string(),
                r.kind.as_str().to_string(),
                r.category.clone(),
                opt(&r.description),
                format!("{:.2}", r.amount),
                opt(&r.quantity),
                opt(&r.unit),
            ]
        }),
    )
}

/// `sow_tags` maps sow ids to ear tags; unknown sows export their id.
pub fn breeding_csv(
    records: &[BreedingRecord],
    sow_tags: &std::collections::HashMap<uuid::Uuid, String>,
) -> String {
    to_csv(
        &["sow", "boar_id", "method", "breeding_date", "expected_farrowing_date", "status", "notes"],
        records.iter().map(|r| {
            vec![
                sow_tags
                    .get(&r.sow_id)
                    .cloned()
                    .unwrap_or_else(|| r.sow_id.to_string()),
                opt(&r.boar_id),
                wire(&r.method),
                r.breeding_date.to_string(),
                r.expected_farrowing_date.to_string(),
                wire(&r.status),
                opt(&r.notes),
            ]
        }),
    )
}

pub fn health_csv(events: &[HealthEvent]) -> String {
    to_csv(
        &[
            "event_date",
            "animal_id",
            "event_type",
            "description",
            "medication",
            "dosage",
            "withdrawal_ends_on",
            "cost",
            "follow_up_date",
        ],
        events.iter().map(|e| {
            vec![
                e.event_date.to_string(),
                e.animal_id.to_string(),
                wire(&e.event_type),
                e.description.clone(),
                opt(&e.medication),
                opt(&e.dosage),
                opt(&e.withdrawal_ends_on()),
                e.cost.map(|c| format!("{:.2}", c)).unwrap_or_default(),
                opt(&e.follow_up_date),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FinancialKind;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field(" padded"), "\" padded\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn neutralizes_spreadsheet_formulas() {
        assert_eq!(escape_field("=HYPERLINK(\"http://x\")"), "\"'=HYPERLINK(\"\"http://x\"\")\"");
        assert_eq!(escape_field("@SUM(A1)"), "'@SUM(A1)");
        assert_eq!(escape_field("+cmd"), "'+cmd");
        assert_eq!(escape_field("-12.50"), "-12.50");
        assert_eq!(escape_field("-"), "'-");
    }

    #[test]
    fn rows_end_with_crlf() {
        let csv = to_csv(&["a", "b"], vec![vec!["1".to_string(), "x,y".to_string()]]);
        assert_eq!(csv, "a,b\r\n1,\"x,y\"\r\n");
    }

    #[test]
    fn financial_export_formats_amounts() {
        let record = FinancialRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            kind: FinancialKind::Income,
            record_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            category: "Weaner sales".into(),
            description: Some("12 head, \"premium\"".into()),
            amount: 1440.5,
            quantity: Some(12.0),
            unit: Some("head".into()),
            animal_id: None,
            created_at: Utc::now(),
        };
        let csv = financial_csv(&[record]);
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "2026-03-02,income,Weaner sales,\"12 head, \"\"premium\"\"\",1440.50,12,head"
        );
    }
}

//! Synthetic clinic datasets and the chart-ready reports built from them.
//!
//! Each domain module follows the same three steps: a generator draws
//! records from the catalog tables, an aggregator folds them into buckets,
//! and a summarizer derives the KPI cards from those same buckets.

pub mod aging;
pub mod appointments;
pub mod cancellations;
pub mod capacity;
pub mod catalog;
pub mod competitors;
pub mod dashboard;
pub mod feedback;
pub mod geography;
pub mod marketing;
pub mod utilization;
pub mod volume;
pub mod waiting;

use clinic_core::ClinicError;
use serde_json::Value;

pub use catalog::ClinicCatalog;
pub use dashboard::{
    build_dashboard, build_report, generate_datasets, DashboardSnapshot, Datasets, Report,
    ReportKind,
};

/// Parse a catalog from a JSON string. Missing tables fall back to the defaults.
pub fn catalog_from_str(catalog_json: &str) -> Result<ClinicCatalog, ClinicError> {
    let value: Value =
        serde_json::from_str(catalog_json).map_err(|err| ClinicError::Parse(err.to_string()))?;
    catalog_from_value(&value)
}

/// Parse a catalog from a `serde_json::Value`.
pub fn catalog_from_value(catalog: &Value) -> Result<ClinicCatalog, ClinicError> {
    if !catalog.is_object() {
        return Err(ClinicError::Parse(format!(
            "expected a catalog object, received {}",
            json_kind(catalog)
        )));
    }
    let parsed: ClinicCatalog = serde_json::from_value(catalog.clone())
        .map_err(|err| ClinicError::Parse(err.to_string()))?;
    parsed.prepare()?;
    Ok(parsed)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_catalog_keeps_defaults() {
        let catalog = catalog_from_str(
            r#"{
                "clinic_name": "Harborne Scan Centre",
                "postcodes": [{ "name": "B17", "weight": 1.0 }]
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.clinic_name, "Harborne Scan Centre");
        assert_eq!(catalog.postcodes.len(), 1);
        assert_eq!(catalog.services, ClinicCatalog::default().services);
    }

    #[test]
    fn rejects_non_object_and_invalid_tables() {
        assert!(matches!(
            catalog_from_str("[1, 2]"),
            Err(ClinicError::Parse(message)) if message.contains("an array")
        ));
        assert!(matches!(
            catalog_from_str("{ not json"),
            Err(ClinicError::Parse(_))
        ));
        assert!(matches!(
            catalog_from_str(r#"{ "services": [] }"#),
            Err(ClinicError::EmptyTable(_))
        ));
    }
}

//! Bridge WASM <-> JavaScript cho dashboard, trung lập framework.

use chrono::NaiveDate;
use clinic_core::{ClinicError, CountRange, ReportConfig};
use clinic_reports::{ClinicCatalog, ReportKind};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
struct JsReportConfig {
    #[serde(default)]
    history_days: Option<u32>,
    #[serde(default)]
    forecast_days: Option<u32>,
    #[serde(default)]
    anchor_date: Option<NaiveDate>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    daily_appointments: Option<CountRange>,
    #[serde(default)]
    invoices_per_day: Option<CountRange>,
    #[serde(default)]
    feedback_per_day: Option<CountRange>,
    #[serde(default)]
    receivables_days: Option<u32>,
    #[serde(default)]
    wait_target_minutes: Option<u32>,
    #[serde(default)]
    capacity_threshold_pct: Option<f64>,
    #[serde(default)]
    catalog: Option<serde_json::Value>,
}

impl JsReportConfig {
    fn report_config(&self) -> ReportConfig {
        let mut base = ReportConfig::default();
        if let Some(days) = self.history_days {
            base.history_days = days;
        }
        if let Some(days) = self.forecast_days {
            base.forecast_days = days;
        }
        if let Some(anchor) = self.anchor_date {
            base.anchor_date = Some(anchor);
        }
        if let Some(seed) = self.seed {
            base.seed = Some(seed);
        }
        if let Some(range) = self.daily_appointments {
            base.daily_appointments = range;
        }
        if let Some(range) = self.invoices_per_day {
            base.invoices_per_day = range;
        }
        if let Some(range) = self.feedback_per_day {
            base.feedback_per_day = range;
        }
        if let Some(days) = self.receivables_days {
            base.receivables_days = days;
        }
        if let Some(minutes) = self.wait_target_minutes {
            base.wait_target_minutes = minutes;
        }
        if let Some(pct) = self.capacity_threshold_pct {
            base.capacity_threshold_pct = pct;
        }
        base
    }

    fn catalog(&self) -> Result<ClinicCatalog, ClinicError> {
        match &self.catalog {
            Some(value) => clinic_reports::catalog_from_value(value),
            None => Ok(ClinicCatalog::default()),
        }
    }
}

fn read_config(config: Option<JsValue>) -> Result<JsReportConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => from_value(js_cfg)
            .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}"))),
        _ => Ok(JsReportConfig::default()),
    }
}

/// Sinh toàn bộ dashboard.
#[wasm_bindgen]
pub fn generate_dashboard(config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let cfg = read_config(config)?;
    let catalog = cfg
        .catalog()
        .map_err(|err| JsValue::from_str(&format_clinic_error(err)))?;

    let snapshot = clinic_reports::build_dashboard(&cfg.report_config(), &catalog)
        .map_err(|err| JsValue::from_str(&format_clinic_error(err)))?;

    to_value(&snapshot)
        .map_err(|err| JsValue::from_str(&format!("Không serialize dashboard: {err}")))
}

/// Sinh một báo cáo theo tên (`volume`, `aging`, ...).
#[wasm_bindgen]
pub fn generate_report(kind: &str, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let kind = parse_kind(kind).map_err(|err| JsValue::from_str(&err))?;
    let cfg = read_config(config)?;
    let catalog = cfg
        .catalog()
        .map_err(|err| JsValue::from_str(&format_clinic_error(err)))?;

    let report = clinic_reports::build_report(kind, &cfg.report_config(), &catalog)
        .map_err(|err| JsValue::from_str(&format_clinic_error(err)))?;

    to_value(&report)
        .map_err(|err| JsValue::from_str(&format!("Không serialize báo cáo: {err}")))
}

/// Danh sách tên báo cáo hỗ trợ.
#[wasm_bindgen]
pub fn report_kinds() -> Vec<JsValue> {
    kind_names().into_iter().map(JsValue::from_str).collect()
}

fn kind_names() -> Vec<&'static str> {
    ReportKind::ALL.iter().map(ReportKind::as_str).collect()
}

fn parse_kind(kind: &str) -> Result<ReportKind, String> {
    kind.parse().map_err(format_clinic_error)
}

fn format_clinic_error(err: ClinicError) -> String {
    format!("Clinic error: {err}")
}

use std::path::Path;

use anyhow::Context;
use clinic_core::ReportConfig;
use clinic_reports::ClinicCatalog;
use serde::Deserialize;

/// Cấu hình đọc từ file TOML.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub report: ReportConfig,
    /// Bỏ trống để dùng catalog mặc định.
    pub catalog: Option<ClinicCatalog>,
}

/// Cấu hình mặc định nhúng trong binary.
const DEFAULT_CONFIG: &str = r#"
[report]
history_days = 90
forecast_days = 28
receivables_days = 180
wait_target_minutes = 15
capacity_threshold_pct = 90.0

[report.daily_appointments]
min = 20
max = 50
"#;

/// Đọc cấu hình từ `path`, hoặc dùng cấu hình nhúng khi không có file.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => {
            tracing::info!("Đọc cấu hình từ: {}", path.display());
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Không đọc được file {:?}", path))?;
            parse_settings(&contents)
                .with_context(|| format!("File cấu hình không hợp lệ: {:?}", path))?
        }
        None => {
            tracing::debug!("Dùng cấu hình mặc định nhúng sẵn");
            parse_settings(DEFAULT_CONFIG)?
        }
    };

    settings.report.validate()?;
    if let Some(catalog) = &settings.catalog {
        catalog.prepare()?;
    }
    Ok(settings)
}

fn parse_settings(contents: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.report, ReportConfig::default());
        assert!(settings.catalog.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = parse_settings(
            r#"
            [report]
            history_days = 30
            seed = 7
            anchor_date = "2025-03-31"

            [catalog]
            clinic_name = "Moseley Ultrasound"

            [[catalog.postcodes]]
            name = "B13"
            weight = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.report.history_days, 30);
        assert_eq!(settings.report.seed, Some(7));
        assert_eq!(settings.report.forecast_days, 28);
        let catalog = settings.catalog.unwrap();
        assert_eq!(catalog.clinic_name, "Moseley Ultrasound");
        assert_eq!(catalog.postcodes.len(), 1);
        assert_eq!(catalog.services, ClinicCatalog::default().services);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/clinic.toml"))).unwrap_err();
        assert!(err.to_string().contains("Không đọc được file"));
    }
}

//! Kiểu dữ liệu lõi cho pipeline sinh dữ liệu mẫu -> tổng hợp -> KPI của phòng khám siêu âm.

pub mod aggregate;
pub mod metrics;
pub mod sampling;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use aggregate::{aggregate, total_count, Bucket, Samples};
pub use sampling::{rng_for, vary, CountRange, WeightedTable};

/// Cấu hình chung cho mọi báo cáo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Số ngày lịch sử (tính cả ngày neo).
    pub history_days: u32,
    /// Số ngày dự báo công suất sau ngày neo.
    pub forecast_days: u32,
    /// Ngày kết thúc cửa sổ lịch sử. `None` nghĩa là hôm nay.
    pub anchor_date: Option<NaiveDate>,
    /// Hạt giống cho bộ sinh ngẫu nhiên. `None` dùng entropy của hệ điều hành.
    pub seed: Option<u64>,
    pub daily_appointments: CountRange,
    pub invoices_per_day: CountRange,
    pub feedback_per_day: CountRange,
    /// Số ngày sổ công nợ tính tới ngày neo. Không ngắn hơn `history_days`.
    pub receivables_days: u32,
    /// Ngưỡng (phút) coi là "được khám đúng giờ".
    pub wait_target_minutes: u32,
    /// Ngưỡng (%) coi một ngày dự báo là quá tải.
    pub capacity_threshold_pct: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            history_days: 90,
            forecast_days: 28,
            anchor_date: None,
            seed: None,
            daily_appointments: CountRange::new(20, 50),
            invoices_per_day: CountRange::new(8, 20),
            feedback_per_day: CountRange::new(3, 10),
            receivables_days: 180,
            wait_target_minutes: 15,
            capacity_threshold_pct: 90.0,
        }
    }
}

impl ReportConfig {
    /// Kiểm tra cấu hình trước khi sinh dữ liệu.
    pub fn validate(&self) -> Result<(), ClinicError> {
        if self.history_days == 0 {
            return Err(ClinicError::InvalidConfig(
                "history_days phải lớn hơn 0".to_string(),
            ));
        }
        for (name, range) in [
            ("daily_appointments", self.daily_appointments),
            ("invoices_per_day", self.invoices_per_day),
            ("feedback_per_day", self.feedback_per_day),
        ] {
            if range.min > range.max {
                return Err(ClinicError::InvalidConfig(format!(
                    "{name}: min ({}) lớn hơn max ({})",
                    range.min, range.max
                )));
            }
        }
        let end = self.anchor();
        let lookback = self.history_days.max(self.receivables_days);
        if ReportWindow::checked_ending_at(end, lookback).is_none() {
            return Err(ClinicError::InvalidConfig(format!(
                "cửa sổ {lookback} ngày trước {end} vượt phạm vi ngày"
            )));
        }
        if ReportWindow::ending_at(end, 1)
            .checked_forecast(self.forecast_days)
            .is_none()
        {
            return Err(ClinicError::InvalidConfig(format!(
                "forecast_days quá lớn: {}",
                self.forecast_days
            )));
        }
        if !self.capacity_threshold_pct.is_finite() || self.capacity_threshold_pct <= 0.0 {
            return Err(ClinicError::InvalidConfig(format!(
                "capacity_threshold_pct không hợp lệ: {}",
                self.capacity_threshold_pct
            )));
        }
        Ok(())
    }

    /// Cửa sổ lịch sử kết thúc tại ngày neo.
    pub fn window(&self) -> ReportWindow {
        ReportWindow::ending_at(self.anchor(), self.history_days)
    }

    /// Cửa sổ sổ công nợ: hóa đơn phát hành trong khoảng này, cùng ngày kết thúc với `window`.
    pub fn receivables_window(&self, window: &ReportWindow) -> ReportWindow {
        ReportWindow::ending_at(window.end, self.receivables_days.max(self.history_days))
    }

    fn anchor(&self) -> NaiveDate {
        self.anchor_date.unwrap_or_else(|| {
            let today = Utc::now().date_naive();
            debug!(%today, "không có ngày neo, dùng hôm nay");
            today
        })
    }
}

/// Khoảng ngày đóng hai đầu `[start, end]`. Rỗng khi `end < start`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Cửa sổ gồm `days` ngày, kết thúc tại `end`. Bị chặn ở `NaiveDate::MIN`.
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        Self::checked_ending_at(end, days).unwrap_or(Self {
            start: NaiveDate::MIN,
            end,
        })
    }

    /// Như `ending_at`, trả `None` khi ngày bắt đầu vượt phạm vi của chrono.
    pub fn checked_ending_at(end: NaiveDate, days: u32) -> Option<Self> {
        let start = end.checked_sub_signed(Duration::days(i64::from(days.max(1)) - 1))?;
        Some(Self { start, end })
    }

    /// Cửa sổ dự báo bắt đầu ngay sau ngày cuối. Bị chặn ở `NaiveDate::MAX`.
    pub fn forecast(&self, days: u32) -> Self {
        self.checked_forecast(days).unwrap_or(Self {
            start: self.end.succ_opt().unwrap_or(NaiveDate::MAX),
            end: NaiveDate::MAX,
        })
    }

    pub fn checked_forecast(&self, days: u32) -> Option<Self> {
        let start = self.end.checked_add_signed(Duration::days(1))?;
        let end = start.checked_add_signed(Duration::days(i64::from(days) - 1))?;
        Some(Self { start, end })
    }

    pub fn len_days(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).num_days() as u32 + 1
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Duyệt từng ngày trong cửa sổ.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Đơn vị hiển thị của thẻ KPI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KpiUnit {
    Count,
    Percent,
    Currency,
    Minutes,
    Days,
    Score,
    Ratio,
}

/// Thẻ KPI đầu trang, luôn được tính từ chính dữ liệu vừa sinh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpi {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub unit: KpiUnit,
    #[serde(default)]
    pub change_pct: Option<f64>,
}

impl Kpi {
    pub fn new(key: &str, label: &str, value: f64, unit: KpiUnit) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            value,
            unit,
            change_pct: None,
        }
    }

    pub fn with_change(mut self, change_pct: Option<f64>) -> Self {
        self.change_pct = change_pct;
        self
    }
}

/// Tìm KPI theo khóa.
pub fn find_kpi<'a>(kpis: &'a [Kpi], key: &str) -> Option<&'a Kpi> {
    kpis.iter().find(|kpi| kpi.key == key)
}

/// Lỗi chung khi sinh và tổng hợp báo cáo.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Cấu hình không hợp lệ: {0}")]
    InvalidConfig(String),
    #[error("Bảng danh mục rỗng: {0}")]
    EmptyTable(String),
    #[error("Trọng số không hợp lệ cho {label}: {weight}")]
    InvalidWeight { label: String, weight: f64 },
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Lỗi khác: {0}")]
    Other(String),
}

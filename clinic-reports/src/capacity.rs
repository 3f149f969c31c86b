//! Capacity forecast built from historical weekday demand.

use chrono::{Datelike, NaiveDate, Weekday};
use clinic_core::{aggregate, metrics, vary, Kpi, KpiUnit, ReportConfig, ReportWindow, Samples};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::appointments::Appointment;
use crate::catalog::ClinicCatalog;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekdayBaseline {
    pub weekday: String,
    /// Number of historical days observed for this weekday.
    pub days: usize,
    pub mean_bookings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemandForecast {
    pub date: NaiveDate,
    pub expected: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub weekday: String,
    pub forecast: f64,
    pub capacity: f64,
    pub utilization_pct: f64,
    pub over_capacity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityReport {
    pub kpis: Vec<Kpi>,
    pub baseline: Vec<WeekdayBaseline>,
    pub days: Vec<ForecastDay>,
}

/// Mean slot-occupying bookings per weekday. Days with no bookings count as zero.
pub fn weekday_baseline(window: &ReportWindow, appointments: &[Appointment]) -> Vec<WeekdayBaseline> {
    let occupied: Vec<&Appointment> = appointments.iter().filter(|a| a.occupies_slot()).collect();
    let daily = aggregate(&occupied, window.days(), |a| a.date, |_: &mut (), _| {});

    aggregate(
        &daily,
        0..7u32,
        |bucket| bucket.key.weekday().num_days_from_monday(),
        |counts: &mut Samples, bucket| counts.push(bucket.count as f64),
    )
    .into_iter()
    .map(|bucket| WeekdayBaseline {
        weekday: WEEKDAYS[bucket.key as usize].to_string(),
        days: bucket.count,
        mean_bookings: metrics::round_to(bucket.acc.mean(), 2),
    })
    .collect()
}

/// Project demand over the forecast window with ±15% day-level noise.
pub fn generate_forecast<R: Rng + ?Sized>(
    history: &ReportWindow,
    config: &ReportConfig,
    baseline: &[WeekdayBaseline],
    rng: &mut R,
) -> Vec<DemandForecast> {
    let window = history.forecast(config.forecast_days);
    if baseline.iter().all(|day| day.days == 0) {
        warn!("no historical days available; forecasting zero demand");
    }

    let forecast: Vec<DemandForecast> = window
        .days()
        .map(|date| {
            let index = date.weekday().num_days_from_monday() as usize;
            let mean = baseline.get(index).map_or(0.0, |day| day.mean_bookings);
            DemandForecast {
                date,
                expected: metrics::round_to(vary(rng, mean, 0.15).max(0.0), 1),
            }
        })
        .collect();

    debug!(days = forecast.len(), "generated demand forecast");
    forecast
}

pub fn build(
    baseline: Vec<WeekdayBaseline>,
    forecast: &[DemandForecast],
    config: &ReportConfig,
    catalog: &ClinicCatalog,
) -> CapacityReport {
    let capacity = metrics::round_to(
        metrics::ratio(
            f64::from(catalog.daily_capacity_minutes()),
            catalog.weighted_duration_minutes(),
        ),
        1,
    );

    let days: Vec<ForecastDay> = forecast
        .iter()
        .map(|day| {
            let utilization = metrics::rate(day.expected, capacity);
            ForecastDay {
                date: day.date,
                weekday: day.date.weekday().to_string(),
                forecast: day.expected,
                capacity,
                utilization_pct: metrics::round_to(utilization, 1),
                over_capacity: utilization > config.capacity_threshold_pct,
            }
        })
        .collect();

    let utilization: Vec<f64> = days.iter().map(|day| day.utilization_pct).collect();
    let over = days.iter().filter(|day| day.over_capacity).count();
    let total: f64 = days.iter().map(|day| day.forecast).sum();

    let mut kpis = vec![
        Kpi::new(
            "forecast_bookings",
            &format!("Forecast bookings, next {} days", days.len()),
            metrics::round_to(total, 0),
            KpiUnit::Count,
        ),
        Kpi::new(
            "avg_forecast_utilization",
            "Average forecast utilization",
            metrics::round_to(metrics::mean(&utilization), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "days_over_threshold",
            &format!("Days above {}% capacity", config.capacity_threshold_pct),
            over as f64,
            KpiUnit::Count,
        ),
    ];
    if let Some(peak) = days
        .iter()
        .max_by(|a, b| a.forecast.total_cmp(&b.forecast).then_with(|| b.date.cmp(&a.date)))
    {
        kpis.push(Kpi::new(
            "peak_forecast",
            &format!("Peak day: {}", peak.date),
            peak.forecast,
            KpiUnit::Count,
        ));
    }

    CapacityReport {
        kpis,
        baseline,
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::{fixtures::appointment, AppointmentStatus};
    use clinic_core::{find_kpi, rng_for};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn baseline_counts_empty_days_as_zero() {
        let window = ReportWindow::new(monday(), monday() + chrono::Duration::days(13));
        let records = vec![
            appointment(monday(), "Gender Scan", AppointmentStatus::Completed, 89.0),
            appointment(monday(), "Gender Scan", AppointmentStatus::NoShow, 89.0),
            appointment(monday(), "Gender Scan", AppointmentStatus::Cancelled, 89.0),
        ];
        let baseline = weekday_baseline(&window, &records);

        assert_eq!(baseline.len(), 7);
        assert_eq!(baseline[0].weekday, "Mon");
        assert_eq!(baseline[0].days, 2);
        assert_eq!(baseline[0].mean_bookings, 1.0);
        assert!(baseline[1..].iter().all(|day| day.mean_bookings == 0.0));
    }

    #[test]
    fn over_capacity_days_are_flagged() {
        let catalog = ClinicCatalog::default();
        let config = ReportConfig::default();
        let forecast = vec![
            DemandForecast {
                date: monday(),
                expected: 10.0,
            },
            DemandForecast {
                date: monday() + chrono::Duration::days(1),
                expected: 500.0,
            },
        ];
        let report = build(Vec::new(), &forecast, &config, &catalog);

        assert!(!report.days[0].over_capacity);
        assert!(report.days[1].over_capacity);
        assert_eq!(find_kpi(&report.kpis, "days_over_threshold").unwrap().value, 1.0);
        assert_eq!(find_kpi(&report.kpis, "peak_forecast").unwrap().value, 500.0);
        assert_eq!(find_kpi(&report.kpis, "forecast_bookings").unwrap().value, 510.0);
    }

    #[test]
    fn forecast_spans_configured_days() {
        let history = ReportWindow::ending_at(monday(), 28);
        let config = ReportConfig {
            forecast_days: 10,
            ..ReportConfig::default()
        };
        let baseline = weekday_baseline(&history, &[]);
        let forecast = generate_forecast(&history, &config, &baseline, &mut rng_for(Some(6)));

        assert_eq!(forecast.len(), 10);
        assert_eq!(forecast[0].date, monday() + chrono::Duration::days(1));
        assert!(forecast.iter().all(|day| day.expected == 0.0));
    }
}

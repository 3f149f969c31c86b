//! Patient volume by day, ISO week and service.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use clinic_core::{aggregate, metrics, total_count, Kpi, KpiUnit, ReportWindow};
use serde::{Deserialize, Serialize};

use crate::appointments::Appointment;
use crate::catalog::ClinicCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub appointments: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyVolume {
    pub iso_year: i32,
    pub iso_week: u32,
    pub week_start: Option<NaiveDate>,
    pub appointments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceVolume {
    pub service: String,
    pub appointments: usize,
    pub completed: usize,
    pub revenue: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeReport {
    pub kpis: Vec<Kpi>,
    pub daily: Vec<DailyVolume>,
    pub weekly: Vec<WeeklyVolume>,
    pub by_service: Vec<ServiceVolume>,
}

#[derive(Default)]
struct VolumeAcc {
    completed: usize,
    revenue: f64,
}

fn absorb(acc: &mut VolumeAcc, appointment: &Appointment) {
    if appointment.is_completed() {
        acc.completed += 1;
        acc.revenue += appointment.value;
    }
}

pub fn build(
    window: &ReportWindow,
    appointments: &[Appointment],
    catalog: &ClinicCatalog,
) -> VolumeReport {
    let daily: Vec<DailyVolume> = aggregate(appointments, window.days(), |a| a.date, absorb)
        .into_iter()
        .map(|bucket| DailyVolume {
            date: bucket.key,
            appointments: bucket.count,
            completed: bucket.acc.completed,
        })
        .collect();

    let iso_key = |date: NaiveDate| {
        let week = date.iso_week();
        (week.year(), week.week())
    };
    let weekly = aggregate(
        appointments,
        window.days().map(iso_key),
        |a| iso_key(a.date),
        |_: &mut (), _| {},
    )
    .into_iter()
    .map(|bucket| WeeklyVolume {
        iso_year: bucket.key.0,
        iso_week: bucket.key.1,
        week_start: NaiveDate::from_isoywd_opt(bucket.key.0, bucket.key.1, Weekday::Mon),
        appointments: bucket.count,
    })
    .collect();

    let service_buckets = aggregate(
        appointments,
        catalog.service_names(),
        |a| a.service.clone(),
        absorb,
    );
    let total = total_count(&service_buckets);
    let mut by_service: Vec<ServiceVolume> = service_buckets
        .into_iter()
        .map(|bucket| ServiceVolume {
            share_pct: metrics::count_rate(bucket.count, total),
            service: bucket.key,
            appointments: bucket.count,
            completed: bucket.acc.completed,
            revenue: bucket.acc.revenue,
        })
        .collect();
    by_service.sort_by(|a, b| {
        b.appointments
            .cmp(&a.appointments)
            .then_with(|| a.service.cmp(&b.service))
    });

    let kpis = summarize(window, &daily, &by_service);

    VolumeReport {
        kpis,
        daily,
        weekly,
        by_service,
    }
}

fn summarize(
    window: &ReportWindow,
    daily: &[DailyVolume],
    by_service: &[ServiceVolume],
) -> Vec<Kpi> {
    let total: usize = daily.iter().map(|day| day.appointments).sum();
    let revenue: f64 = by_service.iter().map(|service| service.revenue).sum();

    let last_week_start = window.end - Duration::days(6);
    let prior_week_start = window.end - Duration::days(13);
    let in_range = |from: NaiveDate, to: NaiveDate| -> usize {
        daily
            .iter()
            .filter(|day| day.date >= from && day.date <= to)
            .map(|day| day.appointments)
            .sum()
    };
    let last_week = in_range(last_week_start, window.end);
    let prior_week = in_range(prior_week_start, last_week_start - Duration::days(1));
    let week_change = if window.len_days() >= 14 {
        metrics::pct_change(last_week as f64, prior_week as f64)
    } else {
        None
    };

    let mut kpis = vec![
        Kpi::new(
            "total_appointments",
            "Total appointments",
            total as f64,
            KpiUnit::Count,
        ),
        Kpi::new(
            "avg_per_day",
            "Average appointments per day",
            metrics::round_to(metrics::ratio(total as f64, f64::from(window.len_days())), 1),
            KpiUnit::Count,
        ),
        Kpi::new(
            "last_7_days",
            "Appointments in the last 7 days",
            last_week as f64,
            KpiUnit::Count,
        )
        .with_change(week_change.map(|change| metrics::round_to(change, 1))),
        Kpi::new(
            "completed_revenue",
            "Revenue from completed scans",
            metrics::round_to(revenue, 2),
            KpiUnit::Currency,
        ),
    ];

    if let Some(top) = by_service.first().filter(|service| service.appointments > 0) {
        kpis.push(Kpi::new(
            "busiest_service",
            &format!("Busiest service: {}", top.service),
            top.appointments as f64,
            KpiUnit::Count,
        ));
    }

    kpis
}

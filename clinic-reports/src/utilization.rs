//! Sonographer utilization and patient segment mix.

use clinic_core::{aggregate, metrics, total_count, Kpi, KpiUnit, ReportWindow};
use serde::{Deserialize, Serialize};

use crate::appointments::Appointment;
use crate::catalog::ClinicCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SonographerUtilization {
    pub name: String,
    pub appointments: usize,
    pub booked_minutes: u64,
    pub available_minutes: u64,
    pub utilization_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentShare {
    pub segment: String,
    pub appointments: usize,
    pub revenue: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UtilizationReport {
    pub kpis: Vec<Kpi>,
    pub sonographers: Vec<SonographerUtilization>,
    pub segments: Vec<SegmentShare>,
}

pub fn build(
    window: &ReportWindow,
    appointments: &[Appointment],
    catalog: &ClinicCatalog,
) -> UtilizationReport {
    let days = u64::from(window.len_days());

    let mut sonographers: Vec<SonographerUtilization> = aggregate(
        appointments,
        catalog.sonographers.iter().map(|s| s.name.clone()),
        |a| a.sonographer.clone(),
        |booked: &mut u64, a| {
            if a.occupies_slot() {
                *booked += u64::from(a.duration_minutes);
            }
        },
    )
    .into_iter()
    .map(|bucket| {
        let daily = catalog
            .sonographers
            .iter()
            .find(|entry| entry.name == bucket.key)
            .map_or(0, |entry| u64::from(entry.daily_minutes));
        let available = daily * days;
        SonographerUtilization {
            utilization_pct: metrics::round_to(
                metrics::rate(bucket.acc as f64, available as f64),
                1,
            ),
            name: bucket.key,
            appointments: bucket.count,
            booked_minutes: bucket.acc,
            available_minutes: available,
        }
    })
    .collect();
    sonographers.sort_by(|a, b| {
        b.utilization_pct
            .total_cmp(&a.utilization_pct)
            .then_with(|| a.name.cmp(&b.name))
    });

    let segment_buckets = aggregate(
        appointments,
        catalog.segments.iter().map(|s| s.name.clone()),
        |a| a.segment.clone(),
        |revenue: &mut f64, a| {
            if a.is_completed() {
                *revenue += a.value;
            }
        },
    );
    let total = total_count(&segment_buckets);
    let mut segments: Vec<SegmentShare> = segment_buckets
        .into_iter()
        .map(|bucket| SegmentShare {
            share_pct: metrics::round_to(metrics::count_rate(bucket.count, total), 1),
            segment: bucket.key,
            appointments: bucket.count,
            revenue: bucket.acc,
        })
        .collect();
    segments.sort_by(|a, b| b.appointments.cmp(&a.appointments));

    let booked: u64 = sonographers.iter().map(|s| s.booked_minutes).sum();
    let available: u64 = sonographers.iter().map(|s| s.available_minutes).sum();
    let mut kpis = vec![
        Kpi::new(
            "avg_utilization",
            "Scanning capacity utilization",
            metrics::round_to(metrics::rate(booked as f64, available as f64), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "booked_hours",
            "Booked scanning hours",
            metrics::round_to(booked as f64 / 60.0, 1),
            KpiUnit::Count,
        ),
    ];
    if let Some(top) = sonographers.first().filter(|s| s.appointments > 0) {
        kpis.push(Kpi::new(
            "top_sonographer",
            &format!("Highest utilization: {}", top.name),
            top.utilization_pct,
            KpiUnit::Percent,
        ));
    }

    UtilizationReport {
        kpis,
        sonographers,
        segments,
    }
}

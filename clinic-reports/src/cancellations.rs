//! Cancellation and no-show analysis with lost revenue.

use clinic_core::{aggregate, metrics, Kpi, KpiUnit};
use serde::{Deserialize, Serialize};

use crate::appointments::{Appointment, AppointmentStatus, CancellationType};
use crate::catalog::ClinicCatalog;

/// Running totals folded over appointment records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CancellationStats {
    pub total_appointments: usize,
    pub cancellations: usize,
    pub no_shows: usize,
    pub lost_revenue: f64,
}

impl CancellationStats {
    pub fn absorb(&mut self, appointment: &Appointment) {
        self.total_appointments += 1;
        match appointment.status {
            AppointmentStatus::Cancelled => self.cancellations += 1,
            AppointmentStatus::NoShow => self.no_shows += 1,
            AppointmentStatus::Completed => return,
        }
        self.lost_revenue += appointment.value;
    }

    pub fn cancellation_rate(&self) -> f64 {
        metrics::count_rate(self.cancellations, self.total_appointments)
    }

    pub fn no_show_rate(&self) -> f64 {
        metrics::count_rate(self.no_shows, self.total_appointments)
    }
}

/// Fold a whole record set into one set of totals.
pub fn summarize(appointments: &[Appointment]) -> CancellationStats {
    appointments
        .iter()
        .fold(CancellationStats::default(), |mut stats, appointment| {
            stats.absorb(appointment);
            stats
        })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceCancellations {
    pub service: String,
    pub total_appointments: usize,
    pub cancellations: usize,
    pub no_shows: usize,
    pub lost_revenue: f64,
    pub cancellation_rate: f64,
    pub no_show_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationTypeShare {
    pub kind: CancellationType,
    pub count: usize,
    pub share_pct: f64,
    pub lost_revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationReport {
    pub kpis: Vec<Kpi>,
    pub by_service: Vec<ServiceCancellations>,
    pub by_type: Vec<CancellationTypeShare>,
}

pub fn build(appointments: &[Appointment], catalog: &ClinicCatalog) -> CancellationReport {
    let mut by_service: Vec<ServiceCancellations> = aggregate(
        appointments,
        catalog.service_names(),
        |a| a.service.clone(),
        |stats: &mut CancellationStats, a| stats.absorb(a),
    )
    .into_iter()
    .map(|bucket| ServiceCancellations {
        cancellation_rate: metrics::round_to(bucket.acc.cancellation_rate(), 1),
        no_show_rate: metrics::round_to(bucket.acc.no_show_rate(), 1),
        service: bucket.key,
        total_appointments: bucket.acc.total_appointments,
        cancellations: bucket.acc.cancellations,
        no_shows: bucket.acc.no_shows,
        lost_revenue: bucket.acc.lost_revenue,
    })
    .collect();
    by_service.sort_by(|a, b| {
        b.lost_revenue
            .total_cmp(&a.lost_revenue)
            .then_with(|| a.service.cmp(&b.service))
    });

    let cancelled: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Cancelled)
        .collect();
    let by_type: Vec<CancellationTypeShare> = aggregate(
        &cancelled,
        CancellationType::ALL,
        |a| a.cancellation.unwrap_or(CancellationType::Patient),
        |lost: &mut f64, a| *lost += a.value,
    )
    .into_iter()
    .map(|bucket| CancellationTypeShare {
        kind: bucket.key,
        count: bucket.count,
        share_pct: metrics::round_to(metrics::count_rate(bucket.count, cancelled.len()), 1),
        lost_revenue: bucket.acc,
    })
    .collect();

    let overall = summarize(appointments);
    let kpis = vec![
        Kpi::new(
            "lost_revenue",
            "Revenue lost to cancellations and no-shows",
            metrics::round_to(overall.lost_revenue, 2),
            KpiUnit::Currency,
        ),
        Kpi::new(
            "cancellation_rate",
            "Cancellation rate",
            metrics::round_to(overall.cancellation_rate(), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "no_show_rate",
            "No-show rate",
            metrics::round_to(overall.no_show_rate(), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "cancellations",
            "Cancellations",
            overall.cancellations as f64,
            KpiUnit::Count,
        ),
    ];

    CancellationReport {
        kpis,
        by_service,
        by_type,
    }
}

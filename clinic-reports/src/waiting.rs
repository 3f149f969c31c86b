//! In-clinic waiting times per hour slot and booking lead times per service.

use clinic_core::{aggregate, metrics, Kpi, KpiUnit, ReportConfig, Samples};
use serde::{Deserialize, Serialize};

use crate::appointments::Appointment;
use crate::catalog::ClinicCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotWait {
    pub hour: u32,
    pub seen: usize,
    pub mean_wait: f64,
    pub median_wait: f64,
    pub p90_wait: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceLeadTime {
    pub service: String,
    pub bookings: usize,
    pub mean_lead_days: f64,
    pub median_lead_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitingReport {
    pub kpis: Vec<Kpi>,
    pub by_hour: Vec<SlotWait>,
    pub lead_times: Vec<ServiceLeadTime>,
}

pub fn build(
    appointments: &[Appointment],
    config: &ReportConfig,
    catalog: &ClinicCatalog,
) -> WaitingReport {
    let waits: Vec<(u32, f64)> = appointments
        .iter()
        .filter_map(|a| a.wait_minutes.map(|wait| (a.hour, wait)))
        .collect();

    let by_hour = aggregate(
        &waits,
        catalog.opening_hour..catalog.closing_hour,
        |(hour, _)| *hour,
        |samples: &mut Samples, (_, wait)| samples.push(*wait),
    )
    .into_iter()
    .map(|bucket| SlotWait {
        hour: bucket.key,
        seen: bucket.count,
        mean_wait: metrics::round_to(bucket.acc.mean(), 1),
        median_wait: metrics::round_to(bucket.acc.median(), 1),
        p90_wait: metrics::round_to(bucket.acc.percentile(90.0), 1),
    })
    .collect();

    let mut lead_times: Vec<ServiceLeadTime> = aggregate(
        appointments,
        catalog.service_names(),
        |a| a.service.clone(),
        |samples: &mut Samples, a| samples.push(f64::from(a.lead_time_days)),
    )
    .into_iter()
    .map(|bucket| ServiceLeadTime {
        service: bucket.key,
        bookings: bucket.count,
        mean_lead_days: metrics::round_to(bucket.acc.mean(), 1),
        median_lead_days: metrics::round_to(bucket.acc.median(), 1),
    })
    .collect();
    lead_times.sort_by(|a, b| {
        b.mean_lead_days
            .total_cmp(&a.mean_lead_days)
            .then_with(|| a.service.cmp(&b.service))
    });

    let all_waits: Samples = waits.iter().map(|(_, wait)| *wait).collect();
    let target = f64::from(config.wait_target_minutes);
    let within_target = all_waits.values().iter().filter(|wait| **wait <= target).count();
    let all_leads: Samples = appointments
        .iter()
        .map(|a| f64::from(a.lead_time_days))
        .collect();

    let kpis = vec![
        Kpi::new(
            "avg_wait",
            "Average wait",
            metrics::round_to(all_waits.mean(), 1),
            KpiUnit::Minutes,
        ),
        Kpi::new(
            "p90_wait",
            "90th percentile wait",
            metrics::round_to(all_waits.percentile(90.0), 1),
            KpiUnit::Minutes,
        ),
        Kpi::new(
            "seen_within_target",
            &format!("Seen within {} minutes", config.wait_target_minutes),
            metrics::round_to(metrics::count_rate(within_target, all_waits.len()), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "avg_lead_time",
            "Average booking lead time",
            metrics::round_to(all_leads.mean(), 1),
            KpiUnit::Days,
        ),
    ];

    WaitingReport {
        kpis,
        by_hour,
        lead_times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::{fixtures::appointment, AppointmentStatus};
    use chrono::NaiveDate;
    use clinic_core::find_kpi;

    fn visit(hour: u32, wait: f64, lead: u32) -> Appointment {
        let mut a = appointment(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            "Thyroid Ultrasound",
            AppointmentStatus::Completed,
            220.0,
        );
        a.hour = hour;
        a.wait_minutes = Some(wait);
        a.lead_time_days = lead;
        a
    }

    #[test]
    fn slot_statistics() {
        let records = vec![
            visit(9, 5.0, 2),
            visit(9, 15.0, 4),
            visit(9, 40.0, 6),
            visit(14, 20.0, 10),
        ];
        let report = build(&records, &ReportConfig::default(), &ClinicCatalog::default());

        assert_eq!(report.by_hour.len(), 10);
        let nine = report.by_hour.iter().find(|slot| slot.hour == 9).unwrap();
        assert_eq!(nine.seen, 3);
        assert_eq!(nine.mean_wait, 20.0);
        assert_eq!(nine.median_wait, 15.0);
        assert_eq!(nine.p90_wait, 40.0);

        assert_eq!(find_kpi(&report.kpis, "seen_within_target").unwrap().value, 50.0);
        assert_eq!(find_kpi(&report.kpis, "avg_lead_time").unwrap().value, 5.5);
        assert_eq!(report.lead_times[0].service, "Thyroid Ultrasound");
        assert_eq!(report.lead_times[0].bookings, 4);
    }

    #[test]
    fn cancelled_visits_do_not_count_as_waits() {
        let cancelled = appointment(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            "Gender Scan",
            AppointmentStatus::Cancelled,
            89.0,
        );
        let report = build(&[cancelled], &ReportConfig::default(), &ClinicCatalog::default());
        assert!(report.by_hour.iter().all(|slot| slot.seen == 0 && slot.mean_wait == 0.0));
        assert_eq!(find_kpi(&report.kpis, "seen_within_target").unwrap().value, 0.0);
        assert_eq!(find_kpi(&report.kpis, "avg_lead_time").unwrap().value, 3.0);
    }
}

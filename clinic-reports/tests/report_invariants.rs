//! Property tests over seeded dashboards: grouping never loses records and
//! no rate escapes its range.

use chrono::NaiveDate;
use clinic_core::{CountRange, Kpi, KpiUnit, ReportConfig};
use clinic_reports::{build_dashboard, generate_datasets, ClinicCatalog, DashboardSnapshot};
use proptest::prelude::*;

fn config(seed: u64, history_days: u32) -> ReportConfig {
    ReportConfig {
        history_days,
        forecast_days: 7,
        anchor_date: NaiveDate::from_ymd_opt(2025, 2, 28),
        seed: Some(seed),
        daily_appointments: CountRange::new(0, 12),
        invoices_per_day: CountRange::new(0, 6),
        feedback_per_day: CountRange::new(0, 4),
        ..ReportConfig::default()
    }
}

fn all_kpis(dashboard: &DashboardSnapshot) -> Vec<&Kpi> {
    [
        &dashboard.volume.kpis,
        &dashboard.cancellations.kpis,
        &dashboard.waiting.kpis,
        &dashboard.utilization.kpis,
        &dashboard.geography.kpis,
        &dashboard.aging.kpis,
        &dashboard.marketing.kpis,
        &dashboard.feedback.kpis,
        &dashboard.competitors.kpis,
        &dashboard.capacity.kpis,
    ]
    .into_iter()
    .flatten()
    .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn groupings_partition_the_records(seed in any::<u64>(), days in 1u32..20) {
        let catalog = ClinicCatalog::default();
        let config = config(seed, days);
        let datasets = generate_datasets(&config, &catalog).unwrap();
        let dashboard = build_dashboard(&config, &catalog).unwrap();
        let appointments = datasets.appointments.len();

        let by_service: usize = dashboard.cancellations.by_service.iter().map(|r| r.total_appointments).sum();
        prop_assert_eq!(by_service, appointments);

        let by_segment: usize = dashboard.utilization.segments.iter().map(|s| s.appointments).sum();
        prop_assert_eq!(by_segment, appointments);

        let leads: usize = dashboard.waiting.lead_times.iter().map(|l| l.bookings).sum();
        prop_assert_eq!(leads, appointments);

        let seen: usize = dashboard.waiting.by_hour.iter().map(|slot| slot.seen).sum();
        let completed = datasets.appointments.iter().filter(|a| a.is_completed()).count();
        prop_assert_eq!(seen, completed);

        let open = datasets.invoices.iter().filter(|inv| inv.outstanding() > 0.0).count();
        let bucketed: usize = dashboard.aging.buckets.iter().map(|b| b.invoices).sum();
        prop_assert_eq!(bucketed, open);

        let responses: usize = dashboard.feedback.by_category.iter().map(|c| c.responses).sum();
        prop_assert_eq!(responses, datasets.feedback.len());
        let weekly: usize = dashboard.feedback.weekly.iter().map(|w| w.responses).sum();
        prop_assert_eq!(weekly, datasets.feedback.len());
    }

    #[test]
    fn rates_are_finite_and_bounded(seed in any::<u64>(), days in 1u32..20) {
        let dashboard = build_dashboard(&config(seed, days), &ClinicCatalog::default()).unwrap();

        for kpi in all_kpis(&dashboard) {
            prop_assert!(kpi.value.is_finite(), "{} is not finite", kpi.key);
        }
        for row in &dashboard.cancellations.by_service {
            prop_assert!((0.0..=100.0).contains(&row.cancellation_rate));
            prop_assert!((0.0..=100.0).contains(&row.no_show_rate));
        }
        for row in &dashboard.geography.districts {
            prop_assert!((0.0..=1.0).contains(&row.intensity));
        }
        for row in &dashboard.aging.by_payer {
            prop_assert!((0.0..=100.0).contains(&row.collected_pct));
        }
        for kpi in all_kpis(&dashboard).into_iter().filter(|k| k.unit == KpiUnit::Percent) {
            if kpi.key != "blended_roi" && kpi.key != "best_channel_roi" {
                prop_assert!(kpi.value >= 0.0, "{} below zero", kpi.key);
            }
        }
    }
}

#[test]
fn empty_generation_is_all_zero() {
    let config = ReportConfig {
        daily_appointments: CountRange::new(0, 0),
        invoices_per_day: CountRange::new(0, 0),
        feedback_per_day: CountRange::new(0, 0),
        ..config(3, 10)
    };
    let dashboard = build_dashboard(&config, &ClinicCatalog::default()).unwrap();

    assert!(dashboard.volume.daily.iter().all(|d| d.appointments == 0));
    assert!(dashboard
        .cancellations
        .by_service
        .iter()
        .all(|r| r.cancellation_rate == 0.0 && r.lost_revenue == 0.0));
    assert!(dashboard.aging.buckets.iter().all(|b| b.outstanding == 0.0));
    assert_eq!(dashboard.feedback.nps, 0.0);
    assert!(dashboard.capacity.days.iter().all(|d| d.forecast == 0.0));
    for kpi in all_kpis(&dashboard) {
        assert!(kpi.value.is_finite());
    }
}

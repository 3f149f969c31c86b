//! Postcode-district heatmap data.

use clinic_core::{aggregate, metrics, total_count, Kpi, KpiUnit};
use serde::{Deserialize, Serialize};

use crate::appointments::Appointment;
use crate::catalog::ClinicCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistrictActivity {
    pub district: String,
    pub appointments: usize,
    pub revenue: f64,
    pub share_pct: f64,
    /// Appointment count scaled against the busiest district, in `[0, 1]`.
    pub intensity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeographyReport {
    pub kpis: Vec<Kpi>,
    pub districts: Vec<DistrictActivity>,
}

pub fn build(appointments: &[Appointment], catalog: &ClinicCatalog) -> GeographyReport {
    let buckets = aggregate(
        appointments,
        catalog.postcodes.iter().map(|p| p.name.clone()),
        |a| a.postcode.clone(),
        |revenue: &mut f64, a| {
            if a.is_completed() {
                *revenue += a.value;
            }
        },
    );
    let total = total_count(&buckets);
    let busiest = buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0);

    let mut districts: Vec<DistrictActivity> = buckets
        .into_iter()
        .map(|bucket| DistrictActivity {
            share_pct: metrics::round_to(metrics::count_rate(bucket.count, total), 1),
            intensity: metrics::round_to(metrics::ratio(bucket.count as f64, busiest as f64), 3),
            district: bucket.key,
            appointments: bucket.count,
            revenue: bucket.acc,
        })
        .collect();
    districts.sort_by(|a, b| {
        b.appointments
            .cmp(&a.appointments)
            .then_with(|| a.district.cmp(&b.district))
    });

    let served = districts.iter().filter(|d| d.appointments > 0).count();
    let mut kpis = vec![Kpi::new(
        "districts_served",
        "Postcode districts served",
        served as f64,
        KpiUnit::Count,
    )];
    if let Some(top) = districts.first().filter(|d| d.appointments > 0) {
        kpis.push(Kpi::new(
            "top_district_share",
            &format!("Share from {}", top.district),
            top.share_pct,
            KpiUnit::Percent,
        ));
    }

    GeographyReport { kpis, districts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::{fixtures::appointment, AppointmentStatus};
    use chrono::NaiveDate;

    #[test]
    fn intensity_scales_to_busiest_district() {
        let day = NaiveDate::from_ymd_opt(2024, 9, 9).unwrap();
        let mut records: Vec<Appointment> = (0..4)
            .map(|_| appointment(day, "Gender Scan", AppointmentStatus::Completed, 89.0))
            .collect();
        records[3].postcode = "CV1".to_string();

        let report = build(&records, &ClinicCatalog::default());
        assert_eq!(report.districts.len(), 10);
        assert_eq!(report.districts[0].district, "B15");
        assert_eq!(report.districts[0].intensity, 1.0);
        assert_eq!(report.districts[0].share_pct, 75.0);
        assert_eq!(report.districts[0].revenue, 267.0);
        assert_eq!(report.districts[1].district, "CV1");
        assert_eq!(report.districts[1].intensity, 0.333);
        assert!(report.districts[2..].iter().all(|d| d.intensity == 0.0));
        assert_eq!(report.kpis[0].value, 2.0);
    }

    #[test]
    fn empty_input_has_no_nan_intensity() {
        let report = build(&[], &ClinicCatalog::default());
        assert!(report
            .districts
            .iter()
            .all(|d| d.intensity == 0.0 && d.share_pct == 0.0));
        assert_eq!(report.kpis.len(), 1);
    }
}

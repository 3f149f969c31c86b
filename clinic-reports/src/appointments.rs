//! Appointment records: the base dataset shared by volume, cancellation,
//! waiting-time, utilization, geography and capacity reports.

use chrono::NaiveDate;
use clinic_core::{metrics, ReportConfig, ReportWindow};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::PreparedCatalog;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CancellationType {
    Patient,
    Clinic,
    LateNotice,
}

impl CancellationType {
    pub const ALL: [CancellationType; 3] = [
        CancellationType::Patient,
        CancellationType::Clinic,
        CancellationType::LateNotice,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub date: NaiveDate,
    pub hour: u32,
    pub service: String,
    pub segment: String,
    pub sonographer: String,
    pub postcode: String,
    pub status: AppointmentStatus,
    pub cancellation: Option<CancellationType>,
    pub value: f64,
    pub duration_minutes: u32,
    pub lead_time_days: u32,
    /// Minutes between arrival and scan. Only set for completed visits.
    pub wait_minutes: Option<f64>,
}

impl Appointment {
    pub fn is_completed(&self) -> bool {
        self.status == AppointmentStatus::Completed
    }

    /// Cancelled and no-show appointments both forfeit their value.
    pub fn is_lost(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Completed visits and no-shows both hold a scanning slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

/// Generate a randomized appointment book covering every day of `window`.
pub fn generate_appointments<R: Rng + ?Sized>(
    window: &ReportWindow,
    config: &ReportConfig,
    prepared: &PreparedCatalog<'_>,
    rng: &mut R,
) -> Vec<Appointment> {
    let catalog = prepared.catalog;
    let mut appointments = Vec::new();

    for date in window.days() {
        let count = config.daily_appointments.sample(rng);
        for _ in 0..count {
            let service = prepared.pick_service(rng);
            let hour = rng.gen_range(catalog.opening_hour..catalog.closing_hour);
            let status = prepared.pick_status(rng);
            let cancellation = match status {
                AppointmentStatus::Cancelled => Some(prepared.pick_cancellation(rng)),
                _ => None,
            };
            let wait_minutes = match status {
                AppointmentStatus::Completed => {
                    let drift = f64::from(hour - catalog.opening_hour) * 1.5;
                    let wait = rng.gen_range(0.0..=10.0) + drift * rng.gen::<f64>();
                    Some(metrics::round_to(wait, 1))
                }
                _ => None,
            };

            appointments.push(Appointment {
                id: format!("APT-{:06}", appointments.len() + 1),
                date,
                hour,
                service: service.name.clone(),
                segment: prepared.pick_segment(rng).to_string(),
                sonographer: prepared.pick_sonographer(rng).name.clone(),
                postcode: prepared.pick_postcode(rng).to_string(),
                status,
                cancellation,
                value: service.price,
                duration_minutes: service.duration_minutes,
                lead_time_days: rng.gen_range(0..=catalog.max_lead_time_days),
                wait_minutes,
            });
        }
    }

    debug!(
        count = appointments.len(),
        days = window.len_days(),
        "generated appointments"
    );
    appointments
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClinicCatalog;
    use clinic_core::{rng_for, CountRange};

    fn config() -> ReportConfig {
        ReportConfig {
            history_days: 14,
            anchor_date: NaiveDate::from_ymd_opt(2024, 5, 31),
            daily_appointments: CountRange::new(20, 50),
            ..ReportConfig::default()
        }
    }

    #[test]
    fn daily_counts_follow_configured_range() {
        let catalog = ClinicCatalog::default();
        let prepared = catalog.prepare().unwrap();
        let config = config();
        let window = config.window();
        let appointments = generate_appointments(&window, &config, &prepared, &mut rng_for(Some(5)));

        for day in window.days() {
            let count = appointments.iter().filter(|a| a.date == day).count();
            assert!((20..=50).contains(&count), "{day}: {count}");
        }
        assert!(appointments.iter().all(|a| window.contains(a.date)));
    }

    #[test]
    fn records_are_internally_consistent() {
        let catalog = ClinicCatalog::default();
        let prepared = catalog.prepare().unwrap();
        let config = config();
        let appointments =
            generate_appointments(&config.window(), &config, &prepared, &mut rng_for(Some(8)));

        for appointment in &appointments {
            assert_eq!(
                appointment.cancellation.is_some(),
                appointment.status == AppointmentStatus::Cancelled
            );
            assert_eq!(appointment.wait_minutes.is_some(), appointment.is_completed());
            assert!(appointment.hour >= catalog.opening_hour && appointment.hour < catalog.closing_hour);
            let service = catalog.service(&appointment.service).unwrap();
            assert_eq!(appointment.value, service.price);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let catalog = ClinicCatalog::default();
        let prepared = catalog.prepare().unwrap();
        let config = config();
        let window = config.window();
        let first = generate_appointments(&window, &config, &prepared, &mut rng_for(Some(21)));
        let second = generate_appointments(&window, &config, &prepared, &mut rng_for(Some(21)));
        assert_eq!(first, second);
    }
}

//! Read-only category tables fed explicitly into every generator.

use clinic_core::{ClinicError, WeightedTable};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::appointments::{AppointmentStatus, CancellationType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceEntry {
    pub name: String,
    pub price: f64,
    pub duration_minutes: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SonographerEntry {
    pub name: String,
    /// Scanning minutes available per working day.
    pub daily_minutes: u32,
    pub weight: f64,
}

/// A named category with a sampling weight (segments, feedback topics, postcodes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedLabel {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayerEntry {
    pub name: String,
    pub weight: f64,
    /// Typical days between invoice and settlement.
    pub avg_payment_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelEntry {
    pub name: String,
    pub daily_budget: f64,
    /// Cost per thousand impressions.
    pub cpm: f64,
    pub ctr_pct: f64,
    pub lead_rate_pct: f64,
    pub booking_rate_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorEntry {
    pub name: String,
    /// Typical price relative to ours (1.0 = parity).
    pub price_factor: f64,
    pub rating: f64,
    pub wait_days: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatusWeights {
    pub completed: f64,
    pub cancelled: f64,
    pub no_show: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CancellationWeights {
    pub patient: f64,
    pub clinic: f64,
    pub late_notice: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicCatalog {
    /// Label used for our own row in competitor rankings.
    pub clinic_name: String,
    pub services: Vec<ServiceEntry>,
    pub sonographers: Vec<SonographerEntry>,
    pub segments: Vec<WeightedLabel>,
    pub postcodes: Vec<WeightedLabel>,
    pub payers: Vec<PayerEntry>,
    pub channels: Vec<ChannelEntry>,
    pub competitors: Vec<CompetitorEntry>,
    pub feedback_categories: Vec<WeightedLabel>,
    /// Weights for star ratings 1 through 5.
    pub rating_weights: Vec<f64>,
    pub status_weights: StatusWeights,
    pub cancellation_weights: CancellationWeights,
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub max_lead_time_days: u32,
}

impl Default for ClinicCatalog {
    fn default() -> Self {
        Self {
            clinic_name: "Our clinic".to_string(),
            services: vec![
                service("Early Pregnancy Scan", 99.0, 20, 0.18),
                service("Gender Scan", 89.0, 20, 0.12),
                service("Growth Scan", 119.0, 30, 0.10),
                service("4D Baby Scan", 149.0, 30, 0.10),
                service("Abdominal Ultrasound", 195.0, 30, 0.12),
                service("Pelvic Ultrasound", 210.0, 30, 0.10),
                service("Musculoskeletal Ultrasound", 245.0, 40, 0.08),
                service("Thyroid Ultrasound", 220.0, 30, 0.07),
                service("Testicular Ultrasound", 199.0, 30, 0.05),
                service("Vascular Doppler", 295.0, 45, 0.08),
            ],
            sonographers: vec![
                sonographer("Amelia Hart", 480, 0.30),
                sonographer("James Okafor", 480, 0.28),
                sonographer("Priya Nair", 420, 0.24),
                sonographer("Sofia Russo", 360, 0.18),
            ],
            segments: labels(&[
                ("Self-pay", 0.55),
                ("Private insurance", 0.30),
                ("Corporate", 0.10),
                ("NHS referral", 0.05),
            ]),
            postcodes: labels(&[
                ("B1", 0.08),
                ("B15", 0.14),
                ("B17", 0.12),
                ("B29", 0.10),
                ("B31", 0.07),
                ("B90", 0.11),
                ("CV1", 0.09),
                ("WS1", 0.08),
                ("WV1", 0.11),
                ("DY1", 0.10),
            ]),
            payers: vec![
                payer("Self-pay", 0.50, 3.0),
                payer("Bupa", 0.18, 45.0),
                payer("AXA Health", 0.14, 52.0),
                payer("Vitality", 0.10, 38.0),
                payer("Corporate account", 0.08, 60.0),
            ],
            channels: vec![
                channel("Google Ads", 180.0, 12.0, 3.2, 9.0, 35.0),
                channel("Meta Ads", 120.0, 7.0, 1.4, 6.0, 28.0),
                channel("Instagram", 60.0, 6.0, 1.1, 5.0, 25.0),
                channel("GP Referral Programme", 40.0, 30.0, 4.0, 20.0, 55.0),
                channel("Email", 15.0, 3.0, 4.5, 8.0, 30.0),
            ],
            competitors: vec![
                competitor("Ultrasound Direct", 0.92, 4.5, 3.0),
                competitor("Babybond", 1.05, 4.6, 5.0),
                competitor("Window to the Womb", 0.97, 4.7, 4.0),
                competitor("City Imaging Centre", 1.12, 4.2, 9.0),
                competitor("Midlands Scan Clinic", 0.88, 4.1, 6.0),
            ],
            feedback_categories: labels(&[
                ("Booking experience", 0.20),
                ("Sonographer care", 0.25),
                ("Waiting time", 0.20),
                ("Facilities", 0.10),
                ("Report turnaround", 0.15),
                ("Billing", 0.10),
            ]),
            rating_weights: vec![0.04, 0.06, 0.12, 0.33, 0.45],
            status_weights: StatusWeights {
                completed: 0.84,
                cancelled: 0.11,
                no_show: 0.05,
            },
            cancellation_weights: CancellationWeights {
                patient: 0.60,
                clinic: 0.15,
                late_notice: 0.25,
            },
            opening_hour: 8,
            closing_hour: 18,
            max_lead_time_days: 21,
        }
    }
}

impl ClinicCatalog {
    /// Check every table and compile the weighted samplers.
    pub fn prepare(&self) -> Result<PreparedCatalog<'_>, ClinicError> {
        if self.opening_hour >= self.closing_hour || self.closing_hour > 24 {
            return Err(ClinicError::InvalidConfig(format!(
                "opening hours {}..{} are not a valid range",
                self.opening_hour, self.closing_hour
            )));
        }
        if self.rating_weights.len() != 5 {
            return Err(ClinicError::InvalidConfig(format!(
                "rating_weights needs 5 entries, found {}",
                self.rating_weights.len()
            )));
        }
        if let Some(bad) = self.services.iter().find(|entry| {
            !(entry.price.is_finite() && entry.price > 0.0) || entry.duration_minutes == 0
        }) {
            return Err(ClinicError::InvalidConfig(format!(
                "service {} needs a positive price and duration",
                bad.name
            )));
        }
        if self.channels.is_empty() {
            return Err(ClinicError::EmptyTable("channels".to_string()));
        }
        if self.competitors.is_empty() {
            return Err(ClinicError::EmptyTable("competitors".to_string()));
        }

        let status = self.status_weights;
        let cancel = self.cancellation_weights;

        Ok(PreparedCatalog {
            catalog: self,
            services: index_table("services", self.services.iter().map(|s| s.weight))?,
            sonographers: index_table("sonographers", self.sonographers.iter().map(|s| s.weight))?,
            segments: index_table("segments", self.segments.iter().map(|s| s.weight))?,
            postcodes: index_table("postcodes", self.postcodes.iter().map(|s| s.weight))?,
            payers: index_table("payers", self.payers.iter().map(|p| p.weight))?,
            feedback_categories: index_table(
                "feedback_categories",
                self.feedback_categories.iter().map(|c| c.weight),
            )?,
            ratings: WeightedTable::new(
                "rating_weights",
                (1..=5u8).zip(self.rating_weights.iter().copied()),
            )?,
            statuses: WeightedTable::new(
                "status_weights",
                [
                    (AppointmentStatus::Completed, status.completed),
                    (AppointmentStatus::Cancelled, status.cancelled),
                    (AppointmentStatus::NoShow, status.no_show),
                ],
            )?,
            cancellations: WeightedTable::new(
                "cancellation_weights",
                [
                    (CancellationType::Patient, cancel.patient),
                    (CancellationType::Clinic, cancel.clinic),
                    (CancellationType::LateNotice, cancel.late_notice),
                ],
            )?,
        })
    }

    pub fn service(&self, name: &str) -> Option<&ServiceEntry> {
        self.services.iter().find(|entry| entry.name == name)
    }

    pub fn service_names(&self) -> impl Iterator<Item = String> + '_ {
        self.services.iter().map(|entry| entry.name.clone())
    }

    /// Daily scanning minutes across every sonographer.
    pub fn daily_capacity_minutes(&self) -> u32 {
        self.sonographers.iter().map(|entry| entry.daily_minutes).sum()
    }

    /// Service duration averaged by booking weight.
    pub fn weighted_duration_minutes(&self) -> f64 {
        weighted_mean(
            self.services
                .iter()
                .map(|entry| (f64::from(entry.duration_minutes), entry.weight)),
        )
    }

    /// Service price averaged by booking weight.
    pub fn weighted_price(&self) -> f64 {
        weighted_mean(self.services.iter().map(|entry| (entry.price, entry.weight)))
    }
}

/// Catalog plus its compiled samplers. Built once per dashboard run.
#[derive(Debug)]
pub struct PreparedCatalog<'a> {
    pub catalog: &'a ClinicCatalog,
    services: WeightedTable<usize>,
    sonographers: WeightedTable<usize>,
    segments: WeightedTable<usize>,
    postcodes: WeightedTable<usize>,
    payers: WeightedTable<usize>,
    feedback_categories: WeightedTable<usize>,
    ratings: WeightedTable<u8>,
    statuses: WeightedTable<AppointmentStatus>,
    cancellations: WeightedTable<CancellationType>,
}

impl<'a> PreparedCatalog<'a> {
    pub fn pick_service<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a ServiceEntry {
        &self.catalog.services[*self.services.sample(rng)]
    }

    pub fn pick_sonographer<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a SonographerEntry {
        &self.catalog.sonographers[*self.sonographers.sample(rng)]
    }

    pub fn pick_segment<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a str {
        &self.catalog.segments[*self.segments.sample(rng)].name
    }

    pub fn pick_postcode<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a str {
        &self.catalog.postcodes[*self.postcodes.sample(rng)].name
    }

    pub fn pick_payer<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a PayerEntry {
        &self.catalog.payers[*self.payers.sample(rng)]
    }

    pub fn pick_feedback_category<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a str {
        &self.catalog.feedback_categories[*self.feedback_categories.sample(rng)].name
    }

    pub fn pick_rating<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        *self.ratings.sample(rng)
    }

    pub fn pick_status<R: Rng + ?Sized>(&self, rng: &mut R) -> AppointmentStatus {
        *self.statuses.sample(rng)
    }

    pub fn pick_cancellation<R: Rng + ?Sized>(&self, rng: &mut R) -> CancellationType {
        *self.cancellations.sample(rng)
    }
}

fn index_table<I>(name: &str, weights: I) -> Result<WeightedTable<usize>, ClinicError>
where
    I: Iterator<Item = f64>,
{
    WeightedTable::new(name, weights.enumerate())
}

fn weighted_mean<I>(pairs: I) -> f64
where
    I: Iterator<Item = (f64, f64)>,
{
    let (sum, weight) = pairs.fold((0.0, 0.0), |(sum, total), (value, weight)| {
        (sum + value * weight, total + weight)
    });
    clinic_core::metrics::ratio(sum, weight)
}

fn service(name: &str, price: f64, duration_minutes: u32, weight: f64) -> ServiceEntry {
    ServiceEntry {
        name: name.to_string(),
        price,
        duration_minutes,
        weight,
    }
}

fn sonographer(name: &str, daily_minutes: u32, weight: f64) -> SonographerEntry {
    SonographerEntry {
        name: name.to_string(),
        daily_minutes,
        weight,
    }
}

fn payer(name: &str, weight: f64, avg_payment_days: f64) -> PayerEntry {
    PayerEntry {
        name: name.to_string(),
        weight,
        avg_payment_days,
    }
}

fn channel(
    name: &str,
    daily_budget: f64,
    cpm: f64,
    ctr_pct: f64,
    lead_rate_pct: f64,
    booking_rate_pct: f64,
) -> ChannelEntry {
    ChannelEntry {
        name: name.to_string(),
        daily_budget,
        cpm,
        ctr_pct,
        lead_rate_pct,
        booking_rate_pct,
    }
}

fn competitor(name: &str, price_factor: f64, rating: f64, wait_days: f64) -> CompetitorEntry {
    CompetitorEntry {
        name: name.to_string(),
        price_factor,
        rating,
        wait_days,
    }
}

fn labels(entries: &[(&str, f64)]) -> Vec<WeightedLabel> {
    entries
        .iter()
        .map(|(name, weight)| WeightedLabel {
            name: (*name).to_string(),
            weight: *weight,
        })
        .collect()
}

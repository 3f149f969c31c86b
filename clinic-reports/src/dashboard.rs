//! Build every report from a single seeded generation pass.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clinic_core::{metrics, rng_for, ClinicError, ReportConfig, ReportWindow};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aging::{self, AgingReport, Invoice};
use crate::appointments::{self, Appointment};
use crate::cancellations::{self, CancellationReport};
use crate::capacity::{self, CapacityReport, DemandForecast, WeekdayBaseline};
use crate::catalog::ClinicCatalog;
use crate::competitors::{self, CompetitorProfile, CompetitorReport, OwnPosition};
use crate::feedback::{self, Feedback, FeedbackReport};
use crate::geography::{self, GeographyReport};
use crate::marketing::{self, CampaignDay, MarketingReport};
use crate::utilization::{self, UtilizationReport};
use crate::volume::{self, VolumeReport};
use crate::waiting::{self, WaitingReport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Volume,
    Cancellations,
    Waiting,
    Utilization,
    Geography,
    Aging,
    Marketing,
    Feedback,
    Competitors,
    Capacity,
}

impl ReportKind {
    pub const ALL: [ReportKind; 10] = [
        ReportKind::Volume,
        ReportKind::Cancellations,
        ReportKind::Waiting,
        ReportKind::Utilization,
        ReportKind::Geography,
        ReportKind::Aging,
        ReportKind::Marketing,
        ReportKind::Feedback,
        ReportKind::Competitors,
        ReportKind::Capacity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Volume => "volume",
            ReportKind::Cancellations => "cancellations",
            ReportKind::Waiting => "waiting",
            ReportKind::Utilization => "utilization",
            ReportKind::Geography => "geography",
            ReportKind::Aging => "aging",
            ReportKind::Marketing => "marketing",
            ReportKind::Feedback => "feedback",
            ReportKind::Competitors => "competitors",
            ReportKind::Capacity => "capacity",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ClinicError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ClinicError::Parse(format!("unknown report kind: {value}")))
    }
}

/// Raw generated records for one run. Every report reads from these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Datasets {
    pub seed: u64,
    pub window: ReportWindow,
    /// Issue dates of the invoice ledger. Ends with `window`.
    pub receivables: ReportWindow,
    pub appointments: Vec<Appointment>,
    pub invoices: Vec<Invoice>,
    pub campaigns: Vec<CampaignDay>,
    pub feedback: Vec<Feedback>,
    pub competitors: Vec<CompetitorProfile>,
    pub baseline: Vec<WeekdayBaseline>,
    pub forecast: Vec<DemandForecast>,
}

/// Generate every dataset once. Without a configured seed a fresh one is drawn
/// and recorded so the run can be replayed.
pub fn generate_datasets(
    config: &ReportConfig,
    catalog: &ClinicCatalog,
) -> Result<Datasets, ClinicError> {
    config.validate()?;
    let prepared = catalog.prepare()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = rng_for(Some(seed));
    let window = config.window();
    let receivables = config.receivables_window(&window);

    let appointments = appointments::generate_appointments(&window, config, &prepared, &mut rng);
    let invoices = aging::generate_invoices(&receivables, config, &prepared, &mut rng);
    let campaigns = marketing::generate_campaigns(&window, catalog, &mut rng);
    let feedback = feedback::generate_feedback(&window, config, &prepared, &mut rng);
    let competitors = competitors::generate_competitors(catalog, &mut rng);
    let baseline = capacity::weekday_baseline(&window, &appointments);
    let forecast = capacity::generate_forecast(&window, config, &baseline, &mut rng);

    Ok(Datasets {
        seed,
        window,
        receivables,
        appointments,
        invoices,
        campaigns,
        feedback,
        competitors,
        baseline,
        forecast,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum Report {
    Volume(VolumeReport),
    Cancellations(CancellationReport),
    Waiting(WaitingReport),
    Utilization(UtilizationReport),
    Geography(GeographyReport),
    Aging(AgingReport),
    Marketing(MarketingReport),
    Feedback(FeedbackReport),
    Competitors(CompetitorReport),
    Capacity(CapacityReport),
}

impl Datasets {
    /// Build one report from the generated records.
    pub fn report(
        &self,
        kind: ReportKind,
        config: &ReportConfig,
        catalog: &ClinicCatalog,
    ) -> Report {
        match kind {
            ReportKind::Volume => {
                Report::Volume(volume::build(&self.window, &self.appointments, catalog))
            }
            ReportKind::Cancellations => {
                Report::Cancellations(cancellations::build(&self.appointments, catalog))
            }
            ReportKind::Waiting => {
                Report::Waiting(waiting::build(&self.appointments, config, catalog))
            }
            ReportKind::Utilization => Report::Utilization(utilization::build(
                &self.window,
                &self.appointments,
                catalog,
            )),
            ReportKind::Geography => {
                Report::Geography(geography::build(&self.appointments, catalog))
            }
            ReportKind::Aging => {
                Report::Aging(aging::build(&self.receivables, &self.invoices, catalog))
            }
            ReportKind::Marketing => {
                Report::Marketing(marketing::build(&self.window, &self.campaigns, catalog))
            }
            ReportKind::Feedback => {
                Report::Feedback(feedback::build(&self.window, &self.feedback, catalog))
            }
            ReportKind::Competitors => Report::Competitors(competitors::build(
                &self.competitors,
                catalog,
                self.own_position(),
            )),
            ReportKind::Capacity => Report::Capacity(capacity::build(
                self.baseline.clone(),
                &self.forecast,
                config,
                catalog,
            )),
        }
    }

    /// Our rating and lead time, derived from this run's feedback and bookings.
    pub fn own_position(&self) -> OwnPosition {
        let ratings: Vec<f64> = self.feedback.iter().map(|r| f64::from(r.rating)).collect();
        let leads: Vec<f64> = self
            .appointments
            .iter()
            .map(|a| f64::from(a.lead_time_days))
            .collect();
        OwnPosition {
            rating: metrics::mean(&ratings),
            wait_days: metrics::mean(&leads),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub window: ReportWindow,
    pub volume: VolumeReport,
    pub cancellations: CancellationReport,
    pub waiting: WaitingReport,
    pub utilization: UtilizationReport,
    pub geography: GeographyReport,
    pub aging: AgingReport,
    pub marketing: MarketingReport,
    pub feedback: FeedbackReport,
    pub competitors: CompetitorReport,
    pub capacity: CapacityReport,
}

impl DashboardSnapshot {
    pub fn from_datasets(
        datasets: &Datasets,
        config: &ReportConfig,
        catalog: &ClinicCatalog,
    ) -> Self {
        let window = datasets.window;
        Self {
            generated_at: Utc::now(),
            seed: datasets.seed,
            window,
            volume: volume::build(&window, &datasets.appointments, catalog),
            cancellations: cancellations::build(&datasets.appointments, catalog),
            waiting: waiting::build(&datasets.appointments, config, catalog),
            utilization: utilization::build(&window, &datasets.appointments, catalog),
            geography: geography::build(&datasets.appointments, catalog),
            aging: aging::build(&datasets.receivables, &datasets.invoices, catalog),
            marketing: marketing::build(&window, &datasets.campaigns, catalog),
            feedback: feedback::build(&window, &datasets.feedback, catalog),
            competitors: competitors::build(
                &datasets.competitors,
                catalog,
                datasets.own_position(),
            ),
            capacity: capacity::build(
                datasets.baseline.clone(),
                &datasets.forecast,
                config,
                catalog,
            ),
        }
    }
}

/// Generate the datasets and build every report.
pub fn build_dashboard(
    config: &ReportConfig,
    catalog: &ClinicCatalog,
) -> Result<DashboardSnapshot, ClinicError> {
    let datasets = generate_datasets(config, catalog)?;
    let snapshot = DashboardSnapshot::from_datasets(&datasets, config, catalog);
    info!(
        seed = snapshot.seed,
        start = %snapshot.window.start,
        end = %snapshot.window.end,
        appointments = datasets.appointments.len(),
        "built dashboard"
    );
    Ok(snapshot)
}

/// Generate the datasets and build a single report.
pub fn build_report(
    kind: ReportKind,
    config: &ReportConfig,
    catalog: &ClinicCatalog,
) -> Result<Report, ClinicError> {
    let datasets = generate_datasets(config, catalog)?;
    info!(seed = datasets.seed, report = %kind, "built report");
    Ok(datasets.report(kind, config, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_kind_parses_names() {
        assert_eq!("aging".parse::<ReportKind>().unwrap(), ReportKind::Aging);
        assert_eq!(" Capacity ".parse::<ReportKind>().unwrap(), ReportKind::Capacity);
        assert!("heatmap".parse::<ReportKind>().is_err());
        for kind in ReportKind::ALL {
            assert_eq!(kind.to_string().parse::<ReportKind>().unwrap(), kind);
        }
    }

    #[test]
    fn invalid_config_is_rejected_before_generation() {
        let config = ReportConfig {
            history_days: 0,
            ..ReportConfig::default()
        };
        assert!(matches!(
            build_dashboard(&config, &ClinicCatalog::default()),
            Err(ClinicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_seed_is_recorded() {
        let config = ReportConfig {
            history_days: 3,
            forecast_days: 2,
            ..ReportConfig::default()
        };
        let catalog = ClinicCatalog::default();
        let first = generate_datasets(&config, &catalog).unwrap();

        let replay = ReportConfig {
            seed: Some(first.seed),
            anchor_date: Some(first.window.end),
            ..config
        };
        let second = generate_datasets(&replay, &catalog).unwrap();
        assert_eq!(first, second);
    }
}

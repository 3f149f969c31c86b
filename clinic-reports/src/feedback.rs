//! Patient feedback, complaints and Net Promoter Score.

use chrono::{Datelike, Duration, NaiveDate};
use clinic_core::{aggregate, metrics, Kpi, KpiUnit, ReportConfig, ReportWindow, Samples};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{ClinicCatalog, PreparedCatalog};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Open,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Complaint {
    pub status: ComplaintStatus,
    /// Days taken to resolve. Only set once resolved.
    pub resolution_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: String,
    pub date: NaiveDate,
    pub category: String,
    pub rating: u8,
    pub nps: u8,
    pub complaint: Option<Complaint>,
}

pub fn generate_feedback<R: Rng + ?Sized>(
    window: &ReportWindow,
    config: &ReportConfig,
    prepared: &PreparedCatalog<'_>,
    rng: &mut R,
) -> Vec<Feedback> {
    let mut records = Vec::new();

    for date in window.days() {
        let age_days = (window.end - date).num_days();
        for _ in 0..config.feedback_per_day.sample(rng) {
            let rating = prepared.pick_rating(rng);
            let nps = (i32::from(rating) * 2 - rng.gen_range(0..=1)).clamp(0, 10) as u8;
            let complaint =
                (rating <= 2 || rng.gen_bool(0.03)).then(|| draw_complaint(age_days, rng));

            records.push(Feedback {
                id: format!("FB-{:06}", records.len() + 1),
                date,
                category: prepared.pick_feedback_category(rng).to_string(),
                rating,
                nps,
                complaint,
            });
        }
    }

    debug!(count = records.len(), "generated feedback");
    records
}

fn draw_complaint<R: Rng + ?Sized>(age_days: i64, rng: &mut R) -> Complaint {
    let resolve_chance = (age_days as f64 / 14.0).min(0.95);
    if rng.gen_bool(resolve_chance) {
        let longest = age_days.clamp(1, 21) as u32;
        Complaint {
            status: ComplaintStatus::Resolved,
            resolution_days: Some(rng.gen_range(1..=longest)),
        }
    } else {
        Complaint {
            status: if rng.gen_bool(0.1) {
                ComplaintStatus::Escalated
            } else {
                ComplaintStatus::Open
            },
            resolution_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryFeedback {
    pub category: String,
    pub responses: usize,
    pub mean_rating: f64,
    pub complaints: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyRating {
    pub week_start: NaiveDate,
    pub responses: usize,
    pub mean_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackReport {
    pub kpis: Vec<Kpi>,
    pub by_category: Vec<CategoryFeedback>,
    pub weekly: Vec<WeeklyRating>,
    pub nps: f64,
}

#[derive(Default)]
struct CategoryAcc {
    ratings: Samples,
    complaints: usize,
    resolved: usize,
}

/// Percentage of promoters (9-10) minus percentage of detractors (0-6).
pub fn net_promoter_score(records: &[Feedback]) -> f64 {
    let promoters = records.iter().filter(|r| r.nps >= 9).count();
    let detractors = records.iter().filter(|r| r.nps <= 6).count();
    metrics::count_rate(promoters, records.len()) - metrics::count_rate(detractors, records.len())
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn build(window: &ReportWindow, records: &[Feedback], catalog: &ClinicCatalog) -> FeedbackReport {
    let mut by_category: Vec<CategoryFeedback> = aggregate(
        records,
        catalog.feedback_categories.iter().map(|c| c.name.clone()),
        |r| r.category.clone(),
        |acc: &mut CategoryAcc, r| {
            acc.ratings.push(f64::from(r.rating));
            if let Some(complaint) = &r.complaint {
                acc.complaints += 1;
                if complaint.status == ComplaintStatus::Resolved {
                    acc.resolved += 1;
                }
            }
        },
    )
    .into_iter()
    .map(|bucket| CategoryFeedback {
        category: bucket.key,
        responses: bucket.count,
        mean_rating: metrics::round_to(bucket.acc.ratings.mean(), 2),
        complaints: bucket.acc.complaints,
        resolved: bucket.acc.resolved,
    })
    .collect();
    by_category.sort_by(|a, b| {
        b.complaints
            .cmp(&a.complaints)
            .then_with(|| a.category.cmp(&b.category))
    });

    let weekly = aggregate(
        records,
        window.days().map(week_start),
        |r| week_start(r.date),
        |ratings: &mut Samples, r| ratings.push(f64::from(r.rating)),
    )
    .into_iter()
    .map(|bucket| WeeklyRating {
        week_start: bucket.key,
        responses: bucket.count,
        mean_rating: metrics::round_to(bucket.acc.mean(), 2),
    })
    .collect();

    let complaints: Vec<&Complaint> = records.iter().filter_map(|r| r.complaint.as_ref()).collect();
    let resolved: Samples = complaints
        .iter()
        .filter_map(|c| c.resolution_days.map(f64::from))
        .collect();
    let ratings: Samples = records.iter().map(|r| f64::from(r.rating)).collect();
    let nps = metrics::round_to(net_promoter_score(records), 1);

    let kpis = vec![
        Kpi::new(
            "avg_rating",
            "Average rating",
            metrics::round_to(ratings.mean(), 2),
            KpiUnit::Score,
        ),
        Kpi::new("nps", "Net Promoter Score", nps, KpiUnit::Score),
        Kpi::new(
            "complaints",
            "Complaints received",
            complaints.len() as f64,
            KpiUnit::Count,
        ),
        Kpi::new(
            "complaint_resolution_rate",
            "Complaints resolved",
            metrics::round_to(metrics::count_rate(resolved.len(), complaints.len()), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "avg_resolution_days",
            "Average days to resolve",
            metrics::round_to(resolved.mean(), 1),
            KpiUnit::Days,
        ),
    ];

    FeedbackReport {
        kpis,
        by_category,
        weekly,
        nps,
    }
}

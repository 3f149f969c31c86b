//! Marketing channel performance.

use chrono::NaiveDate;
use clinic_core::{aggregate, metrics, vary, Kpi, KpiUnit, ReportWindow};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{ChannelEntry, ClinicCatalog};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignDay {
    pub date: NaiveDate,
    pub channel: String,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub leads: u64,
    pub bookings: u64,
    pub revenue: f64,
}

/// One row per channel per day.
pub fn generate_campaigns<R: Rng + ?Sized>(
    window: &ReportWindow,
    catalog: &ClinicCatalog,
    rng: &mut R,
) -> Vec<CampaignDay> {
    let booking_value = catalog.weighted_price();
    let mut rows = Vec::new();

    for date in window.days() {
        for channel in &catalog.channels {
            rows.push(campaign_day(date, channel, booking_value, rng));
        }
    }

    debug!(count = rows.len(), "generated campaign days");
    rows
}

fn campaign_day<R: Rng + ?Sized>(
    date: NaiveDate,
    channel: &ChannelEntry,
    booking_value: f64,
    rng: &mut R,
) -> CampaignDay {
    let spend = metrics::round_to(vary(rng, channel.daily_budget, 0.3).max(0.0), 2);
    let impressions = (metrics::ratio(spend, channel.cpm) * 1000.0).round() as u64;
    let clicks = scale(impressions, vary(rng, channel.ctr_pct, 0.2));
    let leads = scale(clicks, vary(rng, channel.lead_rate_pct, 0.25));
    let bookings = scale(leads, vary(rng, channel.booking_rate_pct, 0.25));
    let revenue = metrics::round_to(bookings as f64 * vary(rng, booking_value, 0.1), 2);

    CampaignDay {
        date,
        channel: channel.name.clone(),
        spend,
        impressions,
        clicks,
        leads,
        bookings,
        revenue,
    }
}

fn scale(base: u64, pct: f64) -> u64 {
    (base as f64 * pct.max(0.0) / 100.0).round() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelPerformance {
    pub channel: String,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub leads: u64,
    pub bookings: u64,
    pub revenue: f64,
    pub ctr_pct: f64,
    pub lead_conversion_pct: f64,
    pub cost_per_acquisition: f64,
    pub roi_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMarketing {
    pub date: NaiveDate,
    pub spend: f64,
    pub bookings: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketingReport {
    pub kpis: Vec<Kpi>,
    pub channels: Vec<ChannelPerformance>,
    pub daily: Vec<DailyMarketing>,
    /// Pearson correlation between daily spend and daily bookings.
    pub spend_bookings_correlation: Option<f64>,
}

#[derive(Debug, Default, Clone)]
struct Funnel {
    spend: f64,
    impressions: u64,
    clicks: u64,
    leads: u64,
    bookings: u64,
    revenue: f64,
}

impl Funnel {
    fn absorb(&mut self, row: &CampaignDay) {
        self.spend += row.spend;
        self.impressions += row.impressions;
        self.clicks += row.clicks;
        self.leads += row.leads;
        self.bookings += row.bookings;
        self.revenue += row.revenue;
    }

    fn roi_pct(&self) -> f64 {
        metrics::rate(self.revenue - self.spend, self.spend)
    }

    fn cost_per_acquisition(&self) -> f64 {
        metrics::ratio(self.spend, self.bookings as f64)
    }
}

pub fn build(window: &ReportWindow, rows: &[CampaignDay], catalog: &ClinicCatalog) -> MarketingReport {
    let channel_buckets = aggregate(
        rows,
        catalog.channels.iter().map(|c| c.name.clone()),
        |row| row.channel.clone(),
        Funnel::absorb,
    );
    let overall = channel_buckets.iter().fold(Funnel::default(), |mut acc, bucket| {
        acc.spend += bucket.acc.spend;
        acc.impressions += bucket.acc.impressions;
        acc.clicks += bucket.acc.clicks;
        acc.leads += bucket.acc.leads;
        acc.bookings += bucket.acc.bookings;
        acc.revenue += bucket.acc.revenue;
        acc
    });

    let mut channels: Vec<ChannelPerformance> = channel_buckets
        .into_iter()
        .map(|bucket| {
            let funnel = bucket.acc;
            ChannelPerformance {
                channel: bucket.key,
                spend: metrics::round_to(funnel.spend, 2),
                impressions: funnel.impressions,
                clicks: funnel.clicks,
                leads: funnel.leads,
                bookings: funnel.bookings,
                revenue: metrics::round_to(funnel.revenue, 2),
                ctr_pct: metrics::round_to(
                    metrics::rate(funnel.clicks as f64, funnel.impressions as f64),
                    2,
                ),
                lead_conversion_pct: metrics::round_to(
                    metrics::rate(funnel.leads as f64, funnel.clicks as f64),
                    1,
                ),
                cost_per_acquisition: metrics::round_to(funnel.cost_per_acquisition(), 2),
                roi_pct: metrics::round_to(funnel.roi_pct(), 1),
            }
        })
        .collect();
    channels.sort_by(|a, b| {
        b.roi_pct
            .total_cmp(&a.roi_pct)
            .then_with(|| a.channel.cmp(&b.channel))
    });

    let daily: Vec<DailyMarketing> = aggregate(rows, window.days(), |row| row.date, Funnel::absorb)
        .into_iter()
        .map(|bucket| DailyMarketing {
            date: bucket.key,
            spend: metrics::round_to(bucket.acc.spend, 2),
            bookings: bucket.acc.bookings,
        })
        .collect();

    let spend_series: Vec<f64> = daily.iter().map(|day| day.spend).collect();
    let booking_series: Vec<f64> = daily.iter().map(|day| day.bookings as f64).collect();
    let spend_bookings_correlation =
        metrics::pearson(&spend_series, &booking_series).map(|r| metrics::round_to(r, 3));

    let mut kpis = vec![
        Kpi::new(
            "total_spend",
            "Marketing spend",
            metrics::round_to(overall.spend, 2),
            KpiUnit::Currency,
        ),
        Kpi::new(
            "marketing_bookings",
            "Bookings from marketing",
            overall.bookings as f64,
            KpiUnit::Count,
        ),
        Kpi::new(
            "blended_roi",
            "Blended return on spend",
            metrics::round_to(overall.roi_pct(), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "cost_per_acquisition",
            "Cost per booking",
            metrics::round_to(overall.cost_per_acquisition(), 2),
            KpiUnit::Currency,
        ),
    ];
    if let Some(best) = channels.first().filter(|c| c.spend > 0.0) {
        kpis.push(Kpi::new(
            "best_channel_roi",
            &format!("Best channel: {}", best.channel),
            best.roi_pct,
            KpiUnit::Percent,
        ));
    }

    MarketingReport {
        kpis,
        channels,
        daily,
        spend_bookings_correlation,
    }
}

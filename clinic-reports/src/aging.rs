//! Accounts-receivable aging.

use chrono::NaiveDate;
use clinic_core::{aggregate, metrics, Kpi, KpiUnit, ReportConfig, ReportWindow};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{ClinicCatalog, PreparedCatalog};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgingBucket {
    #[serde(rename = "0-30")]
    Current,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "90+")]
    Over90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 4] = [
        AgingBucket::Current,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Over90,
    ];

    pub fn classify(days_outstanding: i64) -> Self {
        match days_outstanding {
            i64::MIN..=30 => AgingBucket::Current,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "0-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Over90 => "90+",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub issued_on: NaiveDate,
    pub payer: String,
    pub service: String,
    pub amount: f64,
    pub paid: f64,
}

impl Invoice {
    pub fn outstanding(&self) -> f64 {
        (self.amount - self.paid).max(0.0)
    }

    pub fn days_outstanding(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.issued_on).num_days()
    }
}

/// Issue invoices across the receivables ledger, which usually reaches further
/// back than the appointment history.
pub fn generate_invoices<R: Rng + ?Sized>(
    ledger: &ReportWindow,
    config: &ReportConfig,
    prepared: &PreparedCatalog<'_>,
    rng: &mut R,
) -> Vec<Invoice> {
    let mut invoices = Vec::new();

    for date in ledger.days() {
        let age = (ledger.end - date).num_days() as f64;
        for _ in 0..config.invoices_per_day.sample(rng) {
            let payer = prepared.pick_payer(rng);
            let service = prepared.pick_service(rng);
            let settle_chance = (age / payer.avg_payment_days.max(1.0)).min(1.0) * 0.95;

            let paid = if rng.gen_bool(settle_chance) {
                service.price
            } else if rng.gen_bool(0.2) {
                metrics::round_to(service.price * rng.gen_range(0.2..0.8), 2)
            } else {
                0.0
            };

            invoices.push(Invoice {
                id: format!("INV-{:06}", invoices.len() + 1),
                issued_on: date,
                payer: payer.name.clone(),
                service: service.name.clone(),
                amount: service.price,
                paid,
            });
        }
    }

    debug!(count = invoices.len(), "generated invoices");
    invoices
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgingRow {
    pub bucket: AgingBucket,
    pub invoices: usize,
    pub outstanding: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayerAging {
    pub payer: String,
    pub invoices: usize,
    pub billed: f64,
    pub outstanding: f64,
    pub collected_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgingReport {
    pub kpis: Vec<Kpi>,
    pub buckets: Vec<AgingRow>,
    pub by_payer: Vec<PayerAging>,
}

#[derive(Default)]
struct PayerAcc {
    billed: f64,
    outstanding: f64,
}

pub fn build(ledger: &ReportWindow, invoices: &[Invoice], catalog: &ClinicCatalog) -> AgingReport {
    let open: Vec<&Invoice> = invoices.iter().filter(|inv| inv.outstanding() > 0.0).collect();
    let total_outstanding: f64 = open.iter().map(|inv| inv.outstanding()).sum();

    let buckets: Vec<AgingRow> = aggregate(
        &open,
        AgingBucket::ALL,
        |inv| AgingBucket::classify(inv.days_outstanding(ledger.end)),
        |sum: &mut f64, inv| *sum += inv.outstanding(),
    )
    .into_iter()
    .map(|bucket| AgingRow {
        bucket: bucket.key,
        invoices: bucket.count,
        outstanding: metrics::round_to(bucket.acc, 2),
        share_pct: metrics::round_to(metrics::rate(bucket.acc, total_outstanding), 1),
    })
    .collect();

    let mut by_payer: Vec<PayerAging> = aggregate(
        invoices,
        catalog.payers.iter().map(|p| p.name.clone()),
        |inv| inv.payer.clone(),
        |acc: &mut PayerAcc, inv| {
            acc.billed += inv.amount;
            acc.outstanding += inv.outstanding();
        },
    )
    .into_iter()
    .map(|bucket| PayerAging {
        payer: bucket.key,
        invoices: bucket.count,
        billed: metrics::round_to(bucket.acc.billed, 2),
        outstanding: metrics::round_to(bucket.acc.outstanding, 2),
        collected_pct: metrics::round_to(
            metrics::rate(
                bucket.acc.billed - bucket.acc.outstanding,
                bucket.acc.billed,
            ),
            1,
        ),
    })
    .collect();
    by_payer.sort_by(|a, b| {
        b.outstanding
            .total_cmp(&a.outstanding)
            .then_with(|| a.payer.cmp(&b.payer))
    });

    let billed: f64 = invoices.iter().map(|inv| inv.amount).sum();
    let over_90 = buckets
        .iter()
        .find(|row| row.bucket == AgingBucket::Over90)
        .map_or(0.0, |row| row.outstanding);
    let dso = metrics::ratio(total_outstanding, billed) * f64::from(ledger.len_days());

    let kpis = vec![
        Kpi::new(
            "total_outstanding",
            "Outstanding receivables",
            metrics::round_to(total_outstanding, 2),
            KpiUnit::Currency,
        ),
        Kpi::new(
            "over_90_pct",
            "Receivables older than 90 days",
            metrics::round_to(metrics::rate(over_90, total_outstanding), 1),
            KpiUnit::Percent,
        ),
        Kpi::new(
            "days_sales_outstanding",
            "Days sales outstanding",
            metrics::round_to(dso, 1),
            KpiUnit::Days,
        ),
        Kpi::new(
            "collection_rate",
            "Collection rate",
            metrics::round_to(metrics::rate(billed - total_outstanding, billed), 1),
            KpiUnit::Percent,
        ),
    ];

    AgingReport {
        kpis,
        buckets,
        by_payer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::find_kpi;

    fn invoice(issued_on: NaiveDate, payer: &str, amount: f64, paid: f64) -> Invoice {
        Invoice {
            id: format!("INV-{issued_on}"),
            issued_on,
            payer: payer.to_string(),
            service: "Growth Scan".to_string(),
            amount,
            paid,
        }
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(AgingBucket::classify(0), AgingBucket::Current);
        assert_eq!(AgingBucket::classify(30), AgingBucket::Current);
        assert_eq!(AgingBucket::classify(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::classify(60), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::classify(61), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::classify(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::classify(91), AgingBucket::Over90);
        assert_eq!(AgingBucket::Over90.label(), "90+");
    }

    #[test]
    fn outstanding_balances_are_bucketed() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let window = ReportWindow::ending_at(end, 120);
        let invoices = vec![
            invoice(end, "Bupa", 100.0, 0.0),
            invoice(end - chrono::Duration::days(45), "Bupa", 200.0, 50.0),
            invoice(end - chrono::Duration::days(100), "AXA Health", 250.0, 0.0),
            invoice(end - chrono::Duration::days(100), "Self-pay", 99.0, 99.0),
        ];
        let report = build(&window, &invoices, &ClinicCatalog::default());

        let outstanding: Vec<f64> = report.buckets.iter().map(|row| row.outstanding).collect();
        assert_eq!(outstanding, vec![100.0, 150.0, 0.0, 250.0]);
        assert_eq!(report.buckets[3].invoices, 1);
        assert_eq!(report.buckets[3].share_pct, 50.0);

        assert_eq!(find_kpi(&report.kpis, "total_outstanding").unwrap().value, 500.0);
        assert_eq!(find_kpi(&report.kpis, "over_90_pct").unwrap().value, 50.0);
        assert_eq!(report.by_payer[0].payer, "AXA Health");
        let self_pay = report.by_payer.iter().find(|p| p.payer == "Self-pay").unwrap();
        assert_eq!(self_pay.collected_pct, 100.0);
    }

    #[test]
    fn default_ledger_fills_every_bucket() {
        let config = ReportConfig {
            anchor_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..ReportConfig::default()
        };
        let catalog = ClinicCatalog::default();
        let prepared = catalog.prepare().unwrap();
        let ledger = config.receivables_window(&config.window());

        for seed in 0..5 {
            let mut rng = clinic_core::rng_for(Some(seed));
            let invoices = generate_invoices(&ledger, &config, &prepared, &mut rng);
            assert!(invoices.iter().all(|inv| ledger.contains(inv.issued_on)));

            let report = build(&ledger, &invoices, &catalog);
            let over_90 = &report.buckets[3];
            assert_eq!(over_90.bucket, AgingBucket::Over90);
            assert!(over_90.invoices > 0, "seed {seed}: 90+ bucket is empty");
            assert!(find_kpi(&report.kpis, "over_90_pct").unwrap().value > 0.0);
        }
    }

    #[test]
    fn no_invoices_no_nan() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let report = build(&ReportWindow::ending_at(end, 30), &[], &ClinicCatalog::default());
        assert_eq!(report.buckets.len(), 4);
        assert!(report.kpis.iter().all(|kpi| kpi.value == 0.0));
        assert!(report.by_payer.iter().all(|p| p.collected_pct == 0.0));
    }
}

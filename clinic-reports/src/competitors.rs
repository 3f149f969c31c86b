//! Competitor benchmarking: price index, rating and wait against our own figures.

use clinic_core::{aggregate, metrics, vary, Kpi, KpiUnit, Samples};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::ClinicCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceObservation {
    pub competitor: String,
    pub service: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorProfile {
    pub name: String,
    pub rating: f64,
    pub wait_days: f64,
    pub prices: Vec<PriceObservation>,
}

/// One mystery-shopper observation per competitor and service.
pub fn generate_competitors<R: Rng + ?Sized>(
    catalog: &ClinicCatalog,
    rng: &mut R,
) -> Vec<CompetitorProfile> {
    let mut profiles = Vec::with_capacity(catalog.competitors.len());

    for competitor in &catalog.competitors {
        let rating = metrics::round_to(vary(rng, competitor.rating, 0.03).clamp(1.0, 5.0), 2);
        let wait_days = metrics::round_to(vary(rng, competitor.wait_days, 0.25).max(0.0), 1);
        let mut prices = Vec::with_capacity(catalog.services.len());
        for service in &catalog.services {
            let price = vary(rng, service.price * competitor.price_factor, 0.08);
            prices.push(PriceObservation {
                competitor: competitor.name.clone(),
                service: service.name.clone(),
                price: metrics::round_to(price, 2),
            });
        }
        profiles.push(CompetitorProfile {
            name: competitor.name.clone(),
            rating,
            wait_days,
            prices,
        });
    }

    debug!(count = profiles.len(), "generated competitor profiles");
    profiles
}

/// Our own figures, taken from the generated feedback and appointment data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OwnPosition {
    pub rating: f64,
    pub wait_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorBenchmark {
    pub name: String,
    /// Mean price relative to ours; 100 is parity.
    pub price_index: f64,
    pub rating: f64,
    pub wait_days: f64,
    pub rank: usize,
    pub is_us: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePricing {
    pub service: String,
    pub our_price: f64,
    pub market_mean: f64,
    pub market_min: f64,
    pub market_max: f64,
    /// Our price relative to the market mean; 100 is parity.
    pub price_index: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorReport {
    pub kpis: Vec<Kpi>,
    pub ranking: Vec<CompetitorBenchmark>,
    pub services: Vec<ServicePricing>,
}

pub fn build(
    profiles: &[CompetitorProfile],
    catalog: &ClinicCatalog,
    ours: OwnPosition,
) -> CompetitorReport {
    let our_price = |service: &str| catalog.service(service).map_or(0.0, |entry| entry.price);

    let mut ranking: Vec<CompetitorBenchmark> = profiles
        .iter()
        .map(|profile| {
            let indices: Samples = profile
                .prices
                .iter()
                .map(|obs| metrics::rate(obs.price, our_price(&obs.service)))
                .collect();
            CompetitorBenchmark {
                name: profile.name.clone(),
                price_index: metrics::round_to(indices.mean(), 1),
                rating: profile.rating,
                wait_days: profile.wait_days,
                rank: 0,
                is_us: false,
            }
        })
        .collect();
    let market_rating = metrics::mean(&ranking.iter().map(|row| row.rating).collect::<Vec<_>>());
    let market_wait = metrics::mean(&ranking.iter().map(|row| row.wait_days).collect::<Vec<_>>());

    ranking.push(CompetitorBenchmark {
        name: catalog.clinic_name.clone(),
        price_index: 100.0,
        rating: metrics::round_to(ours.rating, 2),
        wait_days: metrics::round_to(ours.wait_days, 1),
        rank: 0,
        is_us: true,
    });
    ranking.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then_with(|| a.wait_days.total_cmp(&b.wait_days))
            .then_with(|| a.name.cmp(&b.name))
    });
    for (index, row) in ranking.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    let observations: Vec<&PriceObservation> =
        profiles.iter().flat_map(|profile| &profile.prices).collect();
    let services = aggregate(
        &observations,
        catalog.service_names(),
        |obs| obs.service.clone(),
        |prices: &mut Samples, obs| prices.push(obs.price),
    )
    .into_iter()
    .map(|bucket| {
        let prices = bucket.acc.values();
        let market_mean = bucket.acc.mean();
        let our = our_price(&bucket.key);
        ServicePricing {
            our_price: our,
            market_mean: metrics::round_to(market_mean, 2),
            market_min: prices.iter().copied().reduce(f64::min).unwrap_or(0.0),
            market_max: prices.iter().copied().reduce(f64::max).unwrap_or(0.0),
            price_index: metrics::round_to(metrics::rate(our, market_mean), 1),
            service: bucket.key,
        }
    })
    .collect::<Vec<ServicePricing>>();
    let our_index = metrics::mean(
        &services
            .iter()
            .filter(|row| row.market_mean > 0.0)
            .map(|row| row.price_index)
            .collect::<Vec<_>>(),
    );

    let our_rank = ranking
        .iter()
        .find(|row| row.is_us)
        .map_or(0, |row| row.rank);

    let kpis = vec![
        Kpi::new(
            "our_rank",
            &format!("Rank among {} clinics", ranking.len()),
            our_rank as f64,
            KpiUnit::Count,
        ),
        Kpi::new(
            "our_rating",
            "Our average rating",
            metrics::round_to(ours.rating, 2),
            KpiUnit::Score,
        ),
        Kpi::new(
            "rating_gap",
            "Rating versus competitor average",
            metrics::round_to(ours.rating - market_rating, 2),
            KpiUnit::Score,
        ),
        Kpi::new(
            "our_price_index",
            "Our prices relative to the market (100 = parity)",
            metrics::round_to(our_index, 1),
            KpiUnit::Ratio,
        ),
        Kpi::new(
            "wait_gap_days",
            "Lead time versus competitor average",
            metrics::round_to(ours.wait_days - market_wait, 1),
            KpiUnit::Days,
        ),
    ];

    CompetitorReport {
        kpis,
        ranking,
        services,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{find_kpi, rng_for};

    fn profile(name: &str, rating: f64, wait_days: f64, factor: f64) -> CompetitorProfile {
        let catalog = ClinicCatalog::default();
        CompetitorProfile {
            name: name.to_string(),
            rating,
            wait_days,
            prices: catalog
                .services
                .iter()
                .map(|service| PriceObservation {
                    competitor: name.to_string(),
                    service: service.name.clone(),
                    price: service.price * factor,
                })
                .collect(),
        }
    }

    #[test]
    fn ranking_and_price_index() {
        let profiles = vec![
            profile("Cheaper", 4.8, 2.0, 0.9),
            profile("Dearer", 4.0, 8.0, 1.1),
        ];
        let ours = OwnPosition {
            rating: 4.5,
            wait_days: 5.0,
        };
        let report = build(&profiles, &ClinicCatalog::default(), ours);

        let names: Vec<&str> = report.ranking.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Cheaper", "Our clinic", "Dearer"]);
        assert_eq!(report.ranking[0].price_index, 90.0);
        assert_eq!(report.ranking[2].price_index, 110.0);
        assert_eq!(find_kpi(&report.kpis, "our_rank").unwrap().value, 2.0);
        assert_eq!(find_kpi(&report.kpis, "our_price_index").unwrap().value, 100.0);
        assert_eq!(find_kpi(&report.kpis, "wait_gap_days").unwrap().value, 0.0);

        let gender = report
            .services
            .iter()
            .find(|s| s.service == "Gender Scan")
            .unwrap();
        assert_eq!(gender.our_price, 89.0);
        assert_eq!(gender.market_mean, 89.0);
        assert_eq!(gender.price_index, 100.0);
        assert!(gender.market_min < gender.market_max);
    }

    #[test]
    fn dearer_market_puts_our_index_below_parity() {
        let profiles = vec![profile("Dearer", 4.0, 8.0, 1.25)];
        let ours = OwnPosition {
            rating: 4.5,
            wait_days: 5.0,
        };
        let report = build(&profiles, &ClinicCatalog::default(), ours);

        assert_eq!(report.ranking[1].price_index, 125.0);
        assert_eq!(find_kpi(&report.kpis, "our_price_index").unwrap().value, 80.0);
        assert!(report.services.iter().all(|s| s.price_index == 80.0));
    }

    #[test]
    fn no_competitors_leaves_us_first() {
        let ours = OwnPosition {
            rating: 4.2,
            wait_days: 3.0,
        };
        let report = build(&[], &ClinicCatalog::default(), ours);
        assert_eq!(report.ranking.len(), 1);
        assert!(report.ranking[0].is_us);
        assert!(report.services.iter().all(|s| s.price_index == 0.0));
    }

    #[test]
    fn generated_profiles_cover_every_service() {
        let catalog = ClinicCatalog::default();
        let profiles = generate_competitors(&catalog, &mut rng_for(Some(4)));
        assert_eq!(profiles.len(), catalog.competitors.len());
        for profile in &profiles {
            assert_eq!(profile.prices.len(), catalog.services.len());
            assert!((1.0..=5.0).contains(&profile.rating));
        }
    }
}

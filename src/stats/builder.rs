//! Market snapshot builder: turns one source's raw listings into an
//! immutable `MarketStats` aggregate.

use std::collections::BTreeMap;

use crate::stats::histogram::{build_price_histogram, dominant_bin};
use crate::stats::quartiles::{calculate_quartiles, classify, median_sorted, PriceBand};
use crate::types::{Listing, MarketStats, SectorStats, Snapshot};

/// Fixed EUR price buckets: `(label, start, end)`. Non-overlapping,
/// ascending, `end = None` is open-ended.
const PRICE_BUCKETS: &[(&str, f64, Option<f64>)] = &[
    ("under_50k", 0.0, Some(50_000.0)),
    ("50k_70k", 50_000.0, Some(70_000.0)),
    ("70k_90k", 70_000.0, Some(90_000.0)),
    ("90k_120k", 90_000.0, Some(120_000.0)),
    ("over_120k", 120_000.0, None),
];

/// Sector rankings are truncated to this many entries.
const TOP_SECTORS: usize = 5;

/// Mean-relative price factors for the premium/budget sector labels.
const PREMIUM_PRICE_FACTOR: f64 = 1.1;
const BUDGET_PRICE_FACTOR: f64 = 0.9;

/// A sector needs this much volume to count as emerging.
const EMERGING_MIN_LISTINGS: usize = 5;
const EMERGING_AREAS: usize = 3;

/// Build one snapshot from a finite sequence of listings.
///
/// Listings with non-positive price, surface, or room count are silently
/// excluded before aggregation. An empty (or fully-invalid) input yields a
/// zeroed snapshot rather than an error.
pub fn build_snapshot(source: &str, listings: Vec<Listing>) -> Snapshot {
    let listings: Vec<Listing> = listings.into_iter().filter(Listing::is_valid).collect();
    let total = listings.len();

    if total == 0 {
        return Snapshot { stats: empty_stats(source), listings };
    }

    let prices: Vec<f64> = listings.iter().map(|l| l.price_eur).collect();
    let pps: Vec<f64> = listings.iter().map(|l| l.price_per_sqm()).collect();
    let surfaces: Vec<f64> = listings.iter().map(|l| l.surface_sqm).collect();

    let mut sorted_prices = prices.clone();
    sorted_prices.sort_by(|a, b| a.total_cmp(b));
    let mut sorted_pps = pps.clone();
    sorted_pps.sort_by(|a, b| a.total_cmp(b));

    let median_price_eur = median_sorted(&sorted_prices);
    let median_pps = median_sorted(&sorted_pps);

    // Per-sector aggregates over distinct non-empty sector labels.
    let mut sector_acc: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for l in &listings {
        if l.sector.is_empty() {
            continue;
        }
        let entry = sector_acc.entry(l.sector.clone()).or_default();
        entry.0.push(l.price_eur);
        entry.1.push(l.surface_sqm);
    }
    let sector_stats: BTreeMap<String, SectorStats> = sector_acc
        .into_iter()
        .map(|(sector, (prices, surfaces))| {
            let count = prices.len();
            let avg_price = mean(&prices);
            let avg_surface = mean(&surfaces);
            let avg_pps = if avg_surface > 0.0 { avg_price / avg_surface } else { 0.0 };
            let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
            let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (
                sector,
                SectorStats {
                    count,
                    avg_price_eur: round2(avg_price),
                    avg_surface_sqm: round2(avg_surface),
                    avg_price_per_sqm: round2(avg_pps),
                    min_price,
                    max_price,
                },
            )
        })
        .collect();

    // Rankings. BTreeMap iteration is name-ascending, so a stable sort on
    // the ranking criterion keeps the name-asc tie-break for free.
    let mut by_volume: Vec<(String, usize)> = sector_stats
        .iter()
        .map(|(s, st)| (s.clone(), st.count))
        .collect();
    by_volume.sort_by(|a, b| b.1.cmp(&a.1));
    by_volume.truncate(TOP_SECTORS);

    let mut by_price: Vec<(String, f64)> = sector_stats
        .iter()
        .map(|(s, st)| (s.clone(), st.avg_price_per_sqm))
        .collect();
    by_price.sort_by(|a, b| b.1.total_cmp(&a.1));
    by_price.truncate(TOP_SECTORS);

    let mut best_value: Vec<(String, f64)> = sector_stats
        .iter()
        .filter(|(_, st)| st.avg_price_per_sqm < median_pps)
        .map(|(s, st)| (s.clone(), st.avg_price_per_sqm))
        .collect();
    best_value.sort_by(|a, b| a.1.total_cmp(&b.1));
    best_value.truncate(TOP_SECTORS);

    // Mean-relative sector labels. BTreeMap iteration keeps them name-asc.
    let mean_pps = mean(&pps);
    let premium_features: Vec<String> = sector_stats
        .iter()
        .filter(|(_, st)| st.avg_price_per_sqm > mean_pps * PREMIUM_PRICE_FACTOR)
        .map(|(s, _)| s.clone())
        .take(TOP_SECTORS)
        .collect();
    let budget_indicators: Vec<String> = sector_stats
        .iter()
        .filter(|(_, st)| st.avg_price_per_sqm < mean_pps * BUDGET_PRICE_FACTOR)
        .map(|(s, _)| s.clone())
        .take(TOP_SECTORS)
        .collect();
    let emerging_areas: Vec<String> = sector_stats
        .iter()
        .filter(|(_, st)| {
            st.count >= EMERGING_MIN_LISTINGS
                && st.avg_price_per_sqm >= mean_pps * BUDGET_PRICE_FACTOR
                && st.avg_price_per_sqm <= mean_pps * PREMIUM_PRICE_FACTOR
        })
        .map(|(s, _)| s.clone())
        .take(EMERGING_AREAS)
        .collect();

    // Room distribution; most common room count, ties to the smaller count.
    let mut room_distribution: BTreeMap<u32, usize> = BTreeMap::new();
    for l in &listings {
        *room_distribution.entry(l.rooms).or_insert(0) += 1;
    }
    let most_common_rooms = room_distribution
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(&rooms, _)| rooms);

    // Fixed EUR price buckets — each listing lands in exactly one.
    let mut price_ranges: BTreeMap<String, usize> = PRICE_BUCKETS
        .iter()
        .map(|&(label, _, _)| (label.to_string(), 0))
        .collect();
    for &price in &prices {
        for &(label, start, end) in PRICE_BUCKETS {
            let hit = match end {
                Some(end) => price >= start && price < end,
                None => price >= start,
            };
            if hit {
                *price_ranges.get_mut(label).unwrap() += 1;
                break;
            }
        }
    }

    let bins = build_price_histogram(&sorted_pps);
    let (dominant_range, dominant_percentage) = match dominant_bin(&bins) {
        Some((label, pct)) => (Some(label), pct),
        None => (None, 0.0),
    };

    // Quartile/outlier classification over €/m².
    let quartiles = calculate_quartiles(&sorted_pps);
    let mut underpriced = 0usize;
    let mut overpriced = 0usize;
    let mut fair = 0usize;
    for &p in &pps {
        match classify(p, &quartiles, total) {
            PriceBand::Underpriced => underpriced += 1,
            PriceBand::Overpriced => overpriced += 1,
            PriceBand::Fair => fair += 1,
        }
    }

    let stats = MarketStats {
        source: source.to_string(),
        total_listings: total,
        average_price_eur: round2(mean(&prices)),
        median_price_eur: round2(median_price_eur),
        average_price_per_sqm: round2(mean(&pps)),
        median_price_per_sqm: round2(median_pps),
        min_price_per_sqm: round2(sorted_pps[0]),
        max_price_per_sqm: round2(sorted_pps[sorted_pps.len() - 1]),
        average_surface_sqm: round2(mean(&surfaces)),
        sector_stats,
        top_sectors_by_volume: by_volume,
        top_sectors_by_price: by_price,
        best_value_sectors: best_value,
        premium_features,
        budget_indicators,
        emerging_areas,
        room_distribution,
        most_common_rooms,
        price_ranges,
        price_per_sqm_histogram: bins,
        dominant_range,
        dominant_percentage,
        q1_price_per_sqm: round2(quartiles.q1),
        q2_price_per_sqm: round2(quartiles.q2),
        q3_price_per_sqm: round2(quartiles.q3),
        iqr_price_per_sqm: round2(quartiles.iqr),
        underpriced_count: underpriced,
        overpriced_count: overpriced,
        fair_priced_count: fair,
    };

    Snapshot { stats, listings }
}

fn empty_stats(source: &str) -> MarketStats {
    MarketStats {
        source: source.to_string(),
        total_listings: 0,
        average_price_eur: 0.0,
        median_price_eur: 0.0,
        average_price_per_sqm: 0.0,
        median_price_per_sqm: 0.0,
        min_price_per_sqm: 0.0,
        max_price_per_sqm: 0.0,
        average_surface_sqm: 0.0,
        sector_stats: BTreeMap::new(),
        top_sectors_by_volume: Vec::new(),
        top_sectors_by_price: Vec::new(),
        best_value_sectors: Vec::new(),
        premium_features: Vec::new(),
        budget_indicators: Vec::new(),
        emerging_areas: Vec::new(),
        room_distribution: BTreeMap::new(),
        most_common_rooms: None,
        price_ranges: PRICE_BUCKETS
            .iter()
            .map(|&(label, _, _)| (label.to_string(), 0))
            .collect(),
        price_per_sqm_histogram: Vec::new(),
        dominant_range: None,
        dominant_percentage: 0.0,
        q1_price_per_sqm: 0.0,
        q2_price_per_sqm: 0.0,
        q3_price_per_sqm: 0.0,
        iqr_price_per_sqm: 0.0,
        underpriced_count: 0,
        overpriced_count: 0,
        fair_priced_count: 0,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Listing;

    fn listing(id: &str, price: f64, surface: f64, rooms: u32, sector: &str) -> Listing {
        Listing {
            id: id.to_string(),
            price_eur: price,
            surface_sqm: surface,
            rooms,
            sector: sector.to_string(),
            street: None,
            url_slug: format!("{id}-slug"),
        }
    }

    #[test]
    fn empty_input_yields_zeroed_snapshot() {
        let snap = build_snapshot("proimobil", Vec::new());
        assert_eq!(snap.stats.total_listings, 0);
        assert!(snap.stats.sector_stats.is_empty());
        assert_eq!(snap.stats.underpriced_count, 0);
        assert_eq!(snap.stats.fair_priced_count, 0);
    }

    #[test]
    fn invalid_listings_are_silently_excluded() {
        let snap = build_snapshot(
            "proimobil",
            vec![
                listing("a", 60_000.0, 50.0, 2, "Centru"),
                listing("bad-price", 0.0, 50.0, 2, "Centru"),
                listing("bad-surface", 60_000.0, 0.0, 2, "Centru"),
                listing("bad-rooms", 60_000.0, 50.0, 0, "Centru"),
            ],
        );
        assert_eq!(snap.stats.total_listings, 1);
        assert_eq!(snap.listings.len(), 1);
    }

    #[test]
    fn median_of_odd_price_list_is_middle_value() {
        let snap = build_snapshot(
            "proimobil",
            vec![
                listing("a", 60_000.0, 50.0, 2, ""),
                listing("b", 80_000.0, 50.0, 2, ""),
                listing("c", 100_000.0, 50.0, 3, ""),
            ],
        );
        assert_eq!(snap.stats.median_price_eur, 80_000.0);
    }

    #[test]
    fn classification_partitions_all_listings() {
        let surfaces_pps = [1000.0, 1200.0, 1400.0, 1600.0, 1800.0, 2000.0, 2200.0, 2800.0];
        let listings: Vec<Listing> = surfaces_pps
            .iter()
            .enumerate()
            .map(|(i, &pps)| listing(&format!("l{i}"), pps * 50.0, 50.0, 2, "Centru"))
            .collect();
        let snap = build_snapshot("proimobil", listings);
        let s = &snap.stats;
        assert_eq!(
            s.underpriced_count + s.overpriced_count + s.fair_priced_count,
            s.total_listings
        );
        // 1000 and 1200 sit under the interpolated Q1 (1250); 2200 and 2800
        // sit above Q3 (2150).
        assert_eq!(s.underpriced_count, 2);
        assert_eq!(s.overpriced_count, 2);
        assert_eq!(s.fair_priced_count, 4);
    }

    #[test]
    fn room_and_price_range_distributions_cover_every_listing() {
        let snap = build_snapshot(
            "combined",
            vec![
                listing("a", 45_000.0, 40.0, 1, "Botanica"),
                listing("b", 55_000.0, 45.0, 2, "Botanica"),
                listing("c", 75_000.0, 60.0, 2, "Centru"),
                listing("d", 95_000.0, 70.0, 3, "Centru"),
                listing("e", 130_000.0, 90.0, 4, "Rascani"),
            ],
        );
        let s = &snap.stats;
        assert_eq!(s.room_distribution.values().sum::<usize>(), s.total_listings);
        assert_eq!(s.price_ranges.values().sum::<usize>(), s.total_listings);
        assert_eq!(s.price_ranges["under_50k"], 1);
        assert_eq!(s.price_ranges["50k_70k"], 1);
        assert_eq!(s.price_ranges["70k_90k"], 1);
        assert_eq!(s.price_ranges["90k_120k"], 1);
        assert_eq!(s.price_ranges["over_120k"], 1);
        assert_eq!(s.most_common_rooms, Some(2));
    }

    #[test]
    fn sector_keys_are_exactly_the_distinct_non_empty_sectors() {
        let snap = build_snapshot(
            "proimobil",
            vec![
                listing("a", 60_000.0, 50.0, 2, "Centru"),
                listing("b", 70_000.0, 55.0, 2, "Botanica"),
                listing("c", 80_000.0, 60.0, 3, ""),
            ],
        );
        let keys: Vec<&String> = snap.stats.sector_stats.keys().collect();
        assert_eq!(keys, vec!["Botanica", "Centru"]);
        // Empty-sector listing still counts toward totals.
        assert_eq!(snap.stats.total_listings, 3);
    }

    #[test]
    fn volume_ranking_breaks_ties_by_name_ascending() {
        let snap = build_snapshot(
            "proimobil",
            vec![
                listing("a", 60_000.0, 50.0, 2, "Rascani"),
                listing("b", 70_000.0, 55.0, 2, "Botanica"),
                listing("c", 80_000.0, 60.0, 3, "Botanica"),
                listing("d", 90_000.0, 60.0, 3, "Rascani"),
            ],
        );
        assert_eq!(
            snap.stats.top_sectors_by_volume,
            vec![("Botanica".to_string(), 2), ("Rascani".to_string(), 2)]
        );
    }

    #[test]
    fn sector_labels_split_around_the_mean_price() {
        // Mean €/m² is 2000: Centru sits at 150%, Botanica at 50%, and
        // Telecentru exactly at it with enough volume to count as emerging.
        let mut listings = vec![
            listing("c1", 150_000.0, 50.0, 3, "Centru"),
            listing("c2", 150_000.0, 50.0, 3, "Centru"),
            listing("b1", 50_000.0, 50.0, 2, "Botanica"),
            listing("b2", 50_000.0, 50.0, 2, "Botanica"),
        ];
        for i in 0..5 {
            listings.push(listing(&format!("t{i}"), 100_000.0, 50.0, 2, "Telecentru"));
        }
        let s = build_snapshot("proimobil", listings).stats;
        assert_eq!(s.premium_features, vec!["Centru"]);
        assert_eq!(s.budget_indicators, vec!["Botanica"]);
        assert_eq!(s.emerging_areas, vec!["Telecentru"]);
    }

    #[test]
    fn two_listing_sector_is_not_emerging() {
        // Priced at the mean but only two listings.
        let listings = vec![
            listing("a", 100_000.0, 50.0, 2, "Buiucani"),
            listing("b", 100_000.0, 50.0, 2, "Buiucani"),
        ];
        let s = build_snapshot("proimobil", listings).stats;
        assert!(s.emerging_areas.is_empty());
        assert!(s.premium_features.is_empty());
        assert!(s.budget_indicators.is_empty());
    }

    #[test]
    fn best_value_sectors_sit_below_the_overall_median() {
        let snap = build_snapshot(
            "proimobil",
            vec![
                listing("a", 50_000.0, 50.0, 2, "Botanica"), // 1000 €/m²
                listing("b", 60_000.0, 50.0, 2, "Botanica"),
                listing("c", 90_000.0, 50.0, 3, "Centru"), // 1800 €/m²
                listing("d", 100_000.0, 50.0, 3, "Centru"),
                listing("e", 120_000.0, 50.0, 3, "Centru"),
            ],
        );
        let best = &snap.stats.best_value_sectors;
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].0, "Botanica");
        // Ascending by avg €/m² and strictly below the overall median.
        assert!(best[0].1 < snap.stats.median_price_per_sqm);
    }
}

//! Investment scoring for individual listings against a market snapshot.

use crate::types::{Listing, MarketStats, PropertyScore, ValueAssessment};

/// Weighting of the component scores in the overall score.
const PRICE_WEIGHT: f64 = 0.5;
const LOCATION_WEIGHT: f64 = 0.3;
const SIZE_WEIGHT: f64 = 0.2;

/// A sector needs at least this many listings before its own average €/m²
/// replaces the global median as the price reference.
const SECTOR_MIN_LISTINGS: usize = 3;

/// Half-width of the predicted price range around the listing price.
pub const UNCERTAINTY_BAND: f64 = 0.15;

/// Empirical "optimal" surface per room (m²) by room count. Small units
/// need proportionally more space per room.
fn optimal_surface_per_room(rooms: u32) -> f64 {
    match rooms {
        1 => 40.0,
        2 => 30.0,
        3 => 25.0,
        4 => 22.0,
        _ => 20.0,
    }
}

pub fn score_listing(listing: &Listing, stats: &MarketStats) -> PropertyScore {
    let price_score = price_score(listing, stats);
    let location_score = location_score(&listing.sector, stats);
    let size_score = size_score(listing.surface_sqm, listing.rooms);
    let overall =
        price_score * PRICE_WEIGHT + location_score * LOCATION_WEIGHT + size_score * SIZE_WEIGHT;

    let vs_market = if stats.median_price_per_sqm > 0.0 {
        (listing.price_per_sqm() - stats.median_price_per_sqm) / stats.median_price_per_sqm
            * 100.0
    } else {
        0.0
    };

    let listing_id = if listing.url_slug.is_empty() {
        listing.id.clone()
    } else {
        listing.url_slug.clone()
    };

    PropertyScore {
        listing_id,
        price_score: round1(price_score),
        location_score: round1(location_score),
        size_score: round1(size_score),
        overall_score: round1(overall),
        value_assessment: ValueAssessment::from_score(round1(overall)),
        predicted_price_range: (
            round2(listing.price_eur * (1.0 - UNCERTAINTY_BAND)),
            round2(listing.price_eur * (1.0 + UNCERTAINTY_BAND)),
        ),
        vs_market_percentage: round1(vs_market),
    }
}

/// Price component: 100 at or below Q1, sliding to 50 at the reference
/// price, then a proportional penalty above it, floored at 0. The
/// reference is the sector's average €/m² when the sector has enough
/// listings, else the global median.
fn price_score(listing: &Listing, stats: &MarketStats) -> f64 {
    let pps = listing.price_per_sqm();
    let reference = stats
        .sector_stats
        .get(&listing.sector)
        .filter(|s| s.count >= SECTOR_MIN_LISTINGS)
        .map(|s| s.avg_price_per_sqm)
        .unwrap_or(stats.median_price_per_sqm);
    if reference <= 0.0 {
        return 50.0;
    }

    let q1 = stats.q1_price_per_sqm;
    if pps <= q1 {
        return 100.0;
    }
    if pps < reference {
        // q1 < pps < reference, so the denominator is positive.
        return 50.0 + 50.0 * (reference - pps) / (reference - q1);
    }
    (50.0 * (1.0 - ((pps - reference) / reference).min(1.0))).max(0.0)
}

/// Location component: the sector's rank among all sectors ordered by
/// average €/m² descending, mapped onto 0–100. Pricier sectors rank as
/// more desirable. Unknown sector scores a neutral 50.
fn location_score(sector: &str, stats: &MarketStats) -> f64 {
    if sector.is_empty() || !stats.sector_stats.contains_key(sector) {
        return 50.0;
    }
    let mut ranked: Vec<(&String, f64)> = stats
        .sector_stats
        .iter()
        .map(|(name, s)| (name, s.avg_price_per_sqm))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let n = ranked.len() as f64;
    let rank = ranked
        .iter()
        .position(|(name, _)| name.as_str() == sector)
        .unwrap_or(ranked.len() - 1) as f64;
    (n - rank) / n * 100.0
}

/// Size component: rewards surface-per-room close to the optimal target
/// for the room count, penalizing deviation in either direction.
fn size_score(surface_sqm: f64, rooms: u32) -> f64 {
    if rooms == 0 || surface_sqm <= 0.0 {
        return 0.0;
    }
    let target = optimal_surface_per_room(rooms);
    let ratio = (surface_sqm / rooms as f64) / target;
    (100.0 - 100.0 * (ratio - 1.0).abs().min(1.0)).max(0.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::build_snapshot;
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

    /// Snapshot with a spread of €/m² values across two sectors.
    fn market() -> crate::types::Snapshot {
        build_snapshot(
            "proimobil",
            vec![
                listing("a", 50_000.0, 50.0, 2, "Botanica"), // 1000 €/m²
                listing("b", 60_000.0, 50.0, 2, "Botanica"), // 1200
                listing("c", 70_000.0, 50.0, 2, "Botanica"), // 1400
                listing("d", 80_000.0, 50.0, 3, "Centru"),   // 1600
                listing("e", 90_000.0, 50.0, 3, "Centru"),   // 1800
                listing("f", 100_000.0, 50.0, 3, "Centru"),  // 2000
                listing("g", 110_000.0, 50.0, 3, "Centru"),  // 2200
                listing("h", 140_000.0, 50.0, 3, "Centru"),  // 2800
            ],
        )
    }

    #[test]
    fn below_q1_scores_full_price_marks() {
        let snap = market();
        let cheap = listing("x", 48_000.0, 50.0, 2, "Botanica"); // 960 €/m², under Q1
        let score = score_listing(&cheap, &snap.stats);
        assert_eq!(score.price_score, 100.0);
        assert!(score.vs_market_percentage < 0.0, "under median must be negative");
    }

    #[test]
    fn far_above_reference_bottoms_out_at_zero() {
        let snap = market();
        let pricey = listing("y", 500_000.0, 50.0, 3, "Centru"); // 10000 €/m²
        let score = score_listing(&pricey, &snap.stats);
        assert_eq!(score.price_score, 0.0);
        assert_eq!(score.value_assessment, crate::types::ValueAssessment::Overpriced);
    }

    #[test]
    fn pricier_sector_ranks_higher_on_location() {
        let snap = market();
        let centru = score_listing(&listing("c1", 90_000.0, 50.0, 3, "Centru"), &snap.stats);
        let botanica = score_listing(&listing("b1", 90_000.0, 50.0, 3, "Botanica"), &snap.stats);
        assert!(centru.location_score > botanica.location_score);
        // Two sectors: top-ranked gets 100, the other 50.
        assert_eq!(centru.location_score, 100.0);
        assert_eq!(botanica.location_score, 50.0);
    }

    #[test]
    fn unknown_sector_gets_neutral_location_score() {
        let snap = market();
        let score = score_listing(&listing("u", 90_000.0, 50.0, 3, "Telecentru"), &snap.stats);
        assert_eq!(score.location_score, 50.0);
    }

    #[test]
    fn size_score_peaks_at_optimal_ratio() {
        // 2 rooms, 60 m² → exactly 30 m²/room.
        assert_eq!(size_score(60.0, 2), 100.0);
        // 20% over target → 80.
        assert!((size_score(72.0, 2) - 80.0).abs() < 1e-9);
        // Symmetric penalty below target.
        assert!((size_score(48.0, 2) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn predicted_range_brackets_the_listing_price() {
        let snap = market();
        let l = listing("p", 100_000.0, 50.0, 3, "Centru");
        let score = score_listing(&l, &snap.stats);
        assert_eq!(score.predicted_price_range, (85_000.0, 115_000.0));
    }

    #[test]
    fn overall_score_is_the_documented_weighting() {
        let snap = market();
        let l = listing("w", 90_000.0, 50.0, 3, "Centru");
        let score = score_listing(&l, &snap.stats);
        let expected =
            score.price_score * 0.5 + score.location_score * 0.3 + score.size_score * 0.2;
        assert!((score.overall_score - expected).abs() < 0.2);
    }
}

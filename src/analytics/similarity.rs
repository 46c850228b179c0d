//! Similarity ranking: find listings comparable to a reference property.

use crate::types::{Listing, SimilarListing};

/// Component weights (sum to 100).
const SURFACE_WEIGHT: f64 = 40.0;
const ROOMS_WEIGHT: f64 = 30.0;
const SECTOR_WEIGHT: f64 = 30.0;

/// Surface within this fraction of the reference earns full credit.
const SURFACE_FULL_TOLERANCE: f64 = 0.20;
/// Credit decays linearly to zero at this fraction.
const SURFACE_ZERO_TOLERANCE: f64 = 0.60;

/// Candidates must score strictly above this to be included.
const MIN_SIMILARITY: f64 = 40.0;

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 20;

/// Similarity of one candidate to the reference, 0–100.
pub fn similarity_score(reference: &Listing, candidate: &Listing) -> f64 {
    let surface_credit = surface_credit(reference.surface_sqm, candidate.surface_sqm);
    let rooms_credit = if candidate.rooms == reference.rooms { 1.0 } else { 0.0 };
    let sector_credit =
        if !reference.sector.is_empty() && candidate.sector == reference.sector { 1.0 } else { 0.0 };

    let score = SURFACE_WEIGHT * surface_credit
        + ROOMS_WEIGHT * rooms_credit
        + SECTOR_WEIGHT * sector_credit;
    (score * 10.0).round() / 10.0
}

fn surface_credit(reference: f64, candidate: f64) -> f64 {
    if reference <= 0.0 {
        return 0.0;
    }
    let diff = (candidate - reference).abs() / reference;
    if diff <= SURFACE_FULL_TOLERANCE {
        1.0
    } else if diff >= SURFACE_ZERO_TOLERANCE {
        0.0
    } else {
        1.0 - (diff - SURFACE_FULL_TOLERANCE) / (SURFACE_ZERO_TOLERANCE - SURFACE_FULL_TOLERANCE)
    }
}

/// Rank the candidate pool by similarity to `reference`. The reference
/// itself is excluded, as is anything at or below the minimum similarity
/// threshold. Ties in score break toward the cheaper listing.
pub fn find_similar(reference: &Listing, pool: &[Listing], limit: usize) -> Vec<SimilarListing> {
    let mut matches: Vec<SimilarListing> = pool
        .iter()
        .filter(|c| c.id != reference.id)
        .map(|c| SimilarListing { listing: c.clone(), similarity_score: similarity_score(reference, c) })
        .filter(|s| s.similarity_score > MIN_SIMILARITY)
        .collect();

    matches.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then(a.listing.price_eur.total_cmp(&b.listing.price_eur))
    });
    matches.truncate(limit);
    matches
}

/// Normalize a caller-supplied limit: missing or non-positive falls back
/// to the default, anything above the documented upper bound is clamped.
pub fn clamp_limit(limit: Option<i64>, default: usize, max: usize) -> usize {
    match limit {
        Some(n) if n > 0 => (n as usize).min(max),
        _ => default,
    }
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
    fn near_identical_listing_scores_at_least_ninety() {
        let reference = listing("ref", 70_000.0, 50.0, 2, "Centru");
        // Same rooms and sector, surface within 5%.
        let close = listing("c", 72_000.0, 52.0, 2, "Centru");
        assert!(similarity_score(&reference, &close) >= 90.0);
    }

    #[test]
    fn mismatched_rooms_and_sector_is_excluded() {
        let reference = listing("ref", 70_000.0, 50.0, 2, "Centru");
        let unlike = listing("u", 70_000.0, 50.0, 3, "Botanica");
        let score = similarity_score(&reference, &unlike);
        assert!(score <= MIN_SIMILARITY, "score={score}");
        let result = find_similar(&reference, &[reference.clone(), unlike], DEFAULT_LIMIT);
        assert!(result.is_empty());
    }

    #[test]
    fn surface_credit_decays_linearly_outside_tolerance() {
        assert_eq!(surface_credit(50.0, 55.0), 1.0); // 10% off, full credit
        assert_eq!(surface_credit(50.0, 60.0), 1.0); // exactly 20%
        assert_eq!(surface_credit(50.0, 80.0), 0.0); // 60% off, no credit
        let mid = surface_credit(50.0, 70.0); // 40% off, halfway down
        assert!((mid - 0.5).abs() < 1e-9);
    }

    #[test]
    fn results_order_by_score_then_cheaper_price() {
        let reference = listing("ref", 70_000.0, 50.0, 2, "Centru");
        let pool = vec![
            reference.clone(),
            listing("exact_pricey", 80_000.0, 50.0, 2, "Centru"),
            listing("exact_cheap", 60_000.0, 50.0, 2, "Centru"),
            listing("rooms_off", 65_000.0, 50.0, 3, "Centru"),
        ];
        let result = find_similar(&reference, &pool, DEFAULT_LIMIT);
        assert_eq!(result.len(), 3);
        // The two 100-scorers tie; the cheaper one wins.
        assert_eq!(result[0].listing.id, "exact_cheap");
        assert_eq!(result[1].listing.id, "exact_pricey");
        assert_eq!(result[2].listing.id, "rooms_off");
    }

    #[test]
    fn limit_truncates_the_result() {
        let reference = listing("ref", 70_000.0, 50.0, 2, "Centru");
        let pool: Vec<Listing> = (0..10)
            .map(|i| listing(&format!("c{i}"), 60_000.0 + i as f64, 50.0, 2, "Centru"))
            .collect();
        let result = find_similar(&reference, &pool, 3);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn clamp_limit_defaults_and_bounds() {
        assert_eq!(clamp_limit(None, DEFAULT_LIMIT, MAX_LIMIT), 5);
        assert_eq!(clamp_limit(Some(0), DEFAULT_LIMIT, MAX_LIMIT), 5);
        assert_eq!(clamp_limit(Some(-3), DEFAULT_LIMIT, MAX_LIMIT), 5);
        assert_eq!(clamp_limit(Some(7), DEFAULT_LIMIT, MAX_LIMIT), 7);
        assert_eq!(clamp_limit(Some(500), DEFAULT_LIMIT, MAX_LIMIT), 20);
    }
}

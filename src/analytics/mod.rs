//! Analytics engine: derived queries answered against cached snapshots.
//! Borrows a snapshot for the duration of one query; never mutates cache
//! state.

pub mod prediction;
pub mod scoring;
pub mod similarity;

use std::sync::Arc;

use crate::cache::SnapshotCache;
use crate::error::{AppError, Result};
use crate::types::{
    BestDeal, BestDeals, CacheKey, Listing, Prediction, PropertyScore, SimilarListing, Snapshot,
};

/// `best_deals` limit defaults and documented upper bound.
const BEST_DEALS_DEFAULT_LIMIT: usize = 10;
const BEST_DEALS_MAX_LIMIT: usize = 50;

pub struct AnalyticsEngine {
    cache: Arc<SnapshotCache>,
}

impl AnalyticsEngine {
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self { cache }
    }

    /// Investment score for one listing, resolved by id or url_slug.
    pub async fn score_property(&self, key: CacheKey, listing_ref: &str) -> Result<PropertyScore> {
        let snapshot = self.cache.get(key).await?;
        let listing = resolve_listing(&snapshot, listing_ref)?;
        Ok(scoring::score_listing(listing, &snapshot.stats))
    }

    /// Price prediction for a hypothetical property.
    pub async fn predict_price(
        &self,
        key: CacheKey,
        surface_sqm: f64,
        rooms: u32,
        sector: Option<&str>,
    ) -> Result<Prediction> {
        let snapshot = self.cache.get(key).await?;
        prediction::predict_price(&snapshot.stats, surface_sqm, rooms, sector)
    }

    /// Listings most similar to a reference, by id or url_slug.
    pub async fn find_similar(
        &self,
        key: CacheKey,
        listing_ref: &str,
        limit: Option<i64>,
    ) -> Result<Vec<SimilarListing>> {
        let snapshot = self.cache.get(key).await?;
        let reference = resolve_listing(&snapshot, listing_ref)?;
        let limit =
            similarity::clamp_limit(limit, similarity::DEFAULT_LIMIT, similarity::MAX_LIMIT);
        Ok(similarity::find_similar(reference, &snapshot.listings, limit))
    }

    /// Score every listing in the snapshot and return the top deals,
    /// ordered by overall score descending, ties to the cheaper listing.
    pub async fn best_deals(&self, key: CacheKey, limit: Option<i64>) -> Result<BestDeals> {
        let snapshot = self.cache.get(key).await?;
        if snapshot.stats.total_listings == 0 {
            return Err(AppError::InsufficientData(format!(
                "snapshot for {} has no listings to rank",
                snapshot.stats.source
            )));
        }
        let limit = similarity::clamp_limit(limit, BEST_DEALS_DEFAULT_LIMIT, BEST_DEALS_MAX_LIMIT);

        let mut deals: Vec<BestDeal> = snapshot
            .listings
            .iter()
            .map(|l| BestDeal {
                listing: l.clone(),
                score: scoring::score_listing(l, &snapshot.stats),
            })
            .collect();
        deals.sort_by(|a, b| {
            b.score
                .overall_score
                .total_cmp(&a.score.overall_score)
                .then(a.listing.price_eur.total_cmp(&b.listing.price_eur))
        });
        deals.truncate(limit);

        Ok(BestDeals { total_analyzed: snapshot.stats.total_listings, deals })
    }
}

/// Look up a listing by `id` or `url_slug`; the two are interchangeable
/// external identifiers.
fn resolve_listing<'a>(snapshot: &'a Snapshot, listing_ref: &str) -> Result<&'a Listing> {
    if snapshot.stats.total_listings == 0 {
        return Err(AppError::InsufficientData(format!(
            "snapshot for {} has no listings",
            snapshot.stats.source
        )));
    }
    snapshot
        .listings
        .iter()
        .find(|l| l.id == listing_ref || l.url_slug == listing_ref)
        .ok_or_else(|| AppError::NotFound(format!("no listing with id or slug '{listing_ref}'")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::adapters::ListingSource;
    use crate::cache::{Clock, SnapshotCache};
    use crate::types::{Listing, Source};

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_secs(&self) -> u64 {
            1000
        }
    }

    struct FixtureAdapter {
        listings: Vec<Listing>,
    }

    #[async_trait]
    impl ListingSource for FixtureAdapter {
        fn source(&self) -> Source {
            Source::Proimobil
        }

        async fn fetch_listings(&self) -> Result<Vec<Listing>> {
            Ok(self.listings.clone())
        }
    }

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

    fn engine_with(listings: Vec<Listing>) -> AnalyticsEngine {
        let cache = SnapshotCache::new(
            vec![Arc::new(FixtureAdapter { listings }) as Arc<dyn ListingSource>],
            Arc::new(FixedClock),
            3600,
        );
        AnalyticsEngine::new(cache)
    }

    fn market_listings() -> Vec<Listing> {
        vec![
            listing("a", 50_000.0, 50.0, 2, "Botanica"),
            listing("b", 60_000.0, 50.0, 2, "Botanica"),
            listing("c", 70_000.0, 50.0, 2, "Botanica"),
            listing("d", 90_000.0, 50.0, 3, "Centru"),
            listing("e", 100_000.0, 50.0, 3, "Centru"),
            listing("f", 110_000.0, 50.0, 3, "Centru"),
        ]
    }

    const KEY: CacheKey = CacheKey::Source(Source::Proimobil);

    #[tokio::test]
    async fn score_resolves_by_id_and_slug() {
        let engine = engine_with(market_listings());
        let by_id = engine.score_property(KEY, "a").await.unwrap();
        let by_slug = engine.score_property(KEY, "a-slug").await.unwrap();
        assert_eq!(by_id.overall_score, by_slug.overall_score);
        assert_eq!(by_id.listing_id, "a-slug");
    }

    #[tokio::test]
    async fn unknown_listing_is_not_found() {
        let engine = engine_with(market_listings());
        let err = engine.score_property(KEY, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = engine.find_similar(KEY, "missing", None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_snapshot_is_insufficient_data() {
        let engine = engine_with(Vec::new());
        let err = engine.score_property(KEY, "a").await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
        let err = engine.best_deals(KEY, None).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
        let err = engine.predict_price(KEY, 50.0, 2, None).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn best_deals_orders_by_score_descending() {
        let engine = engine_with(market_listings());
        let deals = engine.best_deals(KEY, Some(2)).await.unwrap();
        assert_eq!(deals.total_analyzed, 6);
        assert_eq!(deals.deals.len(), 2);
        // "a" sits under Q1 in the cheap sector (price 100, location 50,
        // size 83.3); "d" is the cheapest pricier-sector listing (price
        // ~61.8, location 100, size 66.7). Everything else scores lower.
        assert_eq!(deals.deals[0].listing.id, "a");
        assert_eq!(deals.deals[0].score.overall_score, 81.7);
        assert_eq!(deals.deals[1].listing.id, "d");
        assert_eq!(deals.deals[1].score.overall_score, 74.2);
        // The full ranking never ascends.
        let all = engine.best_deals(KEY, Some(50)).await.unwrap();
        let scores: Vec<f64> = all.deals.iter().map(|d| d.score.overall_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn similar_excludes_the_reference_itself() {
        let engine = engine_with(market_listings());
        let similar = engine.find_similar(KEY, "a", None).await.unwrap();
        assert!(similar.iter().all(|s| s.listing.id != "a"));
        assert!(!similar.is_empty());
    }

    #[tokio::test]
    async fn prediction_invalid_input_surfaces() {
        let engine = engine_with(market_listings());
        let err = engine.predict_price(KEY, 0.0, 2, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}

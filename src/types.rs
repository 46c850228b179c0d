use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One scraped apartment listing, normalized across sources.
/// Immutable once built by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub price_eur: f64,
    pub surface_sqm: f64,
    pub rooms: u32,
    /// Free-text sector label; empty means unknown.
    pub sector: String,
    pub street: Option<String>,
    /// Human-friendly external identifier, interchangeable with `id`.
    pub url_slug: String,
}

impl Listing {
    pub fn price_per_sqm(&self) -> f64 {
        if self.surface_sqm > 0.0 {
            self.price_eur / self.surface_sqm
        } else {
            0.0
        }
    }

    /// True if the listing carries usable numbers for aggregation.
    pub fn is_valid(&self) -> bool {
        self.price_eur > 0.0 && self.surface_sqm > 0.0 && self.rooms > 0
    }
}

// ---------------------------------------------------------------------------
// Sources and cache keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Proimobil,
    Accesimobil,
    #[serde(rename = "999md")]
    Md999,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Proimobil, Source::Accesimobil, Source::Md999];
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Proimobil => "proimobil",
            Source::Accesimobil => "accesimobil",
            Source::Md999 => "999md",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proimobil" => Ok(Source::Proimobil),
            "accesimobil" => Ok(Source::Accesimobil),
            "999md" => Ok(Source::Md999),
            _ => Err(()),
        }
    }
}

/// Cache key: one per source, plus the combined all-sources snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Source(Source),
    Combined,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Source(s) => write!(f, "{s}"),
            CacheKey::Combined => write!(f, "combined"),
        }
    }
}

impl std::str::FromStr for CacheKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "combined" {
            return Ok(CacheKey::Combined);
        }
        s.parse::<Source>().map(CacheKey::Source)
    }
}

// ---------------------------------------------------------------------------
// MarketStats — immutable per-source aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SectorStats {
    pub count: usize,
    pub avg_price_eur: f64,
    pub avg_surface_sqm: f64,
    pub avg_price_per_sqm: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// One €/m² histogram bin. `end` is None for the open-ended top bin.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: Option<f64>,
    pub count: usize,
    pub percentage: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketStats {
    pub source: String,
    pub total_listings: usize,

    pub average_price_eur: f64,
    pub median_price_eur: f64,
    pub average_price_per_sqm: f64,
    pub median_price_per_sqm: f64,
    pub min_price_per_sqm: f64,
    pub max_price_per_sqm: f64,
    pub average_surface_sqm: f64,

    /// Distinct non-empty sector → aggregate stats.
    pub sector_stats: BTreeMap<String, SectorStats>,
    /// (sector, count) desc by count, ties by name asc. Top 5.
    pub top_sectors_by_volume: Vec<(String, usize)>,
    /// (sector, avg €/m²) desc by price, ties by name asc. Top 5.
    pub top_sectors_by_price: Vec<(String, f64)>,
    /// Sectors below the overall median €/m², asc by avg €/m². Top 5.
    pub best_value_sectors: Vec<(String, f64)>,
    /// Sectors priced above 110% of the mean €/m², name asc. Top 5.
    pub premium_features: Vec<String>,
    /// Sectors priced below 90% of the mean €/m², name asc. Top 5.
    pub budget_indicators: Vec<String>,
    /// High-volume sectors within ±10% of the mean €/m², name asc. Top 3.
    pub emerging_areas: Vec<String>,

    /// Room count → occurrence count.
    pub room_distribution: BTreeMap<u32, usize>,
    pub most_common_rooms: Option<u32>,

    /// Fixed labeled EUR price buckets → counts.
    pub price_ranges: BTreeMap<String, usize>,

    /// €/m² histogram over fixed intervals.
    pub price_per_sqm_histogram: Vec<HistogramBin>,
    pub dominant_range: Option<String>,
    pub dominant_percentage: f64,

    // Quartile analysis of €/m².
    pub q1_price_per_sqm: f64,
    pub q2_price_per_sqm: f64,
    pub q3_price_per_sqm: f64,
    pub iqr_price_per_sqm: f64,

    // Quartile/outlier classification. Always sums to total_listings.
    pub underpriced_count: usize,
    pub overpriced_count: usize,
    pub fair_priced_count: usize,
}

/// The cached unit: aggregate stats plus the listings they were built from,
/// so analytics can query individual properties against the same consistent
/// view.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub stats: MarketStats,
    pub listings: Vec<Listing>,
}

// ---------------------------------------------------------------------------
// Analytics outputs — ephemeral, computed per query, never cached
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueAssessment {
    Excellent,
    Good,
    Fair,
    Overpriced,
}

impl ValueAssessment {
    /// Thresholds: ≥90 excellent, 70–89 good, 50–69 fair, <50 overpriced.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ValueAssessment::Excellent
        } else if score >= 70.0 {
            ValueAssessment::Good
        } else if score >= 50.0 {
            ValueAssessment::Fair
        } else {
            ValueAssessment::Overpriced
        }
    }
}

impl std::fmt::Display for ValueAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueAssessment::Excellent => "excellent",
            ValueAssessment::Good => "good",
            ValueAssessment::Fair => "fair",
            ValueAssessment::Overpriced => "overpriced",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyScore {
    pub listing_id: String,
    pub price_score: f64,
    pub location_score: f64,
    pub size_score: f64,
    pub overall_score: f64,
    pub value_assessment: ValueAssessment,
    /// (low, high) — listing price ± the uncertainty band.
    pub predicted_price_range: (f64, f64),
    /// Signed deviation of the listing's €/m² from the market median, in %.
    /// Negative means underpriced.
    pub vs_market_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceInterval {
    pub min: f64,
    pub max: f64,
    pub confidence: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub predicted_price_eur: f64,
    pub predicted_price_per_sqm: f64,
    pub confidence_interval: ConfidenceInterval,
    pub surface_sqm: f64,
    pub rooms: u32,
    /// Sector the estimate was based on, or "market average" on fallback.
    pub basis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarListing {
    pub listing: Listing,
    pub similarity_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestDeal {
    pub listing: Listing,
    pub score: PropertyScore,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestDeals {
    pub total_analyzed: usize,
    pub deals: Vec<BestDeal>,
}

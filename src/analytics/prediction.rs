//! Heuristic price prediction for a hypothetical property.

use crate::error::{AppError, Result};
use crate::types::{ConfidenceInterval, MarketStats, Prediction};

/// Half-width of the confidence band around the point estimate. Heuristic,
/// labeled "85%" confidence; not a fitted interval.
const CONFIDENCE_BAND: f64 = 0.15;
const CONFIDENCE_LABEL: &str = "85%";

/// Per-room €/m² correction: more rooms on the same surface signals a
/// different market segment, trending cheaper per square meter.
fn room_multiplier(rooms: u32) -> f64 {
    match rooms {
        1 => 1.05,
        2 => 1.00,
        3 => 0.97,
        4 => 0.95,
        _ => 0.92,
    }
}

/// Predict the price of a `surface`/`rooms` property, optionally anchored
/// to a sector. Baseline €/m² is the sector average when the sector is
/// known to the snapshot, else the global median.
pub fn predict_price(
    stats: &MarketStats,
    surface_sqm: f64,
    rooms: u32,
    sector: Option<&str>,
) -> Result<Prediction> {
    if surface_sqm <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "surface_sqm must be positive, got {surface_sqm}"
        )));
    }
    if rooms == 0 {
        return Err(AppError::InvalidInput("rooms must be at least 1".to_string()));
    }
    if stats.total_listings == 0 {
        return Err(AppError::InsufficientData(format!(
            "snapshot for {} has no listings to predict from",
            stats.source
        )));
    }

    let (baseline, basis) = sector
        .filter(|s| !s.is_empty())
        .and_then(|s| stats.sector_stats.get(s).map(|st| (st.avg_price_per_sqm, s)))
        .map(|(pps, s)| (pps, s.to_string()))
        .unwrap_or_else(|| (stats.median_price_per_sqm, "market average".to_string()));

    let adjusted_pps = baseline * room_multiplier(rooms);
    let predicted = adjusted_pps * surface_sqm;

    Ok(Prediction {
        predicted_price_eur: round2(predicted),
        predicted_price_per_sqm: round2(adjusted_pps),
        confidence_interval: ConfidenceInterval {
            min: round2(predicted * (1.0 - CONFIDENCE_BAND)),
            max: round2(predicted * (1.0 + CONFIDENCE_BAND)),
            confidence: CONFIDENCE_LABEL.to_string(),
        },
        surface_sqm,
        rooms,
        basis,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

//! Fixed-interval €/m² histogram.

use crate::types::HistogramBin;

/// Fixed €/m² intervals: `(start, end, label)`. `end = None` means open-ended.
const PRICE_INTERVALS: &[(f64, Option<f64>, &str)] = &[
    (0.0, Some(1100.0), "<1100"),
    (1100.0, Some(1500.0), "1100-1500"),
    (1500.0, Some(1800.0), "1500-1800"),
    (1800.0, Some(2200.0), "1800-2200"),
    (2200.0, Some(2600.0), "2200-2600"),
    (2600.0, Some(3000.0), "2600-3000"),
    (3000.0, Some(3500.0), "3000-3500"),
    (3500.0, None, ">3500"),
];

pub fn build_price_histogram(prices: &[f64]) -> Vec<HistogramBin> {
    if prices.is_empty() {
        return Vec::new();
    }
    let total = prices.len() as f64;
    PRICE_INTERVALS
        .iter()
        .map(|&(start, end, label)| {
            let count = prices
                .iter()
                .filter(|&&p| match end {
                    Some(end) => p >= start && p < end,
                    None => p >= start,
                })
                .count();
            HistogramBin {
                start,
                end,
                count,
                percentage: (count as f64 / total * 1000.0).round() / 10.0,
                label: label.to_string(),
            }
        })
        .collect()
}

/// The bin with the highest count, as `(label, percentage)`.
pub fn dominant_bin(bins: &[HistogramBin]) -> Option<(String, f64)> {
    bins.iter()
        .max_by_key(|b| b.count)
        .map(|b| (b.label.clone(), b.percentage))
}

//! Quartile computation and outlier classification over €/m² series.

/// Q1/Q2/Q3 and IQR of a numeric series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub iqr: f64,
}

/// Outlier classification of one listing relative to the market quartiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBand {
    Underpriced,
    Fair,
    Overpriced,
}

/// Minimum series length for outlier calls. Below this, quartiles
/// degenerate to min/max and everything classifies as fair.
pub const MIN_SAMPLES_FOR_OUTLIERS: usize = 4;

/// Linear-interpolation quartiles, exclusive method: the p-th quantile sits
/// at position `p * (n + 1)` in the 1-based sorted series, clamped to
/// `[1, n]`, interpolating between neighbours.
pub fn calculate_quartiles(values: &[f64]) -> Quartiles {
    if values.is_empty() {
        return Quartiles::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if sorted.len() < MIN_SAMPLES_FOR_OUTLIERS {
        let q2 = median_sorted(&sorted);
        let q1 = sorted[0];
        let q3 = sorted[sorted.len() - 1];
        return Quartiles { q1, q2, q3, iqr: q3 - q1 };
    }

    let q1 = quantile_sorted(&sorted, 0.25);
    let q2 = quantile_sorted(&sorted, 0.50);
    let q3 = quantile_sorted(&sorted, 0.75);
    Quartiles { q1, q2, q3, iqr: q3 - q1 }
}

/// Classify one value against precomputed quartiles. With fewer than
/// `MIN_SAMPLES_FOR_OUTLIERS` samples there is too little data to call
/// outliers, so everything is fair.
pub fn classify(value: f64, quartiles: &Quartiles, sample_count: usize) -> PriceBand {
    if sample_count < MIN_SAMPLES_FOR_OUTLIERS {
        return PriceBand::Fair;
    }
    if value < quartiles.q1 {
        PriceBand::Underpriced
    } else if value > quartiles.q3 {
        PriceBand::Overpriced
    } else {
        PriceBand::Fair
    }
}

/// Median of an already-sorted slice. Even counts average the two middle
/// values.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let pos = p * (n as f64 + 1.0);
    if pos <= 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }
    let lower = pos.floor() as usize; // 1-based
    let frac = pos - pos.floor();
    sorted[lower - 1] + frac * (sorted[lower] - sorted[lower - 1])
}

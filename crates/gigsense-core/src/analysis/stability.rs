//! Income stability scoring
//!
//! Converts a sequence of weekly income totals into a 0-100 score using the
//! population coefficient of variation. Uniform income scores 100; income
//! that swings week to week scores toward 0.

use chrono::NaiveDate;

use crate::models::{IncomeItem, StabilityRating, StabilityReport};

/// Population coefficient of variation as a percentage.
///
/// Returns 0.0 when the mean is zero so empty or all-zero windows score
/// cleanly instead of dividing by zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    variance.sqrt() / mean * 100.0
}

/// Score weekly totals into [0, 100]: 100 minus variability, clamped.
///
/// A zero mean yields 0, not 100, so a no-income window reads as the worst
/// score rather than the best.
pub fn stability_score(values: &[f64]) -> f64 {
    let mean = if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    };

    if mean == 0.0 {
        return 0.0;
    }

    (100.0 - coefficient_of_variation(values)).clamp(0.0, 100.0)
}

/// Three-tier rating with cut points at 50 and 75
pub fn rating_for(score: f64) -> StabilityRating {
    if score >= 75.0 {
        StabilityRating::Stable
    } else if score >= 50.0 {
        StabilityRating::Moderate
    } else {
        StabilityRating::Variable
    }
}

/// Full stability assessment for a set of weekly totals
pub fn assess(weekly_totals: &[f64]) -> StabilityReport {
    let weekly_average = if weekly_totals.is_empty() {
        0.0
    } else {
        weekly_totals.iter().sum::<f64>() / weekly_totals.len() as f64
    };

    let variability_pct = if weekly_average == 0.0 {
        0.0
    } else {
        coefficient_of_variation(weekly_totals)
    };
    let score = stability_score(weekly_totals);

    StabilityReport {
        score,
        rating: rating_for(score),
        weekly_average,
        variability_pct,
    }
}

/// Bucket income items into consecutive 7-day weeks starting at `start`.
///
/// Items past the last bucket boundary land in the final bucket so every
/// item is counted exactly once.
pub fn weekly_buckets(items: &[IncomeItem], start: NaiveDate, weeks: usize) -> Vec<f64> {
    let weeks = weeks.max(1);
    let mut buckets = vec![0.0; weeks];

    for item in items {
        let offset = (item.date - start).num_days().max(0) as usize;
        let idx = (offset / 7).min(weeks - 1);
        buckets[idx] += item.amount;
    }

    buckets
}

use crate::sample::StreamAggregate;

/// Starting value for the running minimum difference.
pub const SCORE_MIN_SENTINEL: f64 = 100.0;

/// Starting value for the running maximum difference.
pub const SCORE_MAX_SENTINEL: f64 = -100.0;

// ── ScoreBreakdown ────────────────────────────────────────────────────────────

/// Extremes of the outer-minus-inner bucket differences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// Smallest per-bucket difference (or [`SCORE_MIN_SENTINEL`]).
    pub min: f64,
    /// Largest per-bucket difference (or [`SCORE_MAX_SENTINEL`]).
    pub max: f64,
    /// Number of buckets present in both channels.
    pub overlap: usize,
}

impl ScoreBreakdown {
    /// The reported score: the sum of both extremes.
    pub fn score(&self) -> f64 {
        self.min + self.max
    }
}

// ── ScoreComputer ─────────────────────────────────────────────────────────────

/// Compare the per-bucket averages of both channels.
///
/// Only buckets present in both sum vectors are considered. With no overlap
/// the sentinels are returned untouched, which makes the score `0.0`.
///
/// Both counts must be non-zero; callers skip scoring until each channel has
/// at least one sample (see [`score_aggregates`]).
pub fn score_breakdown(
    outer_sum: &[f64],
    inner_sum: &[f64],
    outer_count: u64,
    inner_count: u64,
) -> ScoreBreakdown {
    let outer_n = outer_count as f64;
    let inner_n = inner_count as f64;

    let mut min = SCORE_MIN_SENTINEL;
    let mut max = SCORE_MAX_SENTINEL;
    let mut overlap = 0;

    for (outer, inner) in outer_sum.iter().zip(inner_sum) {
        let diff = outer / outer_n - inner / inner_n;
        if diff < min {
            min = diff;
        }
        if diff > max {
            max = diff;
        }
        overlap += 1;
    }

    ScoreBreakdown { min, max, overlap }
}

/// Spread score of the two channels: `min(diff) + max(diff)`.
pub fn compute_score(
    outer_sum: &[f64],
    inner_sum: &[f64],
    outer_count: u64,
    inner_count: u64,
) -> f64 {
    score_breakdown(outer_sum, inner_sum, outer_count, inner_count).score()
}

/// Score two aggregates, or `None` while either has no samples yet.
pub fn score_aggregates(outer: &StreamAggregate, inner: &StreamAggregate) -> Option<f64> {
    if outer.is_empty() || inner.is_empty() {
        return None;
    }
    Some(compute_score(
        outer.sum(),
        inner.sum(),
        outer.count(),
        inner.count(),
    ))
}

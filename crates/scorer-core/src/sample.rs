//! Sweep sample parsing and per-channel accumulation.
//!
//! Each sweep line is a CSV record whose first six fields are metadata
//! (timestamps, frequency range, step, sample count) followed by one power
//! reading per frequency bucket. [`StreamAggregate`] keeps the running sum of
//! every bucket and the number of lines that contributed.

// ── Constants ─────────────────────────────────────────────────────────────────

/// Number of leading metadata fields discarded from every sweep line.
pub const METADATA_FIELDS: usize = 6;

/// Minimum field count for a line to carry at least one bucket.
pub const MIN_SAMPLE_FIELDS: usize = METADATA_FIELDS + 1;

// ── SampleParser ──────────────────────────────────────────────────────────────

/// `true` when `line` has enough fields to contribute bucket data.
pub fn is_sample_line(line: &str) -> bool {
    line.split(',').nth(METADATA_FIELDS).is_some()
}

/// Add the bucket readings in `line` onto `acc` and return the accumulator.
///
/// Lines with fewer than [`MIN_SAMPLE_FIELDS`] fields leave `acc` untouched.
/// Otherwise `acc` is zero-padded up to the line's bucket count (it never
/// shrinks) and each field that parses as a float is added to its bucket.
/// A field that fails to parse leaves its bucket as it was.
pub fn parse_sample(line: &str, mut acc: Vec<f64>) -> Vec<f64> {
    if !is_sample_line(line) {
        return acc;
    }

    let fields: Vec<&str> = line.split(',').skip(METADATA_FIELDS).collect();
    if acc.len() < fields.len() {
        acc.resize(fields.len(), 0.0);
    }

    for (bucket, field) in acc.iter_mut().zip(fields) {
        if let Ok(value) = field.trim().parse::<f64>() {
            *bucket += value;
        }
    }

    acc
}

// ── StreamAggregate ───────────────────────────────────────────────────────────

/// Running per-bucket sums and sample count for one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamAggregate {
    sum: Vec<f64>,
    count: u64,
}

impl StreamAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a single sweep line into the aggregate.
    ///
    /// Returns `false` when the line was too short to count as a sample, in
    /// which case neither `sum` nor `count` changes.
    pub fn ingest(&mut self, line: &str) -> bool {
        if !is_sample_line(line) {
            return false;
        }
        let sum = std::mem::take(&mut self.sum);
        self.sum = parse_sample(line, sum);
        self.count += 1;
        true
    }

    /// Per-bucket running sums.
    pub fn sum(&self) -> &[f64] {
        &self.sum
    }

    /// Number of lines that contributed to `sum`.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Per-bucket mean, or an empty vector before the first sample.
    pub fn averages(&self) -> Vec<f64> {
        if self.count == 0 {
            return Vec::new();
        }
        let n = self.count as f64;
        self.sum.iter().map(|s| s / n).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

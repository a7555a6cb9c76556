//! Precision / recall / F1 with the `-1` sentinel policy.
//!
//! A value of [`SENTINEL`] marks a metric that could not be computed (empty
//! candidate or gold list, zero precision+recall). Sentinels are never mixed
//! into averages: any sentinel input forces a sentinel output.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Marker for a metric that could not be computed
pub const SENTINEL: f64 = -1.0;

/// Precision, recall and F1 for one (approach, publication) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTriple {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl MetricTriple {
    /// All three metrics failed.
    pub const FAILED: MetricTriple = MetricTriple {
        precision: SENTINEL,
        recall: SENTINEL,
        f1: SENTINEL,
    };

    /// Score `matches` against a candidate list of `candidate_len` items and a
    /// gold list of `gold_len` items.
    ///
    /// A match count above a list's length is clamped to that length so the
    /// ratios stay within `[0, 1]`.
    pub fn from_counts(matches: usize, candidate_len: usize, gold_len: usize) -> Self {
        let precision = ratio(matches, candidate_len, "precision");
        let recall = ratio(matches, gold_len, "recall");
        let f1 = f1_score(precision, recall);
        Self {
            precision,
            recall,
            f1,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.precision >= 0.0 && self.recall >= 0.0 && self.f1 >= 0.0
    }
}

fn ratio(matches: usize, len: usize, metric: &str) -> f64 {
    if len == 0 {
        warn!(metric, "Evaluation partly failed: empty list, {} set to -1", metric);
        return SENTINEL;
    }
    if matches > len {
        warn!(metric, matches, len, "Match count exceeds list length, clamping");
    }
    matches.min(len) as f64 / len as f64
}

/// Harmonic mean of precision and recall.
///
/// Returns [`SENTINEL`] when either input is a sentinel or both are zero,
/// since the harmonic mean is undefined there.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision < 0.0 || recall < 0.0 || precision + recall == 0.0 {
        warn!(precision, recall, "Evaluation partly failed: F1 set to -1");
        return SENTINEL;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Harmonic mean over a set of per-record values.
///
/// Any negative value (sentinel) forces [`SENTINEL`]; so does an empty set.
/// A zero anywhere makes the mean zero.
pub fn harmonic_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        warn!("Harmonic mean of an empty set, returning -1");
        return SENTINEL;
    }
    if values.iter().any(|v| *v < 0.0) {
        warn!(
            count = values.len(),
            "Overall evaluation partly failed: a per-record value is -1"
        );
        return SENTINEL;
    }
    if values.iter().any(|v| *v == 0.0) {
        return 0.0;
    }
    let reciprocal_sum: f64 = values.iter().map(|v| 1.0 / v).sum();
    values.len() as f64 / reciprocal_sum
}

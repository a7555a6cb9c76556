//! Corpus-level comparison of SKGC against the CSOC baseline.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::warn;

use crate::metrics::{harmonic_mean, MetricTriple, SENTINEL};
use crate::publication::{Approach, Publication};

/// Which approach scored the higher corpus F1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    SkgcBetter,
    CsocBetter,
    Tie,
}

impl Verdict {
    pub fn sentence(&self) -> &'static str {
        match self {
            Verdict::SkgcBetter => {
                "According to the automatic evaluation, the SKGC approach yielded better results than the CSOC approach."
            }
            Verdict::CsocBetter => {
                "According to the automatic evaluation, the CSOC approach yielded better results than the SKGC approach."
            }
            Verdict::Tie => {
                "According to the automatic evaluation, the SKGC and the CSOC approach performed overall identically."
            }
        }
    }
}

/// Harmonic means of each metric across the corpus, per approach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorpusSummary {
    pub skgc: MetricTriple,
    pub csoc: MetricTriple,
    pub verdict: Verdict,
}

/// Per-record metrics for `approach`; unevaluated records count as failed.
fn collect(publications: &[Publication], approach: Approach) -> Vec<MetricTriple> {
    publications
        .iter()
        .map(|p| {
            p.metrics(approach).unwrap_or_else(|| {
                warn!(title = %p.title, approach = approach.label(), "Record has no metrics");
                MetricTriple::FAILED
            })
        })
        .collect()
}

fn corpus_means(per_record: &[MetricTriple]) -> MetricTriple {
    let column = |f: fn(&MetricTriple) -> f64| -> Vec<f64> { per_record.iter().map(f).collect() };
    MetricTriple {
        precision: harmonic_mean(&column(|m| m.precision)),
        recall: harmonic_mean(&column(|m| m.recall)),
        f1: harmonic_mean(&column(|m| m.f1)),
    }
}

/// Compare the two approaches on corpus F1.
pub fn verdict(skgc_f1: f64, csoc_f1: f64) -> Verdict {
    match skgc_f1.partial_cmp(&csoc_f1) {
        Some(Ordering::Greater) => Verdict::SkgcBetter,
        Some(Ordering::Less) => Verdict::CsocBetter,
        _ => Verdict::Tie,
    }
}

/// Aggregate an evaluated corpus.
pub fn summarize(publications: &[Publication]) -> CorpusSummary {
    let skgc = corpus_means(&collect(publications, Approach::Skgc));
    let csoc = corpus_means(&collect(publications, Approach::Csoc));
    if skgc.f1 == SENTINEL || csoc.f1 == SENTINEL {
        warn!("Overall evaluation partly failed, corpus F1 of -1 means incorrect evaluation");
    }
    CorpusSummary {
        skgc,
        csoc,
        verdict: verdict(skgc.f1, csoc.f1),
    }
}

//! Publication records and their file formats.
//!
//! Input is a corpus JSON object keyed by record ID (the format used by the
//! CSO classifier benchmark). Output is a JSON array of [`Publication`]s with
//! every derived field attached, which loads back unchanged.

use crate::error::{Result, SkgcError};
use crate::metrics::MetricTriple;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Topic-extraction approach being scored against the gold standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    /// This pipeline
    Skgc,
    /// Baseline CSO classifier
    Csoc,
}

impl Approach {
    pub fn label(&self) -> &'static str {
        match self {
            Approach::Skgc => "SKGC",
            Approach::Csoc => "CSOC",
        }
    }
}

/// One scientific publication plus everything the pipelines derive from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Baseline classifier output
    #[serde(default)]
    pub csoc_result: Vec<String>,
    /// Human expert annotation
    #[serde(default)]
    pub gold_standard: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skgc_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skgc_topics_ordered: Option<Vec<String>>,
    /// Gold standard ordered against the SKGC topics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_standard_ordered1: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csoc_topics_ordered: Option<Vec<String>>,
    /// Gold standard ordered against the CSOC result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_standard_ordered2: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skgc_precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skgc_recall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skgc_f1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csoc_precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csoc_recall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csoc_f1: Option<f64>,
}

impl Publication {
    /// Build a record from direct entry, with comma-separated lists.
    pub fn from_entry(
        title: &str,
        keywords: &str,
        abstract_text: &str,
        csoc_result: &str,
        gold_standard: &str,
    ) -> Self {
        Self {
            title: title.trim().to_string(),
            keywords: split_comma_list(keywords),
            abstract_text: abstract_text.trim().to_string(),
            csoc_result: split_comma_list(csoc_result),
            gold_standard: split_comma_list(gold_standard),
            ..Default::default()
        }
    }

    /// Whether extraction has anything to work from.
    pub fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.keywords.is_empty() || !self.abstract_text.is_empty()
    }

    pub fn set_metrics(&mut self, approach: Approach, metrics: MetricTriple) {
        let (p, r, f) = match approach {
            Approach::Skgc => (&mut self.skgc_precision, &mut self.skgc_recall, &mut self.skgc_f1),
            Approach::Csoc => (&mut self.csoc_precision, &mut self.csoc_recall, &mut self.csoc_f1),
        };
        *p = Some(metrics.precision);
        *r = Some(metrics.recall);
        *f = Some(metrics.f1);
    }

    /// Metrics for `approach`, or `None` if the record was not evaluated.
    pub fn metrics(&self, approach: Approach) -> Option<MetricTriple> {
        let (p, r, f) = match approach {
            Approach::Skgc => (self.skgc_precision, self.skgc_recall, self.skgc_f1),
            Approach::Csoc => (self.csoc_precision, self.csoc_recall, self.csoc_f1),
        };
        Some(MetricTriple {
            precision: p?,
            recall: r?,
            f1: f?,
        })
    }
}

/// Split a comma-separated list, trimming items and dropping empty ones.
pub fn split_comma_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Corpus input
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct CorpusEntry {
    #[serde(default)]
    title: String,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    cso_output: Option<CsoOutput>,
    #[serde(default)]
    gold_standard: Option<GoldStandard>,
}

#[derive(Debug, Default, Deserialize)]
struct CsoOutput {
    #[serde(rename = "final", default)]
    final_topics: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GoldStandard {
    #[serde(default)]
    majority_vote: Vec<String>,
}

impl From<CorpusEntry> for Publication {
    fn from(entry: CorpusEntry) -> Self {
        Self {
            title: entry.title.trim().to_string(),
            keywords: entry.keywords,
            abstract_text: entry.abstract_text.trim().to_string(),
            csoc_result: entry.cso_output.map(|c| c.final_topics).unwrap_or_default(),
            gold_standard: entry
                .gold_standard
                .map(|g| g.majority_vote)
                .unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Parse corpus JSON: `{ "<id>": { title, abstract, keywords, cso_output.final,
/// gold_standard.majority_vote, ... }, ... }`. Key order is preserved; unknown
/// keys are ignored.
pub fn parse_corpus(json: &str) -> Result<Vec<Publication>> {
    let root: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut publications = Vec::with_capacity(root.len());
    for (id, value) in root {
        let entry: CorpusEntry = serde_json::from_value(value)
            .map_err(|e| SkgcError::Parse(format!("record {}: {}", id, e)))?;
        let publication = Publication::from(entry);
        if !publication.has_content() {
            warn!(id = %id, "Record has no title, keywords or abstract");
        }
        publications.push(publication);
    }
    Ok(publications)
}

/// Read a corpus JSON file.
pub fn load_corpus(path: &Path) -> Result<Vec<Publication>> {
    let content = std::fs::read_to_string(path)?;
    let publications = parse_corpus(&content)?;
    info!(path = %path.display(), count = publications.len(), "Loaded corpus");
    Ok(publications)
}

// ============================================================================
// Selection
// ============================================================================

/// Which records of a corpus to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Records 3..=36 (records 1 and 2 are the worked examples in the prompts)
    Training,
    /// Records 37..=70
    Testing,
    /// A single record, 1-based
    One(usize),
}

const TRAINING_RANGE: std::ops::Range<usize> = 2..36;
const TESTING_RANGE: std::ops::Range<usize> = 36..70;

impl FromStr for Selection {
    type Err = SkgcError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" => Ok(Selection::All),
            "training" => Ok(Selection::Training),
            "testing" => Ok(Selection::Testing),
            _ => {
                let n = s
                    .strip_prefix("one:")
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| {
                        SkgcError::Validation(format!(
                            "invalid selection '{}', expected all, training, testing or one:N",
                            s
                        ))
                    })?;
                Ok(Selection::One(n))
            }
        }
    }
}

/// Apply `selection` to a corpus. Ranges are clamped to the corpus size.
pub fn select(publications: Vec<Publication>, selection: Selection) -> Result<Vec<Publication>> {
    let total = publications.len();
    let clamp = |range: std::ops::Range<usize>| range.start.min(total)..range.end.min(total);
    let range = match selection {
        Selection::All => 0..total,
        Selection::Training => clamp(TRAINING_RANGE),
        Selection::Testing => clamp(TESTING_RANGE),
        Selection::One(n) => {
            if n == 0 || n > total {
                return Err(SkgcError::Validation(format!(
                    "publication number must be between 1 and {}",
                    total
                )));
            }
            n - 1..n
        }
    };
    Ok(publications
        .into_iter()
        .skip(range.start)
        .take(range.len())
        .collect())
}

// ============================================================================
// Evaluated record output
// ============================================================================

/// Write evaluated records as a JSON array.
pub fn save_records(path: &Path, publications: &[Publication]) -> Result<()> {
    let content = serde_json::to_string_pretty(publications)?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), count = publications.len(), "Saved records");
    Ok(())
}

/// Read records previously written by [`save_records`].
pub fn load_records(path: &Path) -> Result<Vec<Publication>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const CORPUS: &str = r#"{
        "b-2": {
            "title": "  Second ",
            "abstract": "Abstract two",
            "keywords": ["k2"],
            "cso_output": {"final": ["c2"], "syntactic": ["ignored"]},
            "gold_standard": {"majority_vote": ["g2"], "annotator_1": ["x"]},
            "doi": "ignored"
        },
        "a-1": {
            "title": "First",
            "keywords": []
        }
    }"#;

    #[test]
    fn test_parse_corpus_keeps_order_and_defaults() -> Result<()> {
        let pubs = parse_corpus(CORPUS)?;
        assert_eq!(pubs.len(), 2);
        assert_eq!(pubs[0].title, "Second");
        assert_eq!(pubs[0].csoc_result, vec!["c2"]);
        assert_eq!(pubs[0].gold_standard, vec!["g2"]);
        assert_eq!(pubs[1].title, "First");
        assert!(pubs[1].abstract_text.is_empty());
        assert!(pubs[1].gold_standard.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_corpus_rejects_non_object() {
        assert!(parse_corpus("[1, 2]").is_err());
    }

    #[test]
    fn test_from_entry_splits_lists() {
        let p = Publication::from_entry(" T ", "a, b ,", "abs", "", "g1,g2");
        assert_eq!(p.title, "T");
        assert_eq!(p.keywords, vec!["a", "b"]);
        assert!(p.csoc_result.is_empty());
        assert_eq!(p.gold_standard, vec!["g1", "g2"]);
    }

    #[test]
    fn test_split_comma_list_keeps_duplicates() {
        assert_eq!(split_comma_list("x, y, x"), vec!["x", "y", "x"]);
        assert!(split_comma_list("  ").is_empty());
    }

    #[test]
    fn test_selection_parse() -> Result<()> {
        assert_eq!("ALL".parse::<Selection>()?, Selection::All);
        assert_eq!("one:3".parse::<Selection>()?, Selection::One(3));
        assert!("one:x".parse::<Selection>().is_err());
        assert!("half".parse::<Selection>().is_err());
        Ok(())
    }

    fn corpus(n: usize) -> Vec<Publication> {
        (1..=n)
            .map(|i| Publication {
                title: format!("P{}", i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_select_ranges() -> Result<()> {
        let training = select(corpus(80), Selection::Training)?;
        assert_eq!(training.len(), 34);
        assert_eq!(training[0].title, "P3");

        let testing = select(corpus(80), Selection::Testing)?;
        assert_eq!(testing.len(), 34);
        assert_eq!(testing[0].title, "P37");

        // clamped to what exists
        assert_eq!(select(corpus(10), Selection::Training)?.len(), 8);
        assert!(select(corpus(10), Selection::Testing)?.is_empty());

        let one = select(corpus(5), Selection::One(5))?;
        assert_eq!(one[0].title, "P5");
        assert!(select(corpus(5), Selection::One(0)).is_err());
        assert!(select(corpus(5), Selection::One(6)).is_err());
        Ok(())
    }

    #[test]
    fn test_records_round_trip() -> Result<()> {
        let mut p = Publication::from_entry("T", "k", "a", "c1, c2", "g1, g2, g3");
        p.skgc_topics = Some(vec!["neural networks".into(), "nlp".into()]);
        p.skgc_topics_ordered = Some(vec!["nlp".into(), "neural networks".into()]);
        p.gold_standard_ordered1 = Some(vec!["g2".into(), "g1".into(), "g3".into()]);
        p.csoc_topics_ordered = Some(vec![]);
        p.gold_standard_ordered2 = Some(vec!["g1".into()]);
        p.set_metrics(
            Approach::Skgc,
            MetricTriple {
                precision: 1.0,
                recall: 2.0 / 3.0,
                f1: 0.8,
            },
        );
        p.set_metrics(Approach::Csoc, MetricTriple::FAILED);

        let file = NamedTempFile::new()?;
        save_records(file.path(), std::slice::from_ref(&p))?;
        let loaded = load_records(file.path())?;
        assert_eq!(loaded, vec![p]);
        Ok(())
    }

    #[test]
    fn test_computed_metrics_reload_bit_exact() -> Result<()> {
        let mut pubs = Vec::new();
        for gold in 1..=30 {
            for candidate in 1..=30 {
                for matches in 0..=candidate.min(gold) {
                    let mut p = Publication {
                        title: format!("{}/{}/{}", matches, candidate, gold),
                        ..Default::default()
                    };
                    p.set_metrics(
                        Approach::Skgc,
                        MetricTriple::from_counts(matches, candidate, gold),
                    );
                    pubs.push(p);
                }
            }
        }

        let file = NamedTempFile::new()?;
        save_records(file.path(), &pubs)?;
        let loaded = load_records(file.path())?;
        assert_eq!(loaded.len(), pubs.len());
        for (saved, back) in pubs.iter().zip(&loaded) {
            let (a, b) = (saved.metrics(Approach::Skgc), back.metrics(Approach::Skgc));
            let bits = |m: Option<MetricTriple>| {
                m.map(|m| (m.precision.to_bits(), m.recall.to_bits(), m.f1.to_bits()))
            };
            assert_eq!(bits(a), bits(b), "metrics changed for {}", saved.title);
        }
        // (1, 1, 9) has an F1 one step below 0.2
        let f1 = MetricTriple::from_counts(1, 1, 9).f1;
        assert!(loaded.iter().any(|p| p.skgc_f1 == Some(f1)));
        Ok(())
    }

    #[test]
    fn test_metrics_accessor() {
        let mut p = Publication::default();
        assert!(p.metrics(Approach::Skgc).is_none());
        p.set_metrics(Approach::Csoc, MetricTriple::FAILED);
        assert_eq!(p.metrics(Approach::Csoc), Some(MetricTriple::FAILED));
        assert!(p.metrics(Approach::Skgc).is_none());
    }
}

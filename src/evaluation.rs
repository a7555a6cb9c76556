//! Four-stage evaluation of extracted topics against the gold standard.
//!
//! For each approach (SKGC, then the CSOC baseline) the agent first orders
//! the candidate list and the gold standard by similarity, then counts the
//! matching and similar items in the two ordered lists. Precision, recall and
//! F1 follow from that count.
//!
//! The gold standard is ordered separately against each candidate, so a
//! record ends up with two gold orderings.

use tracing::{info, warn};

use crate::conversation::Ledger;
use crate::error::{Result, SkgcError};
use crate::gateway::Gateway;
use crate::metrics::MetricTriple;
use crate::prompts::evaluation::{
    build_check_prompt, build_count_prompt, build_order_prompt, CSOC_TOPICS, CSOC_TOPICS_ORDERED,
    SKGC_TOPICS, SKGC_TOPICS_ORDERED,
};
use crate::prompts::StageTemplates;
use crate::publication::{split_comma_list, Approach, Publication};

/// Section label introducing the SKGC list in an ordering answer
pub const SKGC_RESULT_MARKER: &str = "Your result:";
/// Section label introducing the CSOC list in an ordering answer
pub const CSOC_RESULT_MARKER: &str = "CSOC result:";
/// Section label introducing the gold-standard list in an ordering answer
pub const HUMAN_RESULT_MARKER: &str = "Human expert result:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStage {
    OrderSkgc,
    CountSkgc,
    OrderCsoc,
    CountCsoc,
}

impl EvaluationStage {
    pub fn index(&self) -> usize {
        match self {
            EvaluationStage::OrderSkgc => 0,
            EvaluationStage::CountSkgc => 1,
            EvaluationStage::OrderCsoc => 2,
            EvaluationStage::CountCsoc => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvaluationStage::OrderSkgc => "order-skgc",
            EvaluationStage::CountSkgc => "count-skgc",
            EvaluationStage::OrderCsoc => "order-csoc",
            EvaluationStage::CountCsoc => "count-csoc",
        }
    }

    fn order(approach: Approach) -> Self {
        match approach {
            Approach::Skgc => EvaluationStage::OrderSkgc,
            Approach::Csoc => EvaluationStage::OrderCsoc,
        }
    }

    fn count(approach: Approach) -> Self {
        match approach {
            Approach::Skgc => EvaluationStage::CountSkgc,
            Approach::Csoc => EvaluationStage::CountCsoc,
        }
    }
}

fn result_marker(approach: Approach) -> &'static str {
    match approach {
        Approach::Skgc => SKGC_RESULT_MARKER,
        Approach::Csoc => CSOC_RESULT_MARKER,
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// Outcome of splitting an ordering answer into its two lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionParse {
    Parsed {
        candidate: Vec<String>,
        gold: Vec<String>,
    },
    /// A section label was not found (after the candidate label, for the
    /// gold label)
    MissingMarker(&'static str),
}

impl SectionParse {
    /// Both lists, empty when a marker was missing.
    pub fn into_lists(self) -> (Vec<String>, Vec<String>) {
        match self {
            SectionParse::Parsed { candidate, gold } => (candidate, gold),
            SectionParse::MissingMarker(_) => (Vec::new(), Vec::new()),
        }
    }
}

/// Parse `<candidate_marker> a, b, c <HUMAN_RESULT_MARKER> x, y`.
///
/// The candidate list runs from its label to the gold label; the gold list
/// runs from its label to the next gold label or the end of the text.
pub fn parse_sections(text: &str, candidate_marker: &'static str) -> SectionParse {
    let Some(start) = text.find(candidate_marker) else {
        return SectionParse::MissingMarker(candidate_marker);
    };
    let after_candidate = &text[start + candidate_marker.len()..];

    let Some(split) = after_candidate.find(HUMAN_RESULT_MARKER) else {
        return SectionParse::MissingMarker(HUMAN_RESULT_MARKER);
    };
    let candidate_span = &after_candidate[..split];
    let gold_rest = &after_candidate[split + HUMAN_RESULT_MARKER.len()..];
    let gold_span = match gold_rest.find(HUMAN_RESULT_MARKER) {
        Some(end) => &gold_rest[..end],
        None => gold_rest,
    };

    SectionParse::Parsed {
        candidate: split_comma_list(candidate_span),
        gold: split_comma_list(gold_span),
    }
}

/// Parse the agent's match count, which must be a bare non-negative integer.
pub fn try_parse_match_count(text: &str) -> Result<usize> {
    text.trim()
        .parse::<usize>()
        .map_err(|e| SkgcError::Parse(format!("match count '{}': {}", text.trim(), e)))
}

/// Like [`try_parse_match_count`] but falls back to 0 with a warning.
pub fn parse_match_count(text: &str) -> usize {
    match try_parse_match_count(text) {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "Evaluation partly failed: match count not an integer, using 0");
            0
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Ordered lists and metrics for one approach.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachEvaluation {
    pub candidate_ordered: Vec<String>,
    pub gold_ordered: Vec<String>,
    pub metrics: MetricTriple,
}

impl ApproachEvaluation {
    fn failed() -> Self {
        Self {
            candidate_ordered: Vec::new(),
            gold_ordered: Vec::new(),
            metrics: MetricTriple::FAILED,
        }
    }
}

/// Order `candidate` against `gold`, then count matches and score.
pub async fn evaluate_approach(
    gateway: &Gateway,
    templates: &StageTemplates,
    approach: Approach,
    candidate: &[String],
    gold: &[String],
    ledger: &mut Ledger,
) -> ApproachEvaluation {
    let order_stage = EvaluationStage::order(approach);
    let Some((agent_template, check_template)) = templates.stage(order_stage.index()) else {
        warn!(stage = order_stage.name(), "No prompt template for evaluation stage");
        return ApproachEvaluation::failed();
    };
    let (candidate_token, ordered_token) = match approach {
        Approach::Skgc => (SKGC_TOPICS, SKGC_TOPICS_ORDERED),
        Approach::Csoc => (CSOC_TOPICS, CSOC_TOPICS_ORDERED),
    };

    let prompt = build_order_prompt(agent_template, candidate_token, candidate, gold);
    info!(stage = order_stage.name(), "Evaluation: sending prompt to agent");
    let verified = gateway
        .verified_exchange(ledger, &prompt, |raw| {
            build_check_prompt(check_template, order_stage.index(), raw)
        })
        .await;

    let parsed = parse_sections(&verified, result_marker(approach));
    if let SectionParse::MissingMarker(marker) = &parsed {
        warn!(
            stage = order_stage.name(),
            marker = *marker,
            "Ordering response is missing a section label, using empty lists"
        );
    }
    let (candidate_ordered, gold_ordered) = parsed.into_lists();

    let count_stage = EvaluationStage::count(approach);
    let Some((agent_template, check_template)) = templates.stage(count_stage.index()) else {
        warn!(stage = count_stage.name(), "No prompt template for evaluation stage");
        return ApproachEvaluation {
            candidate_ordered,
            gold_ordered,
            metrics: MetricTriple::FAILED,
        };
    };

    let prompt = build_count_prompt(agent_template, ordered_token, &candidate_ordered, &gold_ordered);
    info!(stage = count_stage.name(), "Evaluation: sending prompt to agent");
    let verified = gateway
        .verified_exchange(ledger, &prompt, |raw| {
            build_check_prompt(check_template, count_stage.index(), raw)
        })
        .await;

    let matches = parse_match_count(&verified);
    let metrics = MetricTriple::from_counts(matches, candidate_ordered.len(), gold_ordered.len());
    info!(
        approach = approach.label(),
        matches,
        precision = metrics.precision,
        recall = metrics.recall,
        f1 = metrics.f1,
        "Evaluation scored"
    );

    ApproachEvaluation {
        candidate_ordered,
        gold_ordered,
        metrics,
    }
}

/// Evaluate SKGC topics and the CSOC baseline for one publication and
/// attach the ordered lists and metrics to it.
///
/// `ledger` is the same ledger the publication's extraction used.
pub async fn evaluate_publication(
    gateway: &Gateway,
    templates: &StageTemplates,
    publication: &mut Publication,
    ledger: &mut Ledger,
) {
    let skgc_topics = match &publication.skgc_topics {
        Some(topics) => topics.clone(),
        None => {
            warn!(title = %publication.title, "Evaluating a publication without extracted topics");
            Vec::new()
        }
    };

    let skgc = evaluate_approach(
        gateway,
        templates,
        Approach::Skgc,
        &skgc_topics,
        &publication.gold_standard,
        ledger,
    )
    .await;
    publication.skgc_topics_ordered = Some(skgc.candidate_ordered);
    publication.gold_standard_ordered1 = Some(skgc.gold_ordered);
    publication.set_metrics(Approach::Skgc, skgc.metrics);

    let csoc = evaluate_approach(
        gateway,
        templates,
        Approach::Csoc,
        &publication.csoc_result,
        &publication.gold_standard,
        ledger,
    )
    .await;
    publication.csoc_topics_ordered = Some(csoc.candidate_ordered);
    publication.gold_standard_ordered2 = Some(csoc.gold_ordered);
    publication.set_metrics(Approach::Csoc, csoc.metrics);
}

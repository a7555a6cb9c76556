//! Placeholders and prompt builders for the four evaluation stages.

use super::join_list;

pub const SKGC_TOPICS: &str = "XXXskgc_topicsXXX";
pub const CSOC_TOPICS: &str = "XXXcsoc_topicsXXX";
pub const GOLD_STANDARD: &str = "XXXgold_standardXXX";
pub const SKGC_TOPICS_ORDERED: &str = "XXXskgc_topics_orderedXXX";
pub const CSOC_TOPICS_ORDERED: &str = "XXXcsoc_topics_orderedXXX";
pub const GOLD_STANDARD_ORDERED: &str = "XXXgold_standard_orderedXXX";

/// Assistant placeholders for the raw agent answer of evaluation stages 1..=4
pub const AGENT_RESPONSES: [&str; 4] = [
    "XXXagent4XXX",
    "XXXagent5XXX",
    "XXXagent6XXX",
    "XXXagent7XXX",
];

/// Ordering prompt: rank `candidate` against the gold standard.
/// `candidate_token` is [`SKGC_TOPICS`] or [`CSOC_TOPICS`].
pub fn build_order_prompt(
    template: &str,
    candidate_token: &str,
    candidate: &[String],
    gold: &[String],
) -> String {
    template
        .replace(candidate_token, &join_list(candidate))
        .replace(GOLD_STANDARD, &join_list(gold))
}

/// Counting prompt over two already-ordered lists.
/// `candidate_token` is [`SKGC_TOPICS_ORDERED`] or [`CSOC_TOPICS_ORDERED`].
pub fn build_count_prompt(
    template: &str,
    candidate_token: &str,
    candidate_ordered: &[String],
    gold_ordered: &[String],
) -> String {
    template
        .replace(candidate_token, &join_list(candidate_ordered))
        .replace(GOLD_STANDARD_ORDERED, &join_list(gold_ordered))
}

/// Assistant format check for the raw agent answer of stage `idx` (0-based).
pub fn build_check_prompt(template: &str, idx: usize, raw: &str) -> String {
    match AGENT_RESPONSES.get(idx) {
        Some(token) => template.replace(token, raw),
        None => template.to_string(),
    }
}

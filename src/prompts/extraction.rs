//! Placeholders and prompt builders for the three extraction stages.

use super::join_list;
use crate::publication::Publication;

pub const TITLE: &str = "XXXtitleXXX";
pub const KEYWORDS: &str = "XXXkeywordsXXX";
pub const ABSTRACT: &str = "XXXabstractXXX";
pub const RESPONSE1: &str = "XXXresponse1XXX";
pub const RESPONSE2: &str = "XXXresponse2XXX";

/// Assistant placeholders for the raw agent answer of stages 1..=3
pub const AGENT_RESPONSES: [&str; 3] = ["XXXagent1XXX", "XXXagent2XXX", "XXXagent3XXX"];

/// Stage 1: syntactic extraction from the publication metadata.
pub fn build_syntactic_prompt(template: &str, publication: &Publication) -> String {
    template
        .replace(TITLE, &publication.title)
        .replace(KEYWORDS, &join_list(&publication.keywords))
        .replace(ABSTRACT, &publication.abstract_text)
}

/// Stage 2: semantic enrichment of the stage-1 answer.
pub fn build_semantic_prompt(template: &str, syntactic: &str) -> String {
    template.replace(RESPONSE1, syntactic)
}

/// Stage 3: review of the stage-2 answer.
pub fn build_review_prompt(template: &str, semantic: &str) -> String {
    template.replace(RESPONSE2, semantic)
}

/// Assistant format check for the raw agent answer of stage `idx` (0-based).
pub fn build_check_prompt(template: &str, idx: usize, raw: &str) -> String {
    match AGENT_RESPONSES.get(idx) {
        Some(token) => template.replace(token, raw),
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_syntactic_prompt() {
        let publication = Publication {
            title: "Deep Parsing".into(),
            keywords: vec!["nlp".into(), "parsing".into()],
            abstract_text: "We parse.".into(),
            ..Default::default()
        };
        let prompt = build_syntactic_prompt(
            "T=XXXtitleXXX K=XXXkeywordsXXX A=XXXabstractXXX",
            &publication,
        );
        assert_eq!(prompt, "T=Deep Parsing K=nlp, parsing A=We parse.");
    }

    #[test]
    fn test_build_check_prompt_uses_stage_token() {
        assert_eq!(build_check_prompt("check: XXXagent2XXX", 1, "a, b"), "check: a, b");
        // other stage tokens are left alone
        assert_eq!(build_check_prompt("check: XXXagent2XXX", 0, "a"), "check: XXXagent2XXX");
    }

    #[test]
    fn test_chained_prompts() {
        assert_eq!(build_semantic_prompt("prev: XXXresponse1XXX", "x, y"), "prev: x, y");
        assert_eq!(build_review_prompt("prev: XXXresponse2XXX", "z"), "prev: z");
    }
}

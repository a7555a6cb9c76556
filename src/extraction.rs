//! Three-stage topic extraction for one publication.
//!
//! Stages run strictly in order, each feeding its verified answer into the
//! next: syntactic keywords from the metadata, semantic enrichment, then a
//! review. The reviewed answer is split on commas into the topic list.
//! A malformed answer is not retried; it simply yields a poor topic list.

use tracing::{info, warn};

use crate::conversation::Ledger;
use crate::gateway::Gateway;
use crate::prompts::extraction::{
    build_check_prompt, build_review_prompt, build_semantic_prompt, build_syntactic_prompt,
};
use crate::prompts::{StageTemplates, AGENT_SYSTEM_PROMPT};
use crate::publication::{split_comma_list, Publication};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Syntactic,
    Semantic,
    Review,
}

impl ExtractionStage {
    pub const ALL: [ExtractionStage; 3] = [
        ExtractionStage::Syntactic,
        ExtractionStage::Semantic,
        ExtractionStage::Review,
    ];

    /// Position of this stage's templates in the template files.
    pub fn index(&self) -> usize {
        match self {
            ExtractionStage::Syntactic => 0,
            ExtractionStage::Semantic => 1,
            ExtractionStage::Review => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStage::Syntactic => "syntactic",
            ExtractionStage::Semantic => "semantic",
            ExtractionStage::Review => "review",
        }
    }
}

/// Extract the topic list of `publication`.
///
/// `ledger` should be the publication's fresh ledger; an empty one is opened
/// with the agent system turn. It receives one prompt and one verified answer per
/// stage. If a stage has no template the pipeline stops there and returns
/// an empty list.
pub async fn extract_topics(
    gateway: &Gateway,
    templates: &StageTemplates,
    publication: &Publication,
    ledger: &mut Ledger,
) -> Vec<String> {
    if !publication.has_content() {
        warn!(title = %publication.title, "Publication has no title, keywords or abstract");
    }
    if ledger.is_empty() {
        ledger.push_system(AGENT_SYSTEM_PROMPT);
    } else {
        warn!(turns = ledger.len(), "Extraction ledger already opened, keeping existing turns");
    }

    let mut previous = String::new();
    for stage in ExtractionStage::ALL {
        let Some((agent_template, check_template)) = templates.stage(stage.index()) else {
            warn!(stage = stage.name(), "No prompt template for extraction stage, skipping extraction");
            return Vec::new();
        };

        let prompt = match stage {
            ExtractionStage::Syntactic => build_syntactic_prompt(agent_template, publication),
            ExtractionStage::Semantic => build_semantic_prompt(agent_template, &previous),
            ExtractionStage::Review => build_review_prompt(agent_template, &previous),
        };

        info!(stage = stage.name(), "Extraction: sending prompt to agent");
        previous = gateway
            .verified_exchange(ledger, &prompt, |raw| {
                build_check_prompt(check_template, stage.index(), raw)
            })
            .await;
        info!(stage = stage.name(), "Extraction: received verified response");
    }

    let topics = split_comma_list(&previous);
    if topics.is_empty() {
        warn!(title = %publication.title, "Extraction produced no topics");
    }
    topics
}

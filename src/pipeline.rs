//! Sequential driver: extraction then evaluation, one publication at a time.
//!
//! Every gateway call is serialized. A publication's ledger is created at the
//! start of its extraction, shared with its evaluation, and only read
//! afterwards.

use tracing::info;

use crate::conversation::Ledger;
use crate::evaluation::evaluate_publication;
use crate::extraction::extract_topics;
use crate::gateway::Gateway;
use crate::prompts::PromptSet;
use crate::publication::Publication;

pub struct Pipeline<'a> {
    gateway: &'a Gateway,
    prompts: &'a PromptSet,
}

impl<'a> Pipeline<'a> {
    pub fn new(gateway: &'a Gateway, prompts: &'a PromptSet) -> Self {
        Self { gateway, prompts }
    }

    /// Extract and evaluate one publication in place. Returns its ledger.
    pub async fn process_publication(&self, publication: &mut Publication) -> Ledger {
        let mut ledger = Ledger::new();
        let topics = extract_topics(
            self.gateway,
            &self.prompts.extraction,
            publication,
            &mut ledger,
        )
        .await;
        info!(title = %publication.title, topics = topics.len(), "Topics extracted");
        publication.skgc_topics = Some(topics);

        evaluate_publication(
            self.gateway,
            &self.prompts.evaluation,
            publication,
            &mut ledger,
        )
        .await;
        ledger
    }

    /// Process every publication in order. Ledgers are returned in the same
    /// order as the publications.
    pub async fn run(&self, publications: &mut [Publication]) -> Vec<Ledger> {
        let total = publications.len();
        let mut ledgers = Vec::with_capacity(total);
        for (idx, publication) in publications.iter_mut().enumerate() {
            info!(publication = idx + 1, total, title = %publication.title, "Processing publication");
            ledgers.push(self.process_publication(publication).await);
        }
        self.gateway.log_usage();
        ledgers
    }
}

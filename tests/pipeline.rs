//! End-to-end extraction + evaluation against a scripted chat backend.
//!
//! The backend answers agent prompts from a fixed script keyed by the
//! prompt's leading tag and "verifies" by echoing the raw answer with a
//! chatty prefix removed, so the tests can tell raw from verified text.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustskgc::conversation::{Ledger, TurnRole};
use rustskgc::error::{Result, SkgcError};
use rustskgc::extraction::extract_topics;
use rustskgc::gateway::{Auth, ChatBackend, ChatRequest, Completion, Credentials, Gateway, GatewayConfig};
use rustskgc::metrics::{MetricTriple, SENTINEL};
use rustskgc::pipeline::Pipeline;
use rustskgc::prompts::{PromptSet, StageTemplates, AGENT_SYSTEM_PROMPT};
use rustskgc::publication::{load_records, save_records, Approach, Publication};

const RAW_PREFIX: &str = "Sure! Here are the topics: ";

type CallLog = Arc<Mutex<Vec<(ChatRequest, String)>>>;

struct ScriptedBackend {
    calls: CallLog,
    fail: bool,
}

fn agent_answer(prompt: &str) -> String {
    let tag = prompt.split_whitespace().next().unwrap_or_default();
    let answer = match tag {
        "S1" => "neural networks",
        "S2" => "neural networks, nlp, nlp",
        "S3" => "neural networks, nlp",
        "O1" => "Your result: neural networks, nlp\nHuman expert result: neural network, nlp, natural language processing",
        "N1" => "2",
        "O2" => "CSOC result: ontology\nHuman expert result: neural network, natural language processing, nlp",
        "N2" => "abc",
        _ => "",
    };
    format!("{}{}", RAW_PREFIX, answer)
}

fn assistant_answer(prompt: &str) -> String {
    // "C<n> <raw answer>"
    let raw = prompt.split_once(' ').map(|(_, rest)| rest).unwrap_or_default();
    raw.trim_start_matches(RAW_PREFIX).to_string()
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: &ChatRequest, auth: Auth<'_>) -> Result<Completion> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((request.clone(), auth.api_key.to_string()));
        }
        if self.fail {
            return Err(SkgcError::Api {
                code: 503,
                message: "unavailable".into(),
            });
        }
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let content = if auth.api_key == "agent" {
            agent_answer(prompt)
        } else {
            assistant_answer(prompt)
        };
        Ok(Completion {
            content,
            usage: None,
        })
    }
}

fn gateway(fail: bool) -> (Gateway, CallLog) {
    let calls = CallLog::default();
    let backend = ScriptedBackend {
        calls: calls.clone(),
        fail,
    };
    let config = GatewayConfig {
        call_delay: Duration::ZERO,
        ..Default::default()
    };
    let credentials = Credentials {
        agent_key: "agent".into(),
        assistant_key: "assistant".into(),
        organization: "org".into(),
    };
    (Gateway::new(Box::new(backend), config, credentials), calls)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn prompts() -> PromptSet {
    PromptSet {
        extraction: StageTemplates::new(
            strings(&[
                "S1 XXXtitleXXX | XXXkeywordsXXX | XXXabstractXXX",
                "S2 XXXresponse1XXX",
                "S3 XXXresponse2XXX",
            ]),
            strings(&["C1 XXXagent1XXX", "C2 XXXagent2XXX", "C3 XXXagent3XXX"]),
        ),
        evaluation: StageTemplates::new(
            strings(&[
                "O1 XXXskgc_topicsXXX | XXXgold_standardXXX",
                "N1 XXXskgc_topics_orderedXXX | XXXgold_standard_orderedXXX",
                "O2 XXXcsoc_topicsXXX | XXXgold_standardXXX",
                "N2 XXXcsoc_topics_orderedXXX | XXXgold_standard_orderedXXX",
            ]),
            strings(&[
                "C4 XXXagent4XXX",
                "C5 XXXagent5XXX",
                "C6 XXXagent6XXX",
                "C7 XXXagent7XXX",
            ]),
        ),
    }
}

fn publication() -> Publication {
    Publication::from_entry(
        "Neural parsing",
        "neural networks, parsing",
        "We train neural networks for natural language processing.",
        "ontology",
        "neural network, natural language processing, nlp",
    )
}

fn recorded(calls: &CallLog) -> Vec<(ChatRequest, String)> {
    calls.lock().map(|c| c.clone()).unwrap_or_default()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn extraction_ledger_holds_only_verified_answers() {
    let (gw, calls) = gateway(false);
    let prompts = prompts();
    let mut ledger = Ledger::new();

    let topics = extract_topics(&gw, &prompts.extraction, &publication(), &mut ledger).await;
    assert_eq!(topics, strings(&["neural networks", "nlp"]));

    // system + 3 prompts + 3 verified answers
    assert_eq!(ledger.len(), 7);
    assert_eq!(ledger.turns()[0].role, TurnRole::System);
    assert_eq!(ledger.turns()[0].content, AGENT_SYSTEM_PROMPT);
    assert_eq!(ledger.count(TurnRole::System), 1);
    assert_eq!(ledger.count(TurnRole::Assistant), 3);
    assert!(ledger.turns().iter().all(|t| !t.content.contains(RAW_PREFIX)));

    // stage 2 was built from the verified stage-1 answer
    assert_eq!(ledger.turns()[3].content, "S2 neural networks");
    assert_eq!(ledger.turns()[5].content, "S3 neural networks, nlp, nlp");

    let calls = recorded(&calls);
    assert_eq!(calls.len(), 6);
    for (request, key) in &calls {
        if key == "assistant" {
            assert_eq!(request.messages.len(), 2);
        }
    }
    // the assistant sees the raw agent answer
    assert_eq!(
        calls[1].0.messages[1].content,
        format!("C1 {}neural networks", RAW_PREFIX)
    );
}

#[tokio::test]
async fn extraction_keeps_single_system_turn_on_opened_ledger() {
    let (gw, _) = gateway(false);
    let prompts = prompts();
    let mut ledger = Ledger::with_system(AGENT_SYSTEM_PROMPT);

    extract_topics(&gw, &prompts.extraction, &publication(), &mut ledger).await;

    assert_eq!(ledger.count(TurnRole::System), 1);
    assert_eq!(ledger.len(), 7);
    assert_eq!(ledger.turns()[1].role, TurnRole::User);
}

#[tokio::test]
async fn full_pipeline_scores_both_approaches() {
    let (gw, calls) = gateway(false);
    let prompts = prompts();
    let mut p = publication();

    let ledger = Pipeline::new(&gw, &prompts).process_publication(&mut p).await;

    assert_eq!(p.skgc_topics, Some(strings(&["neural networks", "nlp"])));
    assert_eq!(p.skgc_topics_ordered, Some(strings(&["neural networks", "nlp"])));
    assert_eq!(
        p.gold_standard_ordered1,
        Some(strings(&["neural network", "nlp", "natural language processing"]))
    );
    assert_eq!(p.csoc_topics_ordered, Some(strings(&["ontology"])));
    assert_eq!(
        p.gold_standard_ordered2,
        Some(strings(&["neural network", "natural language processing", "nlp"]))
    );

    let skgc = p.metrics(Approach::Skgc).unwrap_or(MetricTriple::FAILED);
    assert!(close(skgc.precision, 1.0));
    assert!(close(skgc.recall, 2.0 / 3.0));
    assert!(close(skgc.f1, 0.8));

    // "abc" count parses as 0
    let csoc = p.metrics(Approach::Csoc).unwrap_or(MetricTriple::FAILED);
    assert_eq!(csoc.precision, 0.0);
    assert_eq!(csoc.recall, 0.0);
    assert_eq!(csoc.f1, SENTINEL);

    // 7 stages, each one agent and one assistant call
    assert_eq!(recorded(&calls).len(), 14);
    assert_eq!(ledger.len(), 1 + 2 * 7);
    assert_eq!(ledger.count(TurnRole::Assistant), 7);

    // the count prompt is built from the ordered lists
    let count_prompt = &ledger.turns()[9].content;
    assert_eq!(
        count_prompt,
        "N1 neural networks, nlp | neural network, nlp, natural language processing"
    );
}

#[tokio::test]
async fn remote_failures_degrade_to_sentinels() {
    let (gw, calls) = gateway(true);
    let prompts = prompts();
    let mut p = publication();

    let ledger = Pipeline::new(&gw, &prompts).process_publication(&mut p).await;

    assert_eq!(p.skgc_topics, Some(Vec::new()));
    assert_eq!(p.skgc_topics_ordered, Some(Vec::new()));
    assert_eq!(p.metrics(Approach::Skgc), Some(MetricTriple::FAILED));
    assert_eq!(p.metrics(Approach::Csoc), Some(MetricTriple::FAILED));
    assert_eq!(recorded(&calls).len(), 14);
    // empty verified answers are still recorded
    assert_eq!(ledger.count(TurnRole::Assistant), 7);
}

#[tokio::test]
async fn missing_templates_skip_stages() {
    let (gw, calls) = gateway(false);
    let prompts = PromptSet::default();
    let mut p = publication();

    let ledger = Pipeline::new(&gw, &prompts).process_publication(&mut p).await;

    assert!(recorded(&calls).is_empty());
    assert_eq!(ledger.len(), 1);
    assert_eq!(p.skgc_topics, Some(Vec::new()));
    assert_eq!(p.metrics(Approach::Skgc), Some(MetricTriple::FAILED));
    assert_eq!(p.metrics(Approach::Csoc), Some(MetricTriple::FAILED));
}

#[tokio::test]
async fn run_keeps_ledgers_per_publication() {
    let (gw, calls) = gateway(false);
    let prompts = prompts();
    let mut second = publication();
    second.title = "Second paper".into();
    let mut pubs = vec![publication(), second];

    let ledgers = Pipeline::new(&gw, &prompts).run(&mut pubs).await;

    assert_eq!(ledgers.len(), 2);
    assert_eq!(recorded(&calls).len(), 28);
    assert!(ledgers[0].turns()[1].content.contains("Neural parsing"));
    assert!(ledgers[1].turns()[1].content.contains("Second paper"));
    assert!(ledgers[1]
        .turns()
        .iter()
        .all(|t| !t.content.contains("Neural parsing")));
    assert_eq!(ledgers[1].len(), 15);
}

#[tokio::test]
async fn evaluated_records_round_trip() -> Result<()> {
    let (gw, _) = gateway(false);
    let prompts = prompts();
    let mut pubs = vec![publication()];
    Pipeline::new(&gw, &prompts).run(&mut pubs).await;

    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("results.json");
    save_records(&path, &pubs)?;
    assert_eq!(load_records(&path)?, pubs);
    Ok(())
}

//! # rustskgc
//!
//! Scientific Knowledge Graph Construction - topic extraction from
//! publication metadata through a two-role LLM dialogue, scored against a
//! human gold standard and the CSO classifier baseline.
//!
//! ## Modules
//!
//! - [`gateway`] - Agent/assistant chat-completion gateway
//! - [`conversation`] - Per-publication agent ledger
//! - [`prompts`] - YAML prompt templates and builders
//! - [`extraction`] - Three-stage topic extraction
//! - [`evaluation`] - Four-stage evaluation against the gold standard
//! - [`metrics`] / [`aggregate`] - Precision, recall, F1 and corpus verdict
//! - [`publication`] - Records, corpus input, JSON output
//! - [`report`] - Console/file report and CSV export
//! - [`pipeline`] - Sequential run driver
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustskgc::{gateway::{Gateway, GatewayConfig}, pipeline::Pipeline, prompts::PromptSet, publication};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Gateway::from_env(GatewayConfig::default())?;
//!     let prompts = PromptSet::load_dir(Path::new("templates"));
//!     let mut pubs = publication::load_corpus(Path::new("corpus.json"))?;
//!     let ledgers = Pipeline::new(&gateway, &prompts).run(&mut pubs).await;
//!     println!("Processed {} publications", ledgers.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod conversation;
pub mod error;
pub mod evaluation;
pub mod extraction;
pub mod gateway;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod publication;
pub mod report;

pub use error::{Result, SkgcError};

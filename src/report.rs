//! Human-readable run report and tabular exports.
//!
//! Report text is written through a [`ReportSink`], a scoped fan-out writer
//! (console, optionally plus a file). The sink lives only as long as the
//! report is being written; no process-wide output is redirected.

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::aggregate::CorpusSummary;
use crate::conversation::Ledger;
use crate::error::Result;
use crate::publication::Publication;

const RULE_WIDTH: usize = 160;
const COLUMN_WIDTH: usize = 40;

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

// ============================================================================
// Output sink
// ============================================================================

/// Writer that forwards every write and flush to all of its targets.
pub struct FanOutWriter {
    targets: Vec<Box<dyn Write>>,
}

impl FanOutWriter {
    pub fn new(targets: Vec<Box<dyn Write>>) -> Self {
        Self { targets }
    }
}

impl Write for FanOutWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for target in &mut self.targets {
            target.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for target in &mut self.targets {
            target.flush()?;
        }
        Ok(())
    }
}

/// Destination for report text.
pub struct ReportSink {
    writer: FanOutWriter,
}

impl ReportSink {
    /// Console only.
    pub fn console() -> Self {
        Self {
            writer: FanOutWriter::new(vec![Box::new(io::stdout())]),
        }
    }

    /// Console and `path` simultaneously.
    pub fn console_and_file(path: &Path) -> Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        info!(path = %path.display(), "Writing report to file");
        Ok(Self {
            writer: FanOutWriter::new(vec![Box::new(io::stdout()), Box::new(file)]),
        })
    }

    /// Console, plus `path` when given.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::console_and_file(path),
            None => Ok(Self::console()),
        }
    }
}

impl Write for ReportSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for ReportSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

// ============================================================================
// Report sections
// ============================================================================

/// Dump every publication's agent conversation.
pub fn write_conversations<W: Write>(out: &mut W, ledgers: &[Ledger]) -> io::Result<()> {
    writeln!(out, "{}", rule())?;
    writeln!(out, "{}", rule())?;
    writeln!(out, "Conversation with GPT agent: Topic extraction and evaluation")?;
    for (idx, ledger) in ledgers.iter().enumerate() {
        writeln!(out, "{}", rule())?;
        writeln!(out, "Publication {} of {}", idx + 1, ledgers.len())?;
        for turn in ledger.turns() {
            writeln!(out, "Role: {}", capitalize(turn.role.as_str()))?;
            writeln!(out, "{}", rule())?;
            writeln!(out, "Content: {}", turn.content)?;
            writeln!(out, "{}", rule())?;
        }
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn row<W: Write>(out: &mut W, cells: [&str; 4]) -> io::Result<()> {
    writeln!(
        out,
        "{:<w$} {:<w$} {:<w$} {:<w$}",
        cells[0],
        cells[1],
        cells[2],
        cells[3],
        w = COLUMN_WIDTH
    )
}

/// Metrics always show a decimal point: `1.0`, `0.0`, `-1.0`.
fn metric_text(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:?}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn cell(list: &Option<Vec<String>>, idx: usize) -> &str {
    list.as_ref()
        .and_then(|l| l.get(idx))
        .map(String::as_str)
        .unwrap_or("")
}

/// Per-publication comparison table for one record.
pub fn write_publication_table<W: Write>(out: &mut W, publication: &Publication) -> io::Result<()> {
    writeln!(out, "Publication title: {}", publication.title)?;
    writeln!(out)?;
    row(
        out,
        [
            "SKGC Topics",
            "Gold Standard (Order 1)",
            "Gold Standard (Order 2)",
            "CSOC Topics",
        ],
    )?;
    writeln!(out, "{}", rule())?;

    let columns = [
        &publication.skgc_topics_ordered,
        &publication.gold_standard_ordered1,
        &publication.gold_standard_ordered2,
        &publication.csoc_topics_ordered,
    ];
    let rows = columns
        .iter()
        .map(|&c| c.as_ref().map_or(0, Vec::len))
        .max()
        .unwrap_or(0);
    for idx in 0..rows {
        row(
            out,
            [
                cell(columns[0], idx),
                cell(columns[1], idx),
                cell(columns[2], idx),
                cell(columns[3], idx),
            ],
        )?;
        writeln!(out, "{}", rule())?;
    }

    let metric_rows = [
        ("Precision", publication.skgc_precision, publication.csoc_precision),
        ("Recall", publication.skgc_recall, publication.csoc_recall),
        ("F1", publication.skgc_f1, publication.csoc_f1),
    ];
    for (i, (name, skgc, csoc)) in metric_rows.iter().enumerate() {
        if i > 0 {
            writeln!(out, "{}", rule())?;
        }
        let skgc = format!("{}: {}", name, metric_text(*skgc));
        let csoc = format!("{}: {}", name, metric_text(*csoc));
        row(out, [skgc.as_str(), "", "", csoc.as_str()])?;
    }
    Ok(())
}

/// Corpus means and the final verdict.
pub fn write_summary<W: Write>(out: &mut W, summary: &CorpusSummary) -> io::Result<()> {
    let sections = [
        ("Precision", summary.skgc.precision, summary.csoc.precision),
        ("Recall", summary.skgc.recall, summary.csoc.recall),
        ("F1", summary.skgc.f1, summary.csoc.f1),
    ];
    writeln!(out)?;
    for (name, skgc, csoc) in sections {
        writeln!(out, "{}", rule())?;
        writeln!(out, "Overall comparison between SKGC and CSOC: {} mean comparison", name)?;
        writeln!(out, "{} mean of SKGC approach: {}", name, metric_text(Some(skgc)))?;
        writeln!(out, "{} mean of CSOC approach: {}", name, metric_text(Some(csoc)))?;
    }
    writeln!(out, "{}", rule())?;
    writeln!(out, "{}", summary.verdict.sentence())?;
    Ok(())
}

/// Full evaluation report: one table per publication, then the summary.
pub fn write_evaluation_details<W: Write>(
    out: &mut W,
    publications: &[Publication],
    summary: &CorpusSummary,
) -> io::Result<()> {
    writeln!(out, "{}", rule())?;
    writeln!(out, "Evaluation details:")?;
    for (idx, publication) in publications.iter().enumerate() {
        writeln!(out, "{}", rule())?;
        writeln!(out, "Publication {} of {}:", idx + 1, publications.len())?;
        writeln!(out)?;
        write_publication_table(out, publication)?;
    }
    write_summary(out, summary)?;
    out.flush()
}

// ============================================================================
// CSV export
// ============================================================================

#[derive(Debug, Serialize)]
struct MetricsRow<'a> {
    index: usize,
    title: &'a str,
    skgc_topics: String,
    skgc_precision: Option<f64>,
    skgc_recall: Option<f64>,
    skgc_f1: Option<f64>,
    csoc_precision: Option<f64>,
    csoc_recall: Option<f64>,
    csoc_f1: Option<f64>,
}

/// One CSV row of metrics per publication.
pub fn save_metrics_csv(path: &Path, publications: &[Publication]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    for (idx, p) in publications.iter().enumerate() {
        wtr.serialize(MetricsRow {
            index: idx + 1,
            title: &p.title,
            skgc_topics: p.skgc_topics.as_deref().map(|t| t.join(", ")).unwrap_or_default(),
            skgc_precision: p.skgc_precision,
            skgc_recall: p.skgc_recall,
            skgc_f1: p.skgc_f1,
            csoc_precision: p.csoc_precision,
            csoc_recall: p.csoc_recall,
            csoc_f1: p.csoc_f1,
        })?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = publications.len(), "Saved metrics CSV");
    Ok(())
}

//! Human-readable scenario summaries and CSV export.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::scenarios::congestion::CongestionReport;
use crate::scenarios::queue::QueueReport;
use crate::scenarios::redisen::{HonestOutcome, RedisenReport};

pub fn print_congestion<W: Write>(out: &mut W, report: &CongestionReport) -> Result<()> {
    for (i, percent) in report.transmitting_percent.iter().enumerate() {
        writeln!(out, "{}: {:.2}%", i, percent)?;
    }
    writeln!(out, "mean: {:.2}%", report.mean_percent())?;
    Ok(())
}

pub fn print_redisen<W: Write>(out: &mut W, report: &RedisenReport) -> Result<()> {
    if report.primary_transmitting {
        writeln!(
            out,
            "PU was transmitting (higher value more accurate, malicious users pull it down)"
        )?;
    } else {
        writeln!(
            out,
            "PU was not transmitting (lower value more accurate, malicious users push it up)"
        )?;
    }
    for outcome in &report.honest {
        writeln!(
            out,
            "{} - started at {:.4}, ended at {:.4} (primary {})",
            outcome.agent,
            outcome.first,
            outcome.last,
            if outcome.detected { "detected" } else { "absent" }
        )?;
    }
    Ok(())
}

pub fn print_queue<W: Write>(out: &mut W, report: &QueueReport) -> Result<()> {
    for tick in &report.ticks {
        writeln!(
            out,
            "tick {:>4}  agent {:<4} delta {:>8.3}  clock {:>10.3}",
            tick.tick,
            tick.agent.to_string(),
            tick.delta,
            tick.clock
        )?;
    }
    for (agent, count) in &report.activations {
        writeln!(out, "{}: {} activations", agent, count)?;
    }
    writeln!(out, "final clock: {:.3}", report.clock)?;
    Ok(())
}

/// One row per refinement round: `agent,round,estimate`.
pub fn write_history_csv<W: Write>(out: W, outcomes: &[HonestOutcome]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["agent", "round", "estimate"])?;
    for outcome in outcomes {
        for (round, estimate) in outcome.history.iter().enumerate() {
            writer.write_record(&[
                outcome.agent.0.to_string(),
                round.to_string(),
                estimate.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn save_history_csv(path: &Path, outcomes: &[HonestOutcome]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating history file {}", path.display()))?;
    write_history_csv(file, outcomes).with_context(|| format!("writing {}", path.display()))
}

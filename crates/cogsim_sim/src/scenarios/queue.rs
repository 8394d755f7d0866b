//! Cadence demo on the event-queue scheduler: reporters with different wake
//! intervals watch a duty-cycled primary.

use std::collections::BTreeMap;

use anyhow::Result;
use cogsim_core::{
    AgentId, PrimaryUser, QueueEntry, QueueSimulator, Reporter, SensingParams, Sensor, SimConfig,
    Tick, User,
};
use serde::Serialize;
use tracing::info;

use crate::config::QueueConfig;
use crate::placement::placement_rng;

#[derive(Debug, Clone, Serialize)]
pub struct QueueReport {
    pub ticks: Vec<Tick>,
    /// Times each agent was woken.
    pub activations: BTreeMap<AgentId, u64>,
    pub clock: f64,
}

pub fn run(cfg: &QueueConfig, sensing: SensingParams, seed: u64) -> Result<QueueReport> {
    let mut placement = placement_rng(seed);
    let mut entries = Vec::with_capacity(cfg.reporter_intervals.len() + 1);

    for (i, &interval) in cfg.reporter_intervals.iter().enumerate() {
        let reporter = User::reporter(
            AgentId(i),
            cfg.area.sample(&mut placement),
            Reporter::new(Sensor::honest(sensing)?),
        )
        .in_band(Some(0));
        entries.push(QueueEntry::new(reporter, interval)?);
    }

    let primary = User::primary(
        AgentId(entries.len()),
        cfg.area.sample(&mut placement),
        PrimaryUser::duty_cycle(
            0,
            cfg.time_in.to_range()?,
            cfg.time_out.to_range()?,
            &mut placement,
        ),
    );
    entries.push(QueueEntry::new(primary, cfg.primary_interval)?);

    let mut sim = QueueSimulator::new(SimConfig::new(1, 1).with_seed(seed), entries)?;
    info!(
        reporters = cfg.reporter_intervals.len(),
        ticks = cfg.ticks,
        "running queue scenario"
    );
    let ticks = sim.run(cfg.ticks)?;

    let mut activations = BTreeMap::new();
    for tick in &ticks {
        *activations.entry(tick.agent).or_insert(0) += 1;
    }
    Ok(QueueReport {
        ticks,
        activations,
        clock: sim.total_time(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_reporters_wake_more() {
        let cfg = QueueConfig {
            ticks: 200,
            ..QueueConfig::default()
        };
        let report = run(&cfg, SensingParams::default(), 2).unwrap();
        assert_eq!(report.ticks.len(), 200);
        let fast = report.activations[&AgentId(0)];
        let slow = report.activations[&AgentId(2)];
        assert!(fast > slow, "interval 1.0 should beat interval 4.0");
        assert_eq!(report.ticks.last().unwrap().clock, report.clock);
    }

    #[test]
    fn test_bad_interval_is_an_error() {
        let cfg = QueueConfig {
            reporter_intervals: vec![0.0],
            ..QueueConfig::default()
        };
        assert!(run(&cfg, SensingParams::default(), 0).is_err());
    }
}

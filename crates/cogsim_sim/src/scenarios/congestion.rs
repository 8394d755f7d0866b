//! Baseline: 30 non-cooperative users hopping between 10 bands, leaving any
//! band that holds more than the congestion limit.

use anyhow::Result;
use cogsim_core::{AgentId, CongestionHopper, SimConfig, SyncSimulator, User};
use serde::Serialize;
use tracing::info;

use crate::config::CongestionConfig;

#[derive(Debug, Clone, Serialize)]
pub struct CongestionReport {
    pub steps: u64,
    /// Share of steps each user spent transmitting, in population order.
    pub transmitting_percent: Vec<f64>,
}

impl CongestionReport {
    pub fn mean_percent(&self) -> f64 {
        if self.transmitting_percent.is_empty() {
            return 0.0;
        }
        self.transmitting_percent.iter().sum::<f64>() / self.transmitting_percent.len() as f64
    }
}

pub fn run(cfg: &CongestionConfig, seed: u64) -> Result<CongestionReport> {
    let users = (0..cfg.users)
        .map(|i| {
            let hopper = CongestionHopper::new(cfg.congestion_limit, cfg.bands)?;
            Ok(User::congestion_hopper(AgentId(i), hopper))
        })
        .collect::<cogsim_core::Result<Vec<_>>>()?;

    let mut sim = SyncSimulator::new(SimConfig::new(cfg.bands, 1).with_seed(seed), users)?;
    info!(
        users = cfg.users,
        bands = cfg.bands,
        limit = cfg.congestion_limit,
        steps = cfg.steps,
        "running congestion scenario"
    );
    sim.run(cfg.steps)?;

    let transmitting_percent = sim
        .agents()
        .iter()
        .map(|u| u.metrics().transmitting_percent())
        .collect();
    Ok(CongestionReport {
        steps: cfg.steps,
        transmitting_percent,
    })
}

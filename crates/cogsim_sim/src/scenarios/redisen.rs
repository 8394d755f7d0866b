//! Basic ReDiSen: honest and malicious secondary users share band 0 with a
//! single primary user and fuse their readings over two passes.

use anyhow::Result;
use cogsim_core::{
    Agent, AgentId, ConsensusParams, CooperativeUser, PrimaryUser, SensingParams, Sensor,
    SimConfig, SyncSimulator, User,
};
use serde::Serialize;
use tracing::info;

use crate::config::RedisenConfig;
use crate::placement::placement_rng;

/// One honest user's view of the last evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct HonestOutcome {
    pub agent: AgentId,
    /// Estimate after the first refinement round.
    pub first: f64,
    /// Estimate after the last refinement round.
    pub last: f64,
    pub detected: bool,
    #[serde(skip)]
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedisenReport {
    pub primary_transmitting: bool,
    pub honest: Vec<HonestOutcome>,
}

pub fn build_population(
    cfg: &RedisenConfig,
    sensing: SensingParams,
    consensus: ConsensusParams,
    seed: u64,
) -> Result<Vec<User>> {
    let mut placement = placement_rng(seed);
    let mut users = Vec::with_capacity(cfg.honest + cfg.malicious + 1);

    for i in 0..cfg.honest + cfg.malicious {
        let sensor = if i < cfg.honest {
            Sensor::honest(sensing)?
        } else {
            Sensor::malicious(sensing, cfg.attack_likelihood)?
        };
        let cooperative = CooperativeUser::new(sensor, consensus, 0)?
            .with_retention(cfg.retention)
            .acting_on_estimate(cfg.act_on_estimate);
        users.push(User::cooperative(
            AgentId(i),
            cfg.area.sample(&mut placement),
            cooperative,
        ));
    }

    let band = cfg.primary_transmitting.then_some(0);
    users.push(
        User::primary(
            AgentId(users.len()),
            cfg.area.sample(&mut placement),
            PrimaryUser::constant(),
        )
        .in_band(band)
        .with_transmit_power(cfg.primary_transmit_power),
    );
    Ok(users)
}

pub fn run(
    cfg: &RedisenConfig,
    sensing: SensingParams,
    consensus: ConsensusParams,
    seed: u64,
) -> Result<RedisenReport> {
    let users = build_population(cfg, sensing, consensus, seed)?;
    let mut sim = SyncSimulator::new(SimConfig::new(1, cfg.passes).with_seed(seed), users)?;
    info!(
        honest = cfg.honest,
        malicious = cfg.malicious,
        steps = cfg.steps,
        passes = cfg.passes,
        mode = ?consensus.reputation_mode,
        "running redisen scenario"
    );
    sim.run(cfg.steps)?;

    let honest = sim
        .agents()
        .iter()
        .filter(|u| u.is_honest_cooperative())
        .filter_map(|u| {
            let coop = u.as_cooperative()?;
            let history = coop.estimate_history();
            Some(HonestOutcome {
                agent: u.id(),
                first: *history.first()?,
                last: *history.last()?,
                detected: coop.primary_detected()?,
                history: history.to_vec(),
            })
        })
        .collect();

    Ok(RedisenReport {
        primary_transmitting: cfg.primary_transmitting,
        honest,
    })
}

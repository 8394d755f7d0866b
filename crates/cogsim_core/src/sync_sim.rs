//! Synchronous multi-pass scheduler.
//!
//! Each step:
//! 1. snapshot band membership once,
//! 2. run every agent, in population order, once per pass, against that
//!    same snapshot (band moves made mid-step only show up next step),
//! 3. let every agent observe the result through its metrics callback,
//! 4. advance the step counter.

use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::agent::{Agent, AgentId, Directory, StepContext, Vote};
use crate::band::{check_bands, BandSnapshot};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::SimRng;

/// The two per-step values exported for classifier training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub observed_value: f64,
    pub primary_present: bool,
}

pub struct SyncSimulator<A: Agent> {
    config: SimConfig,
    agents: Vec<A>,
    directory: Directory,
    rng: SimRng,
    current_step: u64,
    outbox: Vec<Vote>,
}

impl<A: Agent> SyncSimulator<A> {
    /// Build a simulator seeded from `config.seed`.
    pub fn new(config: SimConfig, agents: Vec<A>) -> Result<Self> {
        let rng = SimRng::seed_from_u64(config.seed);
        Self::with_rng(config, agents, rng)
    }

    /// Build a simulator around an existing random source.
    pub fn with_rng(config: SimConfig, agents: Vec<A>, rng: SimRng) -> Result<Self> {
        config.validate()?;
        let directory = Directory::build(&agents)?;
        check_bands(&agents, config.band_count)?;

        let needed = agents.iter().map(Agent::required_passes).max().unwrap_or(1);
        if needed > config.pass_count {
            warn!(
                needed,
                configured = config.pass_count,
                "population relies on more passes than configured; later phases will never run"
            );
        }

        Ok(Self {
            config,
            agents,
            directory,
            rng,
            current_step: 0,
            outbox: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn num_bands(&self) -> usize {
        self.config.band_count
    }

    pub fn passes(&self) -> usize {
        self.config.pass_count
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn agents(&self) -> &[A] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&A> {
        let slot = self.directory.slot(id).ok()?;
        self.agents.get(slot)
    }

    pub fn into_agents(self) -> Vec<A> {
        self.agents
    }

    /// Current band membership of every band.
    pub fn band_contents(&self) -> Result<BandSnapshot> {
        BandSnapshot::partition(&self.agents, self.config.band_count)
    }

    /// Run one synchronous step.
    pub fn step(&mut self) -> Result<()> {
        let snapshot = self.band_contents()?;
        let step_index = self.current_step;
        debug!(step = step_index, occupancy = ?snapshot.occupancy(), "step start");

        for pass_index in 0..self.config.pass_count {
            for slot in 0..self.agents.len() {
                let agent = &mut self.agents[slot];
                let view = snapshot.view_for(&*agent)?;
                trace!(step = step_index, pass = pass_index, agent = %agent.id(), "agent step");
                let mut ctx = StepContext::new(
                    view,
                    pass_index,
                    step_index,
                    &mut self.rng,
                    &mut self.outbox,
                );
                agent.step(&mut ctx)?;

                let agents = &mut self.agents;
                self.directory
                    .deliver(&mut self.outbox, |to, vote| agents[to].receive_vote(vote))?;
            }
        }

        check_bands(&self.agents, self.config.band_count)?;

        for agent in &mut self.agents {
            let before = agent.band();
            agent.collect_metrics(step_index);
            let after = agent.band();
            if before != after {
                return Err(SimError::BandChangedDuringMetrics {
                    agent: agent.id(),
                    before,
                    after,
                });
            }
        }

        self.current_step += 1;
        Ok(())
    }

    /// Run `steps` consecutive steps, stopping at the first error.
    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Latest report of `reporter`, paired with whether `primary` currently
    /// holds a band.
    pub fn observe(&self, reporter: AgentId, primary: AgentId) -> Result<Observation> {
        let reporter_agent = &self.agents[self.directory.slot(reporter)?];
        let primary_agent = &self.agents[self.directory.slot(primary)?];
        let observed_value = reporter_agent
            .reported_value()
            .ok_or(SimError::NoReport(reporter))?;
        Ok(Observation {
            observed_value,
            primary_present: primary_agent.band().is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusParams;
    use crate::geometry::Point2D;
    use crate::roles::{CongestionHopper, CooperativeUser, PrimaryUser, Reporter};
    use crate::sensing::{SensingParams, Sensor, NOISE_FLOOR_DBM, PU_TRANSMIT_POWER_DBM};
    use crate::user::User;

    fn honest(id: usize, x: f64) -> User {
        let sensor = Sensor::honest(SensingParams::default()).unwrap();
        let coop = CooperativeUser::new(sensor, ConsensusParams::default(), 0).unwrap();
        User::cooperative(AgentId(id), Point2D::new(x, 0.0), coop)
    }

    fn liar(id: usize, x: f64) -> User {
        let sensor = Sensor::malicious(SensingParams::default(), 1.0).unwrap();
        let coop = CooperativeUser::new(sensor, ConsensusParams::default(), 0).unwrap();
        User::cooperative(AgentId(id), Point2D::new(x, 0.0), coop)
    }

    fn transmitting_primary(id: usize) -> User {
        User::primary(AgentId(id), Point2D::ORIGIN, PrimaryUser::constant()).in_band(Some(0))
    }

    #[test]
    fn test_rejects_zero_bands_and_passes() {
        let err = SyncSimulator::<User>::new(SimConfig::new(0, 1), Vec::new()).err();
        assert_eq!(err, Some(SimError::ZeroBands));
        let err = SyncSimulator::<User>::new(SimConfig::new(1, 0), Vec::new()).err();
        assert_eq!(err, Some(SimError::ZeroPasses));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = SyncSimulator::new(SimConfig::new(1, 2), vec![honest(1, 10.0), honest(1, 20.0)])
            .err();
        assert_eq!(err, Some(SimError::DuplicateAgent(AgentId(1))));
    }

    #[test]
    fn test_rejects_out_of_range_band_at_construction() {
        let pu = transmitting_primary(0).in_band(Some(3));
        let err = SyncSimulator::new(SimConfig::new(2, 1), vec![pu]).err();
        assert_eq!(
            err,
            Some(SimError::BandOutOfRange {
                agent: AgentId(0),
                band: 3,
                num_bands: 2,
            })
        );
    }

    #[test]
    fn test_empty_population_steps() {
        let mut sim = SyncSimulator::<User>::new(SimConfig::new(4, 2), Vec::new()).unwrap();
        sim.run(5).unwrap();
        assert_eq!(sim.current_step(), 5);
        assert_eq!(sim.band_contents().unwrap().occupancy(), vec![0; 4]);
    }

    #[test]
    fn test_votes_flow_between_passes() {
        let agents = vec![honest(0, 100.0), honest(1, 200.0), transmitting_primary(2)];
        let mut sim = SyncSimulator::new(SimConfig::new(1, 2).with_seed(5), agents).unwrap();
        sim.step().unwrap();

        for id in [0, 1] {
            let coop = sim.agent(AgentId(id)).unwrap().as_cooperative().unwrap();
            assert_eq!(coop.votes().len(), 2);
            assert!(coop.last_estimate().is_some());
            assert_eq!(coop.estimate_history().len(), 150);
            assert_eq!(coop.primary_detected(), Some(true));
        }
        let sent = sim.agent(AgentId(0)).unwrap().metrics().votes_sent;
        assert_eq!(sent, 2);
    }

    #[test]
    fn test_single_pass_never_evaluates() {
        let agents = vec![honest(0, 100.0), honest(1, 200.0), transmitting_primary(2)];
        let mut sim = SyncSimulator::new(SimConfig::new(1, 1), agents).unwrap();
        sim.run(3).unwrap();
        let coop = sim.agent(AgentId(0)).unwrap().as_cooperative().unwrap();
        assert_eq!(coop.votes().len(), 2);
        assert_eq!(coop.last_estimate(), None);
    }

    #[test]
    fn test_liar_pulls_estimate_down() {
        let agents = vec![honest(0, 100.0), liar(1, 150.0), transmitting_primary(2)];
        let mut sim = SyncSimulator::new(SimConfig::new(1, 2).with_seed(99), agents).unwrap();
        sim.step().unwrap();

        let coop = sim.agent(AgentId(0)).unwrap().as_cooperative().unwrap();
        let own = coop.last_sensed().unwrap();
        let fused = coop.last_estimate().unwrap();
        assert!(fused < own);
        assert!(fused > NOISE_FLOOR_DBM && fused < PU_TRANSMIT_POWER_DBM);
        // The liar reports but never evaluates.
        let liar = sim.agent(AgentId(1)).unwrap().as_cooperative().unwrap();
        assert_eq!(liar.last_sensed(), Some(NOISE_FLOOR_DBM));
        assert_eq!(liar.last_estimate(), None);
    }

    #[test]
    fn test_congestion_hoppers_stay_in_range() {
        let bands = 10;
        let agents: Vec<User> = (0..30)
            .map(|i| User::congestion_hopper(AgentId(i), CongestionHopper::new(3, bands).unwrap()))
            .collect();
        let mut sim = SyncSimulator::new(SimConfig::new(bands, 1).with_seed(1), agents).unwrap();
        for _ in 0..200 {
            sim.step().unwrap();
            for agent in sim.agents() {
                assert!(agent.band().map_or(true, |b| b < bands));
            }
        }
        let total: u64 = sim
            .agents()
            .iter()
            .map(|a| a.metrics().steps_transmitting)
            .sum();
        assert!(total > 0);
        assert!(sim.agents().iter().all(|a| a.metrics().steps_observed == 200));
    }

    #[test]
    fn test_observe_reporter_and_primary() {
        let reporter = User::reporter(
            AgentId(0),
            Point2D::new(10.0, 0.0),
            Reporter::new(Sensor::honest(SensingParams::default()).unwrap()),
        )
        .in_band(Some(0));
        let agents = vec![reporter, transmitting_primary(1)];
        let mut sim = SyncSimulator::new(SimConfig::default(), agents).unwrap();

        assert_eq!(
            sim.observe(AgentId(0), AgentId(1)).unwrap_err(),
            SimError::NoReport(AgentId(0))
        );
        sim.step().unwrap();
        let obs = sim.observe(AgentId(0), AgentId(1)).unwrap();
        assert!(obs.primary_present);
        assert!(obs.observed_value > NOISE_FLOOR_DBM);
        assert_eq!(
            sim.observe(AgentId(0), AgentId(7)).unwrap_err(),
            SimError::UnknownAgent(AgentId(7))
        );
    }

    #[test]
    fn test_same_seed_same_run() {
        let build = || {
            let agents = vec![
                honest(0, 100.0),
                honest(1, 300.0),
                liar(2, 500.0),
                transmitting_primary(3),
            ];
            SyncSimulator::new(SimConfig::new(1, 2).with_seed(1234), agents).unwrap()
        };
        let mut a = build();
        let mut b = build();
        a.run(10).unwrap();
        b.run(10).unwrap();
        let ea = a.agent(AgentId(0)).unwrap().as_cooperative().unwrap().last_estimate();
        let eb = b.agent(AgentId(0)).unwrap().as_cooperative().unwrap().last_estimate();
        assert_eq!(ea, eb);
    }
}

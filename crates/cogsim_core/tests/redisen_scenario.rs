//! End-to-end ReDiSen runs on the synchronous scheduler.

use cogsim_core::consensus::ConsensusParams;
use cogsim_core::sensing::{NOISE_FLOOR_DBM, PU_TRANSMIT_POWER_DBM};
use cogsim_core::{
    AgentId, CooperativeUser, Point2D, PrimaryUser, ReputationMode, SensingParams, Sensor,
    SimConfig, SyncSimulator, User,
};

fn secondary(id: usize, position: Point2D, attack: Option<f64>, mode: ReputationMode) -> User {
    let params = SensingParams::default();
    let sensor = match attack {
        Some(p) => Sensor::malicious(params, p).unwrap(),
        None => Sensor::honest(params).unwrap(),
    };
    let consensus = ConsensusParams {
        reputation_mode: mode,
        ..ConsensusParams::default()
    };
    User::cooperative(
        AgentId(id),
        position,
        CooperativeUser::new(sensor, consensus, 0).unwrap(),
    )
}

fn primary(id: usize) -> User {
    User::primary(AgentId(id), Point2D::ORIGIN, PrimaryUser::constant()).in_band(Some(0))
}

#[test]
fn test_one_honest_one_liar() {
    let agents = vec![
        primary(0),
        secondary(1, Point2D::new(100.0, 0.0), None, ReputationMode::Redisen),
        secondary(2, Point2D::new(200.0, 0.0), Some(1.0), ReputationMode::Redisen),
    ];
    let mut sim = SyncSimulator::new(SimConfig::new(1, 2).with_seed(2024), agents).unwrap();
    sim.step().unwrap();

    let honest = sim.agent(AgentId(1)).unwrap().as_cooperative().unwrap();
    let own = honest.last_sensed().unwrap();
    let history = honest.estimate_history();
    let estimate = honest.last_estimate().unwrap();

    println!(
        "own {:.2} dBm, first {:.2}, last {:.2}",
        own,
        history[0],
        history[history.len() - 1]
    );

    assert_eq!(history.len(), 150);
    assert!(estimate > NOISE_FLOOR_DBM, "Estimate fell below the noise floor");
    assert!(estimate < PU_TRANSMIT_POWER_DBM, "Estimate exceeded the transmit power");
    assert!(estimate < own, "Liar should pull the estimate down");
    assert!(
        history.windows(2).all(|w| w[1] <= w[0]),
        "Estimate should move monotonically towards the pooled value"
    );

    let liar = sim.agent(AgentId(2)).unwrap().as_cooperative().unwrap();
    assert_eq!(liar.last_sensed(), Some(NOISE_FLOOR_DBM));
}

fn mixed_population(mode: ReputationMode) -> SyncSimulator<User> {
    let mut agents = vec![primary(0)];
    for i in 0..7 {
        let position = Point2D::new(100.0 + 90.0 * i as f64, 40.0 * i as f64);
        agents.push(secondary(1 + i, position, None, mode));
    }
    for i in 0..3 {
        let position = Point2D::new(300.0, 150.0 + 200.0 * i as f64);
        agents.push(secondary(8 + i, position, Some(1.0), mode));
    }
    SyncSimulator::new(SimConfig::new(1, 2).with_seed(7), agents).unwrap()
}

#[test]
fn test_reputation_beats_plain_average() {
    let mut redisen = mixed_population(ReputationMode::Redisen);
    let mut uniform = mixed_population(ReputationMode::Uniform);
    redisen.run(3).unwrap();
    uniform.run(3).unwrap();

    for id in 1..=7 {
        let r = redisen
            .agent(AgentId(id))
            .unwrap()
            .as_cooperative()
            .unwrap();
        let u = uniform
            .agent(AgentId(id))
            .unwrap()
            .as_cooperative()
            .unwrap();
        let r_est = r.last_estimate().unwrap();
        let u_est = u.last_estimate().unwrap();
        println!("user {}: redisen {:.2} uniform {:.2}", id, r_est, u_est);

        assert!(r_est > u_est + 10.0, "Reputation weighting should resist liars");
        assert_eq!(r.primary_detected(), Some(true));

        let reputations = &r.last_outcome().unwrap().reputations;
        let liar_rep = reputations[&AgentId(8)];
        let honest_rep = reputations[&AgentId(id)];
        assert!(liar_rep < honest_rep);
    }

    for id in 8..=10 {
        let liar = redisen.agent(AgentId(id)).unwrap().as_cooperative().unwrap();
        assert_eq!(liar.last_estimate(), None, "Malicious users never evaluate");
    }
}

#[test]
fn test_empty_band_reads_noise_floor_everywhere() {
    let agents = vec![
        secondary(0, Point2D::new(10.0, 10.0), None, ReputationMode::Redisen),
        secondary(1, Point2D::new(20.0, 10.0), None, ReputationMode::Redisen),
    ];
    let mut sim = SyncSimulator::new(SimConfig::new(1, 2), agents).unwrap();
    sim.step().unwrap();
    for id in 0..2 {
        let coop = sim.agent(AgentId(id)).unwrap().as_cooperative().unwrap();
        assert_eq!(coop.last_sensed(), Some(NOISE_FLOOR_DBM));
        assert!((coop.last_estimate().unwrap() - NOISE_FLOOR_DBM).abs() < 1e-9);
        assert_eq!(coop.primary_detected(), Some(false));
    }
}

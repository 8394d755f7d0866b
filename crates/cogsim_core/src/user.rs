//! The concrete agent type: one struct, a closed set of roles.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, Peer, PeerKind, StepContext, Vote};
use crate::error::Result;
use crate::geometry::Point2D;
use crate::roles::{CongestionHopper, CooperativeUser, PrimaryUser, Reporter};
use crate::sensing::PU_TRANSMIT_POWER_DBM;

#[derive(Debug, Clone)]
pub enum Role {
    Primary(PrimaryUser),
    Cooperative(CooperativeUser),
    Reporter(Reporter),
    CongestionHopper(CongestionHopper),
}

impl Role {
    fn peer_kind(&self) -> PeerKind {
        match self {
            Role::Primary(_) => PeerKind::Primary,
            Role::Cooperative(_) => PeerKind::Cooperative,
            Role::Reporter(_) | Role::CongestionHopper(_) => PeerKind::Other,
        }
    }
}

/// Counters updated as the user runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserMetrics {
    /// Steps that ended with the user holding a band.
    pub steps_transmitting: u64,
    /// Steps observed by the metrics callback.
    pub steps_observed: u64,
    pub votes_sent: u64,
    pub votes_received: u64,
    /// Fusions performed (honest cooperative users only).
    pub evaluations: u64,
}

impl UserMetrics {
    /// Share of observed steps spent transmitting, in percent.
    pub fn transmitting_percent(&self) -> f64 {
        if self.steps_observed == 0 {
            return 0.0;
        }
        self.steps_transmitting as f64 * 100.0 / self.steps_observed as f64
    }
}

#[derive(Debug, Clone)]
pub struct User {
    id: AgentId,
    band: Option<usize>,
    position: Point2D,
    transmit_power: f64,
    role: Role,
    metrics: UserMetrics,
}

impl User {
    pub fn new(id: AgentId, position: Point2D, role: Role) -> Self {
        Self {
            id,
            band: None,
            position,
            transmit_power: PU_TRANSMIT_POWER_DBM,
            role,
            metrics: UserMetrics::default(),
        }
    }

    pub fn primary(id: AgentId, position: Point2D, primary: PrimaryUser) -> Self {
        Self::new(id, position, Role::Primary(primary))
    }

    /// A cooperative user starts in its home band.
    pub fn cooperative(id: AgentId, position: Point2D, cooperative: CooperativeUser) -> Self {
        let home = cooperative.home_band();
        Self::new(id, position, Role::Cooperative(cooperative)).in_band(Some(home))
    }

    pub fn reporter(id: AgentId, position: Point2D, reporter: Reporter) -> Self {
        Self::new(id, position, Role::Reporter(reporter))
    }

    pub fn congestion_hopper(id: AgentId, hopper: CongestionHopper) -> Self {
        Self::new(id, Point2D::ORIGIN, Role::CongestionHopper(hopper))
    }

    pub fn in_band(mut self, band: Option<usize>) -> Self {
        self.band = band;
        self
    }

    pub fn with_transmit_power(mut self, dbm: f64) -> Self {
        self.transmit_power = dbm;
        self
    }

    pub fn position(&self) -> Point2D {
        self.position
    }

    pub fn transmit_power(&self) -> f64 {
        self.transmit_power
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn metrics(&self) -> &UserMetrics {
        &self.metrics
    }

    pub fn as_cooperative(&self) -> Option<&CooperativeUser> {
        match &self.role {
            Role::Cooperative(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_primary(&self) -> Option<&PrimaryUser> {
        match &self.role {
            Role::Primary(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_honest_cooperative(&self) -> bool {
        self.as_cooperative().is_some_and(CooperativeUser::is_honest)
    }
}

impl Agent for User {
    fn id(&self) -> AgentId {
        self.id
    }

    fn band(&self) -> Option<usize> {
        self.band
    }

    fn peer(&self) -> Peer {
        Peer {
            id: self.id,
            kind: self.role.peer_kind(),
            position: self.position,
            transmit_power: self.transmit_power,
        }
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        match &mut self.role {
            Role::Primary(primary) => {
                if ctx.pass_index() == 0 {
                    self.band = primary.advance(self.band, ctx.rng());
                }
            }
            Role::Cooperative(cooperative) => {
                let (band, sent) = cooperative.step(self.id, self.position, self.band, ctx)?;
                self.band = band;
                self.metrics.votes_sent += sent as u64;
                self.metrics.evaluations = cooperative.evaluations();
            }
            Role::Reporter(reporter) => reporter.step(self.position, ctx),
            Role::CongestionHopper(hopper) => {
                self.band = hopper.step(self.band, ctx);
            }
        }
        Ok(())
    }

    fn receive_vote(&mut self, vote: &Vote) {
        if let Role::Cooperative(cooperative) = &mut self.role {
            cooperative.receive(vote);
            self.metrics.votes_received += 1;
        }
    }

    fn collect_metrics(&mut self, _step_index: u64) {
        self.metrics.steps_observed += 1;
        if self.band.is_some() {
            self.metrics.steps_transmitting += 1;
        }
    }

    fn reported_value(&self) -> Option<f64> {
        match &self.role {
            Role::Cooperative(c) => c.last_sensed(),
            Role::Reporter(r) => r.last_report(),
            _ => None,
        }
    }

    fn required_passes(&self) -> usize {
        match &self.role {
            Role::Cooperative(c) => c.required_passes(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusParams;
    use crate::sensing::{SensingParams, Sensor};

    #[test]
    fn test_peer_kind_follows_role() {
        let sensor = Sensor::honest(SensingParams::default()).unwrap();
        let coop = CooperativeUser::new(sensor, ConsensusParams::default(), 0).unwrap();
        let user = User::cooperative(AgentId(4), Point2D::new(1.0, 2.0), coop);
        let peer = user.peer();
        assert_eq!(peer.id, AgentId(4));
        assert_eq!(peer.kind, PeerKind::Cooperative);
        assert_eq!(user.band(), Some(0));
        assert_eq!(user.required_passes(), 2);

        let pu = User::primary(AgentId(5), Point2D::ORIGIN, PrimaryUser::constant())
            .in_band(Some(0))
            .with_transmit_power(30.0);
        assert_eq!(pu.peer().kind, PeerKind::Primary);
        assert_eq!(pu.peer().transmit_power, 30.0);
        assert_eq!(pu.required_passes(), 1);
    }

    #[test]
    fn test_malicious_needs_only_vote_pass() {
        let sensor = Sensor::malicious(SensingParams::default(), 1.0).unwrap();
        let coop = CooperativeUser::new(sensor, ConsensusParams::default(), 0).unwrap();
        let user = User::cooperative(AgentId(1), Point2D::ORIGIN, coop);
        assert_eq!(user.required_passes(), 1);
        assert!(!user.is_honest_cooperative());
    }

    #[test]
    fn test_transmitting_percent() {
        let metrics = UserMetrics {
            steps_transmitting: 25,
            steps_observed: 100,
            ..UserMetrics::default()
        };
        assert_eq!(metrics.transmitting_percent(), 25.0);
        assert_eq!(UserMetrics::default().transmitting_percent(), 0.0);
    }
}

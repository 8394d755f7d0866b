//! Agent contract shared by both schedulers.
//!
//! An agent owns its band index and its internal state. Schedulers never
//! write to either; they hand each agent a read-only view of its band
//! snapshot plus an outbox, and deliver whatever the agent queued before
//! the next agent runs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::geometry::Point2D;
use crate::SimRng;

/// Stable handle for an agent, independent of its mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a peer looks like from inside a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerKind {
    /// Licensed transmitter.
    Primary,
    /// Takes part in vote exchange.
    Cooperative,
    /// Anything else (band hoppers, passive reporters).
    Other,
}

/// Immutable description of an agent as captured in a band snapshot.
///
/// Only fields that never change during a run are carried, so a snapshot
/// cannot go stale within a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub id: AgentId,
    pub kind: PeerKind,
    pub position: Point2D,
    pub transmit_power: f64,
}

/// A sensed-power report sent from one cooperating agent to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub from: AgentId,
    pub to: AgentId,
    pub value: f64,
    /// Step index at which the report was produced.
    pub step: u64,
}

/// Everything an agent may touch while it runs one pass.
pub struct StepContext<'a> {
    band: Option<&'a [Peer]>,
    pass_index: usize,
    step_index: u64,
    rng: &'a mut SimRng,
    outbox: &'a mut Vec<Vote>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        band: Option<&'a [Peer]>,
        pass_index: usize,
        step_index: u64,
        rng: &'a mut SimRng,
        outbox: &'a mut Vec<Vote>,
    ) -> Self {
        Self {
            band,
            pass_index,
            step_index,
            rng,
            outbox,
        }
    }

    /// Members of the agent's band as of the start of the step, or `None`
    /// when the agent is not transmitting.
    pub fn band(&self) -> Option<&'a [Peer]> {
        self.band
    }

    pub fn pass_index(&self) -> usize {
        self.pass_index
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn rng(&mut self) -> &mut SimRng {
        &mut *self.rng
    }

    /// Queue a vote. It reaches the recipient as soon as the current agent
    /// returns from its step.
    pub fn send(&mut self, vote: Vote) {
        self.outbox.push(vote);
    }
}

/// The capability both schedulers drive.
pub trait Agent {
    fn id(&self) -> AgentId;

    /// Current band index; `None` means not transmitting.
    fn band(&self) -> Option<usize>;

    /// Snapshot entry for this agent.
    fn peer(&self) -> Peer;

    /// Run one pass of this agent's behaviour. May only change the agent's
    /// own band and internal state.
    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<()>;

    /// Receive a peer's report. Called by the scheduler, never by peers.
    fn receive_vote(&mut self, _vote: &Vote) {}

    /// Read-only observation point after all passes of a step.
    fn collect_metrics(&mut self, _step_index: u64) {}

    /// Latest value this agent reported, if it reports at all.
    fn reported_value(&self) -> Option<f64> {
        None
    }

    /// Number of ordered passes per step this agent's protocol relies on.
    fn required_passes(&self) -> usize {
        1
    }
}

/// Maps agent ids to their slot in a scheduler's population.
#[derive(Debug, Clone, Default)]
pub(crate) struct Directory {
    slots: HashMap<AgentId, usize>,
}

impl Directory {
    pub(crate) fn build<'a, A: Agent + 'a>(
        agents: impl IntoIterator<Item = &'a A>,
    ) -> Result<Self> {
        let mut slots = HashMap::new();
        for (slot, agent) in agents.into_iter().enumerate() {
            if slots.insert(agent.id(), slot).is_some() {
                return Err(SimError::DuplicateAgent(agent.id()));
            }
        }
        Ok(Self { slots })
    }

    pub(crate) fn slot(&self, id: AgentId) -> Result<usize> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(SimError::UnknownAgent(id))
    }

    /// Hand every queued vote to its recipient's slot, in send order.
    pub(crate) fn deliver(
        &self,
        outbox: &mut Vec<Vote>,
        mut receive: impl FnMut(usize, &Vote),
    ) -> Result<()> {
        for vote in outbox.drain(..) {
            let slot = self.slot(vote.to)?;
            receive(slot, &vote);
        }
        Ok(())
    }
}

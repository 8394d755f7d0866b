//! Cooperative secondary users running ReDiSen.
//!
//! Pass 0: sense, then broadcast the reading to every cooperative peer in
//! the band snapshot (self included).
//! Pass 1: fuse the collected votes. Malicious users only report and never
//! evaluate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentId, PeerKind, StepContext, Vote};
use crate::consensus::{self, ConsensusOutcome, ConsensusParams};
use crate::error::Result;
use crate::geometry::Point2D;
use crate::sensing::{Sense, Sensor};

#[cfg(feature = "cli")]
use clap::ValueEnum;

/// Pass on which readings are exchanged.
pub const VOTE_PASS: usize = 0;

/// Pass on which collected readings are fused.
pub const EVALUATE_PASS: usize = 1;

/// Which stored votes take part in an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
pub enum VoteRetention {
    /// A peer's last vote counts until it is overwritten, however old.
    #[default]
    RetainStale,
    /// Only votes produced during the current step count.
    CurrentStepOnly,
}

/// Latest report received from one peer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub value: f64,
    pub step: u64,
}

#[derive(Debug, Clone)]
pub struct CooperativeUser {
    sensor: Sensor,
    consensus: ConsensusParams,
    retention: VoteRetention,
    act_on_estimate: bool,
    home_band: usize,
    votes: BTreeMap<AgentId, Report>,
    last_sensed: Option<f64>,
    reported_at: Option<u64>,
    last_outcome: Option<ConsensusOutcome>,
    primary_detected: Option<bool>,
    evaluations: u64,
}

impl CooperativeUser {
    pub fn new(sensor: Sensor, consensus: ConsensusParams, home_band: usize) -> Result<Self> {
        consensus.validate()?;
        Ok(Self {
            sensor,
            consensus,
            retention: VoteRetention::default(),
            act_on_estimate: false,
            home_band,
            votes: BTreeMap::new(),
            last_sensed: None,
            reported_at: None,
            last_outcome: None,
            primary_detected: None,
            evaluations: 0,
        })
    }

    pub fn with_retention(mut self, retention: VoteRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Vacate the band when the fused estimate says the primary is present.
    pub fn acting_on_estimate(mut self, act: bool) -> Self {
        self.act_on_estimate = act;
        self
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn is_honest(&self) -> bool {
        self.sensor.is_honest()
    }

    pub fn home_band(&self) -> usize {
        self.home_band
    }

    /// Stored reports, keyed by sender.
    pub fn votes(&self) -> &BTreeMap<AgentId, Report> {
        &self.votes
    }

    pub fn last_sensed(&self) -> Option<f64> {
        self.last_sensed
    }

    /// Fused estimate after every refinement round of the last evaluation.
    pub fn estimate_history(&self) -> &[f64] {
        self.last_outcome
            .as_ref()
            .map(|o| o.history.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_estimate(&self) -> Option<f64> {
        self.last_outcome.as_ref().map(|o| o.estimate)
    }

    pub fn last_outcome(&self) -> Option<&ConsensusOutcome> {
        self.last_outcome.as_ref()
    }

    /// Decision of the last evaluation, if any.
    pub fn primary_detected(&self) -> Option<bool> {
        self.primary_detected
    }

    /// Number of fusions performed so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub(crate) fn receive(&mut self, vote: &Vote) {
        self.votes.insert(
            vote.from,
            Report {
                value: vote.value,
                step: vote.step,
            },
        );
    }

    pub(crate) fn required_passes(&self) -> usize {
        if self.is_honest() {
            EVALUATE_PASS + 1
        } else {
            VOTE_PASS + 1
        }
    }

    /// Run one pass. Returns the band the agent wants to occupy next, and
    /// how many votes it sent.
    pub(crate) fn step(
        &mut self,
        id: AgentId,
        position: Point2D,
        band: Option<usize>,
        ctx: &mut StepContext<'_>,
    ) -> Result<(Option<usize>, usize)> {
        match ctx.pass_index() {
            VOTE_PASS => {
                if band.is_none() {
                    if self.act_on_estimate {
                        return Ok((Some(self.home_band), 0));
                    }
                    return Ok((band, 0));
                }
                let sent = self.measure_and_broadcast(id, position, ctx);
                Ok((band, sent))
            }
            EVALUATE_PASS if self.is_honest() => self.evaluate(id, band, ctx.step_index()),
            _ => Ok((band, 0)),
        }
    }

    fn measure_and_broadcast(
        &mut self,
        id: AgentId,
        position: Point2D,
        ctx: &mut StepContext<'_>,
    ) -> usize {
        let view = ctx.band();
        let value = self.sensor.sense(position, view, ctx.rng());
        let step = ctx.step_index();
        self.last_sensed = Some(value);
        self.reported_at = Some(step);

        let mut sent = 0;
        for peer in view.unwrap_or(&[]) {
            if peer.kind == PeerKind::Cooperative {
                ctx.send(Vote {
                    from: id,
                    to: peer.id,
                    value,
                    step,
                });
                sent += 1;
            }
        }
        sent
    }

    fn evaluate(
        &mut self,
        id: AgentId,
        band: Option<usize>,
        step: u64,
    ) -> Result<(Option<usize>, usize)> {
        // Nothing to fuse unless we reported this step.
        if self.reported_at != Some(step) || !self.votes.contains_key(&id) {
            return Ok((band, 0));
        }

        let values: BTreeMap<AgentId, f64> = self
            .votes
            .iter()
            .filter(|(_, report)| match self.retention {
                VoteRetention::RetainStale => true,
                VoteRetention::CurrentStepOnly => report.step == step,
            })
            .map(|(&peer, report)| (peer, report.value))
            .collect();

        let outcome = consensus::fuse(id, &values, &self.consensus)?;
        let detected = self.consensus.is_primary_present(outcome.estimate);
        debug!(
            agent = %id,
            step,
            peers = values.len(),
            estimate = outcome.estimate,
            detected,
            "cooperative evaluation"
        );
        self.last_outcome = Some(outcome);
        self.primary_detected = Some(detected);
        self.evaluations += 1;

        if self.act_on_estimate && detected {
            return Ok((None, 0));
        }
        Ok((band, 0))
    }
}

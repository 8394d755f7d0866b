//! ReDiSen reputation-weighted consensus
//!
//! Fuses the latest sensed-power report of every peer (the caller included)
//! into one trust-adjusted estimate:
//!
//! 1. `avg = mean(v_i)`
//! 2. `dev_sum = sum |v_i - avg|`, replaced by 1 when it is exactly 0
//! 3. `R_i = 2 - n * |v_i - avg| / dev_sum` (may go negative, never clamped)
//! 4. start from the caller's own report, then for a fixed number of rounds
//!    `x += sum_i (1 - lambda) * R_i * (v_i - x)`
//!
//! The round count is fixed. There is no convergence check.
//!
//! Peers are visited in `AgentId` order, so the floating-point summation
//! order (and therefore every bit of the result) is reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::agent::AgentId;
use crate::error::{Result, SimError};

#[cfg(feature = "cli")]
use clap::{Args, ValueEnum};

/// Discount factor (lambda). Higher means the estimate moves more slowly.
pub const DISCOUNT_FACTOR: f64 = 0.995;

/// Refinement rounds per evaluation.
pub const CONSENSUS_ROUNDS: usize = 150;

/// Fused estimates at or above this are read as "primary present" (dBm).
pub const PRESENCE_THRESHOLD_DBM: f64 = 0.0;

/// How peer weights are derived from a round of votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
pub enum ReputationMode {
    /// Deviation-from-mean reputations
    #[default]
    Redisen,
    /// Every peer weighted 1.0 (plain average consensus baseline)
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Args))]
#[serde(default)]
pub struct ConsensusParams {
    /// Discount factor lambda in (0, 1)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DISCOUNT_FACTOR))]
    pub discount_factor: f64,

    /// Fixed number of refinement rounds
    #[cfg_attr(feature = "cli", arg(long, default_value_t = CONSENSUS_ROUNDS))]
    pub rounds: usize,

    /// Estimate at or above which the primary is deemed present (dBm)
    #[cfg_attr(feature = "cli", arg(long, default_value_t = PRESENCE_THRESHOLD_DBM, allow_hyphen_values = true))]
    pub presence_threshold: f64,

    /// Peer weighting scheme
    #[cfg_attr(feature = "cli", arg(long, value_enum, default_value_t = ReputationMode::Redisen))]
    pub reputation_mode: ReputationMode,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            discount_factor: DISCOUNT_FACTOR,
            rounds: CONSENSUS_ROUNDS,
            presence_threshold: PRESENCE_THRESHOLD_DBM,
            reputation_mode: ReputationMode::Redisen,
        }
    }
}

impl ConsensusParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.discount_factor > 0.0 && self.discount_factor < 1.0) {
            return Err(SimError::InvalidParameter {
                name: "discount_factor",
                value: self.discount_factor,
            });
        }
        if !self.presence_threshold.is_finite() {
            return Err(SimError::InvalidParameter {
                name: "presence_threshold",
                value: self.presence_threshold,
            });
        }
        Ok(())
    }

    /// Decision rule applied to a fused estimate.
    pub fn is_primary_present(&self, estimate: f64) -> bool {
        estimate >= self.presence_threshold
    }
}

/// Result of one fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    /// Estimate after the last round.
    pub estimate: f64,
    /// Estimate after every round, in order.
    pub history: Vec<f64>,
    /// Weights used for this fusion.
    pub reputations: BTreeMap<AgentId, f64>,
}

/// Arithmetic mean of the reported values.
pub fn average(votes: &BTreeMap<AgentId, f64>) -> Result<f64> {
    if votes.is_empty() {
        return Err(SimError::EmptyVotes);
    }
    Ok(votes.values().sum::<f64>() / votes.len() as f64)
}

/// ReDiSen reputation of every peer for this round of votes.
pub fn reputations(votes: &BTreeMap<AgentId, f64>) -> Result<BTreeMap<AgentId, f64>> {
    let avg = average(votes)?;
    let n = votes.len() as f64;

    let mut dev_sum: f64 = votes.values().map(|v| (v - avg).abs()).sum();
    if dev_sum == 0.0 {
        dev_sum = 1.0;
    }

    Ok(votes
        .iter()
        .map(|(&peer, &value)| (peer, 2.0 - n * (value - avg).abs() / dev_sum))
        .collect())
}

fn weights(
    votes: &BTreeMap<AgentId, f64>,
    mode: ReputationMode,
) -> Result<BTreeMap<AgentId, f64>> {
    match mode {
        ReputationMode::Redisen => reputations(votes),
        ReputationMode::Uniform => {
            if votes.is_empty() {
                return Err(SimError::EmptyVotes);
            }
            Ok(votes.keys().map(|&peer| (peer, 1.0)).collect())
        }
    }
}

/// Fuse `votes` from the point of view of `self_id`.
///
/// The running estimate starts at the caller's own report, which must be
/// present in `votes`.
pub fn fuse(
    self_id: AgentId,
    votes: &BTreeMap<AgentId, f64>,
    params: &ConsensusParams,
) -> Result<ConsensusOutcome> {
    if votes.is_empty() {
        return Err(SimError::EmptyVotes);
    }
    let mut estimate = *votes
        .get(&self_id)
        .ok_or(SimError::MissingSelfReport(self_id))?;

    let reputations = weights(votes, params.reputation_mode)?;
    let step = 1.0 - params.discount_factor;

    let mut history = Vec::with_capacity(params.rounds);
    for _ in 0..params.rounds {
        let mut delta = 0.0;
        for (peer, value) in votes {
            let r = reputations[peer];
            delta += step * r * (value - estimate);
        }
        estimate += delta;
        history.push(estimate);
    }

    trace!(agent = %self_id, peers = votes.len(), estimate, "consensus fused");

    Ok(ConsensusOutcome {
        estimate,
        history,
        reputations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(values: &[f64]) -> BTreeMap<AgentId, f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (AgentId(i), v))
            .collect()
    }

    #[test]
    fn test_unanimous_votes_get_full_reputation() {
        let reps = reputations(&votes(&[10.0, 10.0, 10.0])).unwrap();
        assert!(reps.values().all(|&r| r == 2.0));
    }

    #[test]
    fn test_outlier_gets_lower_reputation() {
        let reps = reputations(&votes(&[0.0, 0.0, 100.0])).unwrap();
        let (a, b, c) = (reps[&AgentId(0)], reps[&AgentId(1)], reps[&AgentId(2)]);
        assert_eq!(a, b);
        assert!(c < a, "outlier {} should trail {}", c, a);
        // 2 - 3 * 33.3 / 133.3 and 2 - 3 * 66.7 / 133.3
        assert!((a - 1.25).abs() < 1e-9);
        assert!((c - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reputation_can_go_negative() {
        let mut values = vec![0.0; 7];
        values.push(1000.0);
        let reps = reputations(&votes(&values)).unwrap();
        assert!(reps[&AgentId(7)] < 0.0);
        assert!(reps[&AgentId(0)] > 0.0);
    }

    #[test]
    fn test_single_peer() {
        let reps = reputations(&votes(&[-42.0])).unwrap();
        assert_eq!(reps[&AgentId(0)], 2.0);

        let out = fuse(AgentId(0), &votes(&[-42.0]), &ConsensusParams::default()).unwrap();
        assert_eq!(out.estimate, -42.0);
    }

    #[test]
    fn test_empty_votes_are_rejected() {
        let empty = BTreeMap::new();
        assert_eq!(reputations(&empty).unwrap_err(), SimError::EmptyVotes);
        assert_eq!(
            fuse(AgentId(0), &empty, &ConsensusParams::default()).unwrap_err(),
            SimError::EmptyVotes
        );
    }

    #[test]
    fn test_missing_self_report() {
        let err = fuse(AgentId(9), &votes(&[1.0, 2.0]), &ConsensusParams::default()).unwrap_err();
        assert_eq!(err, SimError::MissingSelfReport(AgentId(9)));
    }

    #[test]
    fn test_uniform_input_is_a_fixed_point() {
        let v = 57.25;
        let out = fuse(AgentId(1), &votes(&[v, v, v, v]), &ConsensusParams::default()).unwrap();
        assert_eq!(out.estimate, v);
        assert_eq!(out.history.len(), CONSENSUS_ROUNDS);
        assert!(out.history.iter().all(|&x| x == v));
    }

    #[test]
    fn test_estimate_starts_from_self_not_average() {
        let params = ConsensusParams {
            rounds: 1,
            ..ConsensusParams::default()
        };
        // Two peers, symmetric deviations: both reputations are 1.0.
        let out = fuse(AgentId(0), &votes(&[60.0, -111.0]), &params).unwrap();
        let expected = 60.0 + 0.005 * (0.0 + (-111.0 - 60.0));
        assert!((out.estimate - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_round_count() {
        let params = ConsensusParams {
            rounds: 7,
            ..ConsensusParams::default()
        };
        let out = fuse(AgentId(0), &votes(&[1.0, 5.0, 9.0]), &params).unwrap();
        assert_eq!(out.history.len(), 7);
        assert_eq!(*out.history.last().unwrap(), out.estimate);
    }

    #[test]
    fn test_honest_majority_resists_liar() {
        // Four honest readings near 60 dBm, one liar at the noise floor.
        let values = [61.0, 59.5, 60.5, 58.0, -111.0];
        let redisen = fuse(AgentId(0), &votes(&values), &ConsensusParams::default()).unwrap();
        let uniform = fuse(
            AgentId(0),
            &votes(&values),
            &ConsensusParams {
                reputation_mode: ReputationMode::Uniform,
                ..ConsensusParams::default()
            },
        )
        .unwrap();
        // The liar's weight goes negative, so it cannot drag the estimate
        // toward the noise floor the way it drags a plain average.
        assert!(redisen.reputations[&AgentId(4)] < 0.0);
        assert!(redisen.estimate > 58.0);
        assert!(uniform.estimate < 30.0);
        assert!(redisen.estimate > uniform.estimate);
    }

    #[test]
    fn test_presence_threshold() {
        let params = ConsensusParams::default();
        assert!(params.is_primary_present(0.0));
        assert!(params.is_primary_present(42.0));
        assert!(!params.is_primary_present(-0.5));
    }

    #[test]
    fn test_validate_discount_factor() {
        let mut params = ConsensusParams::default();
        assert!(params.validate().is_ok());
        params.discount_factor = 1.0;
        assert!(params.validate().is_err());
        params.discount_factor = 0.0;
        assert!(params.validate().is_err());
    }
}

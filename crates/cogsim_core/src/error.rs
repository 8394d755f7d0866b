use thiserror::Error;

use crate::agent::AgentId;

/// Errors raised by the schedulers, the consensus kernel and role constructors.
///
/// Every variant is either a configuration mistake or a broken agent
/// contract. Numeric degeneracies that have a defined answer (a zero
/// deviation sum in the reputation formula) are not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("a simulation needs at least one band")]
    ZeroBands,

    #[error("a synchronous simulation needs at least one pass per step")]
    ZeroPasses,

    #[error("agent {agent} is in band {band}, but only {num_bands} bands exist")]
    BandOutOfRange {
        agent: AgentId,
        band: usize,
        num_bands: usize,
    },

    #[error("agent {0} appears more than once in the population")]
    DuplicateAgent(AgentId),

    #[error("agent {0} is not part of this simulation")]
    UnknownAgent(AgentId),

    #[error("consensus requires at least one vote")]
    EmptyVotes,

    #[error("agent {0} has no self-report among its votes")]
    MissingSelfReport(AgentId),

    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("wait interval {0} must be finite and strictly positive")]
    InvalidWaitInterval(f64),

    #[error("parameter `{name}` has invalid value {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("agent {0} has not reported a value yet")]
    NoReport(AgentId),

    #[error("range [{low}, {high}) is empty")]
    InvalidRange { low: i64, high: i64 },

    #[error("agent {agent} changed band from {before:?} to {after:?} while collecting metrics")]
    BandChangedDuringMetrics {
        agent: AgentId,
        before: Option<usize>,
        after: Option<usize>,
    },
}

pub type Result<T> = core::result::Result<T, SimError>;

//! # cogsim_core
//!
//! Deterministic discrete-event simulation of cognitive-radio users sharing a
//! set of frequency bands.
//!
//! Two schedulers drive any [`Agent`]:
//! - [`SyncSimulator`] runs every agent through a fixed number of ordered
//!   passes per step against a band snapshot taken at step start.
//! - [`QueueSimulator`] wakes one agent at a time, whichever has the least
//!   wait time left, and advances a continuous clock.
//!
//! The built-in [`User`] covers licensed primaries, cooperative secondary
//! users fusing each other's readings with ReDiSen ([`consensus::fuse`]),
//! lone reporters and congestion-avoiding band hoppers.
//!
//! All randomness flows through one seeded [`SimRng`] per simulator, so a
//! run is reproducible from its seed.

pub mod agent;
pub mod band;
pub mod config;
pub mod consensus;
pub mod error;
pub mod geometry;
pub mod queue_sim;
pub mod roles;
pub mod sensing;
pub mod sync_sim;
pub mod user;

/// Random source owned by each simulator.
pub type SimRng = rand_chacha::ChaCha20Rng;

pub use agent::{Agent, AgentId, Peer, PeerKind, StepContext, Vote};
pub use band::{check_bands, BandSnapshot};
pub use config::SimConfig;
pub use consensus::{ConsensusOutcome, ConsensusParams, ReputationMode};
pub use error::{Result, SimError};
pub use geometry::Point2D;
pub use queue_sim::{QueueEntry, QueueSimulator, Tick};
pub use roles::{
    CongestionHopper, CooperativeUser, IntRange, PrimaryPattern, PrimaryUser, Reporter,
    VoteRetention,
};
pub use sensing::{SensingParams, Sense, Sensor};
pub use sync_sim::{Observation, SyncSimulator};
pub use user::{Role, User, UserMetrics};

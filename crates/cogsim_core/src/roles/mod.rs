//! Built-in agent behaviours.

pub mod cooperative;
pub mod hopper;
pub mod primary;
pub mod reporter;

pub use cooperative::{CooperativeUser, Report, VoteRetention, EVALUATE_PASS, VOTE_PASS};
pub use hopper::CongestionHopper;
pub use primary::{IntRange, PrimaryPattern, PrimaryUser};
pub use reporter::Reporter;

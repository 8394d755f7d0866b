use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Scheduler configuration shared by both simulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of frequency bands
    pub band_count: usize,

    /// Ordered passes per step (synchronous scheduler only)
    pub pass_count: usize,

    /// Seed for the simulation random source
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            band_count: 1,
            pass_count: 1,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn new(band_count: usize, pass_count: usize) -> Self {
        Self {
            band_count,
            pass_count,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.band_count == 0 {
            return Err(SimError::ZeroBands);
        }
        if self.pass_count == 0 {
            return Err(SimError::ZeroPasses);
        }
        Ok(())
    }
}

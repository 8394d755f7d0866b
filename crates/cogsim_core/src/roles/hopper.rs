use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::StepContext;
use crate::error::{Result, SimError};

/// Non-cooperative band hopper.
///
/// While in a band whose snapshot holds more than `congestion_limit`
/// members it drops out; while out of every band it joins one uniformly at
/// random.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionHopper {
    congestion_limit: usize,
    num_bands: usize,
}

impl CongestionHopper {
    pub fn new(congestion_limit: usize, num_bands: usize) -> Result<Self> {
        if num_bands == 0 {
            return Err(SimError::ZeroBands);
        }
        Ok(Self {
            congestion_limit,
            num_bands,
        })
    }

    pub fn congestion_limit(&self) -> usize {
        self.congestion_limit
    }

    pub(crate) fn step(&mut self, band: Option<usize>, ctx: &mut StepContext<'_>) -> Option<usize> {
        if ctx.pass_index() != 0 {
            return band;
        }
        match (band, ctx.band()) {
            (Some(_), Some(members)) if members.len() > self.congestion_limit => None,
            (Some(_), _) => band,
            (None, _) => Some(ctx.rng().gen_range(0..self.num_bands)),
        }
    }
}

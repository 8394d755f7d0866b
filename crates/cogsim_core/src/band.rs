//! Band membership snapshots.

use crate::agent::{Agent, Peer};
use crate::error::{Result, SimError};

/// Membership of every band, captured once at the start of a step.
///
/// Agents without a band are left out. Iteration order inside a band
/// follows the scheduler's population order.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSnapshot {
    bands: Vec<Vec<Peer>>,
}

impl BandSnapshot {
    /// Partition `agents` by their current band index.
    ///
    /// A band index outside `[0, num_bands)` is a broken agent and fails
    /// the whole partition.
    pub fn partition<'a, A: Agent + 'a>(
        agents: impl IntoIterator<Item = &'a A>,
        num_bands: usize,
    ) -> Result<Self> {
        if num_bands == 0 {
            return Err(SimError::ZeroBands);
        }
        let mut bands = vec![Vec::new(); num_bands];
        for agent in agents {
            if let Some(band) = agent.band() {
                let members = bands.get_mut(band).ok_or(SimError::BandOutOfRange {
                    agent: agent.id(),
                    band,
                    num_bands,
                })?;
                members.push(agent.peer());
            }
        }
        Ok(Self { bands })
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Members of `band`.
    pub fn members(&self, band: usize) -> Option<&[Peer]> {
        self.bands.get(band).map(Vec::as_slice)
    }

    /// The view handed to an agent whose current band is `band`.
    ///
    /// `None` in, `None` out. An index past the last band is an error, even
    /// if the agent only moved there during the current step.
    pub(crate) fn view_for(&self, agent: &impl Agent) -> Result<Option<&[Peer]>> {
        match agent.band() {
            None => Ok(None),
            Some(band) => self
                .members(band)
                .map(Some)
                .ok_or(SimError::BandOutOfRange {
                    agent: agent.id(),
                    band,
                    num_bands: self.num_bands(),
                }),
        }
    }

    /// Number of members per band.
    pub fn occupancy(&self) -> Vec<usize> {
        self.bands.iter().map(Vec::len).collect()
    }
}

/// Fail if any agent sits outside `[0, num_bands)`.
pub fn check_bands<'a, A: Agent + 'a>(
    agents: impl IntoIterator<Item = &'a A>,
    num_bands: usize,
) -> Result<()> {
    for agent in agents {
        if let Some(band) = agent.band() {
            if band >= num_bands {
                return Err(SimError::BandOutOfRange {
                    agent: agent.id(),
                    band,
                    num_bands,
                });
            }
        }
    }
    Ok(())
}

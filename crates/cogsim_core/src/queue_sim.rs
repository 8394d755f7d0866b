//! Event-queue scheduler.
//!
//! Each tick wakes the single agent with the least remaining wait time,
//! charges that wait to everyone else, resets the woken agent to its own
//! interval and advances the clock by the same amount. There is one
//! implicit pass per tick, so vote-then-evaluate protocols never reach
//! their evaluation phase here.

use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{Agent, AgentId, Directory, StepContext, Vote};
use crate::band::{check_bands, BandSnapshot};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::SimRng;

/// An agent plus its cadence.
#[derive(Debug, Clone)]
pub struct QueueEntry<A> {
    agent: A,
    wait_interval: f64,
    remaining: f64,
}

impl<A> QueueEntry<A> {
    /// Wrap `agent`, waking every `wait_interval` time units. The first
    /// wake-up is immediate.
    pub fn new(agent: A, wait_interval: f64) -> Result<Self> {
        if !(wait_interval > 0.0 && wait_interval.is_finite()) {
            return Err(SimError::InvalidWaitInterval(wait_interval));
        }
        Ok(Self {
            agent,
            wait_interval,
            remaining: 0.0,
        })
    }

    /// Delay the first wake-up by `offset`.
    pub fn with_offset(mut self, offset: f64) -> Result<Self> {
        if !(offset >= 0.0 && offset.is_finite()) {
            return Err(SimError::InvalidParameter {
                name: "offset",
                value: offset,
            });
        }
        self.remaining = offset;
        Ok(self)
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn wait_interval(&self) -> f64 {
        self.wait_interval
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn reset_wait_time(&mut self) {
        self.remaining = self.wait_interval;
    }

    pub fn deduct_wait_time(&mut self, delta: f64) {
        self.remaining -= delta;
    }
}

/// What happened on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Agent that was woken.
    pub agent: AgentId,
    /// Time charged to every other agent.
    pub delta: f64,
    /// Clock after the tick.
    pub clock: f64,
    /// Zero-based tick number.
    pub tick: u64,
}

pub struct QueueSimulator<A: Agent> {
    num_bands: usize,
    entries: Vec<QueueEntry<A>>,
    directory: Directory,
    rng: SimRng,
    total_time: f64,
    ticks: u64,
    outbox: Vec<Vote>,
}

impl<A: Agent> QueueSimulator<A> {
    /// Build a queue scheduler. `config.pass_count` is ignored; every tick
    /// is a single pass.
    pub fn new(config: SimConfig, entries: Vec<QueueEntry<A>>) -> Result<Self> {
        config.validate()?;
        let directory = Directory::build(entries.iter().map(|e| &e.agent))?;
        check_bands(entries.iter().map(|e| &e.agent), config.band_count)?;

        for entry in &entries {
            if entry.agent.required_passes() > 1 {
                warn!(
                    agent = %entry.agent.id(),
                    needed = entry.agent.required_passes(),
                    "agent relies on several passes per step; the queue scheduler only runs one"
                );
            }
        }

        Ok(Self {
            num_bands: config.band_count,
            entries,
            directory,
            rng: SimRng::seed_from_u64(config.seed),
            total_time: 0.0,
            ticks: 0,
            outbox: Vec::new(),
        })
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Cumulative simulation clock.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn entries(&self) -> &[QueueEntry<A>] {
        &self.entries
    }

    pub fn agent(&self, id: AgentId) -> Option<&A> {
        let slot = self.directory.slot(id).ok()?;
        self.entries.get(slot).map(QueueEntry::agent)
    }

    pub fn band_contents(&self) -> Result<BandSnapshot> {
        BandSnapshot::partition(self.entries.iter().map(|e| &e.agent), self.num_bands)
    }

    /// Wake the next agent. Returns `None` when there is nobody to wake.
    pub fn step(&mut self) -> Result<Option<Tick>> {
        // First minimum in list order wins ties.
        let mut selected: Option<(usize, f64)> = None;
        for (slot, entry) in self.entries.iter().enumerate() {
            match selected {
                Some((_, best)) if entry.remaining >= best => {}
                _ => selected = Some((slot, entry.remaining)),
            }
        }
        let Some((slot, delta)) = selected else {
            return Ok(None);
        };

        for (other, entry) in self.entries.iter_mut().enumerate() {
            if other != slot {
                entry.deduct_wait_time(delta);
            }
        }
        self.entries[slot].reset_wait_time();

        let snapshot = self.band_contents()?;
        let agent = &mut self.entries[slot].agent;
        let view = snapshot.view_for(&*agent)?;
        let mut ctx = StepContext::new(view, 0, self.ticks, &mut self.rng, &mut self.outbox);
        agent.step(&mut ctx)?;
        let id = agent.id();

        let entries = &mut self.entries;
        self.directory
            .deliver(&mut self.outbox, |to, vote| entries[to].agent.receive_vote(vote))?;
        check_bands(self.entries.iter().map(|e| &e.agent), self.num_bands)?;

        self.entries[slot].agent.collect_metrics(self.ticks);

        self.total_time += delta;
        let tick = Tick {
            agent: id,
            delta,
            clock: self.total_time,
            tick: self.ticks,
        };
        self.ticks += 1;
        debug!(agent = %id, delta, clock = self.total_time, "queue tick");
        Ok(Some(tick))
    }

    /// Run `ticks` ticks and return their log.
    pub fn run(&mut self, ticks: u64) -> Result<Vec<Tick>> {
        let mut log = Vec::new();
        for _ in 0..ticks {
            match self.step()? {
                Some(tick) => log.push(tick),
                None => break,
            }
        }
        Ok(log)
    }
}

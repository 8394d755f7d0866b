use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cogsim_core::{IntRange, VoteRetention};
use serde::{Deserialize, Serialize};

use crate::placement::Area;

/// Scenario shapes, read from a TOML file. Every field has a default, so an
/// empty file (or no file at all) reproduces the stock scenarios.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub congestion: CongestionConfig,
    #[serde(default)]
    pub redisen: RedisenConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

impl ScenarioFile {
    /// Load `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        let file: ScenarioFile = toml::from_str(&content)
            .with_context(|| format!("parsing scenario file {}", path.display()))?;
        Ok(file)
    }
}

/// `[low, high)` range as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub low: i64,
    pub high: i64,
}

impl RangeConfig {
    pub fn to_range(self) -> Result<IntRange> {
        IntRange::new(self.low, self.high).context("invalid step range")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongestionConfig {
    #[serde(default = "default_congestion_users")]
    pub users: usize,
    #[serde(default = "default_congestion_bands")]
    pub bands: usize,
    #[serde(default = "default_congestion_limit")]
    pub congestion_limit: usize,
    #[serde(default = "default_congestion_steps")]
    pub steps: u64,
}

fn default_congestion_users() -> usize {
    30
}
fn default_congestion_bands() -> usize {
    10
}
fn default_congestion_limit() -> usize {
    3
}
fn default_congestion_steps() -> u64 {
    1000
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            users: default_congestion_users(),
            bands: default_congestion_bands(),
            congestion_limit: default_congestion_limit(),
            steps: default_congestion_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisenConfig {
    #[serde(default = "default_honest")]
    pub honest: usize,
    #[serde(default = "default_malicious")]
    pub malicious: usize,
    /// Probability that a malicious report is a lie
    #[serde(default = "default_attack_likelihood")]
    pub attack_likelihood: f64,
    #[serde(default)]
    pub area: Area,
    #[serde(default = "default_redisen_steps")]
    pub steps: u64,
    #[serde(default = "default_redisen_passes")]
    pub passes: usize,
    /// Whether the primary occupies band 0
    #[serde(default = "default_true")]
    pub primary_transmitting: bool,
    #[serde(default = "default_primary_power")]
    pub primary_transmit_power: f64,
    #[serde(default)]
    pub retention: VoteRetention,
    /// Vacate band 0 when the fused estimate says the primary is present
    #[serde(default)]
    pub act_on_estimate: bool,
    /// Where to write every honest user's per-round estimate history
    #[serde(default)]
    pub history_csv: Option<PathBuf>,
}

fn default_honest() -> usize {
    7
}
fn default_malicious() -> usize {
    3
}
fn default_attack_likelihood() -> f64 {
    1.0
}
fn default_redisen_steps() -> u64 {
    1
}
fn default_redisen_passes() -> usize {
    2
}
fn default_true() -> bool {
    true
}
fn default_primary_power() -> f64 {
    cogsim_core::sensing::PU_TRANSMIT_POWER_DBM
}

impl Default for RedisenConfig {
    fn default() -> Self {
        Self {
            honest: default_honest(),
            malicious: default_malicious(),
            attack_likelihood: default_attack_likelihood(),
            area: Area::default(),
            steps: default_redisen_steps(),
            passes: default_redisen_passes(),
            primary_transmitting: true,
            primary_transmit_power: default_primary_power(),
            retention: VoteRetention::default(),
            act_on_estimate: false,
            history_csv: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_steps")]
    pub steps: u64,
    #[serde(default)]
    pub area: Area,
    #[serde(default = "default_time_in")]
    pub time_in: RangeConfig,
    #[serde(default = "default_time_out")]
    pub time_out: RangeConfig,
    /// Likelihoods run are `0/n, 1/n, ..., n/n`
    #[serde(default = "default_likelihood_divisions")]
    pub likelihood_divisions: u32,
    #[serde(default = "default_primary_power")]
    pub primary_transmit_power: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_dataset_steps() -> u64 {
    10_000
}
fn default_time_in() -> RangeConfig {
    RangeConfig {
        low: 100,
        high: 200,
    }
}
fn default_time_out() -> RangeConfig {
    RangeConfig { low: 50, high: 100 }
}
fn default_likelihood_divisions() -> u32 {
    10
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            steps: default_dataset_steps(),
            area: Area::default(),
            time_in: default_time_in(),
            time_out: default_time_out(),
            likelihood_divisions: default_likelihood_divisions(),
            primary_transmit_power: default_primary_power(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// One reporter per entry, waking at that interval
    #[serde(default = "default_reporter_intervals")]
    pub reporter_intervals: Vec<f64>,
    #[serde(default = "default_primary_interval")]
    pub primary_interval: f64,
    #[serde(default = "default_queue_time_in")]
    pub time_in: RangeConfig,
    #[serde(default = "default_queue_time_out")]
    pub time_out: RangeConfig,
    #[serde(default)]
    pub area: Area,
    #[serde(default = "default_queue_ticks")]
    pub ticks: u64,
}

fn default_reporter_intervals() -> Vec<f64> {
    vec![1.0, 2.5, 4.0]
}
fn default_primary_interval() -> f64 {
    1.0
}
fn default_queue_time_in() -> RangeConfig {
    RangeConfig { low: 5, high: 10 }
}
fn default_queue_time_out() -> RangeConfig {
    RangeConfig { low: 3, high: 6 }
}
fn default_queue_ticks() -> u64 {
    30
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            reporter_intervals: default_reporter_intervals(),
            primary_interval: default_primary_interval(),
            time_in: default_queue_time_in(),
            time_out: default_queue_time_out(),
            area: Area::default(),
            ticks: default_queue_ticks(),
        }
    }
}

//! Labelled traces for attack-likelihood classifiers.
//!
//! For each likelihood a lone reporter and a duty-cycled primary share one
//! band. Every step yields `[reported value, primary present]`; the file is
//! labelled with the likelihood used.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cogsim_core::{
    AgentId, PrimaryUser, Reporter, SensingParams, Sensor, SimConfig, SyncSimulator, User,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{DatasetConfig, RangeConfig};
use crate::placement::placement_rng;

const REPORTER: AgentId = AgentId(0);
const PRIMARY: AgentId = AgentId(1);

/// Upper bound on the up-front trace reservation; longer runs grow the vec.
const MAX_PREALLOCATED_STEPS: u64 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub su_area_width: f64,
    pub su_area_height: f64,
    pub time_in_range: RangeConfig,
    pub time_out_range: RangeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub config: DatasetMeta,
    /// `[observed value, 1 if the primary held the band else 0]` per step.
    pub inputs: Vec<(f64, u8)>,
    pub output: f64,
}

fn trace_capacity(steps: u64) -> usize {
    steps.min(MAX_PREALLOCATED_STEPS) as usize
}

/// Run one trace at `attack_likelihood`.
pub fn simulate(
    cfg: &DatasetConfig,
    sensing: SensingParams,
    attack_likelihood: f64,
    seed: u64,
) -> Result<DatasetRecord> {
    let mut placement = placement_rng(seed);
    let reporter = User::reporter(
        REPORTER,
        cfg.area.sample(&mut placement),
        Reporter::new(Sensor::malicious(sensing, attack_likelihood)?),
    )
    .in_band(Some(0));
    let primary = User::primary(
        PRIMARY,
        cfg.area.sample(&mut placement),
        PrimaryUser::duty_cycle(
            0,
            cfg.time_in.to_range()?,
            cfg.time_out.to_range()?,
            &mut placement,
        ),
    )
    .with_transmit_power(cfg.primary_transmit_power);

    let mut sim = SyncSimulator::new(SimConfig::new(1, 1).with_seed(seed), vec![reporter, primary])?;
    let mut inputs = Vec::with_capacity(trace_capacity(cfg.steps));
    for _ in 0..cfg.steps {
        sim.step()?;
        let obs = sim.observe(REPORTER, PRIMARY)?;
        inputs.push((obs.observed_value, u8::from(obs.primary_present)));
    }

    Ok(DatasetRecord {
        config: DatasetMeta {
            su_area_width: cfg.area.width,
            su_area_height: cfg.area.height,
            time_in_range: cfg.time_in,
            time_out_range: cfg.time_out,
        },
        inputs,
        output: attack_likelihood,
    })
}

/// `train-0.0.json`, `train-0.1.json`, ...
pub fn file_name(attack_likelihood: f64) -> String {
    format!("train-{:?}.json", attack_likelihood)
}

pub fn write_record(dir: &Path, record: &DatasetRecord) -> Result<PathBuf> {
    let path = dir.join(file_name(record.output));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), record)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Run every likelihood and write one file per run. Returns the paths
/// written, in likelihood order.
pub fn run(cfg: &DatasetConfig, sensing: SensingParams, seed: u64) -> Result<Vec<PathBuf>> {
    if cfg.likelihood_divisions == 0 {
        bail!("likelihood_divisions must be at least 1");
    }
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating {}", cfg.output_dir.display()))?;
    let divisions = cfg.likelihood_divisions;

    let mut written = Vec::new();
    for i in 0..=divisions {
        let attack_likelihood = f64::from(i) / f64::from(divisions);
        let record = simulate(cfg, sensing, attack_likelihood, seed.wrapping_add(u64::from(i)))?;
        let path = write_record(&cfg.output_dir, &record)?;
        info!(
            attack_likelihood,
            steps = record.inputs.len(),
            path = %path.display(),
            "dataset written"
        );
        written.push(path);
    }
    Ok(written)
}

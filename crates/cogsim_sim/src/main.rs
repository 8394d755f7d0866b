use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cogsim_core::{ConsensusParams, SensingParams, VoteRetention};
use cogsim_sim::report;
use cogsim_sim::scenarios::{congestion, dataset, queue, redisen};
use cogsim_sim::ScenarioFile;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "cogsim")]
#[command(about = "Cognitive-radio band simulator with ReDiSen cooperative sensing")]
struct Cli {
    /// TOML scenario file; defaults reproduce the stock scenarios
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for placement and simulation (overrides the file)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Maximum log level
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(flatten)]
    sensing: SensingParams,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Non-cooperative users hopping away from crowded bands
    Congestion {
        #[arg(long)]
        users: Option<usize>,
        #[arg(long)]
        bands: Option<usize>,
        #[arg(long)]
        congestion_limit: Option<usize>,
        #[arg(long)]
        steps: Option<u64>,
    },
    /// Honest and malicious users fusing readings of one primary user
    Redisen {
        #[arg(long)]
        honest: Option<usize>,
        #[arg(long)]
        malicious: Option<usize>,
        #[arg(long)]
        attack_likelihood: Option<f64>,
        #[arg(long)]
        steps: Option<u64>,
        #[arg(long)]
        passes: Option<usize>,
        /// Keep the primary out of the band
        #[arg(long)]
        primary_silent: bool,
        #[arg(long, value_enum)]
        retention: Option<VoteRetention>,
        /// Vacate the band when the primary is detected
        #[arg(long)]
        act_on_estimate: bool,
        /// Write every honest user's per-round estimates here
        #[arg(long)]
        history_csv: Option<PathBuf>,
        #[command(flatten)]
        consensus: ConsensusParams,
    },
    /// Labelled reporter traces, one JSON file per attack likelihood
    Dataset {
        #[arg(long)]
        steps: Option<u64>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Reporters with heterogeneous wake intervals on the event queue
    Queue {
        #[arg(long)]
        ticks: Option<u64>,
        /// Wake interval per reporter, comma separated
        #[arg(long, value_delimiter = ',')]
        intervals: Option<Vec<f64>>,
    },
}

fn init_logging(json: bool, level: Level) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut file = ScenarioFile::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        file.seed = seed;
    }
    let seed = file.seed;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Congestion {
            users,
            bands,
            congestion_limit,
            steps,
        } => {
            let mut cfg = file.congestion;
            cfg.users = users.unwrap_or(cfg.users);
            cfg.bands = bands.unwrap_or(cfg.bands);
            cfg.congestion_limit = congestion_limit.unwrap_or(cfg.congestion_limit);
            cfg.steps = steps.unwrap_or(cfg.steps);

            let result = congestion::run(&cfg, seed)?;
            report::print_congestion(&mut stdout, &result)?;
        }
        Commands::Redisen {
            honest,
            malicious,
            attack_likelihood,
            steps,
            passes,
            primary_silent,
            retention,
            act_on_estimate,
            history_csv,
            consensus,
        } => {
            let mut cfg = file.redisen;
            cfg.honest = honest.unwrap_or(cfg.honest);
            cfg.malicious = malicious.unwrap_or(cfg.malicious);
            cfg.attack_likelihood = attack_likelihood.unwrap_or(cfg.attack_likelihood);
            cfg.steps = steps.unwrap_or(cfg.steps);
            cfg.passes = passes.unwrap_or(cfg.passes);
            cfg.primary_transmitting &= !primary_silent;
            cfg.retention = retention.unwrap_or(cfg.retention);
            cfg.act_on_estimate |= act_on_estimate;
            cfg.history_csv = history_csv.or(cfg.history_csv);

            let result = redisen::run(&cfg, cli.sensing, consensus, seed)?;
            report::print_redisen(&mut stdout, &result)?;
            if let Some(path) = &cfg.history_csv {
                report::save_history_csv(path, &result.honest)?;
                info!(path = %path.display(), "estimate history written");
            }
        }
        Commands::Dataset { steps, output_dir } => {
            let mut cfg = file.dataset;
            cfg.steps = steps.unwrap_or(cfg.steps);
            cfg.output_dir = output_dir.unwrap_or(cfg.output_dir);

            let written = dataset::run(&cfg, cli.sensing, seed)?;
            for path in written {
                writeln!(stdout, "{}", path.display())?;
            }
        }
        Commands::Queue { ticks, intervals } => {
            let mut cfg = file.queue;
            cfg.ticks = ticks.unwrap_or(cfg.ticks);
            cfg.reporter_intervals = intervals.unwrap_or(cfg.reporter_intervals);

            let result = queue::run(&cfg, cli.sensing, seed)?;
            report::print_queue(&mut stdout, &result)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs, cli.log_level);
    info!(seed = ?cli.seed, config = ?cli.config, "starting cogsim");

    if let Err(e) = run(cli) {
        error!(error = %format!("{:#}", e), "Fatal Error");
        std::process::exit(1);
    }
}

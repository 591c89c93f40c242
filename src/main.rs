//! Sequencer CLI: train the phase network and decode a sequence.
//!
//! Usage:
//!   sequencer run [--config FILE] [--out DIR]
//!   sequencer config

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use phase_sequencer::config::ExperimentConfig;
use phase_sequencer::errors::Result;
use phase_sequencer::experiment::{self, Outputs};
use phase_sequencer::logging;
use phase_sequencer::sequencer::OrderMode;
use phase_sequencer::tape::Activation;

#[derive(Parser)]
#[command(name = "sequencer", version, about = "Complex-valued phase sequencer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the configured text, write charts, decode
    Run {
        /// JSON config file (defaults are used for missing keys)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output directory for charts and report.json
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Override the iteration count
        #[arg(long)]
        iterations: Option<usize>,
        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Override the learning rate
        #[arg(long)]
        learning_rate: Option<f64>,
        /// Override the nonlinearity (tanh, sigmoid)
        #[arg(long)]
        activation: Option<Activation>,
        /// Override how decoded symbols are ordered (position, phase, snapped)
        #[arg(long)]
        order_mode: Option<OrderMode>,
        /// Skip chart rendering
        #[arg(long)]
        no_plots: bool,
    },
    /// Print the default configuration as JSON
    Config,
}

fn main() {
    if let Err(e) = logging::init_tracing("info") {
        eprintln!("Error: {e}");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { config, out, iterations, seed, learning_rate, activation, order_mode, no_plots } => {
            cmd_run(config, out, iterations, seed, learning_rate, activation, order_mode, no_plots)
        }
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    config: Option<PathBuf>,
    out: PathBuf,
    iterations: Option<usize>,
    seed: Option<u64>,
    learning_rate: Option<f64>,
    activation: Option<Activation>,
    order_mode: Option<OrderMode>,
    no_plots: bool,
) -> Result<()> {
    let mut config = match config {
        Some(path) => ExperimentConfig::load(&path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(n) = iterations {
        config.iterations = n;
    }
    if let Some(s) = seed {
        config.seed = s;
    }
    if let Some(r) = learning_rate {
        config.learning_rate = r;
    }
    if let Some(a) = activation {
        config.activation = a;
    }
    if let Some(m) = order_mode {
        config.order_mode = m;
    }

    let outputs = Outputs { dir: Some(out), charts: !no_plots };
    let run = experiment::run(&config, &outputs)?;
    println!("{}", run.report.decoded.sequenced);
    Ok(())
}

fn cmd_config() -> Result<()> {
    println!("{}", ExperimentConfig::default().to_json()?);
    Ok(())
}

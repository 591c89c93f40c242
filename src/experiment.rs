//! End-to-end run: corpus -> train -> charts -> decode -> report.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::ExperimentConfig;
use crate::encoding::{Alphabet, Corpus};
use crate::errors::Result;
use crate::network::Network;
use crate::plot;
use crate::sequencer::{self, Decoded};
use crate::trainer::{self, TrainHistory};

/// Where a run writes its artifacts. `None` keeps everything in memory.
#[derive(Clone, Debug, Default)]
pub struct Outputs {
    pub dir: Option<PathBuf>,
    pub charts: bool,
}

/// Everything a run produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub config: ExperimentConfig,
    pub history: TrainHistory,
    pub decoded: Decoded,
    /// Charts and report written to disk.
    pub artifacts: Vec<PathBuf>,
}

/// Result of `run`: the report plus the trained network.
pub struct ExperimentRun {
    pub report: ExperimentReport,
    pub network: Network,
}

pub fn run(config: &ExperimentConfig, outputs: &Outputs) -> Result<ExperimentRun> {
    config.validate()?;
    let text = config.text_bytes();
    info!(text = %String::from_utf8_lossy(&text), length = text.len(), "input");

    let alphabet = Alphabet::new(config.alphabet, config.width, &text)?;
    let corpus = Corpus::build(&text, &alphabet, config.lookahead, config.active_magnitude)?;
    let mut network = Network::new(config.network(), config.seed)?;
    info!(
        width = config.width,
        middle = config.middle,
        params = network.param_count(),
        activation = %config.activation,
        "network initialised"
    );

    let start = Instant::now();
    let history = trainer::train(&mut network, &corpus, &config.training())?;
    info!(elapsed_s = start.elapsed().as_secs_f64(), "training done");

    let mut artifacts = Vec::new();
    if let Some(dir) = &outputs.dir {
        fs::create_dir_all(dir)?;
        if outputs.charts {
            artifacts.extend(plot::render_history(&history, dir)?);
        }
    }

    // Training is over; the decoder only reads the parameters.
    let trained = &network;
    let decoded = sequencer::decode(trained, &alphabet, corpus.len(), &config.decoding())?;
    for record in &decoded.records {
        debug!(?record, "symbol");
    }
    info!(sequenced = %decoded.sequenced, "decoded");

    let mut report = ExperimentReport {
        config: config.clone(),
        history,
        decoded,
        artifacts,
    };
    if let Some(dir) = &outputs.dir {
        let path = dir.join("report.json");
        report.artifacts.push(path.clone());
        write_report(&report, &path)?;
    }

    Ok(ExperimentRun { report, network })
}

pub fn write_report(report: &ExperimentReport, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

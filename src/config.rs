//! Experiment configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::encoding::{AlphabetKind, ACTIVE_MAGNITUDE};
use crate::errors::{Result, SequencerError};
use crate::network::NetworkConfig;
use crate::sequencer::{DecodeConfig, OrderMode};
use crate::tape::Activation;
use crate::trainer::TrainConfig;

/// Default training text.
pub const DEFAULT_TEXT: &str = "In the beginning God created the heaven and the earth.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub text: String,
    pub width: usize,
    pub middle: usize,
    pub learning_rate: f64,
    pub iterations: usize,
    pub seed: u64,
    /// Distance between an input character and its target.
    pub lookahead: usize,
    pub seed_symbol: char,
    pub activation: Activation,
    pub init_range: (f64, f64),
    pub order_mode: OrderMode,
    pub alphabet: AlphabetKind,
    pub active_magnitude: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            width: 256,
            middle: 512,
            learning_rate: 0.6,
            iterations: 32,
            seed: 3,
            lookahead: 8,
            seed_symbol: 'I',
            activation: Activation::Tanh,
            init_range: (-1.0, 1.0),
            order_mode: OrderMode::Position,
            alphabet: AlphabetKind::Bytes,
            active_magnitude: ACTIVE_MAGNITUDE,
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SequencerError::InvalidConfig(msg));
        if self.width == 0 || self.middle == 0 {
            return invalid(format!("width ({}) and middle ({}) must be > 0", self.width, self.middle));
        }
        if self.iterations == 0 {
            return invalid("iterations must be > 0".into());
        }
        if !(self.learning_rate > 0.0) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.init_range.0 > self.init_range.1 {
            return invalid(format!("init_range {:?} is reversed", self.init_range));
        }
        if self.text_bytes().is_empty() {
            return invalid("text must not be empty".into());
        }
        if !self.text.is_ascii() || !self.seed_symbol.is_ascii() {
            return invalid("text and seed_symbol must be ASCII".into());
        }
        Ok(())
    }

    /// Training text with newlines removed.
    pub fn text_bytes(&self) -> Vec<u8> {
        self.text.bytes().filter(|&b| b != b'\n' && b != b'\r').collect()
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            width: self.width,
            middle: self.middle,
            activation: self.activation,
            init_range: self.init_range,
        }
    }

    pub fn training(&self) -> TrainConfig {
        TrainConfig {
            iterations: self.iterations,
            learning_rate: self.learning_rate,
        }
    }

    pub fn decoding(&self) -> DecodeConfig {
        DecodeConfig {
            seed_symbol: self.seed_symbol as u8,
            order_mode: self.order_mode,
            active_magnitude: self.active_magnitude,
        }
    }
}

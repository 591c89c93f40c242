//! Gradient descent with global L2-norm clipping.
//!
//! Each iteration:
//!   1. zero every parameter gradient
//!   2. backward pass from the scalar cost
//!   3. one L2 norm over every gradient value of every parameter
//!   4. norm > 1: scale by 1/norm, otherwise apply unscaled
//!   5. value -= learning_rate * gradient
//!   6. record cost magnitude and phase
//!
//! No schedule, no momentum, no early stopping.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::encoding::Corpus;
use crate::errors::{Result, SequencerError};
use crate::network::Network;
use crate::types::Param;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct TrainConfig {
    pub iterations: usize,
    pub learning_rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { iterations: 32, learning_rate: 0.6 }
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Diagnostics of one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainStep {
    pub iteration: usize,
    pub cost_magnitude: f64,
    pub cost_phase: f64,
    pub grad_norm: f64,
    pub clipped: bool,
}

/// Append-only record of a training run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainHistory {
    pub steps: Vec<TrainStep>,
}

impl TrainHistory {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// (epoch, |cost|) series.
    pub fn magnitude_points(&self) -> Vec<(f64, f64)> {
        self.steps.iter().map(|s| (s.iteration as f64, s.cost_magnitude)).collect()
    }

    /// (epoch, arg(cost)) series.
    pub fn phase_points(&self) -> Vec<(f64, f64)> {
        self.steps.iter().map(|s| (s.iteration as f64, s.cost_phase)).collect()
    }
}

// ---------------------------------------------------------------------------
// Update rule
// ---------------------------------------------------------------------------

/// L2 norm over every gradient value of every parameter, as one flat vector.
pub fn global_grad_norm(params: &[Param]) -> f64 {
    params.iter().map(|p| p.grad_norm_sqr()).sum::<f64>().sqrt()
}

/// Apply `value -= learning_rate * grad`, clipping the global gradient norm
/// to 1. Returns the pre-clip norm and whether clipping fired.
pub fn apply_clipped_update(params: &mut [Param], learning_rate: f64) -> (f64, bool) {
    let norm = global_grad_norm(params);
    if norm > 1.0 {
        let scaling = 1.0 / norm;
        for p in params.iter_mut() {
            p.descend(learning_rate * scaling);
        }
        (norm, true)
    } else {
        for p in params.iter_mut() {
            p.descend(learning_rate);
        }
        (norm, false)
    }
}

// ---------------------------------------------------------------------------
// Training loop
// ---------------------------------------------------------------------------

/// Run `config.iterations` full-corpus gradient steps on `network`.
pub fn train(network: &mut Network, corpus: &Corpus, config: &TrainConfig) -> Result<TrainHistory> {
    if config.iterations == 0 {
        return Err(SequencerError::InvalidConfig("iterations must be > 0".into()));
    }
    if config.learning_rate.is_nan() || config.learning_rate <= 0.0 {
        return Err(SequencerError::InvalidConfig(format!(
            "learning rate must be positive, got {}",
            config.learning_rate
        )));
    }

    let mut history = TrainHistory { steps: Vec::with_capacity(config.iterations) };
    for iteration in 0..config.iterations {
        let total = network.backprop(&corpus.inputs, &corpus.targets)?;
        for p in network.params() {
            trace!(iteration, param = p.name, grad_norm = p.grad_norm_sqr().sqrt(), "gradient");
        }
        let (grad_norm, clipped) = apply_clipped_update(network.params_mut(), config.learning_rate);

        let step = TrainStep {
            iteration,
            cost_magnitude: total.norm(),
            cost_phase: total.arg(),
            grad_norm,
            clipped,
        };
        info!(iteration, cost = step.cost_magnitude, grad_norm, "iteration");
        if clipped {
            debug!(iteration, scale = 1.0 / grad_norm, "gradient clipped");
        }
        history.steps.push(step);
    }
    Ok(history)
}

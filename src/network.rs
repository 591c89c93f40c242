//! Three-layer complex feed-forward network.
//!
//! Architecture (W = width, M = middle):
//!   layer0 = f(w0 @ x  + b0)   w0: [M, W], b0: [M, 1]
//!   layer1 = f(w1 @ l0 + b1)   w1: [M, M], b1: [M, 1]
//!   layer2 = f(w2 @ l1 + b2)   w2: [W, M], b2: [W, 1]
//!   cost   = mean(|layer2 - target|^2)
//!
//! The input may hold any number of columns: a whole corpus during training,
//! a single encoding vector during decoding.

use num_complex::Complex64;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::errors::{Result, SequencerError};
use crate::tape::{Activation, NodeId, Tape};
use crate::types::{ComplexTensor, Param};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub width: usize,
    pub middle: usize,
    pub activation: Activation,
    /// Real and imaginary parts are each drawn from U(low, high) and scaled
    /// by 1/sqrt(fan_in).
    pub init_range: (f64, f64),
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            width: 256,
            middle: 512,
            activation: Activation::Tanh,
            init_range: (-1.0, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Recorded forward pass
// ---------------------------------------------------------------------------

/// Node ids of one forward pass recorded on a tape.
#[derive(Clone, Debug)]
pub struct Forward {
    /// Leaf ids, in `Network::params()` order.
    pub params: Vec<NodeId>,
    pub input: NodeId,
    pub output: NodeId,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Network {
    config: NetworkConfig,
    params: Vec<Param>,
}

impl Network {
    /// Initialise parameters from a seeded ChaCha8 stream.
    pub fn new(config: NetworkConfig, seed: u64) -> Result<Self> {
        if config.width == 0 || config.middle == 0 {
            return Err(SequencerError::InvalidConfig(
                "network width and middle must be > 0".into(),
            ));
        }
        let (low, high) = config.init_range;
        if low > high {
            return Err(SequencerError::InvalidConfig(format!(
                "init range low {low} exceeds high {high}"
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (w, m) = (config.width, config.middle);
        // (name, rows, cols, fan_in)
        let shapes: [(&'static str, usize, usize, usize); 6] = [
            ("w0", m, w, w),
            ("b0", m, 1, m),
            ("w1", m, m, m),
            ("b1", m, 1, m),
            ("w2", w, m, m),
            ("b2", w, 1, w),
        ];

        let params = shapes
            .iter()
            .map(|&(name, rows, cols, fan_in)| {
                let data = (0..rows * cols)
                    .map(|_| random_complex(&mut rng, low, high, fan_in as f64))
                    .collect();
                Ok(Param::new(name, ComplexTensor::new(data, rows, cols)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { config, params })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.iter().map(|p| p.value().len()).sum()
    }

    /// All parameter values flattened in `params()` order.
    pub fn flat_values(&self) -> Vec<Complex64> {
        self.params
            .iter()
            .flat_map(|p| p.value().as_slice().iter().copied())
            .collect()
    }

    /// Record the three layers on `tape` for `input` of shape [W, k].
    pub fn record(&self, tape: &mut Tape, input: ComplexTensor) -> Result<Forward> {
        if input.rows() != self.config.width {
            return Err(SequencerError::ShapeMismatch {
                op: "network input",
                left: input.shape(),
                right: (self.config.width, input.cols()),
            });
        }
        let params: Vec<NodeId> = self.params.iter().map(|p| tape.leaf(p.value().clone())).collect();
        let input = tape.leaf(input);

        let mut layer = input;
        for pair in params.chunks(2) {
            let z = tape.matmul(pair[0], layer)?;
            let z = tape.add_bias(z, pair[1])?;
            layer = tape.activate(z, self.config.activation);
        }

        Ok(Forward { params, input, output: layer })
    }

    /// Forward pass only; no gradients are computed.
    pub fn predict(&self, input: ComplexTensor) -> Result<ComplexTensor> {
        let mut tape = Tape::new();
        let forward = self.record(&mut tape, input)?;
        Ok(tape.value(forward.output).clone())
    }

    /// Cost of `input` against `target` plus a full backward pass. Parameter
    /// accumulators are zeroed first and hold this pass's gradients on return.
    pub fn backprop(&mut self, input: &ComplexTensor, target: &ComplexTensor) -> Result<Complex64> {
        for p in &mut self.params {
            p.zero_grad();
        }

        let mut tape = Tape::new();
        let forward = self.record(&mut tape, input.clone())?;
        let target = tape.leaf(target.clone());
        let loss = tape.quadratic(forward.output, target)?;
        let cost = tape.mean(loss);
        let total = tape.backward(cost)?;

        for (p, &id) in self.params.iter_mut().zip(&forward.params) {
            p.accumulate_grad(tape.grad(id))?;
        }
        Ok(total)
    }

    /// Cost without a backward pass.
    pub fn cost(&self, input: &ComplexTensor, target: &ComplexTensor) -> Result<Complex64> {
        let mut tape = Tape::new();
        let forward = self.record(&mut tape, input.clone())?;
        let target = tape.leaf(target.clone());
        let loss = tape.quadratic(forward.output, target)?;
        let cost = tape.mean(loss);
        Ok(tape.value(cost).get(0, 0))
    }
}

fn random_complex(rng: &mut ChaCha8Rng, low: f64, high: f64, fan_in: f64) -> Complex64 {
    let scale = fan_in.sqrt();
    let re = ((high - low) * rng.gen::<f64>() + low) / scale;
    let im = ((high - low) * rng.gen::<f64>() + low) / scale;
    Complex64::new(re, im)
}

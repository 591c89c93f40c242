//! Reverse-mode autodiff over complex tensors.
//!
//! A `Tape` records every primitive operation as a node in an arena. Node
//! indices are assigned in recording order, so walking the arena backwards
//! is a reverse topological traversal of the graph.
//!
//! The cost is real. Each gradient buffer holds `dC/dRe(z) + i*dC/dIm(z)`,
//! so `z -= eta * grad` is a descent step for every leaf `z`.
//! Holomorphic operations therefore propagate with the conjugate of their
//! derivative:
//!   - matmul:    G_A += G_C B^H,  G_B += A^H G_C
//!   - add_bias:  G_X += G_Y,      G_b[r] += sum_c G_Y[r, c]
//!   - activate:  G_Z += conj(f'(z)) G_Y
//!   - quadratic: G_A += 2 (a - b) Re(G_Q),  G_B -= 2 (a - b) Re(G_Q)
//!   - mean:      G_X += G_Y / n

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, SequencerError};
use crate::types::{ComplexTensor, ZERO};

/// Arena index of a recorded node.
pub type NodeId = usize;

// ---------------------------------------------------------------------------
// Activation: saturating pointwise nonlinearity
// ---------------------------------------------------------------------------

/// Saturating nonlinearity, applied to the complex value through its
/// analytic continuation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply(self, z: Complex64) -> Complex64 {
        match self {
            Self::Tanh => z.tanh(),
            Self::Sigmoid => Complex64::new(1.0, 0.0) / (Complex64::new(1.0, 0.0) + (-z).exp()),
        }
    }

    /// Complex derivative expressed through the forward output `y = f(z)`.
    pub fn derivative_from_output(self, y: Complex64) -> Complex64 {
        let one = Complex64::new(1.0, 0.0);
        match self {
            Self::Tanh => one - y * y,
            Self::Sigmoid => y * (one - y),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tanh => write!(f, "tanh"),
            Self::Sigmoid => write!(f, "sigmoid"),
        }
    }
}

impl FromStr for Activation {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tanh" => Ok(Self::Tanh),
            "sigmoid" | "logistic" => Ok(Self::Sigmoid),
            other => Err(SequencerError::InvalidConfig(format!(
                "unknown activation '{other}' (expected tanh or sigmoid)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tape operations
// ---------------------------------------------------------------------------

/// A single recorded operation.
#[derive(Clone, Debug)]
pub enum TapeOp {
    /// Parameter or input; gradients stop here.
    Leaf,
    /// out = A @ B where A: [m, n], B: [n, k], out: [m, k]
    Matmul { a: NodeId, b: NodeId },
    /// out = X + b, b: [m, 1] broadcast over the columns of X: [m, k]
    AddBias { x: NodeId, bias: NodeId },
    /// out = f(X) elementwise
    Activate { x: NodeId, activation: Activation },
    /// out = |A - B|^2 elementwise (real valued)
    Quadratic { a: NodeId, b: NodeId },
    /// out = mean(X), shape [1, 1]
    Mean { x: NodeId },
}

#[derive(Clone, Debug)]
struct Node {
    op: TapeOp,
    value: ComplexTensor,
    grad: Vec<Complex64>,
}

// ---------------------------------------------------------------------------
// Tape
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct Tape {
    nodes: Vec<Node>,
}

impl Tape {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, op: TapeOp, value: ComplexTensor) -> NodeId {
        let grad = vec![ZERO; value.len()];
        self.nodes.push(Node { op, value, grad });
        self.nodes.len() - 1
    }

    pub fn op(&self, id: NodeId) -> &TapeOp {
        &self.nodes[id].op
    }

    pub fn value(&self, id: NodeId) -> &ComplexTensor {
        &self.nodes[id].value
    }

    pub fn grad(&self, id: NodeId) -> &[Complex64] {
        &self.nodes[id].grad
    }

    // ----- Leaf -----

    pub fn leaf(&mut self, value: ComplexTensor) -> NodeId {
        self.push(TapeOp::Leaf, value)
    }

    // ----- Forward ops -----

    pub fn matmul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (av, bv) = (&self.nodes[a].value, &self.nodes[b].value);
        let (m, n) = av.shape();
        let (n2, k) = bv.shape();
        if n != n2 {
            return Err(SequencerError::ShapeMismatch {
                op: "matmul",
                left: av.shape(),
                right: bv.shape(),
            });
        }
        let (ad, bd) = (av.as_slice(), bv.as_slice());
        let mut out = vec![ZERO; m * k];
        for i in 0..m {
            for j in 0..n {
                let x = ad[i * n + j];
                let row = &bd[j * k..(j + 1) * k];
                let dst = &mut out[i * k..(i + 1) * k];
                for (o, &y) in dst.iter_mut().zip(row) {
                    *o += x * y;
                }
            }
        }
        let value = ComplexTensor::new(out, m, k)?;
        Ok(self.push(TapeOp::Matmul { a, b }, value))
    }

    pub fn add_bias(&mut self, x: NodeId, bias: NodeId) -> Result<NodeId> {
        let (xv, bv) = (&self.nodes[x].value, &self.nodes[bias].value);
        if bv.cols() != 1 || bv.rows() != xv.rows() {
            return Err(SequencerError::ShapeMismatch {
                op: "add_bias",
                left: xv.shape(),
                right: bv.shape(),
            });
        }
        let mut value = xv.clone();
        let cols = value.cols();
        let b = bv.as_slice();
        for (i, v) in value.as_mut_slice().iter_mut().enumerate() {
            *v += b[i / cols];
        }
        Ok(self.push(TapeOp::AddBias { x, bias }, value))
    }

    pub fn activate(&mut self, x: NodeId, activation: Activation) -> NodeId {
        let mut value = self.nodes[x].value.clone();
        for v in value.as_mut_slice() {
            *v = activation.apply(*v);
        }
        self.push(TapeOp::Activate { x, activation }, value)
    }

    pub fn quadratic(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (av, bv) = (&self.nodes[a].value, &self.nodes[b].value);
        if av.shape() != bv.shape() {
            return Err(SequencerError::ShapeMismatch {
                op: "quadratic",
                left: av.shape(),
                right: bv.shape(),
            });
        }
        let out = av
            .as_slice()
            .iter()
            .zip(bv.as_slice())
            .map(|(&p, &q)| Complex64::new((p - q).norm_sqr(), 0.0))
            .collect();
        let value = ComplexTensor::new(out, av.rows(), av.cols())?;
        Ok(self.push(TapeOp::Quadratic { a, b }, value))
    }

    pub fn mean(&mut self, x: NodeId) -> NodeId {
        let xv = &self.nodes[x].value;
        let n = xv.len().max(1) as f64;
        let sum: Complex64 = xv.as_slice().iter().sum();
        self.push(TapeOp::Mean { x }, ComplexTensor::column(vec![sum / n]))
    }

    // ----- Backward -----

    pub fn zero_grad(&mut self) {
        for node in &mut self.nodes {
            node.grad.iter_mut().for_each(|g| *g = ZERO);
        }
    }

    /// Reverse pass from a `1×1` root. Every gradient buffer is zeroed first,
    /// then the root is seeded with one. Returns the root's value.
    pub fn backward(&mut self, root: NodeId) -> Result<Complex64> {
        let cost = self.nodes[root].value.scalar().ok_or(SequencerError::ShapeMismatch {
            op: "backward",
            left: self.nodes[root].value.shape(),
            right: (1, 1),
        })?;

        self.zero_grad();
        self.nodes[root].grad[0] = Complex64::new(1.0, 0.0);

        for id in (0..=root).rev() {
            let op = self.nodes[id].op.clone();
            match op {
                TapeOp::Leaf => {}
                TapeOp::Matmul { a, b } => self.backward_matmul(id, a, b),
                TapeOp::AddBias { x, bias } => self.backward_add_bias(id, x, bias),
                TapeOp::Activate { x, activation } => self.backward_activate(id, x, activation),
                TapeOp::Quadratic { a, b } => self.backward_quadratic(id, a, b),
                TapeOp::Mean { x } => self.backward_mean(id, x),
            }
        }
        Ok(cost)
    }

    fn accumulate(&mut self, id: NodeId, incoming: Vec<Complex64>) {
        for (g, d) in self.nodes[id].grad.iter_mut().zip(incoming) {
            *g += d;
        }
    }

    fn backward_matmul(&mut self, out: NodeId, a: NodeId, b: NodeId) {
        let (m, n) = self.nodes[a].value.shape();
        let k = self.nodes[b].value.cols();
        let gc = &self.nodes[out].grad;
        let ad = self.nodes[a].value.as_slice();
        let bd = self.nodes[b].value.as_slice();

        let mut ga = vec![ZERO; m * n];
        let mut gb = vec![ZERO; n * k];
        for i in 0..m {
            for j in 0..n {
                let x = ad[i * n + j];
                let mut acc = ZERO;
                for l in 0..k {
                    let g = gc[i * k + l];
                    acc += g * bd[j * k + l].conj();
                    gb[j * k + l] += x.conj() * g;
                }
                ga[i * n + j] = acc;
            }
        }
        self.accumulate(a, ga);
        self.accumulate(b, gb);
    }

    fn backward_add_bias(&mut self, out: NodeId, x: NodeId, bias: NodeId) {
        let gy = self.nodes[out].grad.clone();
        let cols = self.nodes[out].value.cols();
        let mut gb = vec![ZERO; self.nodes[bias].value.len()];
        for (i, &g) in gy.iter().enumerate() {
            gb[i / cols] += g;
        }
        self.accumulate(x, gy);
        self.accumulate(bias, gb);
    }

    fn backward_activate(&mut self, out: NodeId, x: NodeId, activation: Activation) {
        let gz = self.nodes[out]
            .value
            .as_slice()
            .iter()
            .zip(&self.nodes[out].grad)
            .map(|(&y, &g)| activation.derivative_from_output(y).conj() * g)
            .collect();
        self.accumulate(x, gz);
    }

    fn backward_quadratic(&mut self, out: NodeId, a: NodeId, b: NodeId) {
        let ga: Vec<Complex64> = self.nodes[a]
            .value
            .as_slice()
            .iter()
            .zip(self.nodes[b].value.as_slice())
            .zip(&self.nodes[out].grad)
            .map(|((&p, &q), g)| (p - q) * (2.0 * g.re))
            .collect();
        let gb = ga.iter().map(|&d| -d).collect();
        self.accumulate(a, ga);
        self.accumulate(b, gb);
    }

    fn backward_mean(&mut self, out: NodeId, x: NodeId) {
        let n = self.nodes[x].value.len().max(1) as f64;
        let g = self.nodes[out].grad[0] / n;
        let gx = vec![g; self.nodes[x].value.len()];
        self.accumulate(x, gx);
    }
}

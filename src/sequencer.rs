//! Autoregressive decoding and phase-ordered assembly.
//!
//! Starting from a seed symbol, the trained network is fed its own
//! prediction `length` times. Each output column is resolved to a symbol by
//! magnitude. The symbol's order comes from the `OrderMode`: its step
//! position, the raw output phase, or that phase snapped to a bucket edge.
//! The final string is the records sorted by order.
//!
//! At step `i` the previous symbol is fed at phase `pi*(i+1)/L`, the
//! position the new symbol will occupy.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::encoding::{encode, position_phase, Alphabet, ACTIVE_MAGNITUDE};
use crate::errors::{Result, SequencerError};
use crate::network::Network;
use crate::types::ComplexTensor;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One decoded symbol. Never mutated after construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub slot: usize,
    pub symbol: u8,
    /// Sort key, a phase in [0, pi].
    pub order: f64,
    /// Magnitude of the winning slot; `None` for the seed.
    pub score: Option<f64>,
}

/// Winner of a search over one output column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub slot: usize,
    pub order: f64,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where a decoded symbol's sort key comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    /// Record `k` gets `pi*k/L`; the sequence keeps decode order.
    #[default]
    Position,
    /// `|arg|` of the winning output slot.
    Phase,
    /// `|arg|` snapped to the nearer edge of the step's phase bucket.
    Snapped,
}

impl OrderMode {
    /// Sort key for the candidate found at `step` (0-based, seed excluded).
    pub fn order(self, candidate: &Candidate, step: usize, length: usize) -> f64 {
        match self {
            Self::Position => position_phase(step + 1, length),
            Self::Phase => candidate.order,
            Self::Snapped => snap_order(candidate.order, step, length),
        }
    }
}

impl fmt::Display for OrderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => write!(f, "position"),
            Self::Phase => write!(f, "phase"),
            Self::Snapped => write!(f, "snapped"),
        }
    }
}

impl FromStr for OrderMode {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "position" => Ok(Self::Position),
            "phase" => Ok(Self::Phase),
            "snapped" | "snap" => Ok(Self::Snapped),
            other => Err(SequencerError::InvalidConfig(format!(
                "unknown order mode '{other}' (expected position, phase or snapped)"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DecodeConfig {
    pub seed_symbol: u8,
    pub order_mode: OrderMode,
    pub active_magnitude: f64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            seed_symbol: b'I',
            order_mode: OrderMode::Position,
            active_magnitude: ACTIVE_MAGNITUDE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decoded {
    /// Records in insertion order, seed first.
    pub records: Vec<SymbolRecord>,
    /// Symbols sorted by order.
    pub sequenced: String,
}

// ---------------------------------------------------------------------------
// Search and snapping
// ---------------------------------------------------------------------------

/// Visit slots in ascending `|arg|` order and keep the strictly largest
/// magnitude. Every slot is considered; on equal magnitude the slot seen
/// first in phase order wins. `None` only for an empty column.
pub fn search(output: &[Complex64]) -> Option<Candidate> {
    let mut by_phase: Vec<usize> = (0..output.len()).collect();
    by_phase.sort_by(|&i, &j| output[i].arg().abs().total_cmp(&output[j].arg().abs()));

    let mut best: Option<Candidate> = None;
    for slot in by_phase {
        let value = output[slot];
        let score = value.norm();
        if best.map_or(true, |b| score > b.score) {
            best = Some(Candidate { slot, order: value.arg().abs(), score });
        }
    }
    best
}

/// `search` for the decode loop; an empty column is an error.
fn pick(output: &[Complex64], step: usize) -> Result<Candidate> {
    search(output).ok_or(SequencerError::EmptyOutput { step })
}

/// Snap `order` to the nearer edge of bucket `[step*pi/L, (step+1)*pi/L)`.
/// Exact ties go to the lower edge.
pub fn snap_order(order: f64, step: usize, length: usize) -> f64 {
    let low = position_phase(step, length);
    let high = position_phase(step + 1, length);
    if (order - low).abs() <= (high - order).abs() {
        low
    } else {
        high
    }
}

/// Stable sort by order; equal orders keep insertion order. Symbols are
/// emitted as Latin-1 characters.
pub fn assemble(records: &[SymbolRecord]) -> String {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.order.total_cmp(&b.order));
    sorted.iter().map(|r| char::from(r.symbol)).collect()
}

// ---------------------------------------------------------------------------
// Decode loop
// ---------------------------------------------------------------------------

/// Decode `length` steps after the seed. Produces `length + 1` records and a
/// string of `length + 1` characters (the seed is included).
pub fn decode(
    network: &Network,
    alphabet: &Alphabet,
    length: usize,
    config: &DecodeConfig,
) -> Result<Decoded> {
    if length == 0 {
        return Err(SequencerError::InvalidConfig("decode length must be > 0".into()));
    }
    let width = network.width();
    if alphabet.width() != width {
        return Err(SequencerError::DimensionMismatch {
            expected: width,
            got: alphabet.width(),
        });
    }

    let seed_slot = alphabet.slot(config.seed_symbol)?;
    let mut records = Vec::with_capacity(length + 1);
    records.push(SymbolRecord {
        slot: seed_slot,
        symbol: config.seed_symbol,
        order: position_phase(0, length),
        score: None,
    });

    let mut previous = seed_slot;
    for step in 0..length {
        let phase = position_phase(step + 1, length);
        let encoding = encode(width, previous, phase, config.active_magnitude);
        let output = network.predict(ComplexTensor::column(encoding))?;
        let candidate = pick(output.as_slice(), step)?;

        let order = config.order_mode.order(&candidate, step, length);
        let record = SymbolRecord {
            slot: candidate.slot,
            symbol: alphabet.symbol_or_unknown(candidate.slot),
            order,
            score: Some(candidate.score),
        };
        debug!(
            step,
            symbol = %char::from(record.symbol),
            order = record.order,
            score = candidate.score,
            "guess"
        );
        records.push(record);
        previous = candidate.slot;
    }

    let sequenced = assemble(&records);
    Ok(Decoded { records, sequenced })
}

//! Phase/magnitude encoding of characters.
//!
//! One timestep is a width-W column. Every slot carries the timestep's phase
//! `pi * i / L`; only the active symbol's slot carries a non-residual
//! magnitude. Phase encodes position, magnitude encodes identity.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::errors::{Result, SequencerError};
use crate::types::ComplexTensor;

/// Magnitude of the active slot.
pub const ACTIVE_MAGNITUDE: f64 = 0.001;

/// Magnitude of every other slot.
pub const RESIDUAL_MAGNITUDE: f64 = 0.0;

/// Emitted for slots that map to no symbol of a compact alphabet.
pub const UNKNOWN_SYMBOL: u8 = b'?';

/// Phase of timestep `step` in a sequence of `length` steps, in [0, pi).
pub fn position_phase(step: usize, length: usize) -> f64 {
    PI * step as f64 / length.max(1) as f64
}

/// Build one encoding vector with `slot` active.
pub fn encode(width: usize, slot: usize, phase: f64, active_magnitude: f64) -> Vec<Complex64> {
    let mut encoding = vec![Complex64::from_polar(RESIDUAL_MAGNITUDE, phase); width];
    if let Some(v) = encoding.get_mut(slot) {
        *v = Complex64::from_polar(active_magnitude, phase);
    }
    encoding
}

// ---------------------------------------------------------------------------
// Alphabet: symbol byte <-> slot
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphabetKind {
    /// Slot index is the byte value itself.
    #[default]
    Bytes,
    /// Slots are the sorted distinct bytes of the text.
    Compact,
}

#[derive(Clone, Debug)]
pub struct Alphabet {
    width: usize,
    symbols: Vec<u8>,
    slots: Vec<Option<usize>>,
}

impl Alphabet {
    pub fn new(kind: AlphabetKind, width: usize, text: &[u8]) -> Result<Self> {
        if width == 0 {
            return Err(SequencerError::InvalidConfig("alphabet width must be > 0".into()));
        }
        let symbols: Vec<u8> = match kind {
            AlphabetKind::Bytes => (0..width.min(256)).map(|b| b as u8).collect(),
            AlphabetKind::Compact => {
                let mut distinct = text.to_vec();
                distinct.sort_unstable();
                distinct.dedup();
                if distinct.len() > width {
                    return Err(SequencerError::InvalidConfig(format!(
                        "text has {} distinct symbols but width is {}",
                        distinct.len(),
                        width
                    )));
                }
                distinct
            }
        };
        let mut slots = vec![None; 256];
        for (slot, &symbol) in symbols.iter().enumerate() {
            slots[symbol as usize] = Some(slot);
        }
        Ok(Self { width, symbols, slots })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Slot of a symbol byte.
    pub fn slot(&self, symbol: u8) -> Result<usize> {
        self.slots[symbol as usize].ok_or(SequencerError::UnknownSymbol {
            symbol,
            width: self.width,
        })
    }

    /// Symbol byte of a slot, `None` for slots with no symbol.
    pub fn symbol(&self, slot: usize) -> Option<u8> {
        self.symbols.get(slot).copied()
    }

    pub fn symbol_or_unknown(&self, slot: usize) -> u8 {
        self.symbol(slot).unwrap_or(UNKNOWN_SYMBOL)
    }
}

// ---------------------------------------------------------------------------
// Corpus: input/target encodings for a whole text
// ---------------------------------------------------------------------------

/// Training pairs for a text of length L: column `i` of `inputs` encodes
/// `text[i]` at phase `pi*i/L`, column `i` of `targets` encodes
/// `text[(i + lookahead) % L]` at that character's own phase.
#[derive(Clone, Debug)]
pub struct Corpus {
    pub text: Vec<u8>,
    pub inputs: ComplexTensor,
    pub targets: ComplexTensor,
    pub lookahead: usize,
}

impl Corpus {
    pub fn build(
        text: &[u8],
        alphabet: &Alphabet,
        lookahead: usize,
        active_magnitude: f64,
    ) -> Result<Self> {
        if text.is_empty() {
            return Err(SequencerError::InvalidConfig("text must not be empty".into()));
        }
        let length = text.len();
        let width = alphabet.width();

        let mut inputs = Vec::with_capacity(length);
        let mut targets = Vec::with_capacity(length);
        for (i, &symbol) in text.iter().enumerate() {
            debug!(step = i, symbol, "encoding");
            let slot = alphabet.slot(symbol)?;
            inputs.push(encode(width, slot, position_phase(i, length), active_magnitude));

            let j = (i + lookahead) % length;
            let target = alphabet.slot(text[j])?;
            targets.push(encode(width, target, position_phase(j, length), active_magnitude));
        }

        Ok(Self {
            text: text.to_vec(),
            inputs: ComplexTensor::from_columns(&inputs)?,
            targets: ComplexTensor::from_columns(&targets)?,
            lookahead,
        })
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

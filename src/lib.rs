//! Phase Sequencer: complex-valued sequence reconstruction.
//!
//! Core mapping:
//!   - Encoding: phase = position in the text, magnitude = symbol identity
//!   - Network: three complex affine + saturating layers, trained to map a
//!     character to the character `lookahead` positions ahead
//!   - Trainer: reverse-mode gradients, global L2 clipping, fixed iterations
//!   - Sequencer: feed predictions back, order symbols by output phase

pub mod errors;
pub mod types;
pub mod tape;
pub mod encoding;
pub mod network;
pub mod trainer;
pub mod sequencer;
pub mod config;
pub mod plot;
pub mod logging;
pub mod experiment;

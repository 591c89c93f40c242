//! Sequencer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("ShapeMismatch in {op}: left {left:?}, right {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("DimensionMismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),
    #[error("UnknownSymbol: byte {symbol} has no slot in an alphabet of width {width}")]
    UnknownSymbol { symbol: u8, width: usize },
    #[error("EmptyOutput: no candidate slot in the output column at step {step}")]
    EmptyOutput { step: usize },
    #[error("PlotError: {0}")]
    Plot(String),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SequencerError>;

//! Error types for convolution operations.

use crate::block::EngineState;
use thiserror::Error;

/// Errors that can occur during convolution.
#[derive(Debug, Error)]
pub enum ConvError {
    /// A length or parameter violates an engine invariant.
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// Fixed-width accumulation overflowed at an output index.
    #[error("Numeric overflow while accumulating output sample {index}")]
    NumericOverflow { index: usize },

    /// A streaming operation was called in the wrong engine state.
    #[error("Cannot {operation} while engine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvError {
    /// Create an invalid argument error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Shift the index of an overflow error by `offset`.
    ///
    /// Block steps report indices relative to the block; engines rebase them
    /// onto the full output.
    pub(crate) fn offset_by(self, offset: usize) -> Self {
        match self {
            Self::NumericOverflow { index } => Self::NumericOverflow {
                index: index + offset,
            },
            other => other,
        }
    }
}

/// Result type for convolution operations.
pub type ConvResult<T> = Result<T, ConvError>;

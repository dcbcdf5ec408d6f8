//! Error types for the FPGA link
//!
//! Every fatal condition of a run maps to one of these. Threshold warnings
//! are not errors and live in [`crate::stream::ThresholdWarning`].

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain the input sequence. Raised before any transfer begins.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input source could not be opened or read.
    #[error("cannot read input {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A token is not an integer.
    #[error("{origin}:{line}: '{token}' is not an integer")]
    Parse {
        origin: String,
        line: usize,
        token: String,
    },

    /// The source parsed cleanly but holds no values.
    #[error("{origin}: no values found")]
    Empty { origin: String },
}

/// A value does not fit in one signed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value {value} does not fit in a signed byte (-128..=127)")]
pub struct EncodingError {
    pub value: i64,
}

/// Failure opening or driving the serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial device {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("failed to write to serial device: {0}")]
    Write(#[source] io::Error),

    #[error("failed to read from serial device: {0}")]
    Read(#[source] io::Error),

    #[error("no reply from device within {after:?}")]
    Timeout { after: Duration },

    /// The device returned end-of-stream instead of a byte.
    #[error("serial device closed the connection")]
    Closed,
}

/// Failure persisting the reply stream.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create output file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write output file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a streaming or loading run halted, and at which element.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("element {index}: {source}")]
    Encoding {
        index: usize,
        #[source]
        source: EncodingError,
    },

    #[error("element {index}: {source}")]
    Transport {
        index: usize,
        #[source]
        source: TransportError,
    },

    #[error("element {index}: {source}")]
    Output {
        index: usize,
        #[source]
        source: OutputError,
    },
}

impl PipelineError {
    /// Index of the element that was being processed when the run halted.
    pub fn index(&self) -> usize {
        match self {
            PipelineError::Encoding { index, .. }
            | PipelineError::Transport { index, .. }
            | PipelineError::Output { index, .. } => *index,
        }
    }
}

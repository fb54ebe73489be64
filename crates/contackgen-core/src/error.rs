//! Top-level generator errors

use contackgen_capture::{CaptureError, OutputError};
use contackgen_env::{ConfigError, EnvironmentError};
use contackgen_schema::SchemaError;
use std::fmt;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Options or schema rejected
    Configuration,
    /// Container create, start, seed or stop
    Environment,
    /// Capture copy or extraction
    Retrieval,
    /// Reading or decoding the capture
    Capture,
    /// Writing the dataset
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::Environment => "environment lifecycle",
            Self::Retrieval => "artifact retrieval",
            Self::Capture => "capture decoding",
            Self::Output => "dataset output",
        })
    }
}

/// Errors from a generator run
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// `generate` called before `define_schema`
    #[error("dataset format not defined; call define_schema first")]
    FormatUndefined,

    /// Invalid generator configuration
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Invalid column selection
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Environment lifecycle failure
    #[error("{0}")]
    Environment(#[from] EnvironmentError),

    /// Capture decoding failure
    #[error("{0}")]
    Capture(#[from] CaptureError),

    /// The blocking decode task panicked or was cancelled
    #[error("decode task failed: {0}")]
    DecodeTask(#[from] tokio::task::JoinError),

    /// Dataset writer failure
    #[error("{0}")]
    Output(#[from] OutputError),
}

impl GenerateError {
    /// Stage the failure happened in
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::FormatUndefined | Self::Config(_) | Self::Schema(_) => Stage::Configuration,
            Self::Environment(EnvironmentError::Config(_)) => Stage::Configuration,
            Self::Environment(err) if err.is_retrieval() => Stage::Retrieval,
            Self::Environment(_) => Stage::Environment,
            Self::Capture(_) | Self::DecodeTask(_) => Stage::Capture,
            Self::Output(_) => Stage::Output,
        }
    }
}

/// Result type alias for generator operations
pub type GenerateResult<T> = Result<T, GenerateError>;

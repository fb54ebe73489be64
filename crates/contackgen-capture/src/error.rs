//! Error types for capture decoding and dataset output

use std::path::PathBuf;

/// Errors while opening or reading a capture artifact
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Artifact could not be opened at any timestamp precision
    #[error("cannot open capture {path}: {message}")]
    Open {
        /// Artifact path
        path: PathBuf,
        /// libpcap error text
        message: String,
    },

    /// Decoding library failed mid-stream
    #[error("capture read failed: {0}")]
    Read(String),

    /// Packet timestamp outside the representable range
    #[error("packet timestamp out of range: {secs}s + {nanos}ns")]
    Timestamp {
        /// Whole seconds
        secs: i64,
        /// Fractional part in nanoseconds
        nanos: i64,
    },

    /// IO error on the artifact path
    #[error("io error on {path}: {source}")]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    /// Create open error for path
    pub fn open(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Open {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while writing a dataset
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Underlying writer failed
    #[error("io error writing dataset: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Unrecognized output format name
    #[error("unknown output format: '{0}' (expected arff or jsonl)")]
    UnknownFormat(String),
}

//! Error types for environment orchestration
//!
//! Split by where the failure comes from:
//! - `ConfigError`: request rejected before any container exists
//! - `RuntimeError`: the container runtime refused or failed a call
//! - `ArchiveError`: the retrieved archive could not be unpacked
//!
//! `EnvironmentError` ties them to the lifecycle step that failed.

use crate::state::EnvState;
use std::path::PathBuf;

/// Rejected capture configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Image is not on the accepted list
    #[error("unsupported image '{image}' (accepted: {accepted})")]
    UnsupportedImage {
        /// Requested image
        image: String,
        /// Accepted images, comma separated
        accepted: String,
    },

    /// Artifact destination directory does not exist
    #[error("artifact directory does not exist: {0}")]
    MissingArtifactDirectory(PathBuf),

    /// Out-of-range option
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Option name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Configuration file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("cannot parse {path}: {message}")]
    Parse {
        /// Configuration file
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl ConfigError {
    /// Create invalid-value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Container runtime failure
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Runtime client could not be invoked
    #[error("failed to invoke {program}: {source}")]
    Spawn {
        /// Client program
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Runtime reported failure
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Exit status
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// Runtime answered with something unparseable
    #[error("unexpected runtime output: {0}")]
    Malformed(String),
}

impl RuntimeError {
    /// Create command-failed error
    pub fn command_failed(
        command: impl Into<String>,
        status: impl ToString,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.to_string(),
            stderr: stderr.into(),
        }
    }
}

/// Archive extraction failure
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Archive does not contain the capture file
    #[error("'{0}' not found in archive")]
    EntryMissing(String),

    /// Destination directory does not exist
    #[error("destination directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// Reading the archive or writing the file failed
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Environment lifecycle failure
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// Request rejected before any environment exists
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Container could not be created
    #[error("environment creation failed: {0}")]
    CreateFailed(#[source] RuntimeError),

    /// Container could not be started
    #[error("environment start failed: {0}")]
    StartFailed(#[source] RuntimeError),

    /// Seed command or address lookup failed
    #[error("seed command failed: {0}")]
    SeedFailed(#[source] RuntimeError),

    /// Environment has no network interface with an address
    #[error("no network address for container {container}")]
    NoNetworkAddress {
        /// Container id
        container: String,
    },

    /// Capture archive could not be copied out
    #[error("artifact copy failed: {0}")]
    CopyFailed(#[source] RuntimeError),

    /// Capture archive could not be extracted
    #[error("artifact extraction failed: {0}")]
    ArchiveFailed(#[from] ArchiveError),

    /// Lifecycle step attempted out of order
    #[error("illegal environment transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: EnvState,
        /// Rejected target state
        to: EnvState,
    },
}

impl EnvironmentError {
    /// Failure state the lifecycle ends in for this error
    ///
    /// `None` for errors raised before an environment was requested or for
    /// internal ordering faults.
    #[must_use]
    pub fn failed_state(&self) -> Option<EnvState> {
        match self {
            Self::CreateFailed(_) => Some(EnvState::CreateFailed),
            Self::StartFailed(_) => Some(EnvState::StartFailed),
            Self::SeedFailed(_) | Self::NoNetworkAddress { .. } => Some(EnvState::SeedFailed),
            Self::CopyFailed(_) | Self::ArchiveFailed(_) => Some(EnvState::RetrievalFailed),
            Self::Config(_) | Self::IllegalTransition { .. } => None,
        }
    }

    /// Whether the failure happened while retrieving the artifact
    #[must_use]
    pub fn is_retrieval(&self) -> bool {
        matches!(self.failed_state(), Some(EnvState::RetrievalFailed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_states() {
        let runtime = || RuntimeError::Malformed("x".to_string());
        assert_eq!(
            EnvironmentError::CreateFailed(runtime()).failed_state(),
            Some(EnvState::CreateFailed)
        );
        assert_eq!(
            EnvironmentError::NoNetworkAddress {
                container: "c".to_string()
            }
            .failed_state(),
            Some(EnvState::SeedFailed)
        );
        assert!(EnvironmentError::from(ArchiveError::EntryMissing("capture.pcap".to_string()))
            .is_retrieval());
        assert_eq!(
            EnvironmentError::from(ConfigError::invalid("window_secs", "must be positive"))
                .failed_state(),
            None
        );
    }

    #[test]
    fn display() {
        let err = RuntimeError::command_failed("docker start c", "exit status: 1", "no such container");
        assert_eq!(
            err.to_string(),
            "`docker start c` failed (exit status: 1): no such container"
        );
    }
}

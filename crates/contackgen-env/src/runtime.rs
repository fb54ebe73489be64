//! Container runtime seam

use crate::error::RuntimeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Runtime-assigned container identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wrap a runtime-assigned id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a command executed inside a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, if the runtime reported one
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the command exited cleanly
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code.map_or(true, |code| code == 0)
    }
}

/// Operations the environment controller needs from a container runtime
///
/// Every call blocks (asynchronously) until the runtime has answered.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container from `image` with a fixed `name`
    async fn create(&self, image: &str, name: &str) -> Result<ContainerId, RuntimeError>;

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Run a command inside the container and wait for it to exit
    async fn exec(&self, id: &ContainerId, command: &[String]) -> Result<ExecOutput, RuntimeError>;

    /// Address of the first network interface, if any
    async fn inspect_network_address(&self, id: &ContainerId)
        -> Result<Option<IpAddr>, RuntimeError>;

    /// Force-stop the container
    async fn stop(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    async fn remove(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Copy a path out of the container as a tar stream
    async fn copy_archive(&self, id: &ContainerId, internal_path: &str)
        -> Result<Vec<u8>, RuntimeError>;
}

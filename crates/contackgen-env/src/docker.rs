//! Docker CLI adapter
//!
//! Drives the `docker` client binary through `tokio::process`. Each trait
//! call is one CLI invocation; non-zero exits become
//! `RuntimeError::CommandFailed` carrying the client's stderr.

use crate::error::RuntimeError;
use crate::runtime::{ContainerId, ContainerRuntime, ExecOutput};
use async_trait::async_trait;
use std::net::IpAddr;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Go template listing the address of every attached network
const NETWORK_ADDRESS_FORMAT: &str =
    "{{range .NetworkSettings.Networks}}{{.IPAddress}} {{end}}";

/// Container runtime backed by the `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    /// Driver for `docker` on the `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// With a different client binary
    #[inline]
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn output(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        tracing::debug!(program = %self.program, ?args, "invoking runtime client");
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    /// Run and require a zero exit status
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, RuntimeError> {
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(RuntimeError::command_failed(
                format!("{} {}", self.program, args.join(" ")),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }
}

/// First parseable address in `docker inspect` network output
pub(crate) fn first_address(listing: &str) -> Option<IpAddr> {
    listing
        .split_whitespace()
        .find_map(|token| token.parse::<IpAddr>().ok())
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn create(&self, image: &str, name: &str) -> Result<ContainerId, RuntimeError> {
        let stdout = self
            .run(&["create", "--tty", "--name", name, image])
            .await?;
        let id = String::from_utf8_lossy(&stdout).trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::Malformed(
                "create returned no container id".to_string(),
            ));
        }
        Ok(ContainerId::new(id))
    }

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.run(&["start", id.as_str()]).await.map(|_| ())
    }

    async fn exec(&self, id: &ContainerId, command: &[String]) -> Result<ExecOutput, RuntimeError> {
        let mut args = vec!["exec", id.as_str()];
        args.extend(command.iter().map(String::as_str));
        let output = self.output(&args).await?;
        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn inspect_network_address(
        &self,
        id: &ContainerId,
    ) -> Result<Option<IpAddr>, RuntimeError> {
        let stdout = self
            .run(&["inspect", "--format", NETWORK_ADDRESS_FORMAT, id.as_str()])
            .await?;
        Ok(first_address(&String::from_utf8_lossy(&stdout)))
    }

    async fn stop(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.run(&["kill", id.as_str()]).await.map(|_| ())
    }

    async fn remove(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.run(&["rm", "--force", id.as_str()]).await.map(|_| ())
    }

    async fn copy_archive(
        &self,
        id: &ContainerId,
        internal_path: &str,
    ) -> Result<Vec<u8>, RuntimeError> {
        let source = format!("{id}:{internal_path}");
        self.run(&["cp", source.as_str(), "-"]).await
    }
}

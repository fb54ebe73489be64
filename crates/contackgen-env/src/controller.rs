//! Environment controller
//!
//! Drives one container through a capture run:
//!
//! ```text
//! Created ─► Started ─► Seeded ─► ScenarioActive ─► Stopped ─► ArtifactRetrieved ─► Destroyed
//!    │          │          │                           │
//!    ▼          ▼          ▼                           ▼
//! Create/    SeedFailed  SeedFailed              RetrievalFailed
//! StartFailed
//! ```
//!
//! Once a container exists it is removed on every exit path. Removal
//! failures are logged and swallowed.

use crate::archive::{extract_file, internal_file_name};
use crate::error::{ConfigError, EnvironmentError, RuntimeError};
use crate::runtime::{ContainerId, ContainerRuntime};
use crate::scenario::ScenarioRunner;
use crate::state::{EnvState, Lifecycle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Images known to carry the capture payload
pub const ACCEPTED_IMAGES: &[&str] = &["fersuy/contackgen-ubuntu2204:1.1.0"];

/// Default environment image
pub const DEFAULT_IMAGE: &str = "fersuy/contackgen-ubuntu2204:1.1.0";

/// Fixed container name
pub const DEFAULT_CONTAINER_NAME: &str = "contackgen-ubuntu2204";

/// Where the payload writes its capture inside the container
pub const DEFAULT_INTERNAL_CAPTURE_PATH: &str = "/data/capture.pcap";

/// Default scenario window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(180);

/// Pause before and after the seed command.
///
/// Gives the payload time to bring its capture up; there is no readiness
/// signal to wait on instead.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Seed command that starts the in-container capture for `window`
#[must_use]
pub fn seed_command(window: Duration) -> Vec<String> {
    vec![
        "bash".to_string(),
        "-c".to_string(),
        format!("./payload.sh -d {}", window.as_secs()),
    ]
}

/// Parameters of one capture run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Environment image
    pub image: String,
    /// Fixed container name
    pub container_name: String,
    /// Scenario window
    pub window: Duration,
    /// Host destination of the capture file
    pub artifact_path: PathBuf,
    /// Capture path inside the container
    pub internal_capture_path: String,
    /// Command that starts the in-container capture
    pub seed_command: Vec<String>,
}

impl CaptureRequest {
    /// Request with default image, names and window
    #[must_use]
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            window: DEFAULT_WINDOW,
            artifact_path: artifact_path.into(),
            internal_capture_path: DEFAULT_INTERNAL_CAPTURE_PATH.to_string(),
            seed_command: seed_command(DEFAULT_WINDOW),
        }
    }

    /// With environment image
    #[inline]
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// With container name
    #[inline]
    #[must_use]
    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    /// With scenario window; the seed command follows the window
    #[inline]
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self.seed_command = seed_command(window);
        self
    }

    /// With in-container capture path
    #[inline]
    #[must_use]
    pub fn with_internal_capture_path(mut self, path: impl Into<String>) -> Self {
        self.internal_capture_path = path.into();
        self
    }

    /// With explicit seed command
    #[inline]
    #[must_use]
    pub fn with_seed_command(mut self, command: Vec<String>) -> Self {
        self.seed_command = command;
        self
    }

    /// Check the request before any environment is created
    ///
    /// # Errors
    /// - `ConfigError::UnsupportedImage` for images outside [`ACCEPTED_IMAGES`]
    /// - `ConfigError::MissingArtifactDirectory` if the artifact's parent
    ///   directory does not exist
    /// - `ConfigError::Invalid` for a zero window or empty seed command
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ACCEPTED_IMAGES.contains(&self.image.as_str()) {
            return Err(ConfigError::UnsupportedImage {
                image: self.image.clone(),
                accepted: ACCEPTED_IMAGES.join(", "),
            });
        }
        if self.window.is_zero() {
            return Err(ConfigError::invalid("window", "must be greater than zero"));
        }
        if self.seed_command.is_empty() {
            return Err(ConfigError::invalid("seed_command", "must not be empty"));
        }
        let parent = artifact_directory(&self.artifact_path);
        if !parent.is_dir() {
            return Err(ConfigError::MissingArtifactDirectory(parent.to_path_buf()));
        }
        Ok(())
    }
}

/// Directory an artifact path lands in
#[must_use]
pub fn artifact_directory(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// State of a completed capture run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Container that ran the scenario
    pub container: ContainerId,
    /// Address the scenario targeted
    pub address: IpAddr,
    /// When the scenario was launched
    pub scenario_started_at: DateTime<Utc>,
    /// Host path of the retrieved capture
    pub artifact_path: PathBuf,
    /// States visited, in order
    pub states: Vec<EnvState>,
}

impl CaptureSession {
    /// Final lifecycle state
    #[must_use]
    pub fn final_state(&self) -> Option<EnvState> {
        self.states.last().copied()
    }
}

/// Runs capture sessions against a container runtime
pub struct EnvironmentController {
    runtime: Arc<dyn ContainerRuntime>,
    scenario: Arc<dyn ScenarioRunner>,
    settle_delay: Duration,
}

impl std::fmt::Debug for EnvironmentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentController")
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

/// Everything learned while driving a started environment
struct Progress {
    address: IpAddr,
    scenario_started_at: DateTime<Utc>,
}

impl EnvironmentController {
    /// Controller over a runtime and a scenario runner
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, scenario: Arc<dyn ScenarioRunner>) -> Self {
        Self {
            runtime,
            scenario,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// With a different settle delay around the seed command
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Run one capture session
    ///
    /// Returns once the artifact sits at `request.artifact_path` and the
    /// container has been removed.
    ///
    /// # Errors
    /// - `EnvironmentError::Config` before anything is created
    /// - the lifecycle failure that aborted the run; its
    ///   [`failed_state`](EnvironmentError::failed_state) names the step
    pub async fn run(&self, request: &CaptureRequest) -> Result<CaptureSession, EnvironmentError> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "capture",
            %run_id,
            container = %request.container_name,
            image = %request.image
        );
        self.run_validated(run_id, request).instrument(span).await
    }

    async fn run_validated(
        &self,
        run_id: Uuid,
        request: &CaptureRequest,
    ) -> Result<CaptureSession, EnvironmentError> {
        let mut lifecycle = Lifecycle::new();

        let container = match self
            .runtime
            .create(&request.image, &request.container_name)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                let err = EnvironmentError::CreateFailed(err);
                Self::record_failure(&mut lifecycle, &err);
                return Err(err);
            }
        };
        tracing::debug!(%container, "container created");

        let outcome = self.drive(&container, request, &mut lifecycle).await;
        if let Err(err) = &outcome {
            Self::record_failure(&mut lifecycle, err);
        }

        self.destroy(&container).await;

        let progress = outcome?;
        lifecycle.advance(EnvState::Destroyed)?;

        Ok(CaptureSession {
            run_id,
            container,
            address: progress.address,
            scenario_started_at: progress.scenario_started_at,
            artifact_path: request.artifact_path.clone(),
            states: lifecycle.into_history(),
        })
    }

    async fn drive(
        &self,
        container: &ContainerId,
        request: &CaptureRequest,
        lifecycle: &mut Lifecycle,
    ) -> Result<Progress, EnvironmentError> {
        self.runtime
            .start(container)
            .await
            .map_err(EnvironmentError::StartFailed)?;
        lifecycle.advance(EnvState::Started)?;

        tokio::time::sleep(self.settle_delay).await;
        let seeded = self
            .runtime
            .exec(container, &request.seed_command)
            .await
            .map_err(EnvironmentError::SeedFailed)?;
        if !seeded.success() {
            return Err(EnvironmentError::SeedFailed(RuntimeError::command_failed(
                request.seed_command.join(" "),
                format!("exit code {}", seeded.exit_code.unwrap_or(-1)),
                seeded.stderr.trim(),
            )));
        }
        tokio::time::sleep(self.settle_delay).await;
        lifecycle.advance(EnvState::Seeded)?;

        let address = self
            .runtime
            .inspect_network_address(container)
            .await
            .map_err(EnvironmentError::SeedFailed)?
            .ok_or_else(|| EnvironmentError::NoNetworkAddress {
                container: container.to_string(),
            })?;
        self.scenario.start(address);
        let scenario_started_at = Utc::now();
        lifecycle.advance(EnvState::ScenarioActive)?;
        tracing::info!(%address, window_secs = request.window.as_secs(), "scenario active");

        tokio::time::sleep(request.window).await;
        if let Err(err) = self.runtime.stop(container).await {
            tracing::warn!(%container, error = %err, "force stop failed, retrieving anyway");
        }
        lifecycle.advance(EnvState::Stopped)?;

        let archive = self
            .runtime
            .copy_archive(container, &request.internal_capture_path)
            .await
            .map_err(EnvironmentError::CopyFailed)?;
        let bytes = extract_file(
            archive.as_slice(),
            internal_file_name(&request.internal_capture_path),
            &request.artifact_path,
        )?;
        lifecycle.advance(EnvState::ArtifactRetrieved)?;
        tracing::info!(
            artifact = %request.artifact_path.display(),
            bytes,
            "artifact retrieved"
        );

        Ok(Progress {
            address,
            scenario_started_at,
        })
    }

    fn record_failure(lifecycle: &mut Lifecycle, err: &EnvironmentError) {
        if let Some(state) = err.failed_state() {
            if lifecycle.advance(state).is_err() {
                tracing::error!(
                    from = %lifecycle.current(),
                    to = %state,
                    "unexpected failure state"
                );
            }
        }
        tracing::error!(error = %err, "capture run aborted");
    }

    async fn destroy(&self, container: &ContainerId) {
        match self.runtime.remove(container).await {
            Ok(()) => tracing::debug!(%container, "container removed"),
            Err(err) => tracing::warn!(%container, error = %err, "container removal failed"),
        }
    }
}

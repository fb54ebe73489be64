//! Capture environment orchestration for contackgen
//!
//! Provides:
//! - `ContainerRuntime`: the seam to the container runtime, with a Docker
//!   CLI adapter (`DockerCli`)
//! - `ScenarioRunner`: detached background traffic (`UdpFlood`)
//! - `EnvironmentController`: one capture run from container creation to
//!   artifact retrieval and removal
//! - the lifecycle state machine the controller follows

mod archive;
mod controller;
mod docker;
mod error;
mod runtime;
mod scenario;
mod state;

pub use archive::{extract_file, internal_file_name};
pub use controller::{
    artifact_directory, seed_command, CaptureRequest, CaptureSession, EnvironmentController,
    ACCEPTED_IMAGES, DEFAULT_CONTAINER_NAME, DEFAULT_IMAGE, DEFAULT_INTERNAL_CAPTURE_PATH,
    DEFAULT_WINDOW, SETTLE_DELAY,
};
pub use docker::DockerCli;
pub use error::{ArchiveError, ConfigError, EnvironmentError, RuntimeError};
pub use runtime::{ContainerId, ContainerRuntime, ExecOutput};
pub use scenario::{ScenarioRunner, UdpFlood};
pub use state::{allowed_transitions, validate_transition, EnvState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

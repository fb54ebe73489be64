//! Pcap dataset generator
//!
//! Batch-only generator lifecycle:
//! 1. `define_schema()` validates the configuration and fixes the columns
//! 2. `generate()` runs a capture session and decodes the artifact
//!
//! `decode()` runs only the second half, on a capture that already exists.

use crate::config::GeneratorConfig;
use crate::error::{GenerateError, GenerateResult};
use contackgen_capture::{
    write_dataset, ArtifactReader, AssemblyStats, CaptureStart, Decoded, Decoder,
    FeatureExtractor, OutputFormat,
};
use contackgen_env::{
    CaptureSession, ContainerRuntime, DockerCli, EnvironmentController, ScenarioRunner, UdpFlood,
    SETTLE_DELAY,
};
use contackgen_schema::{Dataset, DatasetRow, Schema};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Result of a full generator run
#[derive(Debug, Clone)]
pub struct Generated {
    /// Decoded rows
    pub dataset: Dataset,
    /// Assembly report
    pub stats: AssemblyStats,
    /// Capture session that produced the artifact
    pub session: CaptureSession,
}

/// Generates packet-feature datasets from a containerized UDP flood
pub struct PcapGenerator {
    config: GeneratorConfig,
    runtime: Arc<dyn ContainerRuntime>,
    scenario: Arc<dyn ScenarioRunner>,
    settle_delay: Duration,
    schema: Option<Arc<Schema>>,
}

impl std::fmt::Debug for PcapGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcapGenerator")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl PcapGenerator {
    /// Generator driving the local Docker CLI
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            runtime: Arc::new(DockerCli::new()),
            scenario: Arc::new(UdpFlood::new()),
            settle_delay: SETTLE_DELAY,
            schema: None,
        }
    }

    /// With container runtime
    #[inline]
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// With scenario runner
    #[inline]
    #[must_use]
    pub fn with_scenario(mut self, scenario: Arc<dyn ScenarioRunner>) -> Self {
        self.scenario = scenario;
        self
    }

    /// With settle delay around the seed command
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Generator configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Schema fixed by `define_schema`, if any
    #[inline]
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// Validate the configuration and fix the dataset columns
    ///
    /// Configuration problems surface here, before any environment exists.
    ///
    /// # Errors
    /// `GenerateError::Config` or `GenerateError::Schema`.
    pub fn define_schema(&mut self) -> GenerateResult<Arc<Schema>> {
        self.config.validate()?;
        let schema = Arc::new(self.config.schema()?);
        tracing::info!(%schema, "dataset format defined");
        self.schema = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// Run a capture session and decode its artifact
    ///
    /// # Errors
    /// `GenerateError::FormatUndefined` before `define_schema`; otherwise the
    /// first fatal error of the run. No partial dataset is returned.
    pub async fn generate(&self) -> GenerateResult<Generated> {
        let schema = self.schema.clone().ok_or(GenerateError::FormatUndefined)?;

        let controller =
            EnvironmentController::new(Arc::clone(&self.runtime), Arc::clone(&self.scenario))
                .with_settle_delay(self.settle_delay);
        let session = controller.run(&self.config.capture_request()).await?;

        // libpcap reads block; keep them off the runtime the flood still runs on.
        let decoder = self.decoder(schema);
        let artifact = session.artifact_path.clone();
        let start = CaptureStart::At(session.scenario_started_at);
        let decoded =
            tokio::task::spawn_blocking(move || decode_artifact(&decoder, &artifact, start))
                .await??;

        Ok(Generated {
            dataset: decoded.dataset,
            stats: decoded.stats,
            session,
        })
    }

    /// Single-example generation is not supported
    #[must_use]
    pub fn generate_example(&self) -> Option<DatasetRow> {
        None
    }

    /// Decode an existing capture artifact
    ///
    /// # Errors
    /// `GenerateError::FormatUndefined` before `define_schema`, or the
    /// capture error that stopped decoding.
    pub fn decode(&self, artifact: &Path, start: CaptureStart) -> GenerateResult<Decoded> {
        let schema = self.schema.clone().ok_or(GenerateError::FormatUndefined)?;
        decode_artifact(&self.decoder(schema), artifact, start)
    }

    fn decoder(&self, schema: Arc<Schema>) -> Decoder {
        Decoder::new(
            FeatureExtractor::new(schema).with_transport(self.config.transport),
            self.config.max_rows,
            self.config.disposition.clone(),
        )
    }

    /// Write a dataset under the configured relation name
    ///
    /// # Errors
    /// `GenerateError::Output` if writing fails.
    pub fn write<W: Write>(
        &self,
        dataset: &Dataset,
        format: OutputFormat,
        out: W,
    ) -> GenerateResult<()> {
        write_dataset(dataset, format, &self.config.relation_name, out)?;
        Ok(())
    }
}

fn decode_artifact(
    decoder: &Decoder,
    artifact: &Path,
    start: CaptureStart,
) -> GenerateResult<Decoded> {
    let records = ArtifactReader::open(artifact)?;
    Ok(decoder.decode(records, start)?)
}

//! Generator configuration
//!
//! Loaded from TOML, YAML or JSON (by file extension). Every key is
//! optional; missing keys take the defaults below.
//!
//! ```toml
//! image = "fersuy/contackgen-ubuntu2204:1.1.0"
//! window_secs = 180
//! artifact_path = "/tmp/capture.pcap"
//! max_rows = 1000
//! address_encoding = "text"
//!
//! [disposition]
//! mode = "fill_with_sentinel"
//! integer = -1
//! categorical = "?"
//! ```

use contackgen_capture::{OutputFormat, TransportProtocol};
use contackgen_env::{
    CaptureRequest, ConfigError, DEFAULT_CONTAINER_NAME, DEFAULT_IMAGE,
    DEFAULT_INTERNAL_CAPTURE_PATH,
};
use contackgen_schema::{AddressEncoding, Disposition, Schema, SchemaError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default artifact destination on the host
pub const DEFAULT_ARTIFACT_PATH: &str = "/tmp/capture.pcap";

/// Default row cap
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Default scenario window in seconds
pub const DEFAULT_WINDOW_SECS: u64 = 180;

/// Default dataset relation name
pub const DEFAULT_RELATION: &str = "contackgen-udp-flood";

/// Dataset generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Environment image
    pub image: String,
    /// Scenario window in seconds
    pub window_secs: u64,
    /// Host path the capture artifact is written to
    pub artifact_path: PathBuf,
    /// Maximum dataset rows
    pub max_rows: usize,
    /// Handling of rows with absent fields
    pub disposition: Disposition,
    /// Representation of IP address columns
    pub address_encoding: AddressEncoding,
    /// Transport a packet must carry to become a row
    pub transport: TransportProtocol,
    /// Column names, in order; the full packet feature set when unset
    pub fields: Option<Vec<String>>,
    /// Fixed container name
    pub container_name: String,
    /// Capture path inside the container
    pub internal_capture_path: String,
    /// Relation name written into ARFF output
    pub relation_name: String,
    /// Default output format
    pub format: OutputFormat,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            window_secs: DEFAULT_WINDOW_SECS,
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            max_rows: DEFAULT_MAX_ROWS,
            disposition: Disposition::default(),
            address_encoding: AddressEncoding::default(),
            transport: TransportProtocol::default(),
            fields: None,
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            internal_capture_path: DEFAULT_INTERNAL_CAPTURE_PATH.to_string(),
            relation_name: DEFAULT_RELATION.to_string(),
            format: OutputFormat::default(),
        }
    }
}

impl GeneratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With environment image
    #[inline]
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// With scenario window
    #[inline]
    #[must_use]
    pub fn with_window_secs(mut self, secs: u64) -> Self {
        self.window_secs = secs;
        self
    }

    /// With artifact destination
    #[inline]
    #[must_use]
    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    /// With row cap
    #[inline]
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// With absent-field disposition
    #[inline]
    #[must_use]
    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// With address encoding
    #[inline]
    #[must_use]
    pub fn with_address_encoding(mut self, encoding: AddressEncoding) -> Self {
        self.address_encoding = encoding;
        self
    }

    /// With explicit column list
    #[inline]
    #[must_use]
    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// With target transport
    #[inline]
    #[must_use]
    pub fn with_transport(mut self, transport: TransportProtocol) -> Self {
        self.transport = transport;
        self
    }

    /// Load a configuration file, choosing the parser by extension
    ///
    /// `.toml`, `.yaml`/`.yml` and `.json` are recognized.
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse` for
    /// malformed content or an unknown extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let config: Self = match extension.as_deref() {
            Some("toml") => toml::from_str(&text).map_err(|e| ConfigError::parse(path, e))?,
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&text).map_err(|e| ConfigError::parse(path, e))?
            }
            Some("json") => serde_json::from_str(&text).map_err(|e| ConfigError::parse(path, e))?,
            other => {
                return Err(ConfigError::parse(
                    path,
                    format!("unsupported config extension {other:?}"),
                ))
            }
        };
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load a TOML configuration file
    ///
    /// # Errors
    /// See [`GeneratorConfig::from_file`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        toml::from_str(&text).map_err(|e| ConfigError::parse(path, e))
    }

    /// Scenario window
    #[inline]
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Check the configuration and absolutize the artifact path
    ///
    /// # Errors
    /// Any `ConfigError` the capture request or the option ranges reject.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.max_rows == 0 {
            return Err(ConfigError::invalid("max_rows", "must be greater than zero"));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::invalid("window_secs", "must be greater than zero"));
        }
        if self.artifact_path.is_relative() {
            let cwd = std::env::current_dir().map_err(|e| ConfigError::io(".", e))?;
            self.artifact_path = cwd.join(&self.artifact_path);
        }
        self.capture_request().validate()
    }

    /// Capture request for the environment controller
    #[must_use]
    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest::new(&self.artifact_path)
            .with_image(&self.image)
            .with_container_name(&self.container_name)
            .with_window(self.window())
            .with_internal_capture_path(&self.internal_capture_path)
    }

    /// Dataset schema described by this configuration
    ///
    /// # Errors
    /// `SchemaError` for unknown, duplicate or missing column names.
    pub fn schema(&self) -> Result<Schema, SchemaError> {
        match &self.fields {
            Some(names) => Schema::from_names(names, self.address_encoding),
            None => Ok(Schema::packet_features(self.address_encoding)),
        }
    }
}

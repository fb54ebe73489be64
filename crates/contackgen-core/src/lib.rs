//! contackgen dataset generator
//!
//! Produces labeled packet-feature datasets by running a UDP flood against a
//! containerized victim, retrieving the capture it recorded and decoding it
//! packet by packet.
//!
//! # Example
//!
//! ```rust,no_run
//! use contackgen_core::{GeneratorConfig, PcapGenerator};
//!
//! # async fn run() -> Result<(), contackgen_core::GenerateError> {
//! let mut generator = PcapGenerator::new(GeneratorConfig::new().with_window_secs(60));
//! generator.define_schema()?;
//! let generated = generator.generate().await?;
//! println!("{} rows", generated.dataset.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod generator;

pub use config::{
    GeneratorConfig, DEFAULT_ARTIFACT_PATH, DEFAULT_MAX_ROWS, DEFAULT_RELATION,
    DEFAULT_WINDOW_SECS,
};
pub use error::{GenerateError, GenerateResult, Stage};
pub use generator::{Generated, PcapGenerator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Dataset schema for packet-feature datasets
//!
//! Defines the shapes shared by every stage of the capture-to-dataset
//! pipeline:
//! - `Schema`: ordered, uniquely named fields with their value domains
//! - `FeatureTuple`: one slot per schema field, present or explicitly absent
//! - `Disposition`: how a tuple with absent slots becomes a row (or not)
//! - `Dataset`: the ordered, immutable row collection handed to consumers
//!
//! # Example
//!
//! ```rust
//! use contackgen_schema::{AddressEncoding, Disposition, FeatureTuple, Schema, Slot, Value};
//!
//! let schema = Schema::packet_features(AddressEncoding::Text);
//! let tuple = FeatureTuple::build(&schema, |_| Slot::Absent);
//! let row = Disposition::default().resolve(&schema, &tuple).unwrap();
//!
//! assert_eq!(row.len(), schema.len());
//! assert_eq!(row.values()[0], Value::Categorical("?".to_string()));
//! ```

mod dataset;
mod error;
mod field;
mod schema;
mod tuple;
mod value;

pub use dataset::{Dataset, DatasetBuilder, DatasetRow, Disposition};
pub use error::SchemaError;
pub use field::{AddressEncoding, Domain, Field, FieldKind};
pub use schema::Schema;
pub use tuple::FeatureTuple;
pub use value::{Slot, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

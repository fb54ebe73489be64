//! Error types for schema construction and tuple validation

use crate::field::Domain;

/// Schema and tuple shape errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A schema must name at least one field
    #[error("schema has no fields")]
    Empty,

    /// Field names must be unique
    #[error("duplicate field: '{0}'")]
    DuplicateField(String),

    /// Name does not correspond to any known packet feature
    #[error("unknown field: '{0}'")]
    UnknownField(String),

    /// Tuple or row does not carry one entry per schema field
    #[error("arity mismatch: schema has {expected} fields, got {actual}")]
    ArityMismatch {
        /// Schema field count
        expected: usize,
        /// Entries supplied
        actual: usize,
    },

    /// Present value does not belong to the field's domain
    #[error("domain mismatch for '{field}': expected {expected:?}, got {actual:?}")]
    DomainMismatch {
        /// Field name
        field: String,
        /// Domain the schema declares
        expected: Domain,
        /// Domain of the supplied value
        actual: Domain,
    },
}

//! Rows, dispositions and the assembled dataset

use crate::field::Domain;
use crate::schema::Schema;
use crate::tuple::FeatureTuple;
use crate::value::{Slot, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

fn default_integer_sentinel() -> i64 {
    -1
}

fn default_categorical_sentinel() -> String {
    "?".to_string()
}

/// Policy for tuples that carry absent slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Disposition {
    /// Discard the whole row
    DropRow,
    /// Replace each absent slot with the sentinel for its domain
    FillWithSentinel {
        /// Sentinel for integer fields
        #[serde(default = "default_integer_sentinel")]
        integer: i64,
        /// Sentinel for categorical fields
        #[serde(default = "default_categorical_sentinel")]
        categorical: String,
    },
}

impl Disposition {
    /// Fill with the default sentinels (`-1` and `?`)
    #[inline]
    #[must_use]
    pub fn fill() -> Self {
        Self::FillWithSentinel {
            integer: default_integer_sentinel(),
            categorical: default_categorical_sentinel(),
        }
    }

    /// Resolve a tuple into a row, or `None` if the row is dropped
    ///
    /// The tuple must have been built against `schema`.
    #[must_use]
    pub fn resolve(&self, schema: &Schema, tuple: &FeatureTuple) -> Option<DatasetRow> {
        debug_assert_eq!(schema.len(), tuple.len());

        let mut values = Vec::with_capacity(tuple.len());
        for (field, slot) in schema.fields().iter().zip(tuple.slots()) {
            let value = match (slot, self) {
                (Slot::Present(v), _) => v.clone(),
                (Slot::Absent, Self::DropRow) => return None,
                (Slot::Absent, Self::FillWithSentinel { integer, categorical }) => {
                    match field.domain() {
                        Domain::Integer => Value::Integer(*integer),
                        Domain::CategoricalString => Value::Categorical(categorical.clone()),
                    }
                }
            };
            values.push(value);
        }

        Some(DatasetRow { values })
    }
}

impl Default for Disposition {
    fn default() -> Self {
        Self::fill()
    }
}

/// A fully resolved row, values in schema order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DatasetRow {
    values: Vec<Value>,
}

impl DatasetRow {
    /// Values in schema order
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a row with no values
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a column index
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Accumulates rows during assembly
///
/// The only way to obtain a `Dataset`; once `finish` is called the rows are
/// frozen.
#[derive(Debug)]
pub struct DatasetBuilder {
    schema: Arc<Schema>,
    rows: Vec<DatasetRow>,
}

impl DatasetBuilder {
    /// Empty builder
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Empty builder with room for `capacity` rows
    #[must_use]
    pub fn with_capacity(schema: Arc<Schema>, capacity: usize) -> Self {
        Self {
            schema,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Append a row resolved against this builder's schema
    pub fn push(&mut self, row: DatasetRow) {
        debug_assert_eq!(row.len(), self.schema.len());
        self.rows.push(row);
    }

    /// Rows pushed so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True before the first row
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Schema rows are checked against
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Freeze the collected rows
    #[must_use]
    pub fn finish(self) -> Dataset {
        Dataset {
            schema: self.schema,
            rows: self.rows,
        }
    }
}

/// Ordered, immutable collection of rows sharing one schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    schema: Arc<Schema>,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Column schema
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows in arrival order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True for a dataset with no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.schema.index_of(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(index)).collect())
    }

    /// SHA-256 over column names and every value, hex encoded
    ///
    /// Two datasets with the same schema and rows have the same fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for name in self.schema.names() {
            hasher.update(name.as_bytes());
            hasher.update([0]);
        }
        for row in &self.rows {
            for value in row.values() {
                match value {
                    Value::Integer(v) => {
                        hasher.update([b'i']);
                        hasher.update(v.to_le_bytes());
                    }
                    Value::Categorical(s) => {
                        hasher.update([b's']);
                        hasher.update((s.len() as u64).to_le_bytes());
                        hasher.update(s.as_bytes());
                    }
                }
            }
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a DatasetRow;
    type IntoIter = std::slice::Iter<'a, DatasetRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AddressEncoding, FieldKind};
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::from_kinds(
            [FieldKind::SrcIp, FieldKind::Ttl],
            AddressEncoding::Text,
        )
        .unwrap()
    }

    fn partial(schema: &Schema) -> FeatureTuple {
        FeatureTuple::build(schema, |f| match f.kind() {
            FieldKind::Ttl => Slot::Present(Value::Integer(64)),
            _ => Slot::Absent,
        })
    }

    #[test]
    fn fill_uses_domain_sentinels() {
        let schema = schema();
        let row = Disposition::fill().resolve(&schema, &partial(&schema)).unwrap();

        assert_eq!(
            row.values(),
            &[Value::Categorical("?".to_string()), Value::Integer(64)]
        );
    }

    #[test]
    fn custom_sentinels() {
        let schema = schema();
        let disposition = Disposition::FillWithSentinel {
            integer: 0,
            categorical: "missing".to_string(),
        };
        let row = disposition.resolve(&schema, &partial(&schema)).unwrap();
        assert_eq!(row.values()[0], Value::Categorical("missing".to_string()));
    }

    #[test]
    fn drop_rejects_partial_tuples() {
        let schema = schema();
        assert!(Disposition::DropRow.resolve(&schema, &partial(&schema)).is_none());

        let complete = FeatureTuple::build(&schema, |f| match f.kind() {
            FieldKind::SrcIp => Slot::Present(Value::from("10.0.0.1")),
            _ => Slot::Present(Value::Integer(1)),
        });
        assert!(Disposition::DropRow.resolve(&schema, &complete).is_some());
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let schema = Arc::new(schema());
        let build = |ttl: i64| {
            let tuple = FeatureTuple::build(&schema, |f| match f.kind() {
                FieldKind::Ttl => Slot::Present(Value::Integer(ttl)),
                _ => Slot::Present(Value::from("10.0.0.1")),
            });
            let mut builder = DatasetBuilder::new(Arc::clone(&schema));
            builder.push(Disposition::DropRow.resolve(&schema, &tuple).unwrap());
            builder.finish()
        };

        assert_eq!(build(64).fingerprint(), build(64).fingerprint());
        assert_ne!(build(64).fingerprint(), build(63).fingerprint());
    }

    #[test]
    fn disposition_deserializes_with_default_sentinels() {
        #[derive(Deserialize)]
        struct Wrapper {
            disposition: Disposition,
        }

        let parsed: Wrapper =
            serde_json::from_str(r#"{"disposition":{"mode":"fill_with_sentinel"}}"#).unwrap();
        assert_eq!(parsed.disposition, Disposition::fill());

        let parsed: Wrapper = serde_json::from_str(r#"{"disposition":{"mode":"drop_row"}}"#).unwrap();
        assert_eq!(parsed.disposition, Disposition::DropRow);
    }
}

//! Ordered field schema
//!
//! The schema fixes column order once. Every tuple and row built against it
//! carries its values in exactly this order.

use crate::error::SchemaError;
use crate::field::{AddressEncoding, Field, FieldKind};
use std::collections::HashSet;
use std::fmt;

/// Ordered, uniquely named set of dataset fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    encoding: AddressEncoding,
}

impl Schema {
    /// Build a schema from an ordered list of feature kinds
    ///
    /// # Errors
    /// - `SchemaError::Empty` if no kinds are given
    /// - `SchemaError::DuplicateField` if a kind appears twice
    pub fn from_kinds(
        kinds: impl IntoIterator<Item = FieldKind>,
        encoding: AddressEncoding,
    ) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();

        for kind in kinds {
            if !seen.insert(kind) {
                return Err(SchemaError::DuplicateField(kind.name().to_string()));
            }
            fields.push(Field::new(kind, encoding));
        }

        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        Ok(Self { fields, encoding })
    }

    /// Build a schema from column names
    ///
    /// # Errors
    /// `SchemaError::UnknownField` for names that are not packet features,
    /// plus everything `from_kinds` rejects.
    pub fn from_names<S: AsRef<str>>(
        names: impl IntoIterator<Item = S>,
        encoding: AddressEncoding,
    ) -> Result<Self, SchemaError> {
        let kinds = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                FieldKind::from_name(name).ok_or_else(|| SchemaError::UnknownField(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_kinds(kinds, encoding)
    }

    /// The full packet feature schema in default column order
    #[must_use]
    pub fn packet_features(encoding: AddressEncoding) -> Self {
        Self {
            fields: FieldKind::ALL
                .into_iter()
                .map(|kind| Field::new(kind, encoding))
                .collect(),
            encoding,
        }
    }

    /// Fields in column order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Column names in order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(Field::name)
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a constructed schema
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column index of a feature kind
    #[must_use]
    pub fn position(&self, kind: FieldKind) -> Option<usize> {
        self.fields.iter().position(|f| f.kind() == kind)
    }

    /// Column index of a field name
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Whether the schema includes a feature kind
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: FieldKind) -> bool {
        self.position(kind).is_some()
    }

    /// Address encoding this schema was built with
    #[inline]
    #[must_use]
    pub fn address_encoding(&self) -> AddressEncoding {
        self.encoding
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::packet_features(AddressEncoding::default())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            writeln!(f, "{:>2}  {:<16} {}", i, field.name(), field.domain())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Domain;

    #[test]
    fn default_order_matches_feature_list() {
        let schema = Schema::default();
        let names: Vec<_> = schema.names().collect();

        assert_eq!(
            names,
            vec![
                "srcIp",
                "dstIp",
                "protocol",
                "srcPort",
                "dstPort",
                "type",
                "version",
                "IHL",
                "length",
                "identification",
                "fragmentOffset",
                "TTL",
                "headerChecksum",
                "timeStamp",
            ]
        );
    }

    #[test]
    fn rejects_duplicates() {
        let err = Schema::from_kinds(
            [FieldKind::Ttl, FieldKind::SrcPort, FieldKind::Ttl],
            AddressEncoding::Text,
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("TTL".to_string()));
    }

    #[test]
    fn rejects_empty() {
        let err = Schema::from_kinds([], AddressEncoding::Text).unwrap_err();
        assert_eq!(err, SchemaError::Empty);
    }

    #[test]
    fn from_names_keeps_given_order() {
        let schema =
            Schema::from_names(["TTL", "srcIp", "timeStamp"], AddressEncoding::ConcatenatedOctets)
                .unwrap();

        assert_eq!(schema.index_of("TTL"), Some(0));
        assert_eq!(schema.position(FieldKind::SrcIp), Some(1));
        assert_eq!(schema.fields()[1].domain(), Domain::Integer);
        assert!(!schema.contains(FieldKind::DstIp));
    }

    #[test]
    fn from_names_rejects_unknown() {
        let err = Schema::from_names(["TTL", "flowLabel"], AddressEncoding::Text).unwrap_err();
        assert_eq!(err, SchemaError::UnknownField("flowLabel".to_string()));
    }
}

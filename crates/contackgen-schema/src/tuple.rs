//! Per-packet feature tuples
//!
//! A tuple is built for one packet at a time and always holds exactly one
//! slot per schema field, so a field that fails to match in one packet can
//! never shift the values of another packet into the wrong row.

use crate::error::SchemaError;
use crate::field::Field;
use crate::schema::Schema;
use crate::value::Slot;

/// Schema-shaped feature values for one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureTuple {
    slots: Vec<Slot>,
}

impl FeatureTuple {
    /// Build a tuple by asking `slot_for` once per schema field, in order
    ///
    /// Present values must match their field's domain.
    pub fn build(schema: &Schema, mut slot_for: impl FnMut(&Field) -> Slot) -> Self {
        let slots = schema
            .fields()
            .iter()
            .map(|field| {
                let slot = slot_for(field);
                debug_assert!(
                    slot.value().map_or(true, |v| v.domain() == field.domain()),
                    "value for '{}' outside its domain",
                    field.name()
                );
                slot
            })
            .collect();
        Self { slots }
    }

    /// Validate externally assembled slots against a schema
    ///
    /// # Errors
    /// - `SchemaError::ArityMismatch` if the slot count differs from the schema
    /// - `SchemaError::DomainMismatch` if a present value is in the wrong domain
    pub fn from_slots(schema: &Schema, slots: Vec<Slot>) -> Result<Self, SchemaError> {
        if slots.len() != schema.len() {
            return Err(SchemaError::ArityMismatch {
                expected: schema.len(),
                actual: slots.len(),
            });
        }

        for (field, slot) in schema.fields().iter().zip(&slots) {
            if let Some(value) = slot.value() {
                if value.domain() != field.domain() {
                    return Err(SchemaError::DomainMismatch {
                        field: field.name().to_string(),
                        expected: field.domain(),
                        actual: value.domain(),
                    });
                }
            }
        }

        Ok(Self { slots })
    }

    /// Slots in schema order
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of slots
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True for a tuple with no slots
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot for a named field
    #[must_use]
    pub fn get(&self, schema: &Schema, name: &str) -> Option<&Slot> {
        schema.index_of(name).and_then(|i| self.slots.get(i))
    }

    /// Whether every slot is present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| !s.is_absent())
    }

    /// Names of the fields left absent
    pub fn absent_fields<'a>(&'a self, schema: &'a Schema) -> impl Iterator<Item = &'static str> + 'a {
        schema
            .fields()
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_absent())
            .map(|(field, _)| field.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AddressEncoding, Domain, FieldKind};
    use crate::value::Value;

    fn small_schema() -> Schema {
        Schema::from_kinds(
            [FieldKind::SrcIp, FieldKind::Ttl, FieldKind::DstPort],
            AddressEncoding::Text,
        )
        .unwrap()
    }

    #[test]
    fn build_visits_every_field_once() {
        let schema = small_schema();
        let mut visited = Vec::new();
        let tuple = FeatureTuple::build(&schema, |f| {
            visited.push(f.name());
            Slot::Absent
        });

        assert_eq!(visited, vec!["srcIp", "TTL", "dstPort"]);
        assert_eq!(tuple.len(), 3);
        assert!(!tuple.is_complete());
    }

    #[test]
    fn absent_fields_are_named() {
        let schema = small_schema();
        let tuple = FeatureTuple::build(&schema, |f| match f.kind() {
            FieldKind::Ttl => Slot::Present(Value::Integer(64)),
            _ => Slot::Absent,
        });

        let absent: Vec<_> = tuple.absent_fields(&schema).collect();
        assert_eq!(absent, vec!["srcIp", "dstPort"]);
        assert_eq!(
            tuple.get(&schema, "TTL"),
            Some(&Slot::Present(Value::Integer(64)))
        );
    }

    #[test]
    fn from_slots_checks_arity() {
        let schema = small_schema();
        let err = FeatureTuple::from_slots(&schema, vec![Slot::Absent]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::ArityMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn from_slots_checks_domain() {
        let schema = small_schema();
        let err = FeatureTuple::from_slots(
            &schema,
            vec![
                Slot::Present(Value::Integer(1)),
                Slot::Absent,
                Slot::Absent,
            ],
        )
        .unwrap_err();

        assert_eq!(
            err,
            SchemaError::DomainMismatch {
                field: "srcIp".to_string(),
                expected: Domain::CategoricalString,
                actual: Domain::Integer,
            }
        );
    }
}

//! Dataset assembly
//!
//! Accepts feature tuples in arrival order, resolves absent slots through the
//! configured disposition and stops once the row cap is reached. Dropped rows
//! do not count toward the cap.

use contackgen_schema::{Dataset, DatasetBuilder, Disposition, FeatureTuple, Schema};
use serde::Serialize;
use std::sync::Arc;

/// What happened to an offered tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Row added
    Accepted,
    /// Row dropped by the disposition
    Dropped,
    /// Row cap already reached, tuple ignored
    Full,
}

/// Counters collected while decoding an artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Packet records read from the artifact
    pub records_read: u64,
    /// Records skipped for not carrying the target transport
    pub skipped: u64,
    /// Tuples dropped for absent fields
    pub dropped: u64,
    /// Rows accepted into the dataset
    pub accepted: u64,
}

/// Incremental dataset assembler
#[derive(Debug)]
pub struct Assembler {
    max_rows: usize,
    disposition: Disposition,
    builder: DatasetBuilder,
    stats: AssemblyStats,
}

impl Assembler {
    /// Empty assembler
    #[must_use]
    pub fn new(schema: Arc<Schema>, max_rows: usize, disposition: Disposition) -> Self {
        Self {
            max_rows,
            disposition,
            builder: DatasetBuilder::with_capacity(schema, max_rows.min(4096)),
            stats: AssemblyStats::default(),
        }
    }

    /// Whether the row cap has been reached
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.builder.len() >= self.max_rows
    }

    /// Offer one tuple
    pub fn offer(&mut self, tuple: &FeatureTuple) -> Admission {
        if self.is_full() {
            return Admission::Full;
        }

        match self.disposition.resolve(self.builder.schema(), tuple) {
            Some(row) => {
                self.builder.push(row);
                self.stats.accepted += 1;
                Admission::Accepted
            }
            None => {
                self.stats.dropped += 1;
                tracing::trace!(
                    absent = ?tuple.absent_fields(self.builder.schema()).collect::<Vec<_>>(),
                    "row dropped"
                );
                Admission::Dropped
            }
        }
    }

    /// Count a record read from the artifact
    #[inline]
    pub fn note_record(&mut self) {
        self.stats.records_read += 1;
    }

    /// Count a non-qualifying record
    #[inline]
    pub fn note_skipped(&mut self) {
        self.stats.skipped += 1;
    }

    /// Counts so far
    #[inline]
    #[must_use]
    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    /// Freeze the dataset
    #[must_use]
    pub fn finish(self) -> (Dataset, AssemblyStats) {
        (self.builder.finish(), self.stats)
    }
}

/// Assemble a dataset from a tuple sequence
///
/// Pulls tuples only until `max_rows` rows are accepted.
pub fn assemble(
    tuples: impl IntoIterator<Item = FeatureTuple>,
    schema: Arc<Schema>,
    max_rows: usize,
    disposition: Disposition,
) -> Dataset {
    let mut assembler = Assembler::new(schema, max_rows, disposition);
    for tuple in tuples {
        if assembler.is_full() {
            break;
        }
        assembler.offer(&tuple);
    }
    assembler.finish().0
}

#[cfg(test)]
mod tests {
    use super::*;
    use contackgen_schema::{AddressEncoding, FieldKind, Slot, Value};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::from_kinds([FieldKind::Ttl, FieldKind::DstPort], AddressEncoding::Text)
                .unwrap(),
        )
    }

    fn tuple(schema: &Schema, ttl: Option<i64>) -> FeatureTuple {
        FeatureTuple::build(schema, |f| match f.kind() {
            FieldKind::Ttl => Slot::from(ttl.map(Value::Integer)),
            _ => Slot::Present(Value::Integer(53)),
        })
    }

    #[test]
    fn stops_at_cap_without_pulling_more() {
        let schema = schema();
        let mut pulled = 0;
        let tuples = (0..100).map(|i| {
            pulled += 1;
            tuple(&schema, Some(i))
        });

        let dataset = assemble(tuples, Arc::clone(&schema), 5, Disposition::fill());
        assert_eq!(dataset.len(), 5);
        assert_eq!(pulled, 6);
    }

    #[test]
    fn dropped_rows_do_not_count() {
        let schema = schema();
        let tuples = vec![
            tuple(&schema, Some(1)),
            tuple(&schema, None),
            tuple(&schema, Some(2)),
            tuple(&schema, Some(3)),
        ];

        let dataset = assemble(tuples, Arc::clone(&schema), 3, Disposition::DropRow);
        let ttls: Vec<_> = dataset
            .column("TTL")
            .unwrap()
            .into_iter()
            .filter_map(Value::as_integer)
            .collect();
        assert_eq!(ttls, vec![1, 2, 3]);
    }

    #[test]
    fn admission_and_stats() {
        let schema = schema();
        let mut assembler = Assembler::new(Arc::clone(&schema), 1, Disposition::DropRow);

        assert_eq!(assembler.offer(&tuple(&schema, None)), Admission::Dropped);
        assert_eq!(assembler.offer(&tuple(&schema, Some(9))), Admission::Accepted);
        assert_eq!(assembler.offer(&tuple(&schema, Some(10))), Admission::Full);

        let (dataset, stats) = assembler.finish();
        assert_eq!(dataset.len(), 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn zero_cap_yields_empty_dataset() {
        let schema = schema();
        let dataset = assemble(
            vec![tuple(&schema, Some(1))],
            Arc::clone(&schema),
            0,
            Disposition::fill(),
        );
        assert!(dataset.is_empty());
    }
}

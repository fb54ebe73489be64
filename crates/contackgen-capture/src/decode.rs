//! Record → tuple → row chain
//!
//! Runs synchronously over a record sequence and stops pulling records as
//! soon as the row cap is reached.

use crate::assembler::{Assembler, AssemblyStats};
use crate::error::CaptureError;
use crate::extractor::FeatureExtractor;
use crate::reader::RawPacketRecord;
use chrono::{DateTime, Utc};
use contackgen_schema::{Dataset, Disposition};

/// Reference instant for the elapsed-time field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStart {
    /// Timestamp of the first record in the artifact
    FirstPacket,
    /// Explicit instant, usually when the scenario started
    At(DateTime<Utc>),
}

/// Output of a decoding pass
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Assembled rows
    pub dataset: Dataset,
    /// Assembly report
    pub stats: AssemblyStats,
}

/// Decoding chain configuration
#[derive(Debug, Clone)]
pub struct Decoder {
    extractor: FeatureExtractor,
    max_rows: usize,
    disposition: Disposition,
}

impl Decoder {
    /// Decoder with a row cap and absent-field disposition
    #[must_use]
    pub fn new(extractor: FeatureExtractor, max_rows: usize, disposition: Disposition) -> Self {
        Self {
            extractor,
            max_rows,
            disposition,
        }
    }

    /// Extractor applied to every record
    #[inline]
    #[must_use]
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Decode a record sequence into a dataset
    ///
    /// # Errors
    /// The first `CaptureError` yielded by `records`. No partial dataset is
    /// returned.
    pub fn decode<I>(&self, records: I, start: CaptureStart) -> Result<Decoded, CaptureError>
    where
        I: IntoIterator<Item = Result<RawPacketRecord, CaptureError>>,
    {
        let mut assembler = Assembler::new(
            std::sync::Arc::clone(self.extractor.schema()),
            self.max_rows,
            self.disposition.clone(),
        );
        let mut anchor = match start {
            CaptureStart::At(t) => Some(t),
            CaptureStart::FirstPacket => None,
        };

        for record in records {
            if assembler.is_full() {
                break;
            }
            let record = record?;
            assembler.note_record();

            let capture_start = *anchor.get_or_insert(record.timestamp());
            match self.extractor.extract(&record, capture_start) {
                Some(tuple) => {
                    assembler.offer(&tuple);
                }
                None => assembler.note_skipped(),
            }
        }

        let (dataset, stats) = assembler.finish();
        tracing::info!(
            rows = dataset.len(),
            records = stats.records_read,
            skipped = stats.skipped,
            dropped = stats.dropped,
            "dataset assembled"
        );
        Ok(Decoded { dataset, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::TransportProtocol;
    use chrono::TimeDelta;
    use contackgen_schema::{AddressEncoding, FieldKind, Schema, Value};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn udp(offset_ms: i64, ttl: u8) -> Result<RawPacketRecord, CaptureError> {
        Ok(RawPacketRecord::new(
            t0() + TimeDelta::milliseconds(offset_ms),
            format!("[UDP Header (8 bytes)]\n  TTL: {ttl}\n"),
        ))
    }

    fn decoder(max_rows: usize) -> Decoder {
        let schema = Arc::new(
            Schema::from_kinds([FieldKind::Ttl, FieldKind::ElapsedMillis], AddressEncoding::Text)
                .unwrap(),
        );
        Decoder::new(
            FeatureExtractor::new(schema).with_transport(TransportProtocol::Udp),
            max_rows,
            Disposition::fill(),
        )
    }

    #[test]
    fn first_packet_anchor() {
        let decoded = decoder(10)
            .decode(
                vec![
                    Ok(RawPacketRecord::new(t0(), "ARP")),
                    udp(40, 64),
                    udp(90, 63),
                ],
                CaptureStart::FirstPacket,
            )
            .unwrap();

        let stamps: Vec<_> = decoded
            .dataset
            .column("timeStamp")
            .unwrap()
            .into_iter()
            .filter_map(Value::as_integer)
            .collect();
        assert_eq!(stamps, vec![40, 90]);
        assert_eq!(decoded.stats.skipped, 1);
        assert_eq!(decoded.stats.records_read, 3);
    }

    #[test]
    fn explicit_anchor() {
        let decoded = decoder(10)
            .decode(vec![udp(500, 64)], CaptureStart::At(t0() + TimeDelta::milliseconds(250)))
            .unwrap();
        assert_eq!(decoded.dataset.rows()[0].values()[1], Value::Integer(250));
    }

    #[test]
    fn stops_reading_when_full() {
        let records = vec![
            udp(1, 64),
            udp(2, 64),
            Err(CaptureError::Read("past the cap".to_string())),
        ];
        let decoded = decoder(2).decode(records, CaptureStart::FirstPacket).unwrap();
        assert_eq!(decoded.dataset.len(), 2);
    }

    #[test]
    fn read_error_discards_partial_dataset() {
        let records = vec![udp(1, 64), Err(CaptureError::Read("truncated".to_string()))];
        let result = decoder(10).decode(records, CaptureStart::FirstPacket);
        assert!(matches!(result, Err(CaptureError::Read(_))));
    }
}

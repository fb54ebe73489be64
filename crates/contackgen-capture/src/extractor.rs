//! Feature extraction
//!
//! Maps one raw packet record to a schema-shaped `FeatureTuple`:
//! - records not carrying the target transport are skipped
//! - every schema field is matched independently with its own pattern
//! - a field whose pattern does not match, or whose text does not parse,
//!   becomes `Slot::Absent`
//!
//! The elapsed-time field is derived from the record's own timestamp, never
//! from the wall clock.

use crate::reader::RawPacketRecord;
use crate::render::{TCP_MARKER, UDP_MARKER};
use chrono::{DateTime, Utc};
use contackgen_schema::{AddressEncoding, FeatureTuple, Field, FieldKind, Schema, Slot, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static field pattern")
}

static SRC_ADDR: Lazy<Regex> = Lazy::new(|| pattern(r"Source address: /(\S+)"));
static DST_ADDR: Lazy<Regex> = Lazy::new(|| pattern(r"Destination address: /(\S+)"));
static PROTOCOL: Lazy<Regex> = Lazy::new(|| pattern(r"(?:Protocol|Next Header): (\d+)"));
static SRC_PORT: Lazy<Regex> = Lazy::new(|| pattern(r"Source port: (\d+)"));
static DST_PORT: Lazy<Regex> = Lazy::new(|| pattern(r"Destination port: (\d+)"));
static TYPE: Lazy<Regex> = Lazy::new(|| pattern(r"Type: (0x[0-9a-fA-F]+)"));
static VERSION: Lazy<Regex> = Lazy::new(|| pattern(r"Version: (\d+)"));
static IHL: Lazy<Regex> = Lazy::new(|| pattern(r"IHL: (\d+)"));
static LENGTH: Lazy<Regex> = Lazy::new(|| pattern(r"Length: (\d+)"));
static IDENTIFICATION: Lazy<Regex> = Lazy::new(|| pattern(r"Identification: (\d+)"));
static FRAGMENT_OFFSET: Lazy<Regex> = Lazy::new(|| pattern(r"Fragment offset: (\d+)"));
static TTL: Lazy<Regex> = Lazy::new(|| pattern(r"(?:TTL|Hop Limit): (\d+)"));
static HEADER_CHECKSUM: Lazy<Regex> = Lazy::new(|| pattern(r"Header checksum: (0x[0-9a-fA-F]+)"));

/// How a matched field's text is turned into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parse {
    Decimal,
    Hex,
    Address,
    Categorical,
}

fn rule(kind: FieldKind) -> Option<(&'static Regex, Parse)> {
    let rule = match kind {
        FieldKind::SrcIp => (&*SRC_ADDR, Parse::Address),
        FieldKind::DstIp => (&*DST_ADDR, Parse::Address),
        FieldKind::Protocol => (&*PROTOCOL, Parse::Categorical),
        FieldKind::SrcPort => (&*SRC_PORT, Parse::Decimal),
        FieldKind::DstPort => (&*DST_PORT, Parse::Decimal),
        FieldKind::EtherType => (&*TYPE, Parse::Hex),
        FieldKind::Version => (&*VERSION, Parse::Decimal),
        FieldKind::Ihl => (&*IHL, Parse::Decimal),
        FieldKind::Length => (&*LENGTH, Parse::Decimal),
        FieldKind::Identification => (&*IDENTIFICATION, Parse::Decimal),
        FieldKind::FragmentOffset => (&*FRAGMENT_OFFSET, Parse::Decimal),
        FieldKind::Ttl => (&*TTL, Parse::Decimal),
        FieldKind::HeaderChecksum => (&*HEADER_CHECKSUM, Parse::Hex),
        FieldKind::ElapsedMillis => return None,
    };
    Some(rule)
}

/// Parse base-10 text
#[must_use]
pub fn parse_decimal(text: &str) -> Option<i64> {
    text.parse().ok()
}

/// Parse `0x`-prefixed base-16 text
#[must_use]
pub fn parse_hex(text: &str) -> Option<i64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))?;
    i64::from_str_radix(digits, 16).ok()
}

/// Concatenate the decimal octets of a dotted IPv4 address
///
/// `172.17.0.2` becomes `1721702`. Lossy: different addresses can yield the
/// same integer.
#[must_use]
pub fn concat_octets(text: &str) -> Option<i64> {
    let addr: Ipv4Addr = text.parse().ok()?;
    addr.octets()
        .iter()
        .map(u8::to_string)
        .collect::<String>()
        .parse()
        .ok()
}

/// Transport a record must carry to qualify for extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProtocol {
    /// UDP datagrams
    #[default]
    Udp,
    /// TCP segments
    Tcp,
}

impl TransportProtocol {
    /// Whether a representation carries this transport
    #[inline]
    #[must_use]
    pub fn matches(self, representation: &str) -> bool {
        let marker = match self {
            Self::Udp => UDP_MARKER,
            Self::Tcp => TCP_MARKER,
        };
        representation.contains(marker)
    }
}

/// Maps packet records to feature tuples for one schema
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    schema: Arc<Schema>,
    transport: TransportProtocol,
}

impl FeatureExtractor {
    /// Extractor for UDP records
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            transport: TransportProtocol::Udp,
        }
    }

    /// With target transport
    #[inline]
    #[must_use]
    pub fn with_transport(mut self, transport: TransportProtocol) -> Self {
        self.transport = transport;
        self
    }

    /// Output schema
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Transport a record must carry to qualify
    #[inline]
    #[must_use]
    pub fn transport(&self) -> TransportProtocol {
        self.transport
    }

    /// Whether a record qualifies for extraction
    #[inline]
    #[must_use]
    pub fn qualifies(&self, raw: &RawPacketRecord) -> bool {
        self.transport.matches(raw.representation())
    }

    /// Extract a feature tuple, or `None` for non-qualifying records
    #[must_use]
    pub fn extract(
        &self,
        raw: &RawPacketRecord,
        capture_start: DateTime<Utc>,
    ) -> Option<FeatureTuple> {
        if !self.qualifies(raw) {
            return None;
        }

        let encoding = self.schema.address_encoding();
        Some(FeatureTuple::build(&self.schema, |field| {
            Self::slot(field, raw, capture_start, encoding)
        }))
    }

    fn slot(
        field: &Field,
        raw: &RawPacketRecord,
        capture_start: DateTime<Utc>,
        encoding: AddressEncoding,
    ) -> Slot {
        let Some((regex, parse)) = rule(field.kind()) else {
            let elapsed = raw.timestamp() - capture_start;
            return Slot::Present(Value::Integer(elapsed.num_milliseconds()));
        };

        let Some(text) = regex
            .captures(raw.representation())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            return Slot::Absent;
        };

        let value = match parse {
            Parse::Decimal => parse_decimal(text).map(Value::Integer),
            Parse::Hex => parse_hex(text).map(Value::Integer),
            Parse::Categorical => Some(Value::Categorical(text.to_string())),
            Parse::Address => match encoding {
                AddressEncoding::Text => Some(Value::Categorical(text.to_string())),
                AddressEncoding::ConcatenatedOctets => concat_octets(text).map(Value::Integer),
            },
        };

        if value.is_none() {
            tracing::trace!(field = field.name(), text, "field matched but did not parse");
        }
        Slot::from(value)
    }
}

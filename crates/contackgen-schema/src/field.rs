//! Packet feature fields and their value domains

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value domain of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Signed 64-bit integer
    Integer,
    /// Free-form categorical text
    CategoricalString,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::CategoricalString => f.write_str("categorical"),
        }
    }
}

/// How IPv4 addresses are carried in the dataset
///
/// `ConcatenatedOctets` joins the decimal octets into one integer
/// (`10.0.0.12` becomes `100012`). Distinct addresses can collide
/// (`1.11.1.1` and `11.1.1.1`), so the textual form is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressEncoding {
    /// Canonical dotted text
    #[default]
    Text,
    /// Decimal octets concatenated into an integer
    ConcatenatedOctets,
}

/// Every packet feature the extractor knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// IP source address
    SrcIp,
    /// IP destination address
    DstIp,
    /// IP protocol number
    Protocol,
    /// Transport source port
    SrcPort,
    /// Transport destination port
    DstPort,
    /// Link-layer type code (hex in the decoded form)
    EtherType,
    /// IP version
    Version,
    /// IPv4 header length in 32-bit words
    Ihl,
    /// Transport length
    Length,
    /// IPv4 identification
    Identification,
    /// IPv4 fragment offset
    FragmentOffset,
    /// Time to live
    Ttl,
    /// IPv4 header checksum (hex in the decoded form)
    HeaderChecksum,
    /// Milliseconds between capture start and the packet timestamp
    ElapsedMillis,
}

impl FieldKind {
    /// All kinds, in default dataset column order
    pub const ALL: [Self; 14] = [
        Self::SrcIp,
        Self::DstIp,
        Self::Protocol,
        Self::SrcPort,
        Self::DstPort,
        Self::EtherType,
        Self::Version,
        Self::Ihl,
        Self::Length,
        Self::Identification,
        Self::FragmentOffset,
        Self::Ttl,
        Self::HeaderChecksum,
        Self::ElapsedMillis,
    ];

    /// Column name as written into datasets
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SrcIp => "srcIp",
            Self::DstIp => "dstIp",
            Self::Protocol => "protocol",
            Self::SrcPort => "srcPort",
            Self::DstPort => "dstPort",
            Self::EtherType => "type",
            Self::Version => "version",
            Self::Ihl => "IHL",
            Self::Length => "length",
            Self::Identification => "identification",
            Self::FragmentOffset => "fragmentOffset",
            Self::Ttl => "TTL",
            Self::HeaderChecksum => "headerChecksum",
            Self::ElapsedMillis => "timeStamp",
        }
    }

    /// Look up a kind by its column name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this field carries an IP address
    #[inline]
    #[must_use]
    pub const fn is_address(self) -> bool {
        matches!(self, Self::SrcIp | Self::DstIp)
    }

    /// Domain of this field under the given address encoding
    #[must_use]
    pub const fn domain(self, encoding: AddressEncoding) -> Domain {
        match self {
            Self::SrcIp | Self::DstIp => match encoding {
                AddressEncoding::Text => Domain::CategoricalString,
                AddressEncoding::ConcatenatedOctets => Domain::Integer,
            },
            Self::Protocol => Domain::CategoricalString,
            _ => Domain::Integer,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A schema column: what it holds and in which domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    kind: FieldKind,
    domain: Domain,
}

impl Field {
    #[inline]
    #[must_use]
    pub(crate) const fn new(kind: FieldKind, encoding: AddressEncoding) -> Self {
        Self {
            kind,
            domain: kind.domain(encoding),
        }
    }

    /// Column name
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Feature carried by this column
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Value domain
    #[inline]
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(FieldKind::from_name("payload"), None);
    }

    #[test]
    fn address_domain_follows_encoding() {
        assert_eq!(
            FieldKind::SrcIp.domain(AddressEncoding::Text),
            Domain::CategoricalString
        );
        assert_eq!(
            FieldKind::SrcIp.domain(AddressEncoding::ConcatenatedOctets),
            Domain::Integer
        );
        assert_eq!(
            FieldKind::Protocol.domain(AddressEncoding::ConcatenatedOctets),
            Domain::CategoricalString
        );
        assert_eq!(FieldKind::Ttl.domain(AddressEncoding::Text), Domain::Integer);
    }
}

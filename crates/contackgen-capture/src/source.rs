//! Frame sources
//!
//! A `FrameSource` is the seam to the packet-capture library. It hands out
//! raw link-layer frames one read at a time and reports the two non-frame
//! conditions the reader cares about:
//! - `Timeout`: nothing available yet, read again
//! - `EndOfStream`: the artifact is exhausted

use crate::error::CaptureError;
use chrono::{DateTime, Utc};

/// Link-layer framing of captured data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Ethernet II
    Ethernet,
    /// Linux cooked capture (SLL)
    LinuxSll,
    /// Bare IPv4/IPv6 with no link header
    RawIp,
    /// Anything else, carried by its link type number
    Other(i32),
}

impl LinkKind {
    /// Map a libpcap link type number
    #[must_use]
    pub fn from_linktype(linktype: i32) -> Self {
        match linktype {
            1 => Self::Ethernet,
            113 => Self::LinuxSll,
            12 | 14 | 101 => Self::RawIp,
            other => Self::Other(other),
        }
    }
}

/// Timestamp resolution the artifact was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Fractional part counts microseconds
    Micro,
    /// Fractional part counts nanoseconds
    Nano,
}

impl Precision {
    /// Build an absolute timestamp from seconds plus a fractional part in
    /// this precision's unit
    ///
    /// # Errors
    /// `CaptureError::Timestamp` if the instant is not representable.
    pub fn timestamp(self, secs: i64, fraction: i64) -> Result<DateTime<Utc>, CaptureError> {
        let nanos = match self {
            Self::Micro => fraction.saturating_mul(1_000),
            Self::Nano => fraction,
        };
        u32::try_from(nanos)
            .ok()
            .filter(|n| *n < 1_000_000_000)
            .and_then(|n| DateTime::<Utc>::from_timestamp(secs, n))
            .ok_or(CaptureError::Timestamp { secs, nanos })
    }
}

/// One captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Capture timestamp recorded in the artifact
    pub timestamp: DateTime<Utc>,
    /// Link-layer framing
    pub link: LinkKind,
    /// Captured bytes
    pub data: Vec<u8>,
}

/// Result of a single read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A frame was read
    Frame(Frame),
    /// No frame available within the read timeout
    Timeout,
    /// No more frames
    EndOfStream,
}

/// Source of raw captured frames, in capture order
pub trait FrameSource {
    /// Read the next frame
    ///
    /// # Errors
    /// Any failure other than a timeout or end of stream.
    fn read_next(&mut self) -> Result<ReadOutcome, CaptureError>;

    /// Timestamp precision in effect
    fn precision(&self) -> Precision;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_next(&mut self) -> Result<ReadOutcome, CaptureError> {
        (**self).read_next()
    }

    fn precision(&self) -> Precision {
        (**self).precision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micro_and_nano_fractions() {
        let micro = Precision::Micro.timestamp(10, 250_000).unwrap();
        let nano = Precision::Nano.timestamp(10, 250_000_000).unwrap();
        assert_eq!(micro, nano);
        assert_eq!(micro.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn rejects_fraction_overflow() {
        assert!(Precision::Nano.timestamp(10, 1_000_000_000).is_err());
        assert!(Precision::Micro.timestamp(10, -1).is_err());
    }

    #[test]
    fn linktype_mapping() {
        assert_eq!(LinkKind::from_linktype(1), LinkKind::Ethernet);
        assert_eq!(LinkKind::from_linktype(113), LinkKind::LinuxSll);
        assert_eq!(LinkKind::from_linktype(101), LinkKind::RawIp);
        assert_eq!(LinkKind::from_linktype(105), LinkKind::Other(105));
    }
}

//! Artifact reader
//!
//! Turns a frame source into a lazy, forward-only sequence of raw packet
//! records. Read timeouts are retried without surfacing; end of stream ends
//! the sequence. A consumed sequence cannot be rewound: reopen the artifact
//! to read it again.

use crate::error::CaptureError;
use crate::render::render;
use crate::source::{Frame, FrameSource, Precision, ReadOutcome};
use chrono::{DateTime, Utc};
use std::iter::FusedIterator;

#[cfg(feature = "libpcap")]
use crate::pcap_source::PcapSource;
#[cfg(feature = "libpcap")]
use std::path::Path;

/// Decoded representation of one captured packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacketRecord {
    timestamp: DateTime<Utc>,
    representation: String,
}

impl RawPacketRecord {
    /// Wrap an already rendered representation
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, representation: impl Into<String>) -> Self {
        Self {
            timestamp,
            representation: representation.into(),
        }
    }

    /// Decode a captured frame
    #[must_use]
    pub fn decode(frame: &Frame) -> Self {
        Self {
            timestamp: frame.timestamp,
            representation: render(frame),
        }
    }

    /// Capture timestamp from the artifact
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Textual header-block representation
    #[inline]
    #[must_use]
    pub fn representation(&self) -> &str {
        &self.representation
    }
}

/// Lazy sequence of packet records over a frame source
#[derive(Debug)]
pub struct PacketRecords<S> {
    source: S,
    finished: bool,
    frames_read: u64,
    timeouts: u64,
}

impl<S: FrameSource> PacketRecords<S> {
    /// Wrap a frame source
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            finished: false,
            frames_read: 0,
            timeouts: 0,
        }
    }

    /// Frames read so far
    #[inline]
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read timeouts retried so far
    #[inline]
    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// Timestamp precision of the underlying source
    #[inline]
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.source.precision()
    }
}

impl<S: FrameSource> Iterator for PacketRecords<S> {
    type Item = Result<RawPacketRecord, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.source.read_next() {
                Ok(ReadOutcome::Frame(frame)) => {
                    self.frames_read += 1;
                    return Some(Ok(RawPacketRecord::decode(&frame)));
                }
                Ok(ReadOutcome::Timeout) => {
                    self.timeouts += 1;
                    tracing::trace!(timeouts = self.timeouts, "capture read timed out, retrying");
                }
                Ok(ReadOutcome::EndOfStream) => {
                    tracing::debug!(frames = self.frames_read, "end of capture");
                    self.finished = true;
                    return None;
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<S: FrameSource> FusedIterator for PacketRecords<S> {}

/// Entry point for reading capture artifacts from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactReader;

impl ArtifactReader {
    /// Open a capture artifact
    ///
    /// # Errors
    /// - `CaptureError::Io` if the path does not exist
    /// - `CaptureError::Open` if libpcap cannot open it
    #[cfg(feature = "libpcap")]
    pub fn open(path: impl AsRef<Path>) -> Result<PacketRecords<PcapSource>, CaptureError> {
        let path = path.as_ref();
        std::fs::metadata(path).map_err(|e| CaptureError::io(path, e))?;
        tracing::info!(path = %path.display(), "reading capture artifact");
        Ok(PacketRecords::new(PcapSource::open(path)?))
    }

    /// Read from an arbitrary frame source
    #[must_use]
    pub fn from_source<S: FrameSource>(source: S) -> PacketRecords<S> {
        PacketRecords::new(source)
    }
}

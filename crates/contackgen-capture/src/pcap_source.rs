//! libpcap-backed frame source for offline capture files

use crate::error::CaptureError;
use crate::source::{Frame, FrameSource, LinkKind, Precision, ReadOutcome};
use pcap::{Capture, Offline};
use std::path::Path;

/// Reads frames from a pcap savefile
pub struct PcapSource {
    capture: Capture<Offline>,
    precision: Precision,
    link: LinkKind,
}

impl PcapSource {
    /// Open a capture file, preferring nanosecond timestamps
    ///
    /// Precision is best effort: when libpcap refuses nanosecond precision
    /// the file is reopened with its default precision.
    ///
    /// # Errors
    /// `CaptureError::Open` if the file cannot be opened at all.
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        Self::open_with(path, |path| {
            Capture::from_file_with_precision(path, pcap::Precision::Nano)
        })
    }

    /// Open a capture file, trying `open_nano` first
    ///
    /// `open_nano` must return a capture whose timestamps count nanoseconds.
    /// Its failure falls back to `Capture::from_file` with microsecond
    /// timestamps.
    ///
    /// # Errors
    /// `CaptureError::Open` if the fallback open fails too.
    pub fn open_with<F>(path: &Path, open_nano: F) -> Result<Self, CaptureError>
    where
        F: FnOnce(&Path) -> Result<Capture<Offline>, pcap::Error>,
    {
        let (capture, precision) = match open_nano(path) {
            Ok(capture) => (capture, Precision::Nano),
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "nanosecond precision unavailable, reopening with default precision"
                );
                let capture = Capture::from_file(path).map_err(|e| CaptureError::open(path, e))?;
                (capture, Precision::Micro)
            }
        };

        let link = LinkKind::from_linktype(capture.get_datalink().0);
        tracing::debug!(path = %path.display(), ?precision, ?link, "opened capture");

        Ok(Self {
            capture,
            precision,
            link,
        })
    }

    /// Link-layer framing of this capture
    #[inline]
    #[must_use]
    pub fn link(&self) -> LinkKind {
        self.link
    }
}

impl FrameSource for PcapSource {
    fn read_next(&mut self) -> Result<ReadOutcome, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let timestamp = self
                    .precision
                    .timestamp(i64::from(ts.tv_sec), i64::from(ts.tv_usec))?;
                Ok(ReadOutcome::Frame(Frame {
                    timestamp,
                    link: self.link,
                    data: packet.data.to_vec(),
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(ReadOutcome::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(ReadOutcome::EndOfStream),
            Err(err) => Err(CaptureError::Read(err.to_string())),
        }
    }

    fn precision(&self) -> Precision {
        self.precision
    }
}

impl std::fmt::Debug for PcapSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcapSource")
            .field("precision", &self.precision)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

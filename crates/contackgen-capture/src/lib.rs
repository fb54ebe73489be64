//! Offline capture decoding for contackgen
//!
//! Reads a retrieved capture artifact and turns it into a dataset:
//!
//! ```text
//! artifact ──► PacketRecords ──► FeatureExtractor ──► Assembler ──► Dataset
//!   (pcap)     (lazy, ordered)    (one tuple/packet)   (cap + disposition)
//! ```
//!
//! Everything here is synchronous. Records are pulled one at a time, so a
//! dataset capped at `max_rows` never reads past the packet that filled it.
//!
//! Reading files from disk needs the `libpcap` feature (on by default). The
//! rest of the pipeline runs over any [`FrameSource`].

mod assembler;
mod decode;
mod error;
mod extractor;
mod output;
#[cfg(feature = "libpcap")]
mod pcap_source;
mod reader;
mod render;
mod source;

pub use assembler::{assemble, Admission, Assembler, AssemblyStats};
pub use decode::{CaptureStart, Decoded, Decoder};
pub use error::{CaptureError, OutputError};
pub use extractor::{concat_octets, parse_decimal, parse_hex, FeatureExtractor, TransportProtocol};
pub use output::{write_arff, write_dataset, write_json_lines, OutputFormat};
#[cfg(feature = "libpcap")]
pub use pcap_source::PcapSource;
pub use reader::{ArtifactReader, PacketRecords, RawPacketRecord};
pub use render::{render, TCP_MARKER, UDP_MARKER};
pub use source::{Frame, FrameSource, LinkKind, Precision, ReadOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

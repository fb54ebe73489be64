//! Testing utilities for the contackgen workspace
//!
//! Shared fakes, fixtures and frame builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contackgen_capture::{CaptureError, Frame, FrameSource, LinkKind, Precision, ReadOutcome};
use contackgen_env::{ContainerId, ContainerRuntime, ExecOutput, RuntimeError, ScenarioRunner};
use etherparse::{LinuxSllPacketType, PacketBuilder};
use parking_lot::Mutex;
use pcap::{Capture, Linktype, Packet, PacketHeader};
use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::path::Path;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Container runtime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Create { image: String, name: String },
    Start,
    Exec(Vec<String>),
    InspectNetworkAddress,
    Stop,
    Remove,
    CopyArchive(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Create,
    Start,
    Exec,
    Inspect,
    Stop,
    Remove,
    CopyArchive,
}

/// In-memory container runtime that records every call
#[derive(Debug)]
pub struct FakeRuntime {
    calls: Mutex<Vec<(RuntimeCall, Instant)>>,
    failures: HashSet<Step>,
    address: Option<IpAddr>,
    exec_exit_code: i32,
    archive: Vec<u8>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    /// Runtime whose container answers at 172.17.0.2 and holds an empty
    /// `capture.pcap`
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: HashSet::new(),
            address: Some(IpAddr::from([172, 17, 0, 2])),
            exec_exit_code: 0,
            archive: tar_with("capture.pcap", &[]),
        }
    }

    /// Serve `bytes` as the container's `capture.pcap`
    #[must_use]
    pub fn with_capture(mut self, bytes: &[u8]) -> Self {
        self.archive = tar_with("capture.pcap", bytes);
        self
    }

    /// Serve a raw archive stream
    #[must_use]
    pub fn with_archive(mut self, archive: Vec<u8>) -> Self {
        self.archive = archive;
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: Option<IpAddr>) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_exec_exit_code(mut self, code: i32) -> Self {
        self.exec_exit_code = code;
        self
    }

    /// Make `step` fail with a runtime error
    #[must_use]
    pub fn failing_at(mut self, step: Step) -> Self {
        self.failures.insert(step);
        self
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().iter().map(|(c, _)| c.clone()).collect()
    }

    /// Calls with the (tokio) instant they arrived at
    pub fn timed_calls(&self) -> Vec<(RuntimeCall, Instant)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &RuntimeCall) -> usize {
        self.calls.lock().iter().filter(|(c, _)| c == call).count()
    }

    fn record(&self, call: RuntimeCall, step: Step) -> Result<(), RuntimeError> {
        self.calls.lock().push((call, Instant::now()));
        if self.failures.contains(&step) {
            Err(RuntimeError::command_failed(
                format!("fake {step:?}"),
                "exit status: 1",
                "injected failure",
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(&self, image: &str, name: &str) -> Result<ContainerId, RuntimeError> {
        self.record(
            RuntimeCall::Create {
                image: image.to_string(),
                name: name.to_string(),
            },
            Step::Create,
        )?;
        Ok(ContainerId::new(format!("{name}-0001")))
    }

    async fn start(&self, _id: &ContainerId) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Start, Step::Start)
    }

    async fn exec(&self, _id: &ContainerId, command: &[String]) -> Result<ExecOutput, RuntimeError> {
        self.record(RuntimeCall::Exec(command.to_vec()), Step::Exec)?;
        Ok(ExecOutput {
            exit_code: Some(self.exec_exit_code),
            ..ExecOutput::default()
        })
    }

    async fn inspect_network_address(
        &self,
        _id: &ContainerId,
    ) -> Result<Option<IpAddr>, RuntimeError> {
        self.record(RuntimeCall::InspectNetworkAddress, Step::Inspect)?;
        Ok(self.address)
    }

    async fn stop(&self, _id: &ContainerId) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Stop, Step::Stop)
    }

    async fn remove(&self, _id: &ContainerId) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Remove, Step::Remove)
    }

    async fn copy_archive(
        &self,
        _id: &ContainerId,
        internal_path: &str,
    ) -> Result<Vec<u8>, RuntimeError> {
        self.record(
            RuntimeCall::CopyArchive(internal_path.to_string()),
            Step::CopyArchive,
        )?;
        Ok(self.archive.clone())
    }
}

/// Tar stream holding a single regular file
pub fn tar_with(name: &str, data: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, name, data)
        .expect("append tar entry");
    builder.into_inner().expect("finish tar archive")
}

/// Scenario runner that only records where it was pointed
#[derive(Debug, Default)]
pub struct RecordingScenario {
    starts: Mutex<Vec<(IpAddr, Instant)>>,
}

impl RecordingScenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> Vec<IpAddr> {
        self.starts.lock().iter().map(|(ip, _)| *ip).collect()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.starts.lock().first().map(|(_, at)| *at)
    }
}

impl ScenarioRunner for RecordingScenario {
    fn start(&self, target: IpAddr) {
        self.starts.lock().push((target, Instant::now()));
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Absolute UTC instant
pub fn ts(secs: i64, nanos: u32) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, nanos).expect("valid timestamp")
}

/// Addressing and header values for a synthetic frame
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub src: [u8; 4],
    pub dst: [u8; 4],
    pub ttl: u8,
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: Vec<u8>,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            src: [10, 0, 0, 1],
            dst: [172, 17, 0, 2],
            ttl: 64,
            src_port: 40000,
            dst_port: 80,
            payload: vec![0; 10],
        }
    }
}

impl FrameSpec {
    #[must_use]
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_src(mut self, src: [u8; 4]) -> Self {
        self.src = src;
        self
    }

    #[must_use]
    pub fn with_ports(mut self, src_port: u16, dst_port: u16) -> Self {
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }
}

const SRC_MAC: [u8; 6] = [0x02, 0x42, 0xac, 0x11, 0x00, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0x42, 0xac, 0x11, 0x00, 0x02];

/// Ethernet + IPv4 + UDP frame
pub fn udp_frame(timestamp: DateTime<Utc>, spec: &FrameSpec) -> Frame {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4(spec.src, spec.dst, spec.ttl)
        .udp(spec.src_port, spec.dst_port);
    let mut data = Vec::with_capacity(builder.size(spec.payload.len()));
    builder
        .write(&mut data, &spec.payload)
        .expect("write udp frame");
    Frame {
        timestamp,
        link: LinkKind::Ethernet,
        data,
    }
}

/// Ethernet + IPv4 + TCP frame
pub fn tcp_frame(timestamp: DateTime<Utc>, spec: &FrameSpec) -> Frame {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4(spec.src, spec.dst, spec.ttl)
        .tcp(spec.src_port, spec.dst_port, 1, 64240);
    let mut data = Vec::with_capacity(builder.size(spec.payload.len()));
    builder
        .write(&mut data, &spec.payload)
        .expect("write tcp frame");
    Frame {
        timestamp,
        link: LinkKind::Ethernet,
        data,
    }
}

/// Linux cooked capture (SLL) + IPv4 + UDP frame
pub fn sll_udp_frame(timestamp: DateTime<Utc>, spec: &FrameSpec) -> Frame {
    let mut sender = [0u8; 8];
    sender[..6].copy_from_slice(&SRC_MAC);
    let builder = PacketBuilder::linux_sll(LinuxSllPacketType::HOST, 6, sender)
        .ipv4(spec.src, spec.dst, spec.ttl)
        .udp(spec.src_port, spec.dst_port);
    let mut data = Vec::with_capacity(builder.size(spec.payload.len()));
    builder
        .write(&mut data, &spec.payload)
        .expect("write sll frame");
    Frame {
        timestamp,
        link: LinkKind::LinuxSll,
        data,
    }
}

/// Frame source replaying a fixed script, then end of stream
#[derive(Debug)]
pub struct ScriptedSource {
    script: VecDeque<Result<ReadOutcome, CaptureError>>,
    precision: Precision,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            precision: Precision::Nano,
        }
    }

    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        let mut source = Self::new();
        for frame in frames {
            source = source.frame(frame);
        }
        source
    }

    #[must_use]
    pub fn frame(mut self, frame: Frame) -> Self {
        self.script.push_back(Ok(ReadOutcome::Frame(frame)));
        self
    }

    #[must_use]
    pub fn timeout(mut self) -> Self {
        self.script.push_back(Ok(ReadOutcome::Timeout));
        self
    }

    #[must_use]
    pub fn error(mut self, message: &str) -> Self {
        self.script
            .push_back(Err(CaptureError::Read(message.to_string())));
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ScriptedSource {
    fn read_next(&mut self) -> Result<ReadOutcome, CaptureError> {
        self.script
            .pop_front()
            .unwrap_or(Ok(ReadOutcome::EndOfStream))
    }

    fn precision(&self) -> Precision {
        self.precision
    }
}

// ---------------------------------------------------------------------------
// Pcap fixtures
// ---------------------------------------------------------------------------

fn dead_linktype(link: LinkKind) -> Linktype {
    match link {
        LinkKind::Ethernet => Linktype::ETHERNET,
        LinkKind::LinuxSll => Linktype::LINUX_SLL,
        // pcap_open_dead takes DLT values, and DLT_RAW is 12 on Linux
        LinkKind::RawIp => Linktype(12),
        LinkKind::Other(n) => Linktype(n),
    }
}

/// Write frames to a pcap savefile through libpcap
///
/// The link type is taken from the first frame (Ethernet when empty).
pub fn write_pcap(path: &Path, frames: &[Frame], precision: Precision) -> Result<(), pcap::Error> {
    let link = frames.first().map_or(LinkKind::Ethernet, |f| f.link);
    let tstamp_precision = match precision {
        Precision::Micro => pcap::Precision::Micro,
        Precision::Nano => pcap::Precision::Nano,
    };
    let capture = Capture::dead_with_precision(dead_linktype(link), tstamp_precision)?;
    let mut savefile = capture.savefile(path)?;

    for frame in frames {
        let nanos = frame.timestamp.timestamp_subsec_nanos();
        let fraction = match precision {
            Precision::Micro => nanos / 1_000,
            Precision::Nano => nanos,
        };
        let len = u32::try_from(frame.data.len()).expect("frame fits pcap");
        let header = PacketHeader {
            ts: libc::timeval {
                tv_sec: libc::time_t::try_from(frame.timestamp.timestamp())
                    .expect("timestamp fits time_t"),
                tv_usec: libc::suseconds_t::try_from(fraction).expect("fraction fits suseconds_t"),
            },
            caplen: len,
            len,
        };
        savefile.write(&Packet::new(&header, &frame.data));
    }

    savefile.flush()
}

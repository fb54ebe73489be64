//! Reader → extractor → assembler over synthetic captures

use chrono::{DateTime, TimeDelta, Utc};
use contackgen_capture::{
    ArtifactReader, CaptureError, CaptureStart, Decoder, FeatureExtractor, Frame, RawPacketRecord,
};
use contackgen_schema::{AddressEncoding, Dataset, Disposition, Schema, Value};
use contackgen_test_utils::{sll_udp_frame, tcp_frame, ts, udp_frame, FrameSpec, ScriptedSource};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    ts(1_700_000_000, 0)
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + TimeDelta::milliseconds(ms)
}

fn decoder(max_rows: usize, disposition: Disposition) -> Decoder {
    let schema = Arc::new(Schema::packet_features(AddressEncoding::Text));
    Decoder::new(FeatureExtractor::new(schema), max_rows, disposition)
}

/// Three UDP datagrams interleaved with two TCP segments
fn mixed_frames() -> Vec<Frame> {
    vec![
        udp_frame(at(0), &FrameSpec::default().with_ttl(64)),
        tcp_frame(at(10), &FrameSpec::default()),
        udp_frame(at(20), &FrameSpec::default().with_ttl(63)),
        tcp_frame(at(30), &FrameSpec::default()),
        udp_frame(at(40), &FrameSpec::default().with_ttl(62)),
    ]
}

fn integers(dataset: &Dataset, name: &str) -> Vec<i64> {
    dataset
        .column(name)
        .unwrap()
        .into_iter()
        .filter_map(Value::as_integer)
        .collect()
}

#[test]
fn udp_rows_in_capture_order() {
    let source = ScriptedSource::from_frames(mixed_frames());
    let decoded = decoder(10, Disposition::fill())
        .decode(ArtifactReader::from_source(source), CaptureStart::At(t0()))
        .unwrap();
    let dataset = decoded.dataset;

    assert_eq!(dataset.len(), 3);
    assert_eq!(integers(&dataset, "TTL"), vec![64, 63, 62]);
    assert_eq!(integers(&dataset, "timeStamp"), vec![0, 20, 40]);
    assert_eq!(integers(&dataset, "type"), vec![2048; 3]);
    assert_eq!(integers(&dataset, "version"), vec![4; 3]);
    assert_eq!(integers(&dataset, "IHL"), vec![5; 3]);
    assert_eq!(integers(&dataset, "length"), vec![18; 3]);
    assert_eq!(integers(&dataset, "dstPort"), vec![80; 3]);

    let first = &dataset.rows()[0];
    assert_eq!(first.values()[0], Value::from("10.0.0.1"));
    assert_eq!(first.values()[1], Value::from("172.17.0.2"));
    assert_eq!(first.values()[2], Value::from("17"));

    assert_eq!(decoded.stats.records_read, 5);
    assert_eq!(decoded.stats.skipped, 2);
    assert_eq!(decoded.stats.accepted, 3);
}

#[test]
fn timeouts_are_invisible() {
    let source = ScriptedSource::new()
        .timeout()
        .frame(udp_frame(at(0), &FrameSpec::default()))
        .timeout()
        .timeout()
        .frame(udp_frame(at(5), &FrameSpec::default()));

    let dataset = decoder(10, Disposition::fill())
        .decode(ArtifactReader::from_source(source), CaptureStart::FirstPacket)
        .unwrap()
        .dataset;

    assert_eq!(integers(&dataset, "timeStamp"), vec![0, 5]);
}

#[test]
fn concatenated_addresses() {
    let schema = Arc::new(Schema::packet_features(AddressEncoding::ConcatenatedOctets));
    let decoder = Decoder::new(FeatureExtractor::new(schema), 10, Disposition::fill());
    let source = ScriptedSource::new().frame(udp_frame(at(0), &FrameSpec::default()));

    let dataset = decoder
        .decode(ArtifactReader::from_source(source), CaptureStart::At(t0()))
        .unwrap()
        .dataset;

    assert_eq!(integers(&dataset, "srcIp"), vec![10_001]);
    assert_eq!(integers(&dataset, "dstIp"), vec![1_721_702]);
}

#[test]
fn drop_removes_exactly_the_incomplete_row() {
    let records = || -> Vec<Result<RawPacketRecord, CaptureError>> {
        let complete = |ms| Ok(RawPacketRecord::decode(&udp_frame(at(ms), &FrameSpec::default())));
        // a UDP block with no network layer leaves most fields unmatched
        let incomplete = Ok(RawPacketRecord::new(
            at(15),
            "[UDP Header (8 bytes)]\n  Source port: 1\n  Destination port: 2\n",
        ));
        vec![complete(0), incomplete, complete(30)]
    };

    let filled = decoder(10, Disposition::fill())
        .decode(records(), CaptureStart::At(t0()))
        .unwrap()
        .dataset;
    let dropped = decoder(10, Disposition::DropRow)
        .decode(records(), CaptureStart::At(t0()))
        .unwrap()
        .dataset;

    assert_eq!(filled.len(), 3);
    assert_eq!(integers(&filled, "TTL"), vec![64, -1, 64]);
    assert_eq!(filled.rows()[1].values()[0], Value::from("?"));

    assert_eq!(dropped.len(), 2);
    assert_eq!(integers(&dropped, "timeStamp"), vec![0, 30]);
}

#[test]
fn cap_limits_rows() {
    let frames = (0..50).map(|i| udp_frame(at(i), &FrameSpec::default()));
    let dataset = decoder(7, Disposition::fill())
        .decode(
            ArtifactReader::from_source(ScriptedSource::from_frames(frames)),
            CaptureStart::FirstPacket,
        )
        .unwrap()
        .dataset;

    assert_eq!(dataset.len(), 7);
    assert_eq!(integers(&dataset, "timeStamp"), (0..7).collect::<Vec<_>>());
}

#[test]
fn decoding_is_idempotent() {
    let decode = || {
        decoder(10, Disposition::fill())
            .decode(
                ArtifactReader::from_source(ScriptedSource::from_frames(mixed_frames())),
                CaptureStart::FirstPacket,
            )
            .unwrap()
            .dataset
    };

    let first = decode();
    let second = decode();
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn mid_stream_error_yields_no_dataset() {
    let source = ScriptedSource::new()
        .frame(udp_frame(at(0), &FrameSpec::default()))
        .error("truncated record");

    let result = decoder(10, Disposition::fill())
        .decode(ArtifactReader::from_source(source), CaptureStart::FirstPacket);

    assert!(matches!(result, Err(CaptureError::Read(_))));
}

#[test]
fn cooked_capture_rows_are_complete() {
    let source = ScriptedSource::new()
        .frame(sll_udp_frame(at(0), &FrameSpec::default()))
        .frame(sll_udp_frame(at(8), &FrameSpec::default().with_ttl(61)));

    let decoded = decoder(10, Disposition::DropRow)
        .decode(ArtifactReader::from_source(source), CaptureStart::At(t0()))
        .unwrap();

    assert_eq!(decoded.stats.dropped, 0);
    assert_eq!(integers(&decoded.dataset, "type"), vec![2048, 2048]);
    assert_eq!(integers(&decoded.dataset, "TTL"), vec![64, 61]);
    assert_eq!(integers(&decoded.dataset, "timeStamp"), vec![0, 8]);
}

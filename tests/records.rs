mod common;

use std::io::Cursor;

use common::*;
use hprof_stream::{parse_reader, FormatCause, HprofError};

#[test]
fn minimal_stream_delivers_header_and_string() {
    let b = StreamBuilder::new(8);
    let body = [b.id(1), b"A".to_vec()].concat();
    let stream = b.record(0x01, &body).bytes();

    let events = run(&stream).unwrap();
    assert_eq!(
        events.log,
        vec![
            "header format=JAVA PROFILE 1.0.2 id_size=8 ts=0",
            "string id=1 value=A",
        ]
    );
}

#[test]
fn header_only_stream_is_clean_eof() {
    let stream = StreamBuilder::new(8).bytes();
    let events = run(&stream).unwrap();
    assert_eq!(events.log.len(), 1);
}

#[test]
fn empty_input_is_truncated_at_offset_zero() {
    let err = run(&[]).unwrap_err();
    assert!(matches!(err, HprofError::TruncatedStream { offset: 0 }));
}

#[test]
fn truncated_header_reports_stream_end() {
    let err = run(b"JAVA PROFILE").unwrap_err();
    assert!(matches!(err, HprofError::TruncatedStream { offset: 12 }));
}

#[test]
fn unsupported_identifier_size_is_rejected() {
    let mut stream = b"JAVA PROFILE 1.0.2\0".to_vec();
    stream.extend_from_slice(&2u32.to_be_bytes());
    stream.extend_from_slice(&0u64.to_be_bytes());
    let err = run(&stream).unwrap_err();
    assert!(matches!(err, HprofError::UnsupportedIdSize(2)));
}

#[test]
fn unknown_top_level_tag_is_skipped() {
    let b = StreamBuilder::new(8);
    let body = [b.id(7), b"B".to_vec()].concat();
    let stream = b
        .record(0x7F, &[0xDE, 0xAD, 0xBE, 0xEF])
        .record(0x01, &body)
        .bytes();

    let events = run(&stream).unwrap();
    assert_eq!(events.log.len(), 2);
    assert_eq!(events.log[1], "string id=7 value=B");
}

#[test]
fn string_body_shorter_than_one_id_is_length_mismatch() {
    let stream = StreamBuilder::new(8)
        .record(0x01, &[1, 2, 3, 4, 5])
        .bytes();

    let err = run(&stream).unwrap_err();
    match err {
        HprofError::Format { tag, cause, .. } => {
            assert_eq!(tag, 0x01);
            assert_eq!(
                cause,
                FormatCause::FrameLengthMismatch {
                    declared: 5,
                    consumed: 8,
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn leftover_body_bytes_are_length_mismatch() {
    let body = [u32b(9), u32b(0xAAAA_AAAA)].concat();
    let stream = StreamBuilder::new(8).record(0x03, &body).bytes();

    let err = run(&stream).unwrap_err();
    match err {
        HprofError::Format { tag, cause, .. } => {
            assert_eq!(tag, 0x03);
            assert_eq!(
                cause,
                FormatCause::FrameLengthMismatch {
                    declared: 8,
                    consumed: 4,
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn truncating_a_body_reports_the_missing_byte_offset() {
    let b = StreamBuilder::new(8);
    let header_len = b.header_len();
    let body = [b.id(1), b"A".to_vec()].concat();
    let mut stream = b.record(0x01, &body).bytes();
    stream.truncate(header_len + 9 + 3);

    let err = run(&stream).unwrap_err();
    match err {
        HprofError::TruncatedStream { offset } => assert_eq!(offset, 43),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn truncated_frame_header_is_truncated_stream() {
    let mut stream = StreamBuilder::new(8).bytes();
    stream.extend_from_slice(&[0x01, 0x00, 0x00]);

    let err = run(&stream).unwrap_err();
    match err {
        HprofError::TruncatedStream { offset } => assert_eq!(offset, 34),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn four_byte_identifiers_are_zero_extended() {
    let b = StreamBuilder::new(4);
    let string_body = [b.id(0x2A), b"Z".to_vec()].concat();
    let load_body = [u32b(1).to_vec(), b.id(0x10), u32b(0).to_vec(), b.id(0x2A)].concat();
    let stream = b
        .record(0x01, &string_body)
        .record(0x02, &load_body)
        .bytes();

    let events = run(&stream).unwrap();
    assert_eq!(
        events.log,
        vec![
            "header format=JAVA PROFILE 1.0.2 id_size=4 ts=0",
            "string id=42 value=Z",
            "load_class serial=1 class=16 trace=0 name=42",
        ]
    );
}

#[test]
fn every_scalar_record_kind_decodes_in_stream_order() {
    let b = StreamBuilder::new(8);

    let load_class = [u32b(1).to_vec(), b.id(0x10), u32b(2).to_vec(), b.id(0x20)].concat();
    let stack_frame = [
        b.id(0x30),
        b.id(0x31),
        b.id(0x32),
        b.id(0x33),
        u32b(1).to_vec(),
        i32b(-1).to_vec(),
    ]
    .concat();
    let stack_trace = [
        u32b(2).to_vec(),
        u32b(9).to_vec(),
        u32b(2).to_vec(),
        b.id(0x30),
        b.id(0x34),
    ]
    .concat();
    let alloc_sites = [
        u16b(1).to_vec(),
        f32b(1.5).to_vec(),
        u32b(100).to_vec(),
        u32b(10).to_vec(),
        u64b(1000).to_vec(),
        u64b(50).to_vec(),
        u32b(1).to_vec(),
        vec![1],
        u32b(1).to_vec(),
        u32b(2).to_vec(),
        u32b(10).to_vec(),
        u32b(1).to_vec(),
        u32b(20).to_vec(),
        u32b(2).to_vec(),
    ]
    .concat();
    let heap_summary = [
        u32b(100).to_vec(),
        u32b(10).to_vec(),
        u64b(1000).to_vec(),
        u64b(50).to_vec(),
    ]
    .concat();
    let start_thread = [
        u32b(9).to_vec(),
        b.id(0x40),
        u32b(2).to_vec(),
        b.id(0x41),
        b.id(0x42),
        b.id(0x43),
    ]
    .concat();
    let cpu_samples = [
        u32b(3).to_vec(),
        u32b(2).to_vec(),
        u32b(2).to_vec(),
        u32b(7).to_vec(),
        u32b(1).to_vec(),
        u32b(8).to_vec(),
    ]
    .concat();
    let control_settings = [u32b(3).to_vec(), u16b(16).to_vec()].concat();

    let stream = b
        .record(0x02, &load_class)
        .record(0x03, &u32b(1))
        .record(0x04, &stack_frame)
        .record(0x05, &stack_trace)
        .record(0x06, &alloc_sites)
        .record(0x07, &heap_summary)
        .record(0x0A, &start_thread)
        .record(0x0B, &u32b(9))
        .record(0x0D, &cpu_samples)
        .record(0x0E, &control_settings)
        .bytes();

    let events = run(&stream).unwrap();
    assert_eq!(
        events.log,
        vec![
            "header format=JAVA PROFILE 1.0.2 id_size=8 ts=0",
            "load_class serial=1 class=16 trace=2 name=32",
            "unload_class serial=1",
            "stack_frame id=48 method=49 sig=50 src=51 serial=1 line=-1",
            "stack_trace serial=2 thread=9 frames=[48, 52]",
            "alloc_sites flags=1 cutoff=1.5 sites=1",
            "heap_summary live=100/10 total=1000/50",
            "start_thread serial=9 obj=64 trace=2 name=65 group=66 parent=67",
            "end_thread serial=9",
            "cpu_samples total=3 samples=[(2, 7), (1, 8)]",
            "control_settings flags=3 depth=16",
        ]
    );
}

#[test]
fn handler_abort_stops_the_parse() {
    let b = StreamBuilder::new(8);
    let body = [b.id(1), b"A".to_vec()].concat();
    let stream = b.record(0x01, &body).bytes();

    let err = parse_reader(Cursor::new(stream), AbortOnString).unwrap_err();
    match err {
        HprofError::HandlerAbort { reason } => assert_eq!(reason, "saw string A"),
        other => panic!("unexpected error: {other:?}"),
    }
}

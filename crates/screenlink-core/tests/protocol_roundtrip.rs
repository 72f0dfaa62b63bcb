//! Integration tests for the protocol engine.
//!
//! These tests drive the public API end to end: encoded frames flow through
//! the byte buffer and the incremental parser exactly as socket reads would,
//! and clipboard transfers run the full chunk/parse/reassemble pipeline.

use screenlink_core::clipboard::{chunk_clipboard, ClipboardAssembler, ClipboardData};
use screenlink_core::{
    decode_frame, encode_message, DynamicBuffer, Message, MessageParser, SequenceCounter,
};

/// Appends each message's full frame (length prefix included) to the buffer,
/// then drains the parser once.
fn pump(messages: &[Message]) -> Vec<Message> {
    let buffer = DynamicBuffer::new();
    for msg in messages {
        buffer.append(&encode_message(msg));
    }
    MessageParser::new().drain(&buffer)
}

#[test]
fn test_parse_session_startup_sequence() {
    let sent = vec![
        Message::Hello { major: 1, minor: 6 },
        Message::QueryInfo,
        Message::InfoAck,
        Message::SetOptions { options: vec![0x484B, 5000] },
        Message::Enter { x: 0, y: 300, seq: 1, mask: 0 },
    ];

    assert_eq!(pump(&sent), sent);
}

#[test]
fn test_parse_input_stream_split_at_arbitrary_boundaries() {
    let sent = vec![
        Message::KeyDown { id: 0x61, mask: 0, button: 38 },
        Message::MouseMove { x: 100, y: -3 },
        Message::MouseMove { x: 101, y: -2 },
        Message::KeyUp { id: 0x61, mask: 0, button: 38 },
        Message::KeepAlive,
    ];
    let mut wire = Vec::new();
    for msg in &sent {
        wire.extend_from_slice(&encode_message(msg));
    }

    // Deliver the byte stream in 5-byte slices, draining after each, the way
    // a socket hands over partial reads.
    let buffer = DynamicBuffer::new();
    let mut parser = MessageParser::new();
    let mut received = Vec::new();
    for slice in wire.chunks(5) {
        buffer.append(slice);
        received.extend(parser.drain(&buffer));
    }

    assert_eq!(received, sent);
}

#[test]
fn test_clipboard_transfer_through_full_pipeline() {
    let mut original = ClipboardData::from_text("pasted across machines");
    original.insert(
        screenlink_core::ClipboardFormat::Html,
        b"<p>pasted across machines</p>".to_vec(),
    );

    // Chunk with a small chunk size, push the fragments over the wire, parse
    // them back, and reassemble.
    let fragments = chunk_clipboard(0, 3, &original, 16);
    let parsed = pump(&fragments);
    assert_eq!(parsed.len(), fragments.len());

    let mut assembler = ClipboardAssembler::new();
    let mut result = None;
    for msg in parsed {
        let Message::ClipboardData { marker, data, .. } = msg else {
            panic!("expected clipboard fragment, got {msg:?}");
        };
        if let Some(complete) = assembler.accept(marker, &data) {
            result = Some(complete);
        }
    }

    assert_eq!(result, Some(original));
}

#[test]
fn test_corrupt_frame_does_not_poison_the_stream() {
    let buffer = DynamicBuffer::new();
    buffer.append(&encode_message(&Message::KeepAlive));
    // A framed garbage message with a valid length prefix.
    buffer.append(&8u32.to_be_bytes());
    buffer.append(b"ZZZZ\x01\x02\x03\x04");
    buffer.append(&encode_message(&Message::Leave));

    let parsed = MessageParser::new().drain(&buffer);

    assert_eq!(parsed, vec![Message::KeepAlive, Message::Leave]);
}

#[test]
fn test_every_message_survives_reencoding() {
    let messages = vec![
        Message::Hello { major: 1, minor: 6 },
        Message::HelloBack { major: 1, minor: 6, name: "desk".to_string() },
        Message::NoOp,
        Message::Close,
        Message::Enter { x: 5, y: 6, seq: 9, mask: 0x2000 },
        Message::Leave,
        Message::ClipboardGrab { id: 1, seq: 9 },
        Message::KeepAlive,
        Message::ScreenSaver { on: false },
        Message::InfoAck,
        Message::KeyDown { id: 1, mask: 2, button: 3 },
        Message::KeyUp { id: 1, mask: 2, button: 3 },
        Message::KeyRepeat { id: 1, mask: 2, count: 3, button: 4 },
        Message::MouseDown { button: 1 },
        Message::MouseUp { button: 1 },
        Message::MouseMove { x: -1, y: 1 },
        Message::MouseRelativeMove { x: 2, y: -2 },
        Message::MouseWheel { x_delta: 0, y_delta: 120 },
        Message::ClipboardData { id: 0, seq: 1, marker: 2, data: vec![1, 2, 3] },
        Message::Info {
            x: 0,
            y: 0,
            width: 2560,
            height: 1440,
            warp_zone: 1,
            cursor_x: 1,
            cursor_y: 1,
        },
        Message::SetOptions { options: vec![1, 2, 3] },
        Message::QueryInfo,
        Message::Incompatible { major: 2, minor: 1 },
        Message::Busy,
        Message::Unknown,
        Message::Bad,
    ];

    for msg in messages {
        let frame = encode_message(&msg);
        let decoded = decode_frame(&frame[4..]).expect("decode must succeed");
        assert_eq!(decoded, msg);
        assert_eq!(encode_message(&decoded), frame, "bytes must survive a round trip");
    }
}

#[test]
fn test_sequence_counter_tracks_server_numbering() {
    let counter = SequenceCounter::new();

    // The server numbers screen crossings; observing one must push our own
    // numbering past it.
    counter.observe(41);
    assert_eq!(counter.current(), 42);
    assert_eq!(counter.next(), 42);
    assert_eq!(counter.next(), 43);
}

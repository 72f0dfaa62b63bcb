//! Send-side clipboard chunking.

use crate::clipboard::data::ClipboardData;
use crate::protocol::messages::{ClipboardStage, Message};

/// Maximum bytes carried by one `Data` fragment.
pub const CLIPBOARD_CHUNK_SIZE: usize = 512 * 1024;

/// Fragments a clipboard value into its `Start`/`Data`*/`End` message
/// sequence for one clipboard buffer.
///
/// The `Start` fragment carries the total serialized size as an ASCII decimal
/// string, each `Data` fragment carries up to `chunk_size` bytes of the
/// serialized value, and the `End` fragment carries nothing. The protocol
/// sends this sequence twice per transfer, once per buffer id (0 and 1); the
/// caller drives the duplication.
///
/// `chunk_size` is [`CLIPBOARD_CHUNK_SIZE`] in production; tests shrink it to
/// exercise multi-fragment transfers with small payloads.
pub fn chunk_clipboard(
    id: u8,
    seq: u32,
    data: &ClipboardData,
    chunk_size: usize,
) -> Vec<Message> {
    let payload = data.to_wire();
    let chunk_size = chunk_size.max(1);

    let mut messages = Vec::with_capacity(2 + payload.len().div_ceil(chunk_size));
    messages.push(Message::ClipboardData {
        id,
        seq,
        marker: ClipboardStage::Start as u8,
        data: payload.len().to_string().into_bytes(),
    });
    for chunk in payload.chunks(chunk_size) {
        messages.push(Message::ClipboardData {
            id,
            seq,
            marker: ClipboardStage::Data as u8,
            data: chunk.to_vec(),
        });
    }
    messages.push(Message::ClipboardData {
        id,
        seq,
        marker: ClipboardStage::End as u8,
        data: Vec::new(),
    });
    messages
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(messages: &[Message]) -> Vec<u8> {
        messages
            .iter()
            .map(|m| match m {
                Message::ClipboardData { marker, .. } => *marker,
                other => panic!("unexpected message {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_small_payload_produces_start_data_end() {
        let data = ClipboardData::from_text("hi");
        let messages = chunk_clipboard(0, 1, &data, CLIPBOARD_CHUNK_SIZE);
        assert_eq!(markers(&messages), vec![1, 2, 3]);
    }

    #[test]
    fn test_forced_small_chunks_split_the_payload() {
        let data = ClipboardData::from_text("0123456789abcdef");
        let wire_len = data.to_wire().len();
        let messages = chunk_clipboard(1, 2, &data, 8);

        let expected_chunks = wire_len.div_ceil(8);
        assert_eq!(messages.len(), expected_chunks + 2);

        // All fragments share the buffer id and sequence number.
        for msg in &messages {
            match msg {
                Message::ClipboardData { id, seq, .. } => {
                    assert_eq!(*id, 1);
                    assert_eq!(*seq, 2);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
    }

    #[test]
    fn test_start_fragment_carries_total_size_as_ascii() {
        let data = ClipboardData::from_text("abc");
        let wire_len = data.to_wire().len();
        let messages = chunk_clipboard(0, 0, &data, 8);

        let Message::ClipboardData { data: start, .. } = &messages[0] else {
            panic!("expected clipboard fragment");
        };
        assert_eq!(start, wire_len.to_string().as_bytes());
    }

    #[test]
    fn test_end_fragment_is_empty() {
        let data = ClipboardData::from_text("abc");
        let messages = chunk_clipboard(0, 0, &data, 8);
        let Some(Message::ClipboardData { marker, data, .. }) = messages.last() else {
            panic!("expected clipboard fragment");
        };
        assert_eq!(*marker, ClipboardStage::End as u8);
        assert!(data.is_empty());
    }
}

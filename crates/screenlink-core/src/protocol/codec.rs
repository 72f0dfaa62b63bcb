//! Frame-level codec: bytes to [`Message`] and back.
//!
//! Wire format:
//! ```text
//! [length:4][code:4..][payload:N]
//! ```
//! `length` is big-endian and covers the code plus the payload, so the
//! minimum valid frame body is the 4-byte code alone. Payload fields are
//! fixed-width big-endian integers or u32 length-prefixed byte strings, as
//! declared by the message's template.

use thiserror::Error;

use crate::protocol::messages::{FieldValue, Message};
use crate::protocol::template::{self, FieldSpec};

/// Errors that can occur while decoding a frame body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame body is shorter than the 4-byte type code.
    #[error("frame of {0} bytes is shorter than the 4-byte type code")]
    FrameTooShort(usize),

    /// The 4-byte code prefix matches no registered template.
    #[error("unknown message code: {0}")]
    UnknownCode(String),

    /// A field extends past the end of the payload.
    #[error("malformed {code} payload: need {needed} bytes, got {available}")]
    Truncated {
        code: &'static str,
        needed: usize,
        available: usize,
    },

    /// Decoding succeeded but left unconsumed bytes.
    #[error("{code} payload has {trailing} trailing bytes")]
    TrailingBytes { code: &'static str, trailing: usize },

    /// Field values did not fit the message constructor (bad UTF-8 in a
    /// string field, or a template/constructor mismatch).
    #[error("{code} field values do not match the message shape")]
    FieldMismatch { code: &'static str },
}

/// Encodes a message into a complete frame, including the length prefix.
pub fn encode_message(msg: &Message) -> Vec<u8> {
    let template = msg.template();
    let code = template.code.as_bytes();
    let body_len = code.len() + msg.payload_size();

    let mut buf = Vec::with_capacity(4 + body_len);
    buf.extend_from_slice(&(body_len as u32).to_be_bytes());
    buf.extend_from_slice(code);
    for field in msg.to_fields() {
        match field {
            FieldValue::U8(v) => buf.push(v),
            FieldValue::U16(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::U32(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Bytes(b) => {
                buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
                buf.extend_from_slice(&b);
            }
            FieldValue::U32List(l) => {
                buf.extend_from_slice(&(l.len() as u32).to_be_bytes());
                for v in l {
                    buf.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
    }
    buf
}

/// Decodes one frame body (code + payload, without the length prefix).
///
/// Templates sharing the 4-byte code prefix are tried in declared order; the
/// first whose fields consume the payload exactly wins.
///
/// # Errors
///
/// Returns [`ProtocolError`] when no template matches or the payload does not
/// fit any candidate.
pub fn decode_frame(frame: &[u8]) -> Result<Message, ProtocolError> {
    if frame.len() < 4 {
        return Err(ProtocolError::FrameTooShort(frame.len()));
    }
    let prefix: [u8; 4] = [frame[0], frame[1], frame[2], frame[3]];

    let mut last_err = None;
    for candidate in template::lookup(prefix) {
        let code = candidate.code.as_bytes();
        if frame.len() < code.len() || &frame[..code.len()] != code {
            continue;
        }
        match decode_fields(candidate.code, candidate.fields, &frame[code.len()..]) {
            Ok(fields) => match Message::from_fields(candidate.kind, fields) {
                Some(msg) => return Ok(msg),
                None => last_err = Some(ProtocolError::FieldMismatch { code: candidate.code }),
            },
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ProtocolError::UnknownCode(String::from_utf8_lossy(&prefix).into_owned())
    }))
}

/// Walks a template's field specifiers over a payload, enforcing exact
/// consumption.
fn decode_fields(
    code: &'static str,
    specs: &[FieldSpec],
    payload: &[u8],
) -> Result<Vec<FieldValue>, ProtocolError> {
    let mut reader = FieldReader { code, payload, pos: 0 };
    let mut fields = Vec::with_capacity(specs.len());
    for spec in specs {
        let value = match spec {
            FieldSpec::U8 => FieldValue::U8(reader.take(1)?[0]),
            FieldSpec::U16 => {
                let b = reader.take(2)?;
                FieldValue::U16(u16::from_be_bytes([b[0], b[1]]))
            }
            FieldSpec::U32 => FieldValue::U32(reader.take_u32()?),
            FieldSpec::Bytes => {
                let len = reader.take_u32()? as usize;
                FieldValue::Bytes(reader.take(len)?.to_vec())
            }
            FieldSpec::U32List => {
                let count = reader.take_u32()? as usize;
                // Bound the allocation by what the payload can actually hold.
                let mut list = Vec::with_capacity(count.min(payload.len() / 4));
                for _ in 0..count {
                    list.push(reader.take_u32()?);
                }
                FieldValue::U32List(list)
            }
        };
        fields.push(value);
    }
    let trailing = payload.len() - reader.pos;
    if trailing > 0 {
        return Err(ProtocolError::TrailingBytes { code, trailing });
    }
    Ok(fields)
}

struct FieldReader<'a> {
    code: &'static str,
    payload: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.pos + len > self.payload.len() {
            return Err(ProtocolError::Truncated {
                code: self.code,
                needed: self.pos + len,
                available: self.payload.len(),
            });
        }
        let slice = &self.payload[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Typed representation of every protocol message.
//!
//! [`Message`] is a closed enum with one variant per concrete wire message.
//! Each variant converts to and from the generic field values its template
//! describes (`to_fields` / `from_fields`); the frame codec in `codec.rs`
//! handles the byte-level encoding, so the invariant
//! `encode(decode(bytes)) == bytes` holds for every variant.

use crate::protocol::template::{self, MessageKind, MessageTemplate};

/// A decoded payload field, mirroring [`FieldSpec`](crate::protocol::FieldSpec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Bytes(Vec<u8>),
    U32List(Vec<u32>),
}

/// Marker byte inside a clipboard `Data` fragment: the stage of a chunked
/// clipboard transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClipboardStage {
    /// Carries the total transfer size as an ASCII decimal string.
    Start = 1,
    /// Carries one chunk of the serialized clipboard value.
    Data = 2,
    /// Carries no bytes; the transfer is complete.
    End = 3,
}

impl TryFrom<u8> for ClipboardStage {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ClipboardStage::Start),
            2 => Ok(ClipboardStage::Data),
            3 => Ok(ClipboardStage::End),
            _ => Err(()),
        }
    }
}

/// All messages the client can send or receive, discriminated by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Server greeting: protocol version it speaks.
    Hello { major: u16, minor: u16 },
    /// Client reply to the greeting: version plus this screen's name.
    HelloBack { major: u16, minor: u16, name: String },
    NoOp,
    Close,
    /// Cursor entered this screen at (x, y); `seq` numbers the crossing.
    Enter { x: u16, y: u16, seq: u32, mask: u16 },
    Leave,
    /// Server announces it holds new clipboard contents for buffer `id`.
    ClipboardGrab { id: u8, seq: u32 },
    KeepAlive,
    ScreenSaver { on: bool },
    /// Server acknowledged our `Info`; keep-alive supervision starts here.
    InfoAck,
    KeyDown { id: u16, mask: u16, button: u16 },
    KeyUp { id: u16, mask: u16, button: u16 },
    KeyRepeat { id: u16, mask: u16, count: u16, button: u16 },
    MouseDown { button: u8 },
    MouseUp { button: u8 },
    MouseMove { x: i16, y: i16 },
    MouseRelativeMove { x: i16, y: i16 },
    MouseWheel { x_delta: i16, y_delta: i16 },
    /// One fragment of a chunked clipboard transfer for buffer `id`.
    ClipboardData {
        id: u8,
        seq: u32,
        marker: u8,
        data: Vec<u8>,
    },
    /// Local screen geometry and cursor position, seven u16 values:
    /// origin x/y, width, height, warp zone, cursor x/y.
    Info {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        warp_zone: u16,
        cursor_x: u16,
        cursor_y: u16,
    },
    SetOptions { options: Vec<u32> },
    QueryInfo,
    Incompatible { major: u16, minor: u16 },
    Busy,
    Unknown,
    Bad,
}

impl Message {
    /// Returns the [`MessageKind`] discriminant for this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Hello { .. } => MessageKind::Hello,
            Message::HelloBack { .. } => MessageKind::HelloBack,
            Message::NoOp => MessageKind::NoOp,
            Message::Close => MessageKind::Close,
            Message::Enter { .. } => MessageKind::Enter,
            Message::Leave => MessageKind::Leave,
            Message::ClipboardGrab { .. } => MessageKind::ClipboardGrab,
            Message::KeepAlive => MessageKind::KeepAlive,
            Message::ScreenSaver { .. } => MessageKind::ScreenSaver,
            Message::InfoAck => MessageKind::InfoAck,
            Message::KeyDown { .. } => MessageKind::KeyDown,
            Message::KeyUp { .. } => MessageKind::KeyUp,
            Message::KeyRepeat { .. } => MessageKind::KeyRepeat,
            Message::MouseDown { .. } => MessageKind::MouseDown,
            Message::MouseUp { .. } => MessageKind::MouseUp,
            Message::MouseMove { .. } => MessageKind::MouseMove,
            Message::MouseRelativeMove { .. } => MessageKind::MouseRelativeMove,
            Message::MouseWheel { .. } => MessageKind::MouseWheel,
            Message::ClipboardData { .. } => MessageKind::ClipboardData,
            Message::Info { .. } => MessageKind::Info,
            Message::SetOptions { .. } => MessageKind::SetOptions,
            Message::QueryInfo => MessageKind::QueryInfo,
            Message::Incompatible { .. } => MessageKind::Incompatible,
            Message::Busy => MessageKind::Busy,
            Message::Unknown => MessageKind::Unknown,
            Message::Bad => MessageKind::Bad,
        }
    }

    /// Returns the template describing this message's wire shape.
    pub fn template(&self) -> &'static MessageTemplate {
        template::for_kind(self.kind())
    }

    /// Flattens this message into the field values its template describes,
    /// in template order.
    pub fn to_fields(&self) -> Vec<FieldValue> {
        use FieldValue as F;
        match self {
            Message::Hello { major, minor } => vec![F::U16(*major), F::U16(*minor)],
            Message::HelloBack { major, minor, name } => vec![
                F::U16(*major),
                F::U16(*minor),
                F::Bytes(name.as_bytes().to_vec()),
            ],
            Message::NoOp
            | Message::Close
            | Message::Leave
            | Message::KeepAlive
            | Message::InfoAck
            | Message::QueryInfo
            | Message::Busy
            | Message::Unknown
            | Message::Bad => Vec::new(),
            Message::Enter { x, y, seq, mask } => {
                vec![F::U16(*x), F::U16(*y), F::U32(*seq), F::U16(*mask)]
            }
            Message::ClipboardGrab { id, seq } => vec![F::U8(*id), F::U32(*seq)],
            Message::ScreenSaver { on } => vec![F::U8(u8::from(*on))],
            Message::KeyDown { id, mask, button } | Message::KeyUp { id, mask, button } => {
                vec![F::U16(*id), F::U16(*mask), F::U16(*button)]
            }
            Message::KeyRepeat { id, mask, count, button } => {
                vec![F::U16(*id), F::U16(*mask), F::U16(*count), F::U16(*button)]
            }
            Message::MouseDown { button } | Message::MouseUp { button } => vec![F::U8(*button)],
            Message::MouseMove { x, y } | Message::MouseRelativeMove { x, y } => {
                vec![F::U16(*x as u16), F::U16(*y as u16)]
            }
            Message::MouseWheel { x_delta, y_delta } => {
                vec![F::U16(*x_delta as u16), F::U16(*y_delta as u16)]
            }
            Message::ClipboardData { id, seq, marker, data } => vec![
                F::U8(*id),
                F::U32(*seq),
                F::U8(*marker),
                F::Bytes(data.clone()),
            ],
            Message::Info { x, y, width, height, warp_zone, cursor_x, cursor_y } => vec![
                F::U16(*x),
                F::U16(*y),
                F::U16(*width),
                F::U16(*height),
                F::U16(*warp_zone),
                F::U16(*cursor_x),
                F::U16(*cursor_y),
            ],
            Message::SetOptions { options } => vec![F::U32List(options.clone())],
            Message::Incompatible { major, minor } => vec![F::U16(*major), F::U16(*minor)],
        }
    }

    /// Reconstructs a message from decoded field values.
    ///
    /// The codec guarantees `fields` matches `kind`'s template shape, so a
    /// mismatch here means the template table and this constructor diverged.
    pub(crate) fn from_fields(kind: MessageKind, fields: Vec<FieldValue>) -> Option<Message> {
        use FieldValue as F;
        let msg = match (kind, fields.as_slice()) {
            (MessageKind::Hello, [F::U16(major), F::U16(minor)]) => {
                Message::Hello { major: *major, minor: *minor }
            }
            (MessageKind::HelloBack, [F::U16(major), F::U16(minor), F::Bytes(name)]) => {
                Message::HelloBack {
                    major: *major,
                    minor: *minor,
                    name: String::from_utf8(name.clone()).ok()?,
                }
            }
            (MessageKind::NoOp, []) => Message::NoOp,
            (MessageKind::Close, []) => Message::Close,
            (MessageKind::Enter, [F::U16(x), F::U16(y), F::U32(seq), F::U16(mask)]) => {
                Message::Enter { x: *x, y: *y, seq: *seq, mask: *mask }
            }
            (MessageKind::Leave, []) => Message::Leave,
            (MessageKind::ClipboardGrab, [F::U8(id), F::U32(seq)]) => {
                Message::ClipboardGrab { id: *id, seq: *seq }
            }
            (MessageKind::KeepAlive, []) => Message::KeepAlive,
            (MessageKind::ScreenSaver, [F::U8(on)]) => Message::ScreenSaver { on: *on != 0 },
            (MessageKind::InfoAck, []) => Message::InfoAck,
            (MessageKind::KeyDown, [F::U16(id), F::U16(mask), F::U16(button)]) => {
                Message::KeyDown { id: *id, mask: *mask, button: *button }
            }
            (MessageKind::KeyUp, [F::U16(id), F::U16(mask), F::U16(button)]) => {
                Message::KeyUp { id: *id, mask: *mask, button: *button }
            }
            (
                MessageKind::KeyRepeat,
                [F::U16(id), F::U16(mask), F::U16(count), F::U16(button)],
            ) => Message::KeyRepeat {
                id: *id,
                mask: *mask,
                count: *count,
                button: *button,
            },
            (MessageKind::MouseDown, [F::U8(button)]) => Message::MouseDown { button: *button },
            (MessageKind::MouseUp, [F::U8(button)]) => Message::MouseUp { button: *button },
            (MessageKind::MouseMove, [F::U16(x), F::U16(y)]) => {
                Message::MouseMove { x: *x as i16, y: *y as i16 }
            }
            (MessageKind::MouseRelativeMove, [F::U16(x), F::U16(y)]) => {
                Message::MouseRelativeMove { x: *x as i16, y: *y as i16 }
            }
            (MessageKind::MouseWheel, [F::U16(x), F::U16(y)]) => {
                Message::MouseWheel { x_delta: *x as i16, y_delta: *y as i16 }
            }
            (
                MessageKind::ClipboardData,
                [F::U8(id), F::U32(seq), F::U8(marker), F::Bytes(data)],
            ) => Message::ClipboardData {
                id: *id,
                seq: *seq,
                marker: *marker,
                data: data.clone(),
            },
            (
                MessageKind::Info,
                [F::U16(x), F::U16(y), F::U16(w), F::U16(h), F::U16(warp), F::U16(cx), F::U16(cy)],
            ) => Message::Info {
                x: *x,
                y: *y,
                width: *w,
                height: *h,
                warp_zone: *warp,
                cursor_x: *cx,
                cursor_y: *cy,
            },
            (MessageKind::SetOptions, [F::U32List(options)]) => {
                Message::SetOptions { options: options.clone() }
            }
            (MessageKind::QueryInfo, []) => Message::QueryInfo,
            (MessageKind::Incompatible, [F::U16(major), F::U16(minor)]) => {
                Message::Incompatible { major: *major, minor: *minor }
            }
            (MessageKind::Busy, []) => Message::Busy,
            (MessageKind::Unknown, []) => Message::Unknown,
            (MessageKind::Bad, []) => Message::Bad,
            _ => return None,
        };
        Some(msg)
    }

    /// Size of the encoded payload (the frame body minus the type code).
    pub fn payload_size(&self) -> usize {
        self.to_fields()
            .iter()
            .map(|f| match f {
                FieldValue::U8(_) => 1,
                FieldValue::U16(_) => 2,
                FieldValue::U32(_) => 4,
                FieldValue::Bytes(b) => 4 + b.len(),
                FieldValue::U32List(l) => 4 + 4 * l.len(),
            })
            .sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Declarative templates for every message the protocol knows.
//!
//! A template pairs a full ASCII code string with an ordered list of field
//! specifiers. Incoming frames are matched against templates by the first
//! four bytes of their code; the greeting code (`"Barrier"`) is longer than
//! four bytes but shares the `Barr` prefix with the greeting reply, so
//! several templates may share a prefix. Shared prefixes are resolved in
//! declared order: the decoder tries each candidate until one consumes the
//! payload exactly.
//!
//! Adding a message means extending [`MessageKind`], this table, and the
//! field conversions in `messages.rs` together, never independently.

/// Protocol version advertised in the greeting reply.
pub const PROTOCOL_MAJOR: u16 = 1;
pub const PROTOCOL_MINOR: u16 = 6;

/// Discriminant for every known message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Hello,
    HelloBack,
    NoOp,
    Close,
    Enter,
    Leave,
    ClipboardGrab,
    KeepAlive,
    ScreenSaver,
    InfoAck,
    KeyDown,
    KeyUp,
    KeyRepeat,
    MouseDown,
    MouseUp,
    MouseMove,
    MouseRelativeMove,
    MouseWheel,
    ClipboardData,
    Info,
    SetOptions,
    QueryInfo,
    Incompatible,
    Busy,
    Unknown,
    Bad,
}

/// Shape of one field within a message payload.
///
/// Integers are big-endian and fixed width; `Bytes` is a u32 length-prefixed
/// byte string; `U32List` is a u32 count followed by that many u32 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSpec {
    U8,
    U16,
    U32,
    Bytes,
    U32List,
}

/// Declarative description of one message type on the wire.
#[derive(Debug)]
pub struct MessageTemplate {
    /// Full ASCII code string. Four characters for all types except the
    /// greeting, which is matched by its first four bytes.
    pub code: &'static str,
    pub kind: MessageKind,
    pub fields: &'static [FieldSpec],
}

use FieldSpec::{Bytes, U16, U32, U32List, U8};

/// All known templates, in resolution order for shared prefixes.
///
/// `Hello` precedes `HelloBack`: both carry the `Barrier` code, and the
/// shorter server greeting must win when the payload is only two integers.
pub const TEMPLATES: &[MessageTemplate] = &[
    MessageTemplate { code: "Barrier", kind: MessageKind::Hello, fields: &[U16, U16] },
    MessageTemplate { code: "Barrier", kind: MessageKind::HelloBack, fields: &[U16, U16, Bytes] },
    MessageTemplate { code: "CNOP", kind: MessageKind::NoOp, fields: &[] },
    MessageTemplate { code: "CBYE", kind: MessageKind::Close, fields: &[] },
    MessageTemplate { code: "CINN", kind: MessageKind::Enter, fields: &[U16, U16, U32, U16] },
    MessageTemplate { code: "COUT", kind: MessageKind::Leave, fields: &[] },
    MessageTemplate { code: "CCLP", kind: MessageKind::ClipboardGrab, fields: &[U8, U32] },
    MessageTemplate { code: "CALV", kind: MessageKind::KeepAlive, fields: &[] },
    MessageTemplate { code: "CSEC", kind: MessageKind::ScreenSaver, fields: &[U8] },
    MessageTemplate { code: "CIAK", kind: MessageKind::InfoAck, fields: &[] },
    MessageTemplate { code: "DKDN", kind: MessageKind::KeyDown, fields: &[U16, U16, U16] },
    MessageTemplate { code: "DKUP", kind: MessageKind::KeyUp, fields: &[U16, U16, U16] },
    MessageTemplate { code: "DKRP", kind: MessageKind::KeyRepeat, fields: &[U16, U16, U16, U16] },
    MessageTemplate { code: "DMDN", kind: MessageKind::MouseDown, fields: &[U8] },
    MessageTemplate { code: "DMUP", kind: MessageKind::MouseUp, fields: &[U8] },
    MessageTemplate { code: "DMMV", kind: MessageKind::MouseMove, fields: &[U16, U16] },
    MessageTemplate { code: "DMRM", kind: MessageKind::MouseRelativeMove, fields: &[U16, U16] },
    MessageTemplate { code: "DMWM", kind: MessageKind::MouseWheel, fields: &[U16, U16] },
    MessageTemplate { code: "DCLP", kind: MessageKind::ClipboardData, fields: &[U8, U32, U8, Bytes] },
    MessageTemplate { code: "DINF", kind: MessageKind::Info, fields: &[U16, U16, U16, U16, U16, U16, U16] },
    MessageTemplate { code: "DSOP", kind: MessageKind::SetOptions, fields: &[U32List] },
    MessageTemplate { code: "QINF", kind: MessageKind::QueryInfo, fields: &[] },
    MessageTemplate { code: "EICV", kind: MessageKind::Incompatible, fields: &[U16, U16] },
    MessageTemplate { code: "EBSY", kind: MessageKind::Busy, fields: &[] },
    MessageTemplate { code: "EUNK", kind: MessageKind::Unknown, fields: &[] },
    MessageTemplate { code: "EBAD", kind: MessageKind::Bad, fields: &[] },
];

/// Returns all templates whose code starts with the given 4-byte prefix,
/// in declared order.
pub fn lookup(prefix: [u8; 4]) -> impl Iterator<Item = &'static MessageTemplate> {
    TEMPLATES
        .iter()
        .filter(move |t| t.code.as_bytes().get(..4) == Some(prefix.as_slice()))
}

/// Returns the template for a message kind.
///
/// Every kind has exactly one template; the table and the enum are extended
/// together.
pub fn for_kind(kind: MessageKind) -> &'static MessageTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or_else(|| unreachable!("template table is missing {kind:?}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_four_byte_prefix_finds_greeting_templates_in_order() {
        let matches: Vec<MessageKind> =
            lookup(*b"Barr").map(|t| t.kind).collect();
        assert_eq!(matches, vec![MessageKind::Hello, MessageKind::HelloBack]);
    }

    #[test]
    fn test_lookup_unknown_prefix_yields_nothing() {
        assert_eq!(lookup(*b"XXXX").count(), 0);
    }

    #[test]
    fn test_lookup_iterator_outlives_its_prefix() {
        let templates: Vec<&'static MessageTemplate> = {
            let prefix = *b"CALV";
            lookup(prefix).collect()
        };
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].kind, MessageKind::KeepAlive);
    }

    #[test]
    fn test_every_kind_has_exactly_one_template() {
        for template in TEMPLATES {
            let count = TEMPLATES.iter().filter(|t| t.kind == template.kind).count();
            assert_eq!(count, 1, "{:?} must appear once", template.kind);
        }
    }

    #[test]
    fn test_all_codes_are_at_least_four_ascii_bytes() {
        for template in TEMPLATES {
            assert!(template.code.len() >= 4, "{} too short", template.code);
            assert!(template.code.is_ascii());
        }
    }
}

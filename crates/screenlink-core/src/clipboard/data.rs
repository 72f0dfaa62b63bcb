//! The clipboard value type and its wire encoding.

use std::collections::BTreeMap;

use thiserror::Error;

/// Clipboard payload format codes, as used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ClipboardFormat {
    Text = 0,
    Bitmap = 1,
    Html = 2,
}

impl TryFrom<u32> for ClipboardFormat {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ClipboardFormat::Text),
            1 => Ok(ClipboardFormat::Bitmap),
            2 => Ok(ClipboardFormat::Html),
            _ => Err(()),
        }
    }
}

/// Errors from decoding a serialized clipboard value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClipboardDecodeError {
    /// The bytes end before the declared records do.
    #[error("clipboard data truncated: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// A record declared an unrecognized format code.
    #[error("unknown clipboard format code: {0}")]
    UnknownFormat(u32),

    /// Decoding finished with unconsumed bytes.
    #[error("clipboard data has {0} trailing bytes")]
    TrailingBytes(usize),
}

/// A clipboard payload: a mapping from format to raw bytes.
///
/// Keys are unique by format (inserting a format twice replaces the earlier
/// variant) and iterate in a stable order, so encoding is deterministic.
///
/// Wire encoding: u32 format count, then per format a u32 code, u32 length,
/// and the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardData {
    variants: BTreeMap<ClipboardFormat, Vec<u8>>,
}

impl ClipboardData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a plain-text clipboard value.
    pub fn from_text(text: &str) -> Self {
        let mut data = Self::new();
        data.insert(ClipboardFormat::Text, text.as_bytes().to_vec());
        data
    }

    /// Sets the bytes for `format`, replacing any earlier variant.
    pub fn insert(&mut self, format: ClipboardFormat, bytes: Vec<u8>) {
        self.variants.insert(format, bytes);
    }

    /// Returns the bytes stored for `format`, if any.
    pub fn get(&self, format: ClipboardFormat) -> Option<&[u8]> {
        self.variants.get(&format).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn format_count(&self) -> usize {
        self.variants.len()
    }

    /// Serializes the value into its wire form.
    pub fn to_wire(&self) -> Vec<u8> {
        let total: usize = self
            .variants
            .values()
            .map(|bytes| 8 + bytes.len())
            .sum::<usize>()
            + 4;
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&(self.variants.len() as u32).to_be_bytes());
        for (format, bytes) in &self.variants {
            buf.extend_from_slice(&(*format as u32).to_be_bytes());
            buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            buf.extend_from_slice(bytes);
        }
        buf
    }

    /// Deserializes a value from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardDecodeError`] when the bytes are truncated, carry
    /// an unknown format code, or have trailing garbage.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, ClipboardDecodeError> {
        let mut pos = 0;
        let take_u32 = |pos: &mut usize| -> Result<u32, ClipboardDecodeError> {
            if *pos + 4 > bytes.len() {
                return Err(ClipboardDecodeError::Truncated {
                    needed: *pos + 4,
                    available: bytes.len(),
                });
            }
            let v = u32::from_be_bytes([
                bytes[*pos],
                bytes[*pos + 1],
                bytes[*pos + 2],
                bytes[*pos + 3],
            ]);
            *pos += 4;
            Ok(v)
        };

        let count = take_u32(&mut pos)?;
        let mut data = Self::new();
        for _ in 0..count {
            let code = take_u32(&mut pos)?;
            let format = ClipboardFormat::try_from(code)
                .map_err(|_| ClipboardDecodeError::UnknownFormat(code))?;
            let len = take_u32(&mut pos)? as usize;
            if pos + len > bytes.len() {
                return Err(ClipboardDecodeError::Truncated {
                    needed: pos + len,
                    available: bytes.len(),
                });
            }
            data.insert(format, bytes[pos..pos + len].to_vec());
            pos += len;
        }
        if pos != bytes.len() {
            return Err(ClipboardDecodeError::TrailingBytes(bytes.len() - pos));
        }
        Ok(data)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

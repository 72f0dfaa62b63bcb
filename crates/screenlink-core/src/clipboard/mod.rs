//! Chunked clipboard transfer sub-protocol.
//!
//! A clipboard value travels as a `Start`/`Data`*/`End` marker sequence
//! inside `DCLP` messages, duplicated over two logical clipboard buffers
//! (ids 0 and 1). `data` defines the value and its wire encoding, `chunker`
//! produces the outbound fragment sequence, and `assembler` reassembles an
//! inbound one.

pub mod assembler;
pub mod chunker;
pub mod data;

pub use assembler::ClipboardAssembler;
pub use chunker::{chunk_clipboard, CLIPBOARD_CHUNK_SIZE};
pub use data::{ClipboardData, ClipboardDecodeError, ClipboardFormat};

//! # screenlink-core
//!
//! Protocol engine for ScreenLink, a client for the Barrier/Synergy family of
//! screen-sharing protocols. A server on another machine forwards keyboard,
//! mouse, and clipboard events to this client over TCP; this crate implements
//! everything between raw socket bytes and typed domain events.
//!
//! This crate has no dependencies on sockets, OS APIs, or UI frameworks; it
//! is used by the `screenlink-client` connection engine and is fully testable
//! in isolation.
//!
//! Modules:
//!
//! - **`buffer`** – a growable byte accumulator with independent read/write
//!   cursors, used to assemble socket reads into complete frames.
//! - **`protocol`** – the message template registry, the typed [`Message`]
//!   model, the frame codec, the incremental [`MessageParser`], and the
//!   [`SequenceCounter`] used to number clipboard transfers.
//! - **`clipboard`** – the clipboard value type and the chunked
//!   Start/Data/End transfer sub-protocol (send-side chunker and receive-side
//!   reassembly state machine).
//! - **`bus`** – a synchronous publish/subscribe hub for the domain events
//!   the engine exposes to its collaborators.

pub mod buffer;
pub mod bus;
pub mod clipboard;
pub mod protocol;

pub use buffer::{BufferError, DynamicBuffer};
pub use bus::{Event, EventBus, Subscription};
pub use clipboard::{ClipboardAssembler, ClipboardData, ClipboardFormat};
pub use protocol::codec::{decode_frame, encode_message, ProtocolError};
pub use protocol::messages::Message;
pub use protocol::parser::MessageParser;
pub use protocol::sequence::SequenceCounter;

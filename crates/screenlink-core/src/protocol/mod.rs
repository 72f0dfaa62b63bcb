//! Wire protocol: templates, typed messages, frame codec, incremental parser,
//! and the sequence counter used to number clipboard transfers.

pub mod codec;
pub mod messages;
pub mod parser;
pub mod sequence;
pub mod template;

pub use codec::{decode_frame, encode_message, ProtocolError};
pub use messages::{ClipboardStage, Message};
pub use parser::MessageParser;
pub use sequence::SequenceCounter;
pub use template::{FieldSpec, MessageKind, MessageTemplate, PROTOCOL_MAJOR, PROTOCOL_MINOR};

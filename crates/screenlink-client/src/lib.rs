//! screenlink-client library entry point.
//!
//! Re-exports the public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! The *client* is the machine whose keyboard, mouse, and clipboard are
//! driven remotely. A Barrier/Synergy-family server on another machine
//! forwards input events here over TCP; this crate:
//!
//! 1. Connects to the server (plain TCP or TLS) and answers its greeting.
//! 2. Reports the local screen geometry so the server can place this screen
//!    in its virtual layout.
//! 3. Parses the inbound message stream and publishes typed domain events
//!    on the [`screenlink_core::EventBus`] for the input-injection layer.
//! 4. Sends local clipboard changes back as chunked clipboard transfers.
//!
//! Protocol mechanics (framing, codec, clipboard chunking, event bus) live
//! in `screenlink-core`; this crate adds the socket transport, the
//! per-connection dispatcher, and the reconnecting orchestrator.

/// Application layer: the message dispatcher and the client orchestrator.
pub mod application;

/// Infrastructure layer: network transport, TLS engine, config storage.
pub mod infrastructure;

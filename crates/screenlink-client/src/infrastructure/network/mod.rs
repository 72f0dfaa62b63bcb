//! Network infrastructure: the full-duplex socket transport and the
//! manually-driven TLS engine it optionally wraps the stream in.

pub mod tls;
pub mod transport;

pub use tls::{HandshakeState, TlsEngine, TlsError};
pub use transport::{SocketEvent, Transport, TransportConfig};

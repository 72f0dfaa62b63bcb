//! Full-duplex socket transport.
//!
//! One spawned task per connection runs a readiness-based I/O loop over a
//! single TCP stream: inbound bytes are appended to a [`DynamicBuffer`] and
//! drained through the [`MessageParser`], outbound frames are queued and
//! written opportunistically on write readiness. When TLS is requested the
//! loop first drives the [`TlsEngine`] handshake explicitly, then keeps
//! wrapping/unwrapping through the same engine in steady state.
//!
//! The transport reports everything through [`SocketEvent`]s on a channel
//! owned by its single listener. Every failure path funnels into exactly one
//! `Disconnected` emission; `stop` is idempotent and may suppress it when
//! the listener is tearing the connection down itself.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use screenlink_core::{encode_message, DynamicBuffer, Message, MessageParser};
use thiserror::Error;
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::infrastructure::network::tls::{HandshakeState, TlsEngine, TlsError};

/// Errors that can occur in the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection to the server could not be established.
    #[error("failed to connect to {address}:{port}: {source}")]
    ConnectFailed {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TLS engine failed during handshake or steady state.
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub address: String,
    pub port: u16,
    pub tls: bool,
}

/// Events the transport emits to its single listener.
#[derive(Debug)]
pub enum SocketEvent {
    /// The connection (and TLS handshake, when enabled) completed.
    Connected,
    /// One batch of messages parsed from an inbound read.
    Messages(Vec<Message>),
    /// The connection ended; emitted exactly once per transport unless
    /// suppressed via [`Transport::stop`].
    Disconnected,
    /// A failure that is about to end the connection.
    Error(TransportError),
}

/// Handle to one connection's I/O task.
pub struct Transport {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    stopped: Arc<AtomicBool>,
    suppress_disconnect: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    /// Connects to `config` in the background and returns immediately.
    ///
    /// All outcomes, including a failed connect, arrive as [`SocketEvent`]s
    /// on `events`.
    pub fn start(config: TransportConfig, events: mpsc::UnboundedSender<SocketEvent>) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let suppress_disconnect = Arc::new(AtomicBool::new(false));
        let stop_signal = Arc::new(Notify::new());

        let task = tokio::spawn(run_connection(
            config,
            events,
            outbound_rx,
            Arc::clone(&stopped),
            Arc::clone(&suppress_disconnect),
            Arc::clone(&stop_signal),
        ));

        Self {
            outbound,
            stopped,
            suppress_disconnect,
            stop_signal,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queues a message for sending. Frames queued after the connection has
    /// ended are silently discarded.
    pub fn send(&self, msg: &Message) {
        let _ = self.outbound.send(encode_message(msg));
    }

    /// Requests shutdown of the I/O task.
    ///
    /// Idempotent. With `suppress_disconnect` the task skips its final
    /// `Disconnected` emission, for callers that are replacing the
    /// connection and do not want the teardown reported.
    pub fn stop(&self, suppress_disconnect: bool) {
        if suppress_disconnect {
            self.suppress_disconnect.store(true, Ordering::SeqCst);
        }
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.stop_signal.notify_one();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Waits for the I/O task to finish.
    pub async fn wait(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// Runs one connection to completion and performs the single terminal
/// `Disconnected` emission.
async fn run_connection(
    config: TransportConfig,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    stopped: Arc<AtomicBool>,
    suppress_disconnect: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
) {
    match drive(&config, &events, &mut outbound_rx, &stopped, &stop_signal).await {
        Ok(()) => debug!("transport loop ended"),
        Err(TransportError::Closed) => info!("server closed the connection"),
        Err(e) => {
            warn!(error = %e, "transport failed");
            let _ = events.send(SocketEvent::Error(e));
        }
    }
    stopped.store(true, Ordering::SeqCst);
    if !suppress_disconnect.load(Ordering::SeqCst) {
        let _ = events.send(SocketEvent::Disconnected);
    }
}

/// Connects, handshakes, and runs the steady-state readiness loop.
async fn drive(
    config: &TransportConfig,
    events: &mpsc::UnboundedSender<SocketEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    stopped: &AtomicBool,
    stop_signal: &Notify,
) -> Result<(), TransportError> {
    let stream = TcpStream::connect((config.address.as_str(), config.port))
        .await
        .map_err(|source| TransportError::ConnectFailed {
            address: config.address.clone(),
            port: config.port,
            source,
        })?;
    let _ = stream.set_nodelay(true);

    let inbound = DynamicBuffer::new();
    let mut parser = MessageParser::new();
    let mut pending: VecDeque<Vec<u8>> = VecDeque::new();

    let mut tls = if config.tls {
        let mut engine = TlsEngine::new(&config.address)?;
        // Plaintext can ride in with the final handshake records; keep it.
        let early = perform_handshake(&stream, &mut engine, stopped).await?;
        if !early.is_empty() {
            inbound.append(&early);
        }
        Some(engine)
    } else {
        None
    };

    info!(address = %config.address, port = config.port, tls = config.tls, "connected");
    let _ = events.send(SocketEvent::Connected);

    loop {
        if stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let interest = if pending.is_empty() {
            Interest::READABLE
        } else {
            Interest::READABLE | Interest::WRITABLE
        };

        tokio::select! {
            _ = stop_signal.notified() => return Ok(()),

            frame = outbound_rx.recv() => {
                let Some(plaintext) = frame else { return Ok(()) };
                let wire = match tls.as_mut() {
                    Some(engine) => {
                        engine.wrap_outgoing(&plaintext)?;
                        engine.take_ciphertext()?
                    }
                    None => plaintext,
                };
                if !wire.is_empty() {
                    pending.push_back(wire);
                    // Try immediately rather than waiting a loop turn.
                    flush_pending(&stream, &mut pending)?;
                }
            }

            ready = stream.ready(interest) => {
                let ready = ready?;
                if ready.is_readable() {
                    let mut raw = [0u8; 4096];
                    match stream.try_read(&mut raw) {
                        Ok(0) => return Err(TransportError::Closed),
                        Ok(n) => {
                            let plain = match tls.as_mut() {
                                Some(engine) => {
                                    let plain = engine.unwrap_incoming(&raw[..n])?;
                                    // The engine may respond with records of
                                    // its own (renegotiation, close alerts).
                                    let replies = engine.take_ciphertext()?;
                                    if !replies.is_empty() {
                                        pending.push_back(replies);
                                    }
                                    plain
                                }
                                None => raw[..n].to_vec(),
                            };
                            if !plain.is_empty() {
                                inbound.append(&plain);
                                let messages = parser.drain(&inbound);
                                if !messages.is_empty() {
                                    let _ = events.send(SocketEvent::Messages(messages));
                                }
                            }
                        }
                        Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                if ready.is_writable() {
                    flush_pending(&stream, &mut pending)?;
                }
            }
        }
    }
}

/// Drives the TLS handshake to completion, returning any application
/// plaintext that arrived alongside the final handshake records.
async fn perform_handshake(
    stream: &TcpStream,
    engine: &mut TlsEngine,
    stopped: &AtomicBool,
) -> Result<Vec<u8>, TransportError> {
    let mut early_plaintext = Vec::new();
    loop {
        if stopped.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        match engine.handshake_state() {
            HandshakeState::NeedWrap => {
                let records = engine.take_ciphertext()?;
                write_all(stream, &records).await?;
            }
            HandshakeState::NeedUnwrap => {
                stream.readable().await?;
                let mut raw = [0u8; 4096];
                match stream.try_read(&mut raw) {
                    Ok(0) => return Err(TransportError::Closed),
                    Ok(n) => {
                        early_plaintext.extend(engine.unwrap_incoming(&raw[..n])?);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(e) => return Err(e.into()),
                }
            }
            HandshakeState::Finished => return Ok(early_plaintext),
        }
    }
}

async fn write_all(stream: &TcpStream, mut bytes: &[u8]) -> Result<(), TransportError> {
    while !bytes.is_empty() {
        stream.writable().await?;
        match stream.try_write(bytes) {
            Ok(n) => bytes = &bytes[n..],
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Writes as much of the queue as the socket accepts right now. A partial
/// write leaves the remainder at the front for the next write readiness.
fn flush_pending(
    stream: &TcpStream,
    pending: &mut VecDeque<Vec<u8>>,
) -> Result<(), TransportError> {
    while let Some(front) = pending.front_mut() {
        match stream.try_write(front) {
            Ok(n) if n == front.len() => {
                pending.pop_front();
            }
            Ok(n) => {
                front.drain(..n);
                return Ok(());
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

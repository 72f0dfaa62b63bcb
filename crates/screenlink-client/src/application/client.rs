//! Connection orchestrator.
//!
//! [`Client`] owns the current [`ServerTarget`], an enable flag, and the
//! live transport/handler pair. All state lives inside one actor task with
//! an mpsc command inbox, so public methods never touch connection state
//! directly; they enqueue a command and return. A fixed 1-second tick
//! drives the reconnection policy: disabled with a live session means
//! disconnect, enabled without one means try again. There is no backoff;
//! the protocol family expects the client to keep knocking.

use std::sync::Arc;
use std::time::Duration;

use screenlink_core::bus::{Event, EventBus};
use screenlink_core::{ClipboardData, Message};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::handler::{Connection, MessageHandler, ScreenDetails};
use crate::infrastructure::network::{SocketEvent, Transport, TransportConfig};

/// Sentinel address meaning "no server configured yet".
pub const UNSET_ADDRESS: &str = "unset";

const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Rejections from [`ServerTarget::validate`]. A rejected update leaves the
/// previous target untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("server address is blank or unset")]
    AddressUnset,

    #[error("server port {0} is outside 1..=32767")]
    PortOutOfRange(u16),
}

/// Where to connect and what to report about the local screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    /// Screen name announced in the greeting reply.
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tls: bool,
    /// Local screen pixel dimensions for the `Info` report.
    pub width: u16,
    pub height: u16,
}

impl ServerTarget {
    /// Checks the target is usable before it replaces the current one.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] for a blank or sentinel address, or a port
    /// outside `1..=32767`.
    pub fn validate(&self) -> Result<(), TargetError> {
        let address = self.address.trim();
        if address.is_empty() || address == UNSET_ADDRESS {
            return Err(TargetError::AddressUnset);
        }
        if self.port == 0 || self.port > 32767 {
            return Err(TargetError::PortOutOfRange(self.port));
        }
        Ok(())
    }
}

enum Command {
    SetEnabled(bool),
    SetTarget(ServerTarget),
    SendClipboard(ClipboardData),
    Shutdown,
}

/// Handle to the orchestrator actor.
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Spawns the actor. The client starts enabled but with no target.
    pub fn spawn(bus: Arc<EventBus>) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_actor(bus, inbox));
        Self {
            commands,
            task: Mutex::new(Some(task)),
        }
    }

    /// Enables or disables the connection. Disabling tears down any live
    /// session; re-enabling lets the reconnect tick establish a new one.
    pub fn set_enabled(&self, enabled: bool) {
        let _ = self.commands.send(Command::SetEnabled(enabled));
    }

    /// Replaces the server target.
    ///
    /// Setting an equal target is a no-op; a different one tears down the
    /// current session and reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the target is invalid; the previous
    /// target, if any, stays active.
    pub fn set_target(&self, target: ServerTarget) -> Result<(), TargetError> {
        target.validate()?;
        let _ = self.commands.send(Command::SetTarget(target));
        Ok(())
    }

    /// Sends the local clipboard to the server. Dropped silently when no
    /// connection is live.
    pub fn send_clipboard(&self, data: ClipboardData) {
        let _ = self.commands.send(Command::SendClipboard(data));
    }

    /// Stops the actor and waits for it to tear everything down. Safe to
    /// call more than once.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Connection for Transport {
    fn send(&self, msg: &Message) {
        Transport::send(self, msg);
    }

    fn stop(&self) {
        Transport::stop(self, false);
    }
}

/// One connection attempt's working set.
struct Session {
    transport: Arc<Transport>,
    handler: MessageHandler,
    events: mpsc::UnboundedReceiver<SocketEvent>,
}

struct ActorState {
    bus: Arc<EventBus>,
    enabled: bool,
    target: Option<ServerTarget>,
    connected: bool,
    session: Option<Session>,
}

async fn run_actor(bus: Arc<EventBus>, mut inbox: mpsc::UnboundedReceiver<Command>) {
    let mut state = ActorState {
        bus,
        enabled: true,
        target: None,
        connected: false,
        session: None,
    };
    let mut tick = time::interval(RECONNECT_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = inbox.recv() => match cmd {
                None | Some(Command::Shutdown) => break,
                Some(Command::SetEnabled(enabled)) => state.set_enabled(enabled).await,
                Some(Command::SetTarget(target)) => state.set_target(target).await,
                Some(Command::SendClipboard(data)) => state.send_clipboard(&data),
            },

            _ = tick.tick() => state.reconnect_check().await,

            event = next_socket_event(&mut state.session) => match event {
                Some(event) => state.on_socket_event(event),
                // The transport task ended without a terminal event; treat
                // it like a disconnect so the tick can retry.
                None => state.on_socket_event(SocketEvent::Disconnected),
            },
        }
    }

    state.disconnect().await;
    debug!("client actor stopped");
}

async fn next_socket_event(session: &mut Option<Session>) -> Option<SocketEvent> {
    match session {
        Some(session) => session.events.recv().await,
        None => std::future::pending().await,
    }
}

impl ActorState {
    async fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        info!(enabled, "client enable flag changed");
        self.enabled = enabled;
        if !enabled {
            self.disconnect().await;
        }
    }

    async fn set_target(&mut self, target: ServerTarget) {
        if self.target.as_ref() == Some(&target) {
            debug!("target unchanged");
            return;
        }
        info!(
            address = %target.address,
            port = target.port,
            tls = target.tls,
            "server target updated"
        );
        self.disconnect().await;
        self.target = Some(target);
        // The next reconnect tick establishes the new connection.
    }

    fn send_clipboard(&mut self, data: &ClipboardData) {
        match self.session.as_mut() {
            Some(session) => session.handler.send_clipboard(data),
            None => debug!("no connection; clipboard change dropped"),
        }
    }

    /// The 1-second policy check.
    async fn reconnect_check(&mut self) {
        if !self.enabled {
            if self.session.is_some() {
                self.disconnect().await;
            }
            return;
        }
        if self.session.is_none() {
            self.connect();
        }
    }

    /// Starts a fresh transport/handler pair for the current target.
    fn connect(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };
        debug!(address = %target.address, port = target.port, "connecting");
        let (events_tx, events) = mpsc::unbounded_channel();
        let transport = Arc::new(Transport::start(
            TransportConfig {
                address: target.address,
                port: target.port,
                tls: target.tls,
            },
            events_tx,
        ));
        let handler = MessageHandler::new(
            Arc::clone(&transport) as Arc<dyn Connection>,
            Arc::clone(&self.bus),
            ScreenDetails {
                name: target.name,
                width: target.width,
                height: target.height,
            },
        );
        self.session = Some(Session {
            transport,
            handler,
            events,
        });
    }

    fn on_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => {
                self.connected = true;
                self.bus.publish(&Event::Connected);
            }
            SocketEvent::Messages(messages) => {
                if let Some(session) = self.session.as_mut() {
                    for msg in messages {
                        session.handler.handle(msg);
                    }
                }
            }
            SocketEvent::Error(e) => warn!(error = %e, "connection error"),
            SocketEvent::Disconnected => {
                self.session = None;
                if self.connected {
                    self.connected = false;
                    self.bus.publish(&Event::Disconnected);
                }
            }
        }
    }

    /// Tears down the live session, if any, and reports the disconnect when
    /// a connection had actually been established.
    async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            // The actor is initiating the teardown; the transport's own
            // Disconnected would race with the session being dropped.
            session.transport.stop(true);
            session.transport.wait().await;
            if self.connected {
                self.connected = false;
                self.bus.publish(&Event::Disconnected);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn target(address: &str, port: u16) -> ServerTarget {
        ServerTarget {
            name: "testscreen".to_string(),
            address: address.to_string(),
            port,
            tls: false,
            width: 1920,
            height: 1080,
        }
    }

    // ── Target validation ─────────────────────────────────────────────────────

    #[test]
    fn test_target_with_valid_fields_passes() {
        assert_eq!(target("192.168.1.5", 24800).validate(), Ok(()));
    }

    #[test]
    fn test_target_with_blank_or_sentinel_address_is_rejected() {
        assert_eq!(target("", 24800).validate(), Err(TargetError::AddressUnset));
        assert_eq!(target("   ", 24800).validate(), Err(TargetError::AddressUnset));
        assert_eq!(
            target(UNSET_ADDRESS, 24800).validate(),
            Err(TargetError::AddressUnset)
        );
    }

    #[test]
    fn test_target_with_out_of_range_port_is_rejected() {
        assert_eq!(
            target("host", 0).validate(),
            Err(TargetError::PortOutOfRange(0))
        );
        assert_eq!(
            target("host", 32768).validate(),
            Err(TargetError::PortOutOfRange(32768))
        );
        assert_eq!(target("host", 32767).validate(), Ok(()));
    }

    // ── Orchestration ─────────────────────────────────────────────────────────

    /// Binds a listener on a port that target validation accepts. OS-assigned
    /// ephemeral ports sit above the protocol's 32767 ceiling, so port 0 is
    /// not usable here.
    async fn bind_validatable_port() -> (TcpListener, u16) {
        for port in 20000..21000u16 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
                return (listener, port);
            }
        }
        panic!("no free port below the protocol ceiling");
    }

    /// Forwards bus events into a channel the test can await.
    fn event_channel(bus: &EventBus) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        bus.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    async fn expect_event(rx: &mut mpsc::UnboundedReceiver<Event>, expected: Event) {
        let event = time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("bus channel closed");
        assert_eq!(event, expected);
    }

    #[tokio::test]
    async fn test_client_connects_to_target_and_reports_connected() {
        // Arrange
        let (listener, port) = bind_validatable_port().await;
        let bus = Arc::new(EventBus::new());
        let mut events = event_channel(&bus);
        let client = Client::spawn(Arc::clone(&bus));

        // Act
        client.set_target(target("127.0.0.1", port)).unwrap();

        // Assert
        let (_server, _) = listener.accept().await.unwrap();
        expect_event(&mut events, Event::Connected).await;

        client.shutdown().await;
        expect_event(&mut events, Event::Disconnected).await;
    }

    #[tokio::test]
    async fn test_disabling_tears_down_and_reports_disconnected() {
        // Arrange
        let (listener, port) = bind_validatable_port().await;
        let bus = Arc::new(EventBus::new());
        let mut events = event_channel(&bus);
        let client = Client::spawn(Arc::clone(&bus));
        client.set_target(target("127.0.0.1", port)).unwrap();
        let (_server, _) = listener.accept().await.unwrap();
        expect_event(&mut events, Event::Connected).await;

        // Act
        client.set_enabled(false);

        // Assert
        expect_event(&mut events, Event::Disconnected).await;
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_client_reconnects_after_server_drops_the_connection() {
        // Arrange
        let (listener, port) = bind_validatable_port().await;
        let bus = Arc::new(EventBus::new());
        let mut events = event_channel(&bus);
        let client = Client::spawn(Arc::clone(&bus));
        client.set_target(target("127.0.0.1", port)).unwrap();

        let (server, _) = listener.accept().await.unwrap();
        expect_event(&mut events, Event::Connected).await;

        // Act: the server goes away, then comes back.
        drop(server);
        expect_event(&mut events, Event::Disconnected).await;

        // Assert: the 1-second tick dials again.
        let (_server, _) = listener.accept().await.unwrap();
        expect_event(&mut events, Event::Connected).await;

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_target_is_rejected_without_touching_the_client() {
        let bus = Arc::new(EventBus::new());
        let client = Client::spawn(bus);

        let err = client.set_target(target(UNSET_ADDRESS, 24800)).unwrap_err();
        assert_eq!(err, TargetError::AddressUnset);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let client = Client::spawn(Arc::new(EventBus::new()));
        client.shutdown().await;
        client.shutdown().await;
    }
}

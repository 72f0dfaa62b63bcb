//! Per-connection message dispatcher.
//!
//! Turns parsed wire messages into protocol actions (greeting reply,
//! keep-alive ping-pong, screen geometry reports) and republishes the rest
//! as domain events on the [`EventBus`]. One handler lives exactly as long
//! as one connection; reconnecting builds a fresh one, so all dispatch state
//! (screen-active flag, clipboard reassembly, sequence numbering) starts
//! clean.
//!
//! Keep-alive is ping-pong, not a self-driven heartbeat: the server sends
//! `CALV`, the handler echoes it and records the time. After the server
//! acknowledges the info exchange the handler supervises that timestamp
//! every 200 ms and force-stops the transport when the server has been
//! silent for 9 seconds.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use screenlink_core::bus::{Event, EventBus, KeyboardEvent, MouseEvent};
use screenlink_core::clipboard::{chunk_clipboard, ClipboardAssembler, CLIPBOARD_CHUNK_SIZE};
use screenlink_core::protocol::{Message, SequenceCounter, PROTOCOL_MAJOR, PROTOCOL_MINOR};
use screenlink_core::ClipboardData;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Interval between keep-alive supervision checks.
const KEEPALIVE_CHECK_INTERVAL: Duration = Duration::from_millis(200);
/// Server silence tolerated before the connection is considered dead.
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(9);

/// The handler's outbound seam: what it needs from the transport.
#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    /// Queues a message for the server.
    fn send(&self, msg: &Message);
    /// Force-stops the connection.
    fn stop(&self);
}

/// Local screen identity and geometry reported to the server.
#[derive(Debug, Clone)]
pub struct ScreenDetails {
    pub name: String,
    pub width: u16,
    pub height: u16,
}

/// Dispatches one connection's message stream.
pub struct MessageHandler {
    conn: Arc<dyn Connection>,
    bus: Arc<EventBus>,
    screen: ScreenDetails,
    sequence: SequenceCounter,
    screen_active: bool,
    /// Reassembly state per clipboard buffer id (0 and 1).
    assemblers: [ClipboardAssembler; 2],
    /// Clipboard fragments held back until the cursor leaves this screen.
    pending_clipboard: Vec<Message>,
    last_keepalive: Arc<Mutex<Instant>>,
    supervision: Option<JoinHandle<()>>,
}

impl MessageHandler {
    pub fn new(conn: Arc<dyn Connection>, bus: Arc<EventBus>, screen: ScreenDetails) -> Self {
        Self {
            conn,
            bus,
            screen,
            sequence: SequenceCounter::new(),
            screen_active: false,
            assemblers: [ClipboardAssembler::new(), ClipboardAssembler::new()],
            pending_clipboard: Vec::new(),
            last_keepalive: Arc::new(Mutex::new(Instant::now())),
            supervision: None,
        }
    }

    /// Dispatches one inbound message.
    pub fn handle(&mut self, msg: Message) {
        match msg {
            Message::Hello { major, minor } => {
                info!(major, minor, "server greeting");
                if (major, minor) != (PROTOCOL_MAJOR, PROTOCOL_MINOR) {
                    warn!(
                        major,
                        minor, "server speaks a different protocol version; replying anyway"
                    );
                }
                self.conn.send(&Message::HelloBack {
                    major: PROTOCOL_MAJOR,
                    minor: PROTOCOL_MINOR,
                    name: self.screen.name.clone(),
                });
            }

            Message::KeepAlive => {
                *self.lock_keepalive() = Instant::now();
                self.conn.send(&Message::KeepAlive);
            }

            Message::QueryInfo => {
                self.conn.send(&Message::Info {
                    x: 0,
                    y: 0,
                    width: self.screen.width,
                    height: self.screen.height,
                    warp_zone: 0,
                    cursor_x: self.screen.width / 2,
                    cursor_y: self.screen.height / 2,
                });
            }

            Message::InfoAck => {
                debug!("server acknowledged screen info");
                *self.lock_keepalive() = Instant::now();
                self.start_keepalive_supervision();
                self.bus.publish(&Event::HandshakeAcknowledged);
            }

            Message::Enter { x, y, seq, mask } => {
                debug!(x, y, seq, mask, "cursor entered this screen");
                self.sequence.observe(seq);
                self.screen_active = true;
                // A new crossing supersedes any clipboard still waiting.
                self.pending_clipboard.clear();
                self.bus.publish(&Event::ScreenEntered);
            }

            Message::Leave => {
                debug!("cursor left this screen");
                self.screen_active = false;
                let pending = std::mem::take(&mut self.pending_clipboard);
                for fragment in &pending {
                    self.conn.send(fragment);
                }
                self.bus.publish(&Event::ScreenLeft);
            }

            Message::ClipboardGrab { id, seq } => {
                debug!(id, seq, "server grabbed clipboard");
                self.sequence.observe(seq);
            }

            Message::ClipboardData { id, seq, marker, data } => {
                self.sequence.observe(seq);
                let Some(assembler) = self.assemblers.get_mut(id as usize) else {
                    warn!(id, "clipboard fragment for unknown buffer id");
                    return;
                };
                if let Some(complete) = assembler.accept(marker, &data) {
                    info!(id, formats = complete.format_count(), "clipboard received");
                    self.bus.publish(&Event::ClipboardSet(complete));
                }
            }

            Message::KeyDown { id, mask, button } => {
                self.bus
                    .publish(&Event::Keyboard(KeyboardEvent::Down { id, mask, button }));
            }
            Message::KeyUp { id, mask, button } => {
                self.bus
                    .publish(&Event::Keyboard(KeyboardEvent::Up { id, mask, button }));
            }
            Message::KeyRepeat { id, mask, count, button } => {
                self.bus.publish(&Event::Keyboard(KeyboardEvent::Repeat {
                    id,
                    mask,
                    count,
                    button,
                }));
            }
            Message::MouseDown { button } => {
                self.bus.publish(&Event::Mouse(MouseEvent::Down { button }));
            }
            Message::MouseUp { button } => {
                self.bus.publish(&Event::Mouse(MouseEvent::Up { button }));
            }
            Message::MouseMove { x, y } => {
                self.bus.publish(&Event::Mouse(MouseEvent::Move { x, y }));
            }
            Message::MouseRelativeMove { x, y } => {
                self.bus
                    .publish(&Event::Mouse(MouseEvent::RelativeMove { x, y }));
            }
            Message::MouseWheel { x_delta, y_delta } => {
                self.bus
                    .publish(&Event::Mouse(MouseEvent::Wheel { x_delta, y_delta }));
            }

            Message::Busy => {
                warn!("server already has a client with this screen name");
                self.conn.stop();
            }
            Message::Incompatible { major, minor } => {
                warn!(major, minor, "server rejected our protocol version");
                self.conn.stop();
            }
            Message::Close => {
                info!("server requested close");
                self.conn.stop();
            }

            Message::ScreenSaver { on } => debug!(on, "server screen saver state"),
            Message::SetOptions { options } => debug!(count = options.len(), "server options"),
            Message::Unknown => debug!("server did not recognize our last message"),
            Message::Bad => warn!("server reported a malformed message from us"),
            Message::NoOp => {}

            // Outbound-only shapes; a server sending them is just noise.
            Message::HelloBack { .. } | Message::Info { .. } => {
                debug!(kind = ?msg.kind(), "ignoring unexpected message");
            }
        }
    }

    /// Sends the local clipboard to the server.
    ///
    /// Two grab announcements (buffer ids 0 and 1) go out immediately; the
    /// two duplicate fragment sequences follow at once when the cursor is on
    /// another screen, or are held until the next `Leave` otherwise.
    pub fn send_clipboard(&mut self, data: &ClipboardData) {
        let grab_seq = self.sequence.next();
        let data_seq = self.sequence.next();

        for id in [0u8, 1u8] {
            self.conn.send(&Message::ClipboardGrab { id, seq: grab_seq });
        }

        let mut fragments = Vec::new();
        for id in [0u8, 1u8] {
            fragments.extend(chunk_clipboard(id, data_seq, data, CLIPBOARD_CHUNK_SIZE));
        }

        if self.screen_active {
            debug!(fragments = fragments.len(), "holding clipboard until cursor leaves");
            self.pending_clipboard.extend(fragments);
        } else {
            for fragment in &fragments {
                self.conn.send(fragment);
            }
        }
    }

    fn start_keepalive_supervision(&mut self) {
        if self.supervision.is_some() {
            return;
        }
        let last = Arc::clone(&self.last_keepalive);
        let conn = Arc::clone(&self.conn);
        self.supervision = Some(tokio::spawn(async move {
            let mut tick = time::interval(KEEPALIVE_CHECK_INTERVAL);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let idle = last.lock().unwrap_or_else(|e| e.into_inner()).elapsed();
                if idle >= KEEPALIVE_TIMEOUT {
                    warn!(?idle, "keep-alive timeout; stopping transport");
                    conn.stop();
                    return;
                }
            }
        }));
    }

    fn lock_keepalive(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.last_keepalive.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for MessageHandler {
    fn drop(&mut self) {
        if let Some(task) = self.supervision.take() {
            task.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

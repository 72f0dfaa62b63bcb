//! ScreenLink client application entry point.
//!
//! Wires together configuration, the event bus, and the connection
//! orchestrator, then waits for Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()       -- TOML config with first-run defaults
//!  └─ EventBus            -- domain events out of the protocol layer
//!  └─ Client::spawn()     -- actor: reconnect loop, transport, dispatcher
//!  └─ ctrl_c -> shutdown
//! ```
//!
//! # Platform input injection
//!
//! The bus subscriber registered here only logs the keyboard, mouse, and
//! clipboard events. In a production build it is replaced by an OS input
//! injector (`SendInput` on Windows, XTest on Linux, CoreGraphics on macOS)
//! and a real clipboard bridge.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use screenlink_client::application::{Client, ServerTarget};
use screenlink_client::infrastructure::storage::load_config;
use screenlink_core::bus::{Event, EventBus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialise structured logging. RUST_LOG overrides the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.screen.log_level.clone())),
        )
        .init();

    info!("ScreenLink client starting");

    // ── Event bus ─────────────────────────────────────────────────────────────
    let bus = Arc::new(EventBus::new());
    bus.subscribe(|event| match event {
        Event::Connected => info!("connected to server"),
        Event::Disconnected => info!("disconnected from server"),
        Event::HandshakeAcknowledged => info!("server acknowledged screen info"),
        Event::ScreenEntered => info!("cursor entered this screen"),
        Event::ScreenLeft => info!("cursor left this screen"),
        Event::Keyboard(key) => info!(?key, "keyboard event"),
        Event::Mouse(mouse) => info!(?mouse, "mouse event"),
        Event::ClipboardSet(data) => info!(formats = data.format_count(), "clipboard received"),
    });

    // ── Connection orchestrator ───────────────────────────────────────────────
    let client = Client::spawn(Arc::clone(&bus));

    let target = ServerTarget {
        name: config.screen.name.clone(),
        address: config.server.address.clone(),
        port: config.server.port,
        tls: config.server.use_tls,
        width: config.screen.width,
        height: config.screen.height,
    };
    match client.set_target(target) {
        Ok(()) => info!(
            address = %config.server.address,
            port = config.server.port,
            tls = config.server.use_tls,
            "connecting"
        ),
        Err(e) => warn!("server target not usable ({e}); edit the config file and restart"),
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    client.shutdown().await;

    info!("ScreenLink client stopped");
    Ok(())
}

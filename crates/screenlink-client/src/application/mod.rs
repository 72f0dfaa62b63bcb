//! Application layer for the client.

pub mod client;
pub mod handler;

pub use client::{Client, ServerTarget, TargetError};
pub use handler::{Connection, MessageHandler, ScreenDetails};

//! Receive-side clipboard reassembly.
//!
//! A phase state machine that accepts only the marker valid for its current
//! phase: `Start` from idle, `Data` after `Start`, `End` after at least one
//! `Data`. Any out-of-order marker, or a decode failure at `End`, discards
//! all buffered fragments and resets to idle; the peer simply retries on its
//! next clipboard change, so nothing is surfaced upward.

use tracing::{debug, warn};

use crate::clipboard::data::ClipboardData;
use crate::protocol::messages::ClipboardStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Receiving,
}

/// Reassembles one clipboard buffer's `Start`/`Data`*/`End` fragment stream
/// into a [`ClipboardData`] value.
#[derive(Debug)]
pub struct ClipboardAssembler {
    phase: Phase,
    expected_len: usize,
    fragments: Vec<u8>,
}

impl ClipboardAssembler {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            expected_len: 0,
            fragments: Vec::new(),
        }
    }

    /// Feeds one fragment into the state machine.
    ///
    /// Returns the reassembled value when `payload` completes a well-formed
    /// transfer; returns `None` while the transfer is in progress or after
    /// any reset.
    pub fn accept(&mut self, marker: u8, payload: &[u8]) -> Option<ClipboardData> {
        let Ok(stage) = ClipboardStage::try_from(marker) else {
            warn!(marker, "unknown clipboard marker; resetting");
            self.reset();
            return None;
        };

        match (self.phase, stage) {
            (Phase::Idle, ClipboardStage::Start) => {
                let Some(expected) = parse_ascii_total(payload) else {
                    warn!("clipboard Start size is not ASCII decimal; resetting");
                    self.reset();
                    return None;
                };
                self.expected_len = expected;
                self.fragments.clear();
                self.phase = Phase::Started;
                None
            }
            (Phase::Started | Phase::Receiving, ClipboardStage::Data) => {
                self.fragments.extend_from_slice(payload);
                self.phase = Phase::Receiving;
                None
            }
            (Phase::Receiving, ClipboardStage::End) => {
                let result = self.finish();
                self.reset();
                result
            }
            (phase, stage) => {
                debug!(?phase, ?stage, "out-of-order clipboard marker; resetting");
                self.reset();
                None
            }
        }
    }

    fn finish(&self) -> Option<ClipboardData> {
        if self.fragments.len() != self.expected_len {
            warn!(
                expected = self.expected_len,
                received = self.fragments.len(),
                "clipboard transfer size mismatch; discarding"
            );
            return None;
        }
        match ClipboardData::from_wire(&self.fragments) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(error = %e, "clipboard transfer failed to decode; discarding");
                None
            }
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.expected_len = 0;
        self.fragments.clear();
    }
}

impl Default for ClipboardAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_ascii_total(payload: &[u8]) -> Option<usize> {
    std::str::from_utf8(payload).ok()?.parse().ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

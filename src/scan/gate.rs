// SPDX-License-Identifier: GPL-3.0-only

//! Single-flight delivery gate
//!
//! The decoder happily reads the same physical code from several
//! consecutive frames; the gate is the enforcement point that turns that
//! stream into exactly one delivery per armed period. The arm state is a
//! single atomic so that concurrent decode completions cannot both win.

use super::token::JoinToken;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Gate arm state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Ready to deliver the next submitted token
    Armed,
    /// A token has been delivered; submissions are discarded until reset
    Fired,
}

/// Callback invoked with the winning token, exactly once per armed period
pub type DeliveryCallback = Arc<dyn Fn(JoinToken) + Send + Sync>;

/// Latch delivering the first submitted token and swallowing the rest
pub struct ScanGate {
    fired: AtomicBool,
    on_token: DeliveryCallback,
}

impl ScanGate {
    /// Create an armed gate delivering through `on_token`
    pub fn new(on_token: DeliveryCallback) -> Self {
        Self {
            fired: AtomicBool::new(false),
            on_token,
        }
    }

    /// Submit a token; the first submission per armed period fires the
    /// delivery callback, every later one is a no-op
    ///
    /// Returns whether this call was the one that delivered.
    pub fn submit(&self, token: JoinToken) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!(token = %token, "Scan gate fired");
            (self.on_token)(token);
            true
        } else {
            trace!("Scan gate already fired, token discarded");
            false
        }
    }

    /// Re-arm the gate for one more delivery
    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
    }

    /// Current arm state
    pub fn state(&self) -> GateState {
        if self.is_fired() {
            GateState::Fired
        } else {
            GateState::Armed
        }
    }

    /// Whether the gate has fired in the current armed period
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

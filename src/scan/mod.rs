// SPDX-License-Identifier: GPL-3.0-only

//! Acquisition session wiring
//!
//! A [`ScanSession`] assembles the full pipeline — frame source, gate
//! check, backpressured analyzer, decoder, token extraction, delivery
//! gate — into one restartable unit. Starting a session re-arms the gate
//! and attaches the source; stopping detaches the source synchronously.
//! Once the gate has fired, frames are released on arrival without ever
//! reaching the decoder.

pub mod gate;
pub mod token;

pub use gate::{GateState, ScanGate};
pub use token::{JoinToken, extract_token};

use crate::analyze::FrameAnalyzer;
use crate::capture::{CaptureDevice, FrameSource};
use crate::decode::{Decoder, RawCandidate};
use crate::errors::{ScanError, ScanResult};
use crate::onboarding::ScanControl;
use crate::permission::{PermissionGate, PermissionStatus};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};
use uuid::Uuid;

/// One code-acquisition pipeline instance
pub struct ScanSession {
    id: Uuid,
    source: FrameSource,
    analyzer: FrameAnalyzer,
    gate: Arc<ScanGate>,
    permissions: PermissionGate,
}

impl ScanSession {
    /// Assemble a session around a device, a decoder and a delivery
    /// callback
    ///
    /// Decode completions run on `runtime`. The callback is invoked at
    /// most once per started acquisition, from a decode task.
    pub fn new(
        runtime: Handle,
        device: Box<dyn CaptureDevice>,
        decoder: Arc<dyn Decoder>,
        permissions: PermissionGate,
        on_token: impl Fn(JoinToken) + Send + Sync + 'static,
    ) -> Self {
        let id = Uuid::new_v4();
        let gate = Arc::new(ScanGate::new(Arc::new(on_token)));

        let sink_gate = Arc::clone(&gate);
        let sink = move |candidates: Vec<RawCandidate>| {
            if let Some(token) = extract_token(&candidates) {
                sink_gate.submit(token);
            }
        };

        Self {
            id,
            source: FrameSource::new(device),
            analyzer: FrameAnalyzer::new(runtime, decoder, Arc::new(sink)),
            gate,
            permissions,
        }
    }

    /// Arm the gate and start frame acquisition
    ///
    /// Requires capture permission: without it the platform prompt is
    /// triggered and `PermissionDenied` is returned; the caller retries
    /// after observing a status change. A device open failure is likewise
    /// returned once and acquisition does not start.
    pub fn try_start(&mut self) -> ScanResult<()> {
        if self.permissions.current_status() != PermissionStatus::Granted {
            self.permissions.request_if_needed();
            return Err(ScanError::PermissionDenied);
        }

        self.gate.reset();

        let gate = Arc::clone(&self.gate);
        let analyzer = self.analyzer.clone();
        self.source.attach(move |frame| {
            // After the first delivery the decoder is not invoked again;
            // arriving frames are simply released.
            if gate.is_fired() {
                drop(frame);
                return;
            }
            analyzer.offer(frame);
        })?;

        info!(session = %self.id, "Acquisition started");
        Ok(())
    }

    /// Stop frame acquisition and re-arm the gate
    ///
    /// Synchronous for new emission; a decode already in flight completes
    /// on its own and its frame is released normally. A late token from
    /// such a decode is delivered through the callback and it is the
    /// consumer's state machine that disposes of it.
    pub fn stop(&mut self) {
        self.source.detach();
        self.gate.reset();
        info!(session = %self.id, "Acquisition stopped");
    }

    /// Session identity used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether frames are currently flowing
    pub fn is_scanning(&self) -> bool {
        self.source.is_attached()
    }

    /// Current gate arm state
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Frames discarded so far by the analyzer's drop-latest policy
    pub fn dropped_frames(&self) -> u64 {
        self.analyzer.dropped_frames()
    }
}

impl ScanControl for ScanSession {
    fn start(&mut self) {
        if let Err(e) = self.try_start() {
            // Permission denial renders a retry affordance upstream;
            // device failures are surfaced once. Neither is fatal.
            warn!(session = %self.id, error = %e, "Failed to start acquisition");
        }
    }

    fn stop(&mut self) {
        ScanSession::stop(self);
    }

    fn is_active(&self) -> bool {
        self.is_scanning()
    }
}

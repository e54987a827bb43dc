// SPDX-License-Identifier: GPL-3.0-only

//! Capture permission gate
//!
//! Tracks whether the capture device is authorized and gates activation
//! of the frame source. The platform prompt is a capability: requesting
//! has no return value, the decision arrives later as a status change on
//! the watch channel. Denial is retryable and never fatal; nothing here
//! retries on its own.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Authorization state of the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// Not yet requested or answered
    #[default]
    Unknown,
    /// Capture is authorized
    Granted,
    /// Denied, but the user can be asked again
    DeniedRetryable,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PermissionStatus::Unknown => "unknown",
            PermissionStatus::Granted => "granted",
            PermissionStatus::DeniedRetryable => "denied",
        };
        write!(f, "{}", s)
    }
}

/// Handle a prompt implementation uses to report the user's decision
pub struct PermissionResponder {
    status: Arc<watch::Sender<PermissionStatus>>,
}

impl PermissionResponder {
    /// Record the decision; observers see it as a status change
    pub fn resolve(self, status: PermissionStatus) {
        info!(status = %status, "Permission prompt resolved");
        self.status.send_replace(status);
    }
}

/// Platform permission prompt capability
///
/// `request` triggers the host platform's permission dialog. The outcome
/// is reported through the responder, asynchronously; implementations
/// must not block.
pub trait PermissionPrompt: Send + Sync {
    fn request(&self, respond: PermissionResponder);
}

/// Prompt that grants immediately, for hosts without a permission model
/// (headless tools, tests)
pub struct AlwaysGranted;

impl PermissionPrompt for AlwaysGranted {
    fn request(&self, respond: PermissionResponder) {
        respond.resolve(PermissionStatus::Granted);
    }
}

/// Tracks capture authorization and triggers the platform prompt
#[derive(Clone)]
pub struct PermissionGate {
    status: Arc<watch::Sender<PermissionStatus>>,
    prompt: Arc<dyn PermissionPrompt>,
}

impl PermissionGate {
    /// Create a gate in the `Unknown` state
    pub fn new(prompt: Arc<dyn PermissionPrompt>) -> Self {
        let (status, _) = watch::channel(PermissionStatus::default());
        Self {
            status: Arc::new(status),
            prompt,
        }
    }

    /// Create a gate that is already granted
    ///
    /// For hosts where device access needs no user consent.
    pub fn pre_granted() -> Self {
        let gate = Self::new(Arc::new(AlwaysGranted));
        gate.status.send_replace(PermissionStatus::Granted);
        gate
    }

    /// Current authorization status
    pub fn current_status(&self) -> PermissionStatus {
        *self.status.borrow()
    }

    /// Observe status changes
    pub fn subscribe(&self) -> watch::Receiver<PermissionStatus> {
        self.status.subscribe()
    }

    /// Trigger the platform prompt unless already granted
    ///
    /// The answer is observed via a status change, not returned. Callers
    /// re-invoke whatever was gated after the status changes; nothing is
    /// retried automatically.
    pub fn request_if_needed(&self) {
        if self.current_status() == PermissionStatus::Granted {
            return;
        }
        debug!("Requesting capture permission");
        self.prompt.request(PermissionResponder {
            status: Arc::clone(&self.status),
        });
    }
}

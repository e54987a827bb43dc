// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle management for the capture loop
//!
//! The capture loop runs on a dedicated thread so device pacing never
//! touches the caller's control flow. The loop owns its state (the open
//! device and the bound consumer) and hands it back when joined, which is
//! what makes a source re-attachable after a stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running on its own thread
///
/// The loop calls `loop_fn` repeatedly with mutable access to the state
/// until the callback returns [`LoopAction::Stop`] or [`CaptureLoop::stop`]
/// is called. Stopping joins the thread, so once `stop()` returns no
/// further iterations run.
pub struct CaptureLoop<S> {
    thread_handle: Option<JoinHandle<S>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl<S: Send + 'static> CaptureLoop<S> {
    /// Spawn a loop thread around `state`
    ///
    /// The state is moved into the thread and returned from [`stop`]
    /// (unless the thread panicked).
    ///
    /// [`stop`]: CaptureLoop::stop
    pub fn spawn<F>(name: &str, mut state: S, mut loop_fn: F) -> Self
    where
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Capture loop thread started");

            loop {
                // Check stop signal first so a stop request wins over
                // whatever the last iteration decided
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                match loop_fn(&mut state) {
                    LoopAction::Continue => {}
                    LoopAction::Stop => {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }
            }

            debug!(name = %name_clone, "Capture loop thread exiting");
            state
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it to finish
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop, wait for the thread to finish and recover the state
    ///
    /// Returns `None` if the loop thread panicked, in which case the state
    /// is lost.
    pub fn stop(mut self) -> Option<S> {
        self.request_stop();
        let handle = self.thread_handle.take()?;
        match handle.join() {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
                None
            }
        }
    }
}

impl<S> Drop for CaptureLoop<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "CaptureLoop dropped, stopping loop");
            self.stop_signal.store(true, Ordering::SeqCst);
            if handle.join().is_err() {
                warn!(name = %self.name, "Capture loop thread panicked");
            }
        }
    }
}

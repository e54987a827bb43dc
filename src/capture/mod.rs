// SPDX-License-Identifier: GPL-3.0-only

//! Frame source and capture device abstraction
//!
//! A [`FrameSource`] owns a [`CaptureDevice`] handle and, while attached,
//! emits its frames to exactly one consumer from a dedicated capture
//! thread. Attachment opens the device; detachment stops emission
//! synchronously and releases it. Frames carry a permit from a bounded
//! pool so that unreleased frames stall capture instead of growing
//! memory.

pub mod file_source;
pub mod frame_loop;
pub mod types;

pub use file_source::StillImageDevice;
pub use types::{DeviceInfo, Frame, PixelFormat, RawFrame, Rotation};

use crate::constants::DEFAULT_FRAME_POOL_SIZE;
use crate::errors::CaptureError;
use frame_loop::{CaptureLoop, LoopAction};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

/// A capture device producing frames at its native rate
///
/// Implementations block in [`next_frame`](CaptureDevice::next_frame) to
/// pace emission; all methods are called from the source's capture thread
/// except [`open`](CaptureDevice::open), which runs on the attaching
/// caller so an open failure can be reported once, synchronously.
pub trait CaptureDevice: Send {
    /// Acquire the underlying device. Called on attach, before any frame
    /// is emitted. An error here means emission never starts.
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Block until the next frame is available at the device's native
    /// rate, then return it.
    fn next_frame(&mut self) -> Result<RawFrame, CaptureError>;

    /// Rotation hint applied to frames from this device
    fn rotation(&self) -> Rotation {
        Rotation::None
    }

    /// Device description for logs
    fn info(&self) -> DeviceInfo;

    /// Release the underlying device. Called when the capture loop ends.
    fn close(&mut self);
}

/// State owned by the capture thread while attached
struct Attachment {
    device: Box<dyn CaptureDevice>,
    consumer: Box<dyn FnMut(Frame) + Send>,
    pool: Arc<Semaphore>,
    rotation: Rotation,
    seq: u64,
}

/// Continuous frame producer bound to a capture device
///
/// While attached, frames flow to the bound consumer until [`detach`] is
/// called or the device fails. `detach()` joins the capture thread, so no
/// frame is delivered after it returns. Attaching while already attached
/// implicitly detaches the previous consumer first.
///
/// [`detach`]: FrameSource::detach
pub struct FrameSource {
    /// Device handle; present while detached, moved into the capture
    /// thread while attached
    device: Option<Box<dyn CaptureDevice>>,
    running: Option<CaptureLoop<Attachment>>,
    pool: Arc<Semaphore>,
    pool_size: usize,
}

impl FrameSource {
    /// Create a source around an owned device handle
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self::with_pool_size(device, DEFAULT_FRAME_POOL_SIZE)
    }

    /// Create a source with a custom frame pool capacity
    pub fn with_pool_size(device: Box<dyn CaptureDevice>, pool_size: usize) -> Self {
        Self {
            device: Some(device),
            running: None,
            pool: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    /// Open the device and start emitting frames to `consumer`
    ///
    /// Returns an error if the device cannot be opened; this is reported
    /// exactly once and emission never starts. A consumer already bound
    /// is unbound first.
    pub fn attach<F>(&mut self, consumer: F) -> Result<(), CaptureError>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        self.detach();

        let mut device = self.device.take().ok_or(CaptureError::DeviceLost)?;
        let info = device.info();

        if let Err(e) = device.open() {
            warn!(device = %info.name, error = %e, "Device open failed");
            self.device = Some(device);
            return Err(e);
        }

        info!(device = %info.name, path = %info.path, "Capture started");

        let rotation = device.rotation();
        let state = Attachment {
            device,
            consumer: Box::new(consumer),
            pool: Arc::clone(&self.pool),
            rotation,
            seq: 0,
        };

        self.running = Some(CaptureLoop::spawn("frame-source", state, capture_iteration));
        Ok(())
    }

    /// Stop emission and release the device
    ///
    /// Synchronous: the capture thread is joined, so no frame reaches the
    /// consumer after this returns. In-flight frames already handed out
    /// are unaffected; their permits return to the pool when they are
    /// dropped. No-op when detached.
    pub fn detach(&mut self) {
        if let Some(running) = self.running.take() {
            match running.stop() {
                Some(mut state) => {
                    state.device.close();
                    debug!(frames = state.seq, "Capture stopped");
                    self.device = Some(state.device);
                }
                None => {
                    // Thread panicked; the handle is gone and a later
                    // attach reports DeviceLost.
                    warn!("Capture thread lost the device handle");
                }
            }
        }
    }

    /// Whether a consumer is currently bound and the loop is running
    pub fn is_attached(&self) -> bool {
        self.running.as_ref().map(CaptureLoop::is_running).unwrap_or(false)
    }

    /// Number of frame permits currently available
    ///
    /// Equals the pool capacity exactly when every emitted frame has been
    /// released.
    pub fn available_permits(&self) -> usize {
        self.pool.available_permits()
    }

    /// Frame pool capacity
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.detach();
    }
}

/// One iteration of the capture thread: pull a frame, wrap it, emit it
fn capture_iteration(state: &mut Attachment) -> LoopAction {
    let raw = match state.device.next_frame() {
        Ok(raw) => raw,
        Err(e) => {
            // A device failure mid-stream ends this attachment; it is
            // not fatal to the host.
            warn!(error = %e, "Capture device failed, stopping emission");
            return LoopAction::Stop;
        }
    };

    let permit = match Arc::clone(&state.pool).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            // All frames are held downstream; drop this one rather than
            // queueing or blocking the device.
            trace!(seq = state.seq, "Frame pool exhausted, skipping frame");
            return LoopAction::Continue;
        }
    };

    let frame = Frame::from_raw(raw, state.seq, state.rotation, permit);
    state.seq += 1;
    (state.consumer)(frame);
    LoopAction::Continue
}

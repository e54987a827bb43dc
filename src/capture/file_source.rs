// SPDX-License-Identifier: GPL-3.0-only

//! File-backed capture device
//!
//! Streams a still image as if it were a live camera: the image is loaded
//! on open and re-emitted at a fixed interval. Stands in for real camera
//! hardware in the CLI and in integration tests.

use super::types::{DeviceInfo, PixelFormat, RawFrame, Rotation};
use super::CaptureDevice;
use crate::constants::DEFAULT_FRAME_INTERVAL;
use crate::errors::CaptureError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Capture device replaying a single image file at a fixed rate
pub struct StillImageDevice {
    path: PathBuf,
    interval: Duration,
    rotation: Rotation,
    /// Loaded on open, dropped on close
    frame: Option<RawFrame>,
}

impl StillImageDevice {
    /// Create a device for the given image file
    ///
    /// The file is not touched until [`CaptureDevice::open`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            interval: DEFAULT_FRAME_INTERVAL,
            rotation: Rotation::None,
            frame: None,
        }
    }

    /// Set the emission interval (native frame rate)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the rotation hint carried on emitted frames
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}

impl CaptureDevice for StillImageDevice {
    fn open(&mut self) -> Result<(), CaptureError> {
        let img = image::open(&self.path)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {}", self.path.display(), e)))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        debug!(path = %self.path.display(), width, height, "Loaded still image");

        self.frame = Some(RawFrame {
            width,
            height,
            stride: width * 4,
            format: PixelFormat::Rgba8,
            data: Arc::from(rgba.into_raw().into_boxed_slice()),
        });
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        let frame = self.frame.clone().ok_or(CaptureError::Disconnected)?;
        std::thread::sleep(self.interval);
        Ok(frame)
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "still-image".into(),
            path: self.path.display().to_string(),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

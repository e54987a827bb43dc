// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture devices and frames

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;

/// Pixel format for captured frames
///
/// The pipeline works on either direct RGBA or single-channel grayscale;
/// devices producing anything else convert before emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba8,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Sensors may be physically mounted at an angle relative to the device,
/// common on phones and tablets. Carried as a hint on every frame; the
/// decoder is rotation-invariant so the hint is informational for
/// downstream consumers (e.g. preview overlays).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise
    Rotate270,
}

impl Rotation {
    /// Create rotation from an integer degree value (normalised to 0-360)
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Description of a capture device, for logs and diagnostics
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Human-readable device name
    pub name: String,
    /// Device path or source location
    pub path: String,
}

/// Raw frame as produced by a [`CaptureDevice`](super::CaptureDevice)
///
/// This is the device-side representation; the frame source wraps it into
/// a [`Frame`] with a sequence number, timestamp and pool permit before
/// handing it to the consumer.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding beyond width * bpp)
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
}

/// A single captured frame
///
/// Owned transiently by the analyzer. Dropping the frame is its release:
/// the pool permit returns to the source, which may emit again. A frame
/// that is never dropped keeps its permit and eventually stalls emission,
/// so holders must not store frames beyond processing. Not `Clone`.
pub struct Frame {
    /// Monotonic sequence number within one attachment
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding beyond width * bpp)
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
    /// Rotation hint from the device
    pub rotation: Rotation,
    /// Timestamp when the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
    /// Capacity permit from the source's frame pool; released on drop
    permit: Option<OwnedSemaphorePermit>,
}

impl Frame {
    /// Wrap a device frame with pipeline metadata and a pool permit
    pub(crate) fn from_raw(
        raw: RawFrame,
        seq: u64,
        rotation: Rotation,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            seq,
            width: raw.width,
            height: raw.height,
            stride: raw.stride,
            format: raw.format,
            data: raw.data,
            rotation,
            captured_at: Instant::now(),
            permit: Some(permit),
        }
    }

    /// Create a frame not backed by any frame pool
    ///
    /// Used for one-shot decoding of loaded images and in tests, where no
    /// capture source is involved and release accounting does not apply.
    pub fn detached(
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
        data: Arc<[u8]>,
    ) -> Self {
        Self {
            seq: 0,
            width,
            height,
            stride,
            format,
            data,
            rotation: Rotation::None,
            captured_at: Instant::now(),
            permit: None,
        }
    }

    /// Whether this frame holds a pool permit
    pub fn is_pooled(&self) -> bool {
        self.permit.is_some()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("seq", &self.seq)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .field("pooled", &self.permit.is_some())
            .finish()
    }
}

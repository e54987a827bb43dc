// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// URI prefix a scanned code must carry to be treated as a join token.
///
/// The payload after the prefix is the join code itself; it must be
/// non-blank after trimming. Codes without this prefix are ignored.
pub const JOIN_URI_PREFIX: &str = "flowpods://join?code=";

/// Maximum dimension for QR detection (frames are downscaled to this)
///
/// Codes are typically large enough in the frame to survive downscaling,
/// and detection cost grows with pixel count.
pub const DEFAULT_DECODE_MAX_DIMENSION: u32 = 640;

/// Number of frames that may be alive (dispatched but not yet released)
/// at once. When the pool is exhausted the capture loop skips emission
/// until a frame is released, so a leaked frame stalls capture rather
/// than growing memory.
pub const DEFAULT_FRAME_POOL_SIZE: usize = 4;

/// Native frame interval for file-backed capture devices (~30 fps)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scan pipeline and onboarding flow

use std::fmt;

/// Result type alias using ScanError
pub type ScanResult<T> = Result<T, ScanError>;

/// Main error type for the crate
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Capture device errors
    Capture(CaptureError),
    /// Decoder errors
    Decode(DecodeError),
    /// Capture permission not granted
    PermissionDenied,
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Capture-device-specific errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Opening the device failed; emission never started
    OpenFailed(String),
    /// Device disconnected during capture
    Disconnected,
    /// Frame format not usable by the pipeline
    InvalidFormat(String),
    /// The device handle is gone (capture thread panicked)
    DeviceLost,
}

/// Per-frame decode errors
///
/// These never stop the pipeline; the frame is released, the slot is
/// freed and the next frame is processed.
#[derive(Debug, Clone)]
pub enum DecodeError {
    /// Frame could not be converted for detection
    BadFrame(String),
    /// Decoder backend failed on this frame
    Failed(String),
    /// The decode task was cancelled or panicked
    TaskFailed(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Capture(e) => write!(f, "Capture error: {}", e),
            ScanError::Decode(e) => write!(f, "Decode error: {}", e),
            ScanError::PermissionDenied => write!(f, "Camera permission not granted"),
            ScanError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ScanError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::OpenFailed(msg) => write!(f, "Failed to open device: {}", msg),
            CaptureError::Disconnected => write!(f, "Device disconnected"),
            CaptureError::InvalidFormat(msg) => write!(f, "Invalid frame format: {}", msg),
            CaptureError::DeviceLost => write!(f, "Device handle lost"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BadFrame(msg) => write!(f, "Bad frame: {}", msg),
            DecodeError::Failed(msg) => write!(f, "Decode failed: {}", msg),
            DecodeError::TaskFailed(msg) => write!(f, "Decode task failed: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for DecodeError {}

// Conversions from sub-errors to ScanError
impl From<CaptureError> for ScanError {
    fn from(err: CaptureError) -> Self {
        ScanError::Capture(err)
    }
}

impl From<DecodeError> for ScanError {
    fn from(err: DecodeError) -> Self {
        ScanError::Decode(err)
    }
}

impl From<String> for ScanError {
    fn from(msg: String) -> Self {
        ScanError::Other(msg)
    }
}

impl From<&str> for ScanError {
    fn from(msg: &str) -> Self {
        ScanError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Config(err.to_string())
    }
}

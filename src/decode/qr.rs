// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoder
//!
//! Decodes QR codes from captured frames using the rqrr crate. Frames are
//! converted to grayscale and downscaled before detection; the
//! CPU-intensive work runs on the blocking pool so the async runtime is
//! never stalled.

use super::{Decoder, RawCandidate};
use crate::capture::{Frame, PixelFormat};
use crate::constants::DEFAULT_DECODE_MAX_DIMENSION;
use crate::errors::DecodeError;
use futures::future::BoxFuture;
use image::GrayImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// QR code decoder backed by rqrr
pub struct QrDecoder {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    /// Create a decoder with the default processing resolution
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_DECODE_MAX_DIMENSION,
        }
    }

    /// Create a decoder with a custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Decoder for QrDecoder {
    fn decode<'a>(
        &'a self,
        frame: &'a Frame,
    ) -> BoxFuture<'a, Result<Vec<RawCandidate>, DecodeError>> {
        let max_dimension = self.max_dimension;
        let data = Arc::clone(&frame.data);
        let (width, height, stride, format) =
            (frame.width, frame.height, frame.stride, frame.format);

        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                decode_sync(&data, width, height, stride, format, max_dimension)
            })
            .await
            .map_err(|e| DecodeError::TaskFailed(e.to_string()))?
        })
    }
}

/// Synchronous QR detection (runs in a blocking task)
fn decode_sync(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
    max_dimension: u32,
) -> Result<Vec<RawCandidate>, DecodeError> {
    let start = Instant::now();

    let mut gray = to_gray(data, width, height, stride, format)?;

    // Downscale large frames; codes big enough to scan survive this and
    // detection cost drops with the square of the dimension.
    if width > max_dimension || height > max_dimension {
        let scale = (width as f32 / max_dimension as f32)
            .max(height as f32 / max_dimension as f32);
        let new_width = (width as f32 / scale) as u32;
        let new_height = (height as f32 / scale) as u32;
        gray = image::imageops::resize(
            &gray,
            new_width.max(1),
            new_height.max(1),
            image::imageops::FilterType::Triangle,
        );
    }

    let mut prepared = rqrr::PreparedImage::prepare(gray);
    let grids = prepared.detect_grids();

    let mut candidates = Vec::with_capacity(grids.len());
    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(content = %content, "Decoded QR code");
                candidates.push(RawCandidate::classify(content));
            }
            Err(e) => {
                // A located but unreadable grid; skip it, keep the rest
                debug!(error = %e, "Failed to decode located QR grid");
            }
        }
    }

    trace!(
        count = candidates.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Frame decode complete"
    );

    Ok(candidates)
}

/// Convert frame data to a tightly packed grayscale image
fn to_gray(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
) -> Result<GrayImage, DecodeError> {
    let packed = copy_without_stride(data, width, height, stride, format)?;

    match format {
        PixelFormat::Gray8 => GrayImage::from_raw(width, height, packed)
            .ok_or_else(|| DecodeError::BadFrame("gray data does not match dimensions".into())),
        PixelFormat::Rgba8 => {
            let rgba = image::RgbaImage::from_raw(width, height, packed).ok_or_else(|| {
                DecodeError::BadFrame("rgba data does not match dimensions".into())
            })?;
            Ok(image::DynamicImage::ImageRgba8(rgba).to_luma8())
        }
    }
}

/// Copy frame data row by row, dropping any stride padding
fn copy_without_stride(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
) -> Result<Vec<u8>, DecodeError> {
    let row_bytes = width as usize * format.bytes_per_pixel();
    let stride = stride as usize;

    if stride < row_bytes {
        return Err(DecodeError::BadFrame(format!(
            "stride {} smaller than row size {}",
            stride, row_bytes
        )));
    }

    let mut result = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let row_start = y * stride;
        let row_end = row_start + row_bytes;
        if row_end > data.len() {
            return Err(DecodeError::BadFrame("frame data truncated".into()));
        }
        result.extend_from_slice(&data[row_start..row_end]);
    }
    Ok(result)
}

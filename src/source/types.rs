// SPDX-License-Identifier: GPL-3.0-only
// Shared types for frame sources

//! Shared types for video frame sources

use crate::errors::FilterError;
use std::sync::Arc;
use std::time::Instant;

/// Pixel format for delivered frames
///
/// RGBA is the canonical format used throughout the pipeline; the other
/// formats are converted on demand by the preview filter and the staging
/// encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    /// Used for monochrome cameras and IR sensors
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::RGBA => 4,
            Self::RGB24 => 3,
            Self::Gray8 => 1,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RGBA => write!(f, "RGBA"),
            Self::RGB24 => write!(f, "RGB24"),
            Self::Gray8 => write!(f, "GRAY8"),
        }
    }
}

/// A single raw video frame
///
/// Pixel data is immutable and shared zero-copy via `Arc`; frames delivered
/// by a source and frames committed to the reel are the same allocation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding beyond `width * bpp`)
    pub stride: u32,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Immutable pixel data
    pub data: Arc<[u8]>,
    /// Timestamp when the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl Frame {
    /// Build an RGBA frame from tightly packed pixel data
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * 4,
            format: PixelFormat::RGBA,
            data: Arc::from(data),
            captured_at: Instant::now(),
        }
    }

    /// Minimum data length implied by the frame geometry
    pub fn expected_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// One row of pixel data, without any stride padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..start + row_bytes]
    }

    /// Convert to tightly packed RGBA bytes
    ///
    /// Strided input is repacked; RGB24 gains an opaque alpha channel and
    /// Gray8 is expanded to neutral RGB. Fails if the data is shorter than
    /// the frame geometry implies.
    pub fn to_rgba_bytes(&self) -> Result<Vec<u8>, FilterError> {
        if self.data.len() < self.expected_len() {
            return Err(FilterError::UnsupportedFormat(format!(
                "frame data too small: expected {}, got {}",
                self.expected_len(),
                self.data.len()
            )));
        }

        let width = self.width as usize;
        let height = self.height as usize;
        let mut out = Vec::with_capacity(width * height * 4);

        for y in 0..height {
            let row = self.row(y as u32);
            match self.format {
                PixelFormat::RGBA => out.extend_from_slice(row),
                PixelFormat::RGB24 => {
                    for px in row.chunks_exact(3) {
                        out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                    }
                }
                PixelFormat::Gray8 => {
                    for &v in row {
                        out.extend_from_slice(&[v, v, v, 255]);
                    }
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::RGBA.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::RGB24.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Gray8.bytes_per_pixel(), 1);
    }

    #[test]
    fn test_rgba_roundtrip_is_identity() {
        let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let frame = Frame::from_rgba(2, 1, data.clone());
        assert_eq!(frame.to_rgba_bytes().unwrap(), data);
    }

    #[test]
    fn test_gray8_expands_to_neutral_rgb() {
        let frame = Frame {
            width: 2,
            height: 1,
            stride: 2,
            format: PixelFormat::Gray8,
            data: Arc::from(vec![0u8, 200]),
            captured_at: Instant::now(),
        };
        let rgba = frame.to_rgba_bytes().unwrap();
        assert_eq!(rgba, vec![0, 0, 0, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_strided_rgb24_repacks() {
        // 1x2 RGB24 with 2 bytes of row padding
        let frame = Frame {
            width: 1,
            height: 2,
            stride: 5,
            format: PixelFormat::RGB24,
            data: Arc::from(vec![10u8, 20, 30, 0, 0, 40, 50, 60, 0, 0]),
            captured_at: Instant::now(),
        };
        let rgba = frame.to_rgba_bytes().unwrap();
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_short_data_is_rejected() {
        let frame = Frame {
            width: 4,
            height: 4,
            stride: 16,
            format: PixelFormat::RGBA,
            data: Arc::from(vec![0u8; 8]),
            captured_at: Instant::now(),
        };
        assert!(frame.to_rgba_bytes().is_err());
    }
}

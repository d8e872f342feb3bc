// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic frame source
//!
//! Produces a deterministic moving test pattern, standing in for a real
//! capture device in the CLI demo and the tests. Frame content is a pure
//! function of the sequence number, so tests can regenerate any frame.

use super::{Frame, FrameSource, PixelFormat};
use crate::errors::{CaptureError, CaptureResult};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default pacing between synthetic frames (~30 fps)
const DEFAULT_INTERVAL: Duration = Duration::from_millis(33);

/// Frame source generating a moving test pattern
pub struct SyntheticSource {
    width: u32,
    height: u32,
    interval: Duration,
    running: bool,
    sequence: u64,
    /// Stop after this many frames (None = unbounded)
    frame_limit: Option<u64>,
}

impl SyntheticSource {
    /// Create a source producing frames of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            interval: DEFAULT_INTERVAL,
            running: false,
            sequence: 0,
            frame_limit: None,
        }
    }

    /// Set the pacing between frames
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop delivery after `limit` frames
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Generate the pattern frame for a given sequence number
    ///
    /// Horizontal and vertical gradients with a bright vertical bar that
    /// advances each frame, so consecutive frames are visibly distinct.
    pub fn pattern_frame(width: u32, height: u32, sequence: u64) -> Frame {
        let w = width as usize;
        let h = height as usize;
        let bar = (sequence as usize * 4) % w.max(1);
        let mut data = vec![0u8; w * h * 4];

        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) * 4;
                let (r, g, b) = if x == bar {
                    (255, 255, 255)
                } else {
                    (
                        (x * 255 / w.max(1)) as u8,
                        (y * 255 / h.max(1)) as u8,
                        (sequence % 256) as u8,
                    )
                };
                data[idx] = r;
                data[idx + 1] = g;
                data[idx + 2] = b;
                data[idx + 3] = 255;
            }
        }

        Frame {
            width,
            height,
            stride: width * 4,
            format: PixelFormat::RGBA,
            data: Arc::from(data),
            captured_at: Instant::now(),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn start(&mut self) -> CaptureResult<()> {
        debug!(
            width = self.width,
            height = self.height,
            "Starting synthetic source"
        );
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn next_frame(&mut self) -> CaptureResult<Arc<Frame>> {
        if !self.running {
            return Err(CaptureError::Unavailable("source not started".into()));
        }
        if let Some(limit) = self.frame_limit
            && self.sequence >= limit
        {
            return Err(CaptureError::Stopped);
        }

        thread::sleep(self.interval);
        let frame = Self::pattern_frame(self.width, self.height, self.sequence);
        self.sequence += 1;
        Ok(Arc::new(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_deterministic() {
        let a = SyntheticSource::pattern_frame(32, 24, 7);
        let b = SyntheticSource::pattern_frame(32, 24, 7);
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_consecutive_frames_differ() {
        let a = SyntheticSource::pattern_frame(32, 24, 0);
        let b = SyntheticSource::pattern_frame(32, 24, 1);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_requires_start() {
        let mut source = SyntheticSource::new(8, 8);
        assert!(matches!(
            source.next_frame(),
            Err(CaptureError::Unavailable(_))
        ));
    }

    #[test]
    fn test_frame_limit_ends_delivery() {
        let mut source = SyntheticSource::new(8, 8)
            .with_interval(Duration::from_millis(0))
            .with_frame_limit(2);
        source.start().unwrap();
        assert!(source.next_frame().is_ok());
        assert!(source.next_frame().is_ok());
        assert!(matches!(source.next_frame(), Err(CaptureError::Stopped)));
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Ghost-overlay preview filters
//!
//! Every delivered frame passes through one of two filters before display:
//! with an empty reel the raw frame goes through unchanged, and once the
//! reel has frames the last committed frame is blended in as a
//! semi-transparent ghost so the next shot can be aligned against it.
//!
//! Compositing is a pure function of the raw frame and the ghost reference.
//! Filter construction failures never fail the display path: the pipeline
//! falls back to the unfiltered frame and logs a warning.

use crate::errors::FilterError;
use crate::source::{Frame, PixelFormat};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Pass-through filter used while the reel is empty
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePictureFilter;

impl SinglePictureFilter {
    /// Identity: the preview is the raw frame
    pub fn apply(&self, raw: &Arc<Frame>) -> Arc<Frame> {
        Arc::clone(raw)
    }
}

/// Ghost-overlay filter used once the reel has at least one frame
///
/// Holds the ghost pre-converted to packed RGBA, so the per-frame composite
/// is a single blend pass over the raw pixels.
pub struct MultiplePicturesFilter {
    ghost: Arc<Frame>,
    ghost_rgba: Vec<u8>,
    opacity: f32,
}

impl MultiplePicturesFilter {
    /// Build the filter for a ghost reference frame
    ///
    /// # Arguments
    /// * `ghost` - The reel's last committed frame
    /// * `opacity` - Ghost weight in the blend, clamped to 0.0..=1.0
    pub fn new(ghost: Arc<Frame>, opacity: f32) -> Result<Self, FilterError> {
        if ghost.width == 0 || ghost.height == 0 {
            return Err(FilterError::ConstructionFailed(
                "ghost frame has zero extent".into(),
            ));
        }
        let ghost_rgba = ghost
            .to_rgba_bytes()
            .map_err(|e| FilterError::ConstructionFailed(e.to_string()))?;

        Ok(Self {
            ghost,
            ghost_rgba,
            opacity: opacity.clamp(0.0, 1.0),
        })
    }

    /// The ghost reference this filter was built for
    pub fn ghost(&self) -> &Arc<Frame> {
        &self.ghost
    }

    /// Composite `raw` over the semi-transparent ghost
    ///
    /// Full-frame alpha blend, no geometric registration: each output pixel
    /// is `raw * (1 - opacity) + ghost * opacity` with an opaque alpha
    /// channel. Fails if the raw frame's extent does not match the ghost.
    pub fn apply(&self, raw: &Frame) -> Result<Frame, FilterError> {
        if raw.width != self.ghost.width || raw.height != self.ghost.height {
            return Err(FilterError::ConstructionFailed(format!(
                "frame extent {}x{} does not match ghost {}x{}",
                raw.width, raw.height, self.ghost.width, self.ghost.height
            )));
        }

        let raw_rgba = raw.to_rgba_bytes()?;
        let a = self.opacity;
        let mut out = vec![0u8; raw_rgba.len()];

        for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
            let idx = i * 4;
            for c in 0..3 {
                let live = raw_rgba[idx + c] as f32;
                let ghost = self.ghost_rgba[idx + c] as f32;
                chunk[c] = (live * (1.0 - a) + ghost * a).clamp(0.0, 255.0) as u8;
            }
            chunk[3] = 255;
        }

        Ok(Frame {
            width: raw.width,
            height: raw.height,
            stride: raw.width * 4,
            format: PixelFormat::RGBA,
            data: Arc::from(out),
            captured_at: Instant::now(),
        })
    }
}

/// The filter currently selected for preview compositing
pub enum PreviewFilter {
    /// Reel is empty: pass-through
    SinglePicture(SinglePictureFilter),
    /// Reel has frames: ghost overlay
    MultiplePictures(MultiplePicturesFilter),
}

/// Preview filter pipeline
///
/// Owns the current [`PreviewFilter`] and rebuilds it whenever the ghost
/// reference changes (after every commit or deletion), since the overlay
/// source image changes with each committed snapshot.
pub struct FilterPipeline {
    filter: PreviewFilter,
    opacity: f32,
}

impl FilterPipeline {
    /// Create a pipeline for an empty reel
    pub fn new(opacity: f32) -> Self {
        Self {
            filter: PreviewFilter::SinglePicture(SinglePictureFilter),
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    /// Select the filter for a ghost reference
    ///
    /// Construction failure falls back to the pass-through filter; the
    /// preview keeps working with whatever frames arrive.
    pub fn generate_filter(ghost: Option<Arc<Frame>>, opacity: f32) -> PreviewFilter {
        match ghost {
            None => PreviewFilter::SinglePicture(SinglePictureFilter),
            Some(ghost) => match MultiplePicturesFilter::new(ghost, opacity) {
                Ok(filter) => PreviewFilter::MultiplePictures(filter),
                Err(e) => {
                    warn!(error = %e, "Ghost filter construction failed, using pass-through");
                    PreviewFilter::SinglePicture(SinglePictureFilter)
                }
            },
        }
    }

    /// Rebuild the filter for a changed ghost reference
    pub fn rebuild(&mut self, ghost: Option<Arc<Frame>>) {
        self.filter = Self::generate_filter(ghost, self.opacity);
    }

    /// The ghost reference the current filter composites against
    pub fn ghost(&self) -> Option<&Arc<Frame>> {
        match &self.filter {
            PreviewFilter::SinglePicture(_) => None,
            PreviewFilter::MultiplePictures(f) => Some(f.ghost()),
        }
    }

    /// Composite one delivered frame for display
    ///
    /// Never fails: a composite error falls back to the raw frame.
    pub fn composite(&self, raw: &Arc<Frame>) -> Arc<Frame> {
        match &self.filter {
            PreviewFilter::SinglePicture(f) => f.apply(raw),
            PreviewFilter::MultiplePictures(f) => match f.apply(raw) {
                Ok(preview) => Arc::new(preview),
                Err(e) => {
                    warn!(error = %e, "Composite failed, showing unfiltered frame");
                    Arc::clone(raw)
                }
            },
        }
    }
}

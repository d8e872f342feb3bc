// SPDX-License-Identifier: GPL-3.0-only

//! Stop-motion capture pipeline
//!
//! This library implements the frame-capture-to-reel pipeline of a
//! stop-motion capture application: frames stream in from a live video
//! source, every frame is composited against a ghost of the last committed
//! frame for on-screen alignment, and a discrete snapshot action commits
//! the next raw frame into an ordered, crash-safely staged reel.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`source`]: frame source abstraction and delivery loop
//! - [`pipelines`]: preview compositing and the snapshot commit pipeline
//! - [`reel`]: the ordered, persisted collection of committed frames
//! - [`storage`]: staging directory and atomic package saves
//! - [`document`]: the open document wiring all of the above together
//! - [`config`]: user configuration handling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stopmotion::{CaptureDocument, Config};
//! use stopmotion::source::SyntheticSource;
//!
//! let document = CaptureDocument::open(Config::default()).unwrap();
//! let receipt = document.take_snapshot().unwrap();
//! let frame = Arc::new(SyntheticSource::pattern_frame(640, 480, 0));
//! let _preview = document.handle_frame(frame);
//! let index = receipt.wait().unwrap();
//! assert_eq!(index, 0);
//! ```

pub mod config;
pub mod constants;
pub mod document;
pub mod errors;
pub mod pipelines;
pub mod reel;
pub mod source;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use document::{CaptureDocument, ReelNavigatorDelegate, ReelObserver, ReelUpdate};
pub use errors::{AppError, AppResult};
pub use pipelines::snapshot::{SnapshotReceipt, SnapshotState};
pub use reel::Reel;
pub use source::{Frame, FrameSource, PixelFormat};

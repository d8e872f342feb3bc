// SPDX-License-Identifier: GPL-3.0-only

//! Frame source abstraction and delivery loop
//!
//! A [`FrameSource`] wraps a live video input and hands out frames one at a
//! time. Delivery is lossy: a source may drop frames under load, there is no
//! back-pressure signal, and the consumer must process or discard each
//! delivered frame promptly.
//!
//! ```text
//! ┌──────────────┐
//! │ DeliveryLoop │  ← thread lifecycle, stop signal, error pacing
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  FrameSource │  ← common interface
//! └──────┬───────┘
//!        │
//!        ▼
//!   ┌─────────┐
//!   │Synthetic│  ← in-tree implementation (tests, CLI demo)
//!   └─────────┘
//! ```

pub mod synthetic;
pub mod types;

pub use synthetic::SyntheticSource;
pub use types::*;

use crate::errors::{CaptureError, CaptureResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay before retrying a source that reported itself unavailable
const UNAVAILABLE_RETRY: Duration = Duration::from_millis(100);

/// A live video input delivering frames one at a time
///
/// Implementations block in `next_frame` until a frame is available. Frames
/// the consumer was too slow to pull are dropped by the source, never queued
/// without bound.
pub trait FrameSource: Send {
    /// Begin delivering frames
    fn start(&mut self) -> CaptureResult<()>;

    /// Stop delivery and release the device
    fn stop(&mut self);

    /// Whether the source is currently delivering
    fn is_running(&self) -> bool;

    /// Block until the next frame is available
    ///
    /// # Returns
    /// * `Ok(frame)` - The next delivered frame
    /// * `Err(CaptureError::Unavailable)` - Device temporarily cannot deliver
    /// * `Err(CaptureError::Stopped)` - Source is finished; no more frames
    fn next_frame(&mut self) -> CaptureResult<Arc<Frame>>;
}

/// Action returned by the delivery callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue pulling frames
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a frame delivery loop running in a separate thread
///
/// Pulls frames from a [`FrameSource`] on a dedicated thread and hands each
/// one to the callback. When the source reports itself unavailable the loop
/// pauses and retries rather than tearing down, so any pending document
/// state (an armed snapshot, for instance) survives the outage.
pub struct DeliveryLoop {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl DeliveryLoop {
    /// Start delivering frames from `source` to `on_frame`
    ///
    /// The callback runs on the delivery thread and must return promptly;
    /// blocking I/O here stalls preview for every subsequent frame.
    pub fn start<S, F>(name: &str, mut source: S, mut on_frame: F) -> Self
    where
        S: FrameSource + 'static,
        F: FnMut(Arc<Frame>) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting frame delivery loop");

        let thread_handle = thread::spawn(move || {
            if let Err(e) = source.start() {
                warn!(name = %name_clone, error = %e, "Frame source failed to start");
                return;
            }
            debug!(name = %name_clone, "Delivery thread started");

            loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                match source.next_frame() {
                    Ok(frame) => match on_frame(frame) {
                        LoopAction::Continue => {}
                        LoopAction::Stop => {
                            debug!(name = %name_clone, "Consumer requested stop");
                            break;
                        }
                    },
                    Err(CaptureError::Stopped) => {
                        debug!(name = %name_clone, "Source finished");
                        break;
                    }
                    Err(e) => {
                        // Preview pauses here; armed snapshot state is owned
                        // by the consumer and survives until frames resume.
                        warn!(name = %name_clone, error = %e, "Frame delivery paused");
                        thread::sleep(UNAVAILABLE_RETRY);
                    }
                }
            }

            source.stop();
            info!(name = %name_clone, "Delivery loop exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting delivery loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending a stop signal
    ///
    /// Useful when the callback or the source ends the loop itself.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for delivery thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Delivery thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Delivery thread finished");
            }
        }
    }
}

impl Drop for DeliveryLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "DeliveryLoop dropped, stopping");
            self.stop();
        }
    }
}

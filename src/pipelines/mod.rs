// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipelines
//!
//! - [`preview`]: per-frame ghost-overlay compositing for the live preview
//! - [`snapshot`]: arming and strictly ordered commits into the reel

pub mod preview;
pub mod snapshot;

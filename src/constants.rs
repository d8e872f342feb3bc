// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Application identifier (config directory, staging directory prefix)
pub const APP_ID: &str = "stopmotion";

/// Configuration file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Staged frame file name prefix
pub const STAGED_FRAME_PREFIX: &str = "frame-";

/// Zero-padding width of the staged frame sequence number
pub const STAGED_SEQUENCE_WIDTH: usize = 6;

/// Manifest file name inside a saved package
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Current saved-package manifest version
pub const MANIFEST_VERSION: u32 = 1;

/// Default ghost overlay weight in the preview composite
pub const DEFAULT_GHOST_OPACITY: f32 = 0.4;

/// Default JPEG quality for staged frames
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Default saved-package file extension used by the CLI
pub const PACKAGE_EXTENSION: &str = "reel";

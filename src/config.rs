// SPDX-License-Identifier: GPL-3.0-only

//! User configuration handling

use crate::constants::{APP_ID, CONFIG_FILE_NAME, DEFAULT_GHOST_OPACITY, DEFAULT_JPEG_QUALITY};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Image format for staged frame files
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum StagedImageFormat {
    /// Lossless; staged round-trips are bit-identical
    #[default]
    Png,
    /// Lossy, smaller staging footprint
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Ghost overlay weight in the preview composite (0.0 - 1.0)
    pub ghost_opacity: f32,
    /// Encoding for staged frame images
    pub staged_format: StagedImageFormat,
    /// JPEG quality (1 - 100, only used with the Jpeg format)
    pub jpeg_quality: u8,
    /// Root directory for staging areas (system temp dir when unset)
    pub staging_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ghost_opacity: DEFAULT_GHOST_OPACITY,
            staged_format: StagedImageFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            staging_root: None, // Default to the system temp directory
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults
    ///
    /// A missing file is normal (first run); a malformed one is reported
    /// and replaced by defaults rather than failing startup.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Config>(&data) {
                Ok(config) => {
                    debug!(path = %path.display(), "Configuration loaded");
                    config.sanitized()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration to the platform config directory
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path()
            .ok_or_else(|| AppError::Config("no config directory on this platform".into()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::Config(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        fs::write(&path, json).map_err(|e| AppError::Config(e.to_string()))?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Clamp out-of-range values from hand-edited files
    fn sanitized(mut self) -> Self {
        self.ghost_opacity = self.ghost_opacity.clamp(0.0, 1.0);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.staged_format, StagedImageFormat::Png);
        assert!(config.ghost_opacity > 0.0 && config.ghost_opacity < 1.0);
        assert!(config.staging_root.is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = Config {
            ghost_opacity: 0.25,
            staged_format: StagedImageFormat::Jpeg,
            jpeg_quality: 80,
            staging_root: Some(PathBuf::from("/tmp/reels")),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_sanitize_clamps_ranges() {
        let config = Config {
            ghost_opacity: 7.0,
            jpeg_quality: 0,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.ghost_opacity, 1.0);
        assert_eq!(config.jpeg_quality, 1);
    }
}

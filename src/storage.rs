// SPDX-License-Identifier: GPL-3.0-only

//! Document storage: crash-safe staging and atomic package saves
//!
//! Every open document owns a unique temporary staging directory holding
//! one image file per committed frame. The staging area is decoupled from
//! the document's saved location: an explicit save assembles a package
//! (manifest plus images in reel order) in a scratch directory and swaps it
//! into place, so a crash mid-save leaves either the old package or the new
//! one, never a mix. Closing without saving discards the staging area.

use crate::config::{Config, StagedImageFormat};
use crate::constants::{
    APP_ID, MANIFEST_FILE_NAME, MANIFEST_VERSION, STAGED_FRAME_PREFIX, STAGED_SEQUENCE_WIDTH,
};
use crate::errors::{AppError, AppResult, StorageError, StorageResult};
use crate::source::Frame;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// On-disk encoding for staged frame images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// PNG (lossless; staged round-trips are bit-identical)
    Png,
    /// JPEG (lossy compression, quality controlled)
    Jpeg,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Png => "png",
            EncodingFormat::Jpeg => "jpg",
        }
    }
}

impl From<StagedImageFormat> for EncodingFormat {
    fn from(format: StagedImageFormat) -> Self {
        match format {
            StagedImageFormat::Png => EncodingFormat::Png,
            StagedImageFormat::Jpeg => EncodingFormat::Jpeg,
        }
    }
}

/// Saved-package manifest
///
/// Records the reel order of the image files inside a saved package; the
/// file names themselves carry staging sequence numbers, which after
/// deletions no longer match reel indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub version: u32,
    /// RFC 3339 timestamp of the save
    pub saved_at: String,
    /// Image file names in reel order
    pub frames: Vec<String>,
}

impl PackageManifest {
    fn new(frames: Vec<String>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            saved_at: chrono::Local::now().to_rfc3339(),
            frames,
        }
    }

    /// Read the manifest from a saved package directory
    pub fn load(package: &Path) -> AppResult<Self> {
        let path = package.join(MANIFEST_FILE_NAME);
        let data = fs::read_to_string(&path)
            .map_err(|e| AppError::Other(format!("Reading {}: {}", path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| AppError::Other(format!("Parsing {}: {}", path.display(), e)))
    }
}

/// Storage for one open document
///
/// Owns the temporary staging directory exclusively; no two documents share
/// one. The original document location stays `None` until the first
/// successful save.
pub struct DocumentStorage {
    original_document_url: Mutex<Option<PathBuf>>,
    temporary_storage_url: PathBuf,
    format: EncodingFormat,
    jpeg_quality: u8,
}

impl DocumentStorage {
    /// Allocate storage for a newly opened document
    ///
    /// Picks a fresh unique staging path under the configured root (the
    /// system temp directory by default). Nothing touches the disk until
    /// [`DocumentStorage::create_temporary_url`] runs.
    pub fn open(config: &Config) -> Self {
        let root = config
            .staging_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let temporary_storage_url = root.join(format!("{}-{}", APP_ID, Uuid::new_v4()));

        debug!(path = %temporary_storage_url.display(), "Allocated staging directory");

        Self {
            original_document_url: Mutex::new(None),
            temporary_storage_url,
            format: config.staged_format.into(),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Idempotently return the staging directory, creating it on first use
    pub fn create_temporary_url(&self) -> StorageResult<PathBuf> {
        if !self.temporary_storage_url.exists() {
            fs::create_dir_all(&self.temporary_storage_url)?;
            debug!(path = %self.temporary_storage_url.display(), "Staging directory created");
        }
        Ok(self.temporary_storage_url.clone())
    }

    /// The staging directory path (may not exist yet)
    pub fn temporary_storage_url(&self) -> &Path {
        &self.temporary_storage_url
    }

    /// The document's last-saved location, if it was ever saved
    pub fn original_document_url(&self) -> Option<PathBuf> {
        self.original_document_url.lock().unwrap().clone()
    }

    /// Stable staged file name for a frame sequence number
    ///
    /// Sequence numbers are zero-padded and never reused, so names stay
    /// unique across deletions.
    pub fn staged_file_name(&self, sequence: u64) -> String {
        format!(
            "{}{:0width$}.{}",
            STAGED_FRAME_PREFIX,
            sequence,
            self.format.extension(),
            width = STAGED_SEQUENCE_WIDTH
        )
    }

    /// Encode a frame and write it into the staging directory
    pub fn write_frame(&self, file_name: &str, frame: &Frame) -> StorageResult<()> {
        let dir = self.create_temporary_url()?;
        let data = self.encode_frame(frame)?;
        let path = dir.join(file_name);
        fs::write(&path, &data)?;
        debug!(path = %path.display(), size = data.len(), "Staged frame written");
        Ok(())
    }

    /// Decode a staged frame file back to packed RGBA bytes
    pub fn read_staged_rgba(&self, file_name: &str) -> StorageResult<Vec<u8>> {
        let path = self.temporary_storage_url.join(file_name);
        let img = image::open(&path)
            .map_err(|e| StorageError::WriteFailed(format!("decoding {}: {}", file_name, e)))?;
        Ok(img.to_rgba8().into_raw())
    }

    /// Remove a staged frame file
    pub fn remove_frame(&self, file_name: &str) -> StorageResult<()> {
        let path = self.temporary_storage_url.join(file_name);
        fs::remove_file(&path)?;
        debug!(path = %path.display(), "Staged frame removed");
        Ok(())
    }

    /// Atomically save the reel into a package directory
    ///
    /// `frame_files` is the staged file list in reel order. On success the
    /// destination becomes the document's original location. On failure the
    /// previously saved package (if any) is left intact and the staging
    /// directory is retained for retry.
    pub async fn save_package(
        &self,
        frame_files: Vec<String>,
        destination: PathBuf,
    ) -> StorageResult<()> {
        let staging = self.create_temporary_url()?;
        let dest = destination.clone();

        tokio::task::spawn_blocking(move || Self::save_package_sync(&staging, &frame_files, &dest))
            .await
            .map_err(|e| StorageError::SaveFailed(format!("save task error: {}", e)))??;

        *self.original_document_url.lock().unwrap() = Some(destination);
        Ok(())
    }

    fn save_package_sync(
        staging: &Path,
        frame_files: &[String],
        destination: &Path,
    ) -> StorageResult<()> {
        let dest_name = destination
            .file_name()
            .ok_or_else(|| StorageError::SaveFailed("destination has no file name".into()))?
            .to_string_lossy()
            .into_owned();
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| StorageError::SaveFailed(e.to_string()))?;

        // Assemble the new package next to the destination
        let work = parent.join(format!(".{}.saving-{}", dest_name, Uuid::new_v4()));
        if let Err(e) = Self::assemble_package(staging, frame_files, &work) {
            let _ = fs::remove_dir_all(&work);
            return Err(e);
        }

        // Swap it into place: old state stays visible until the new one is
        // complete, and is restored if the swap itself fails.
        if destination.exists() {
            let backup = parent.join(format!(".{}.previous-{}", dest_name, Uuid::new_v4()));
            if let Err(e) = fs::rename(destination, &backup) {
                let _ = fs::remove_dir_all(&work);
                return Err(StorageError::SaveFailed(e.to_string()));
            }
            if let Err(e) = fs::rename(&work, destination) {
                if let Err(restore) = fs::rename(&backup, destination) {
                    warn!(error = %restore, "Failed to restore previous package after save error");
                }
                let _ = fs::remove_dir_all(&work);
                return Err(StorageError::SaveFailed(e.to_string()));
            }
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!(path = %backup.display(), error = %e, "Stale package backup left behind");
            }
        } else if let Err(e) = fs::rename(&work, destination) {
            let _ = fs::remove_dir_all(&work);
            return Err(StorageError::SaveFailed(e.to_string()));
        }

        info!(
            path = %destination.display(),
            frames = frame_files.len(),
            "Package saved"
        );
        Ok(())
    }

    fn assemble_package(staging: &Path, frame_files: &[String], work: &Path) -> StorageResult<()> {
        fs::create_dir_all(work).map_err(|e| StorageError::SaveFailed(e.to_string()))?;

        let manifest = PackageManifest::new(frame_files.to_vec());
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| StorageError::SaveFailed(format!("manifest: {}", e)))?;
        fs::write(work.join(MANIFEST_FILE_NAME), json)
            .map_err(|e| StorageError::SaveFailed(e.to_string()))?;

        for name in frame_files {
            fs::copy(staging.join(name), work.join(name))
                .map_err(|e| StorageError::SaveFailed(format!("copying {}: {}", name, e)))?;
        }
        Ok(())
    }

    /// Discard the staging directory and everything in it
    ///
    /// Runs automatically when the storage is dropped (document close); has
    /// no effect on any saved package.
    pub fn discard(&self) {
        if self.temporary_storage_url.exists() {
            match fs::remove_dir_all(&self.temporary_storage_url) {
                Ok(()) => {
                    debug!(path = %self.temporary_storage_url.display(), "Staging directory discarded")
                }
                Err(e) => {
                    warn!(
                        path = %self.temporary_storage_url.display(),
                        error = %e,
                        "Failed to discard staging directory"
                    )
                }
            }
        }
    }

    fn encode_frame(&self, frame: &Frame) -> StorageResult<Vec<u8>> {
        let rgba = frame
            .to_rgba_bytes()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        let img = RgbaImage::from_raw(frame.width, frame.height, rgba)
            .ok_or_else(|| StorageError::WriteFailed("frame geometry mismatch".into()))?;

        let mut buffer = Vec::new();
        match self.format {
            EncodingFormat::Png => {
                img.write_to(
                    &mut std::io::Cursor::new(&mut buffer),
                    image::ImageFormat::Png,
                )
                .map_err(|e| StorageError::WriteFailed(format!("PNG encoding failed: {}", e)))?;
            }
            EncodingFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb: image::RgbImage = image::DynamicImage::ImageRgba8(img).to_rgb8();
                let mut cursor = std::io::Cursor::new(&mut buffer);
                let mut encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, self.jpeg_quality);
                encoder
                    .encode(
                        rgb.as_raw(),
                        rgb.width(),
                        rgb.height(),
                        image::ExtendedColorType::Rgb8,
                    )
                    .map_err(|e| {
                        StorageError::WriteFailed(format!("JPEG encoding failed: {}", e))
                    })?;
            }
        }
        Ok(buffer)
    }
}

impl Drop for DocumentStorage {
    fn drop(&mut self) {
        self.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Png.extension(), "png");
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_staged_file_names_are_zero_padded() {
        let storage = DocumentStorage::open(&Config::default());
        assert_eq!(storage.staged_file_name(0), "frame-000000.png");
        assert_eq!(storage.staged_file_name(42), "frame-000042.png");
    }

    #[test]
    fn test_manifest_round_trip() {
        let manifest = PackageManifest::new(vec!["frame-000000.png".into()]);
        let json = serde_json::to_string(&manifest).unwrap();
        let back: PackageManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest, back);
    }

    #[test]
    fn test_staging_paths_are_unique() {
        let config = Config::default();
        let a = DocumentStorage::open(&config);
        let b = DocumentStorage::open(&config);
        assert_ne!(a.temporary_storage_url(), b.temporary_storage_url());
    }
}

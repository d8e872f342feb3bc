// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for frame source operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Result type alias for reel and document storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Frame source errors
    Capture(CaptureError),
    /// Preview filter errors
    Filter(FilterError),
    /// Reel persistence and package save errors
    Storage(StorageError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Frame-source-specific errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Source cannot deliver frames right now (device missing or busy)
    Unavailable(String),
    /// Device disconnected during delivery
    Disconnected,
    /// Source was stopped and will deliver no further frames
    Stopped,
}

/// Preview filter errors
///
/// These are always recovered locally by falling back to the unfiltered
/// frame; they never propagate past the preview path.
#[derive(Debug, Clone)]
pub enum FilterError {
    /// Filter could not be built for the given ghost frame
    ConstructionFailed(String),
    /// Frame format cannot be composited
    UnsupportedFormat(String),
}

/// Reel persistence and package save errors
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Writing or removing a staged frame file failed
    WriteFailed(String),
    /// Atomic commit of the staged reel to the document package failed;
    /// the previously saved package is left intact
    SaveFailed(String),
    /// Deletion target does not exist (logic error in the caller)
    IndexOutOfRange { index: usize, count: usize },
    /// The owning document was closed before the operation completed
    DocumentClosed,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Filter(e) => write!(f, "Filter error: {}", e),
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Unavailable(msg) => write!(f, "Source unavailable: {}", msg),
            CaptureError::Disconnected => write!(f, "Capture device disconnected"),
            CaptureError::Stopped => write!(f, "Frame source stopped"),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::ConstructionFailed(msg) => {
                write!(f, "Filter construction failed: {}", msg)
            }
            FilterError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::WriteFailed(msg) => write!(f, "Staged write failed: {}", msg),
            StorageError::SaveFailed(msg) => write!(f, "Package save failed: {}", msg),
            StorageError::IndexOutOfRange { index, count } => {
                write!(f, "Index {} out of range (reel holds {})", index, count)
            }
            StorageError::DocumentClosed => write!(f, "Document closed"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for FilterError {}
impl std::error::Error for StorageError {}

// Conversions from sub-errors to AppError
impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::Filter(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::WriteFailed(err.to_string()))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::WriteFailed(err.to_string())
    }
}

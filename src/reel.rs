// SPDX-License-Identifier: GPL-3.0-only

//! The reel: ordered collection of committed frames
//!
//! Indices are contiguous from 0 and the order is append-only except for
//! explicit deletion. The last frame (index `count - 1`) is the ghost
//! reference for the next preview composite. Every mutation persists
//! through [`DocumentStorage`] before it is allowed to stand: a failed
//! staged write rolls the in-memory change back, so the reel and the
//! staging directory never disagree.

use crate::errors::{StorageError, StorageResult};
use crate::source::Frame;
use crate::storage::DocumentStorage;
use std::sync::Arc;
use tracing::{debug, warn};

/// One committed frame and the staged file backing it
struct ReelEntry {
    frame: Arc<Frame>,
    file_name: String,
}

/// Ordered, persisted sequence of committed frames
///
/// Callers only ever receive `Arc` clones of frames; there is no mutable
/// access to the sequence that could bypass persistence.
pub struct Reel {
    entries: Vec<ReelEntry>,
    selected: Option<usize>,
    /// Monotonic staged-file sequence; never reused after deletions
    next_sequence: u64,
}

impl Reel {
    /// Create an empty reel for a new document
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
            next_sequence: 0,
        }
    }

    /// Number of committed frames
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The frame at `index`, if any
    pub fn get(&self, index: usize) -> Option<Arc<Frame>> {
        self.entries.get(index).map(|e| Arc::clone(&e.frame))
    }

    /// The last committed frame, i.e. the ghost reference for the next preview
    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.entries.last().map(|e| Arc::clone(&e.frame))
    }

    /// Staged file name backing the frame at `index`
    pub fn file_name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.file_name.as_str())
    }

    /// Staged file names in reel order (the save manifest order)
    pub fn file_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.file_name.clone()).collect()
    }

    /// Currently selected frame index
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Select a frame; ignored with a warning if the index is invalid
    pub fn select(&mut self, index: usize) {
        if index < self.entries.len() {
            self.selected = Some(index);
        } else {
            warn!(index, count = self.entries.len(), "Ignoring invalid selection");
        }
    }

    /// Append a frame and persist it into the staging directory
    ///
    /// The new frame becomes the selection. On a failed staged write the
    /// in-memory append is rolled back and the error propagates; the reel
    /// is unchanged.
    ///
    /// # Returns
    /// * `Ok(index)` - The committed frame's index (`count - 1`)
    /// * `Err(StorageError)` - Persistence failed, nothing was appended
    pub fn append(&mut self, frame: Arc<Frame>, storage: &DocumentStorage) -> StorageResult<usize> {
        let file_name = storage.staged_file_name(self.next_sequence);
        self.entries.push(ReelEntry {
            frame: Arc::clone(&frame),
            file_name: file_name.clone(),
        });

        if let Err(e) = storage.write_frame(&file_name, &frame) {
            self.entries.pop();
            return Err(e);
        }

        self.next_sequence += 1;
        let index = self.entries.len() - 1;
        self.selected = Some(index);
        debug!(index, file = %file_name, "Frame committed to reel");
        Ok(index)
    }

    /// Delete the frame at `index`, shifting later frames down by one
    ///
    /// The staged file is removed; other staged files keep their names. An
    /// invalid index is a caller logic error: fatal in debug builds, a
    /// warning and error return in release.
    pub fn delete(&mut self, index: usize, storage: &DocumentStorage) -> StorageResult<()> {
        let count = self.entries.len();
        if index >= count {
            debug_assert!(false, "delete index {index} out of range (count {count})");
            warn!(index, count, "Ignoring out-of-range deletion request");
            return Err(StorageError::IndexOutOfRange { index, count });
        }

        // Remove the staged file first; a failure leaves the reel untouched
        storage.remove_frame(&self.entries[index].file_name)?;
        let removed = self.entries.remove(index);

        self.selected = match self.selected {
            Some(s) if s > index => Some(s - 1),
            Some(s) if s == index => {
                if self.entries.is_empty() {
                    None
                } else {
                    Some(index.min(self.entries.len() - 1))
                }
            }
            other => other,
        };

        debug!(index, file = %removed.file_name, "Frame deleted from reel");
        Ok(())
    }
}

impl Default for Reel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::source::SyntheticSource;

    fn scratch_storage() -> DocumentStorage {
        DocumentStorage::open(&Config::default())
    }

    fn test_frame(sequence: u64) -> Arc<Frame> {
        Arc::new(SyntheticSource::pattern_frame(8, 8, sequence))
    }

    #[test]
    fn test_empty_reel() {
        let reel = Reel::new();
        assert_eq!(reel.count(), 0);
        assert!(reel.last_frame().is_none());
        assert!(reel.selected_index().is_none());
    }

    #[test]
    fn test_append_selects_new_frame() {
        let storage = scratch_storage();
        let mut reel = Reel::new();

        assert_eq!(reel.append(test_frame(0), &storage).unwrap(), 0);
        assert_eq!(reel.append(test_frame(1), &storage).unwrap(), 1);
        assert_eq!(reel.selected_index(), Some(1));
    }

    #[test]
    fn test_selection_adjusts_on_delete() {
        let storage = scratch_storage();
        let mut reel = Reel::new();
        for sequence in 0..3 {
            reel.append(test_frame(sequence), &storage).unwrap();
        }

        reel.select(2);
        reel.delete(0, &storage).unwrap();
        assert_eq!(reel.selected_index(), Some(1));

        // Deleting the selected last frame clamps to the new last
        reel.delete(1, &storage).unwrap();
        assert_eq!(reel.selected_index(), Some(0));

        reel.delete(0, &storage).unwrap();
        assert!(reel.selected_index().is_none());
    }

    #[test]
    fn test_invalid_select_is_ignored() {
        let storage = scratch_storage();
        let mut reel = Reel::new();
        reel.append(test_frame(0), &storage).unwrap();
        reel.select(5);
        assert_eq!(reel.selected_index(), Some(0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_delete_is_fatal_in_debug() {
        let storage = scratch_storage();
        let mut reel = Reel::new();
        let _ = reel.delete(0, &storage);
    }
}

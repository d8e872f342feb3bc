// SPDX-License-Identifier: GPL-3.0-only

//! Capture document: wires the delivery path to the reel
//!
//! A [`CaptureDocument`] owns one reel, one staging area, the preview
//! filter and the snapshot state machine. Frames arrive on the delivery
//! context via [`CaptureDocument::handle_frame`]; snapshot requests arrive
//! from UI actions or a navigator implementing nothing beyond the
//! [`ReelNavigatorDelegate`] call contract.
//!
//! Locking: the reel mutex serializes all mutations (appends on the
//! committer thread, deletions from any caller). The preview path never
//! takes it: compositing only needs the filter, which holds its own atomic
//! snapshot of the ghost reference, so staged-file I/O never stalls the
//! display of the next frame.

use crate::config::Config;
use crate::errors::{StorageError, StorageResult};
use crate::pipelines::preview::FilterPipeline;
use crate::pipelines::snapshot::{CommitQueue, SnapshotController, SnapshotReceipt};
use crate::reel::Reel;
use crate::source::Frame;
use crate::storage::DocumentStorage;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Reel state pushed to the navigator after every successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelUpdate {
    pub count: usize,
    pub selected: Option<usize>,
}

/// Callback notified of reel count/selection changes
pub type ReelObserver = Box<dyn Fn(ReelUpdate) + Send + Sync + 'static>;

/// Requests an external reel navigator may send to the core
///
/// Fire-and-forget: no return value, no synchronous completion guarantee.
/// This is the navigator's entire coupling to the core; reel state flows
/// back only through plain queries (`frame_count`, `selected_index`).
pub trait ReelNavigatorDelegate {
    /// The navigator asks to commit the next live frame
    fn navigator_requests_snapshot(&self);
    /// The navigator asks to delete the currently selected frame
    fn navigator_requests_deletion(&self);
}

/// One open stop-motion document
pub struct CaptureDocument {
    reel: Arc<Mutex<Reel>>,
    controller: Mutex<SnapshotController>,
    filter: Arc<Mutex<FilterPipeline>>,
    storage: Arc<DocumentStorage>,
    commits: CommitQueue,
    observer: Arc<Mutex<Option<ReelObserver>>>,
}

impl CaptureDocument {
    /// Open a new document with an empty reel
    ///
    /// Allocates and creates the staging directory; it stays valid until
    /// the document is dropped, at which point it is discarded.
    pub fn open(config: Config) -> StorageResult<Self> {
        let storage = Arc::new(DocumentStorage::open(&config));
        storage.create_temporary_url()?;

        let reel = Arc::new(Mutex::new(Reel::new()));
        let filter = Arc::new(Mutex::new(FilterPipeline::new(config.ghost_opacity)));
        let observer: Arc<Mutex<Option<ReelObserver>>> = Arc::new(Mutex::new(None));

        let commit_reel = Arc::clone(&reel);
        let commit_storage = Arc::clone(&storage);
        let commit_filter = Arc::clone(&filter);
        let commit_observer = Arc::clone(&observer);
        let commits = CommitQueue::start("reel-commits", move |frame| {
            let (index, update) = {
                let mut reel = commit_reel.lock().unwrap();
                let index = reel.append(frame, &commit_storage)?;
                commit_filter.lock().unwrap().rebuild(reel.last_frame());
                (
                    index,
                    ReelUpdate {
                        count: reel.count(),
                        selected: reel.selected_index(),
                    },
                )
            };
            if let Ok(guard) = commit_observer.lock()
                && let Some(observer) = guard.as_ref()
            {
                observer(update);
            }
            Ok(index)
        });

        info!(staging = %storage.temporary_storage_url().display(), "Document opened");

        Ok(Self {
            reel,
            controller: Mutex::new(SnapshotController::new()),
            filter,
            storage,
            commits,
            observer,
        })
    }

    /// Process one delivered frame: commit if armed, composite for preview
    ///
    /// Runs on the delivery context once per arriving frame and returns
    /// promptly: an armed commit is handed to the committer thread, and
    /// the returned preview is the ghost composite (or the raw frame with
    /// an empty reel). The committed frame is the raw one, never the
    /// composite.
    pub fn handle_frame(&self, frame: Arc<Frame>) -> Arc<Frame> {
        if let Some(ack) = self.controller.lock().unwrap().take_armed() {
            self.commits.submit(Arc::clone(&frame), ack);
        }
        self.filter.lock().unwrap().composite(&frame)
    }

    /// Arm a snapshot against the next delivered frame
    ///
    /// # Returns
    /// * `Some(receipt)` - Armed; the receipt resolves once the frame is
    ///   appended and persisted
    /// * `None` - Already armed; the request was dropped, not queued
    pub fn take_snapshot(&self) -> Option<SnapshotReceipt> {
        self.controller.lock().unwrap().request_snapshot()
    }

    /// Whether a snapshot is pending against the next frame
    pub fn is_armed(&self) -> bool {
        self.controller.lock().unwrap().is_armed()
    }

    /// Delete the frame at `index`
    pub fn delete_frame(&self, index: usize) -> StorageResult<()> {
        self.delete_with(|_| Some(index))
    }

    /// Delete the currently selected frame; a no-op when nothing is selected
    pub fn delete_selected(&self) -> StorageResult<()> {
        self.delete_with(Reel::selected_index)
    }

    fn delete_with(&self, pick: impl FnOnce(&Reel) -> Option<usize>) -> StorageResult<()> {
        let update = {
            let mut reel = self.reel.lock().unwrap();
            let Some(index) = pick(&*reel) else {
                warn!("Deletion requested with nothing selected");
                return Ok(());
            };
            reel.delete(index, &self.storage)?;
            self.filter.lock().unwrap().rebuild(reel.last_frame());
            ReelUpdate {
                count: reel.count(),
                selected: reel.selected_index(),
            }
        };
        self.notify(update);
        Ok(())
    }

    /// Number of committed frames
    pub fn frame_count(&self) -> usize {
        self.reel.lock().unwrap().count()
    }

    /// The committed frame at `index`
    pub fn frame_at(&self, index: usize) -> Option<Arc<Frame>> {
        self.reel.lock().unwrap().get(index)
    }

    /// The reel's last committed frame
    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.reel.lock().unwrap().last_frame()
    }

    /// Currently selected frame index
    pub fn selected_index(&self) -> Option<usize> {
        self.reel.lock().unwrap().selected_index()
    }

    /// Select a frame and notify the observer
    pub fn select(&self, index: usize) {
        let update = {
            let mut reel = self.reel.lock().unwrap();
            reel.select(index);
            ReelUpdate {
                count: reel.count(),
                selected: reel.selected_index(),
            }
        };
        self.notify(update);
    }

    /// The ghost frame the preview currently composites against
    pub fn preview_ghost(&self) -> Option<Arc<Frame>> {
        self.filter.lock().unwrap().ghost().cloned()
    }

    /// The staging directory backing this document
    pub fn staging_path(&self) -> PathBuf {
        self.storage.temporary_storage_url().to_path_buf()
    }

    /// Where the document was last saved, if ever
    pub fn saved_location(&self) -> Option<PathBuf> {
        self.storage.original_document_url()
    }

    /// Read a committed frame's staged bytes back as packed RGBA
    pub fn staged_rgba(&self, index: usize) -> StorageResult<Vec<u8>> {
        let file_name = {
            let reel = self.reel.lock().unwrap();
            let count = reel.count();
            reel.file_name(index)
                .map(str::to_owned)
                .ok_or(StorageError::IndexOutOfRange { index, count })?
        };
        self.storage.read_staged_rgba(&file_name)
    }

    /// Save the reel as a package at `destination`
    ///
    /// All-or-nothing: on failure any previously saved package is intact
    /// and the staging area is retained for retry. On success the
    /// destination becomes the document's saved location.
    pub async fn save_as(&self, destination: PathBuf) -> StorageResult<()> {
        let files = self.reel.lock().unwrap().file_names();
        self.storage.save_package(files, destination).await
    }

    /// Save to the document's existing location
    pub async fn save(&self) -> StorageResult<()> {
        let Some(destination) = self.storage.original_document_url() else {
            return Err(StorageError::SaveFailed(
                "document has never been saved; use save_as".into(),
            ));
        };
        self.save_as(destination).await
    }

    /// Register the callback notified after every reel mutation
    pub fn set_reel_observer(&self, observer: impl Fn(ReelUpdate) + Send + Sync + 'static) {
        *self.observer.lock().unwrap() = Some(Box::new(observer));
    }

    /// Close the document
    ///
    /// Pending armed state is discarded, the commit queue drains, and the
    /// staging directory is removed. Dropping the document does the same.
    pub fn close(self) {
        info!(staging = %self.storage.temporary_storage_url().display(), "Document closing");
    }

    fn notify(&self, update: ReelUpdate) {
        if let Ok(guard) = self.observer.lock()
            && let Some(observer) = guard.as_ref()
        {
            observer(update);
        }
    }
}

impl ReelNavigatorDelegate for CaptureDocument {
    fn navigator_requests_snapshot(&self) {
        // Fire-and-forget: the receipt is dropped, the commit still runs
        let _ = self.take_snapshot();
    }

    fn navigator_requests_deletion(&self) {
        if let Err(e) = self.delete_selected() {
            warn!(error = %e, "Navigator deletion failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;

    fn test_frame(sequence: u64) -> Arc<Frame> {
        Arc::new(SyntheticSource::pattern_frame(8, 8, sequence))
    }

    #[test]
    fn test_idle_frames_are_not_committed() {
        let document = CaptureDocument::open(Config::default()).unwrap();
        for sequence in 0..5 {
            document.handle_frame(test_frame(sequence));
        }
        assert_eq!(document.frame_count(), 0);
    }

    #[test]
    fn test_open_creates_staging_directory() {
        let document = CaptureDocument::open(Config::default()).unwrap();
        assert!(document.staging_path().is_dir());
    }

    #[test]
    fn test_close_discards_staging_directory() {
        let document = CaptureDocument::open(Config::default()).unwrap();
        let staging = document.staging_path();
        document.close();
        assert!(!staging.exists());
    }

    #[test]
    fn test_never_saved_document_has_no_location() {
        let document = CaptureDocument::open(Config::default()).unwrap();
        assert!(document.saved_location().is_none());
    }
}

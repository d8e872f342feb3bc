// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot pipeline: arming and ordered commits
//!
//! Taking a picture is a two-step handshake against the continuous frame
//! stream. A snapshot request *arms* the controller; the next delivered
//! frame is then captured raw (unfiltered) and handed to the commit queue,
//! which appends it to the reel and persists it before acknowledging. The
//! committed frame is therefore always strictly newer than the request,
//! never a stale buffered frame.
//!
//! ```text
//! request_snapshot()          frame delivered           committer thread
//!   Idle → Armed      →→→   take_armed(): → Idle  →→→  append + persist
//!        (receipt)                 (job)                  (receipt resolves)
//! ```
//!
//! Commits run on a single dedicated thread fed by a FIFO channel, so
//! commit N+1 never races commit N and preview delivery is never blocked
//! by staged-file I/O.

use crate::errors::{StorageError, StorageResult};
use crate::source::Frame;
use futures::channel::oneshot;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Acknowledgment channel for one armed snapshot
pub type CommitAck = oneshot::Sender<StorageResult<usize>>;

/// Snapshot controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Frames flow only to the preview filter
    Idle,
    /// The next delivered frame will be committed
    Armed,
}

/// The one-shot arming state machine
///
/// At most one snapshot is pending at a time: a second request while armed
/// is dropped, not queued. The only way out of `Armed` is consuming one
/// delivered frame via [`SnapshotController::take_armed`].
pub struct SnapshotController {
    pending: Option<CommitAck>,
}

impl SnapshotController {
    pub fn new() -> Self {
        Self { pending: None }
    }

    pub fn state(&self) -> SnapshotState {
        if self.pending.is_some() {
            SnapshotState::Armed
        } else {
            SnapshotState::Idle
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Arm the controller
    ///
    /// # Returns
    /// * `Some(receipt)` - Armed; the receipt resolves once the commit has
    ///   persisted (or failed, or the document closed)
    /// * `None` - Already armed; this request is dropped
    pub fn request_snapshot(&mut self) -> Option<SnapshotReceipt> {
        if self.pending.is_some() {
            debug!("Snapshot request dropped, already armed");
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.pending = Some(tx);
        Some(SnapshotReceipt { rx })
    }

    /// Consume the armed state for a delivered frame
    ///
    /// Transitions `Armed → Idle` and hands back the acknowledgment channel
    /// exactly once per armed request; returns `None` while idle.
    pub fn take_armed(&mut self) -> Option<CommitAck> {
        self.pending.take()
    }
}

impl Default for SnapshotController {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending result of one armed snapshot
///
/// Resolves only after the frame's append (including the staged-file
/// write) completed, so a caller that waited never sees a frame the
/// reel failed to persist.
pub struct SnapshotReceipt {
    rx: oneshot::Receiver<StorageResult<usize>>,
}

impl SnapshotReceipt {
    /// Block until the commit result is known
    pub fn wait(self) -> StorageResult<usize> {
        futures::executor::block_on(self.rx).unwrap_or(Err(StorageError::DocumentClosed))
    }

    /// Await the commit result
    pub async fn resolved(self) -> StorageResult<usize> {
        self.rx.await.unwrap_or(Err(StorageError::DocumentClosed))
    }
}

/// One frame waiting to be committed
struct CommitJob {
    frame: Arc<Frame>,
    ack: CommitAck,
}

/// Strictly ordered commit worker
///
/// A dedicated thread drains a FIFO channel and runs the supplied commit
/// closure for each captured frame. Closing the queue (or dropping it)
/// joins the thread; jobs submitted after that resolve their receipts with
/// [`StorageError::DocumentClosed`].
pub struct CommitQueue {
    tx: Option<mpsc::Sender<CommitJob>>,
    thread_handle: Option<JoinHandle<()>>,
    name: String,
}

impl CommitQueue {
    /// Start the committer thread
    ///
    /// `commit_fn` performs the append (in-memory + persistence) and returns
    /// the new reel index. It runs on the committer thread only, one job at
    /// a time, in submission order.
    pub fn start<F>(name: &str, mut commit_fn: F) -> Self
    where
        F: FnMut(Arc<Frame>) -> StorageResult<usize> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<CommitJob>();
        let name_clone = name.to_string();

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Commit thread started");
            for job in rx {
                let result = commit_fn(job.frame);
                if let Err(e) = &result {
                    warn!(name = %name_clone, error = %e, "Snapshot commit failed");
                }
                // The receipt may have been dropped (fire-and-forget path)
                let _ = job.ack.send(result);
            }
            debug!(name = %name_clone, "Commit queue drained");
        });

        Self {
            tx: Some(tx),
            thread_handle: Some(thread_handle),
            name: name.to_string(),
        }
    }

    /// Enqueue a captured frame for commit
    pub fn submit(&self, frame: Arc<Frame>, ack: CommitAck) {
        match &self.tx {
            Some(tx) => {
                // A failed send drops the ack, resolving the receipt with
                // DocumentClosed.
                if tx.send(CommitJob { frame, ack }).is_err() {
                    warn!(name = %self.name, "Commit queue gone, snapshot dropped");
                }
            }
            None => warn!(name = %self.name, "Commit queue closed, snapshot dropped"),
        }
    }

    /// Stop accepting jobs, drain the queue, and join the thread
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for commit thread to drain");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Commit thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CommitQueue {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CommitQueue dropped, draining");
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;
    use std::sync::Mutex;

    fn test_frame(sequence: u64) -> Arc<Frame> {
        Arc::new(SyntheticSource::pattern_frame(8, 8, sequence))
    }

    #[test]
    fn test_double_arm_is_dropped() {
        let mut controller = SnapshotController::new();
        assert!(controller.request_snapshot().is_some());
        assert!(controller.request_snapshot().is_none());
        assert_eq!(controller.state(), SnapshotState::Armed);
    }

    #[test]
    fn test_take_armed_is_one_shot() {
        let mut controller = SnapshotController::new();
        let _receipt = controller.request_snapshot().unwrap();
        assert!(controller.take_armed().is_some());
        assert!(controller.take_armed().is_none());
        assert_eq!(controller.state(), SnapshotState::Idle);
    }

    #[test]
    fn test_receipt_resolves_after_commit() {
        let mut controller = SnapshotController::new();
        let mut queue = CommitQueue::start("test-commits", |_frame| Ok(7));

        let receipt = controller.request_snapshot().unwrap();
        let ack = controller.take_armed().unwrap();
        queue.submit(test_frame(0), ack);

        assert_eq!(receipt.wait().unwrap(), 7);
        queue.close();
    }

    #[test]
    fn test_commits_run_in_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let mut next = 0usize;

        let mut queue = CommitQueue::start("test-order", move |frame| {
            // Blue channel of pixel (1, 0) encodes the pattern sequence
            seen_clone.lock().unwrap().push(frame.data[6]);
            let index = next;
            next += 1;
            Ok(index)
        });

        let mut receipts = Vec::new();
        for sequence in 0..5 {
            let mut controller = SnapshotController::new();
            let receipt = controller.request_snapshot().unwrap();
            queue.submit(test_frame(sequence), controller.take_armed().unwrap());
            receipts.push(receipt);
        }

        let indices: Vec<usize> = receipts.into_iter().map(|r| r.wait().unwrap()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        queue.close();
    }

    #[test]
    fn test_closed_queue_reports_document_closed() {
        let mut controller = SnapshotController::new();
        let receipt = controller.request_snapshot().unwrap();

        let mut queue = CommitQueue::start("test-closed", |_frame| Ok(0));
        queue.close();
        queue.submit(test_frame(0), controller.take_armed().unwrap());

        assert!(matches!(receipt.wait(), Err(StorageError::DocumentClosed)));
    }

    #[test]
    fn test_dropped_arm_reports_document_closed() {
        let mut controller = SnapshotController::new();
        let receipt = controller.request_snapshot().unwrap();
        // Document closes while armed: pending ack dropped without a frame
        drop(controller);
        assert!(matches!(receipt.wait(), Err(StorageError::DocumentClosed)));
    }
}

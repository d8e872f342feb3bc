// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the snapshot pipeline at the document level

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stopmotion::pipelines::preview::MultiplePicturesFilter;
use stopmotion::source::{Frame, SyntheticSource};
use stopmotion::{CaptureDocument, Config, ReelNavigatorDelegate, ReelUpdate};

fn test_frame(sequence: u64) -> Arc<Frame> {
    Arc::new(SyntheticSource::pattern_frame(16, 12, sequence))
}

fn open_document() -> CaptureDocument {
    CaptureDocument::open(Config::default()).unwrap()
}

/// Poll until the committer catches up (fire-and-forget paths only)
fn wait_for_count(document: &CaptureDocument, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while document.frame_count() != count {
        assert!(Instant::now() < deadline, "timed out waiting for reel count");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn empty_reel_snapshot_scenario() {
    let document = open_document();
    let frame_a = test_frame(0);

    let receipt = document.take_snapshot().unwrap();
    let _preview = document.handle_frame(Arc::clone(&frame_a));

    assert_eq!(receipt.wait().unwrap(), 0);
    assert_eq!(document.frame_count(), 1);
    assert!(!document.is_armed());

    // The receipt resolved, so the staged file is already on disk
    assert_eq!(
        document.staged_rgba(0).unwrap(),
        frame_a.to_rgba_bytes().unwrap()
    );

    // The committed frame is now the ghost reference for the next composite
    let ghost = document.preview_ghost().expect("ghost should be set");
    assert!(Arc::ptr_eq(&ghost, &frame_a));

    let frame_b = test_frame(1);
    let preview = document.handle_frame(Arc::clone(&frame_b));
    let expected = MultiplePicturesFilter::new(frame_a, Config::default().ghost_opacity)
        .unwrap()
        .apply(&frame_b)
        .unwrap();
    assert_eq!(preview.data, expected.data);

    // No snapshot was armed for frame B
    assert_eq!(document.frame_count(), 1);
}

#[test]
fn double_arm_commits_exactly_one_frame() {
    let document = open_document();

    let receipt = document.take_snapshot().expect("first request arms");
    assert!(document.take_snapshot().is_none(), "second request is dropped");

    document.handle_frame(test_frame(0));
    assert_eq!(receipt.wait().unwrap(), 0);

    // The next frame arrives with the controller idle again
    document.handle_frame(test_frame(1));
    assert_eq!(document.frame_count(), 1);
}

#[test]
fn committed_frame_is_raw_not_composite() {
    let document = open_document();

    let receipt = document.take_snapshot().unwrap();
    document.handle_frame(test_frame(0));
    receipt.wait().unwrap();

    // Second commit happens with a ghost overlay active in the preview;
    // the reel must still receive the unfiltered frame
    let frame_b = test_frame(1);
    let receipt = document.take_snapshot().unwrap();
    let preview = document.handle_frame(Arc::clone(&frame_b));
    receipt.wait().unwrap();

    assert_ne!(preview.data, frame_b.data);
    assert_eq!(document.frame_at(1).unwrap().data, frame_b.data);
}

#[test]
fn snapshots_append_in_arming_order() {
    let document = open_document();

    let mut receipts = Vec::new();
    for sequence in 0..4 {
        let receipt = document.take_snapshot().unwrap();
        document.handle_frame(test_frame(sequence));
        receipts.push(receipt);
    }

    let indices: Vec<usize> = receipts.into_iter().map(|r| r.wait().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn deletion_scenario_keeps_remaining_staged_file() {
    let document = open_document();

    // reel = [A, B]
    for sequence in 0..2 {
        let receipt = document.take_snapshot().unwrap();
        document.handle_frame(test_frame(sequence));
        receipt.wait().unwrap();
    }
    let frame_b = document.frame_at(1).unwrap();

    // Navigator deletes frame 0
    document.select(0);
    document.navigator_requests_deletion();

    assert_eq!(document.frame_count(), 1);
    assert_eq!(document.frame_at(0).unwrap().data, frame_b.data);

    let staging = document.staging_path();
    assert!(!staging.join("frame-000000.png").exists());
    assert!(staging.join("frame-000001.png").is_file());
}

#[test]
fn deleting_while_armed_preserves_armed_state() {
    let document = open_document();

    let receipt = document.take_snapshot().unwrap();
    document.handle_frame(test_frame(0));
    receipt.wait().unwrap();

    let _pending = document.take_snapshot().unwrap();
    document.delete_frame(0).unwrap();

    assert!(document.is_armed(), "deletion must not consume the armed state");
    assert_eq!(document.frame_count(), 0);

    document.handle_frame(test_frame(1));
    wait_for_count(&document, 1);
    assert!(!document.is_armed());
}

#[test]
fn navigator_snapshot_is_fire_and_forget() {
    let document = open_document();

    document.navigator_requests_snapshot();
    assert!(document.is_armed());

    document.handle_frame(test_frame(0));
    wait_for_count(&document, 1);
}

#[test]
fn deletion_with_empty_reel_is_a_noop() {
    let document = open_document();
    document.navigator_requests_deletion();
    assert_eq!(document.frame_count(), 0);
}

#[test]
fn observer_sees_count_and_selection() {
    let document = open_document();
    let updates: Arc<Mutex<Vec<ReelUpdate>>> = Arc::new(Mutex::new(Vec::new()));

    let observed = Arc::clone(&updates);
    document.set_reel_observer(move |update| {
        observed.lock().unwrap().push(update);
    });

    let receipt = document.take_snapshot().unwrap();
    document.handle_frame(test_frame(0));
    receipt.wait().unwrap();
    document.delete_frame(0).unwrap();

    let seen = updates.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            ReelUpdate {
                count: 1,
                selected: Some(0)
            },
            ReelUpdate {
                count: 0,
                selected: None
            },
        ]
    );
}

#[test]
fn ghost_reference_follows_deletion() {
    let document = open_document();

    for sequence in 0..2 {
        let receipt = document.take_snapshot().unwrap();
        document.handle_frame(test_frame(sequence));
        receipt.wait().unwrap();
    }

    // Deleting the last frame moves the ghost back to the previous one
    let frame_a = document.frame_at(0).unwrap();
    document.delete_frame(1).unwrap();
    let ghost = document.preview_ghost().unwrap();
    assert!(Arc::ptr_eq(&ghost, &frame_a));

    // Emptying the reel clears the ghost entirely
    document.delete_frame(0).unwrap();
    assert!(document.preview_ghost().is_none());
}

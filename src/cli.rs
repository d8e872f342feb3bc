// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the capture pipeline
//!
//! Headless demo surface: drives the pipeline against the synthetic frame
//! source and works with saved packages. The real application front-end
//! replaces the synthetic source with a capture device and the println
//! summary with its navigator UI.

use chrono::Local;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stopmotion::constants::PACKAGE_EXTENSION;
use stopmotion::source::{DeliveryLoop, LoopAction, SyntheticSource};
use stopmotion::storage::PackageManifest;
use stopmotion::{CaptureDocument, Config};

/// Pacing of the synthetic capture source (~30 fps)
const CAPTURE_INTERVAL: Duration = Duration::from_millis(33);

/// Capture `frames` snapshots from the synthetic source and save a package
pub fn capture(
    frames: u32,
    width: u32,
    height: u32,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let document = Arc::new(CaptureDocument::open(config)?);
    let source = SyntheticSource::new(width, height).with_interval(CAPTURE_INTERVAL);

    println!("Capturing {} frames at {}x{}...", frames, width, height);

    // Arm a snapshot for every delivered frame until we have enough receipts
    let receipts = Arc::new(Mutex::new(Vec::new()));
    let target = frames as usize;
    let delivery_document = Arc::clone(&document);
    let delivery_receipts = Arc::clone(&receipts);
    let mut delivery = DeliveryLoop::start("cli-capture", source, move |frame| {
        if let Some(receipt) = delivery_document.take_snapshot() {
            delivery_receipts.lock().unwrap().push(receipt);
        }
        let _preview = delivery_document.handle_frame(frame);
        if delivery_receipts.lock().unwrap().len() >= target {
            LoopAction::Stop
        } else {
            LoopAction::Continue
        }
    });
    delivery.join();

    // Each receipt resolves once its frame is persisted in the staging area
    let receipts = std::mem::take(&mut *receipts.lock().unwrap());
    for receipt in receipts {
        let index = receipt.wait()?;
        println!("  committed frame {}", index);
    }

    let destination = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "reel_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            PACKAGE_EXTENSION
        ))
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(document.save_as(destination.clone()))?;

    println!(
        "Saved {} frames to {}",
        document.frame_count(),
        destination.display()
    );
    Ok(())
}

/// Print the manifest of a saved package
pub fn inspect(package: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = PackageManifest::load(&package)?;

    println!("Package: {}", package.display());
    println!("Saved:   {}", manifest.saved_at);
    println!("Frames:  {}", manifest.frames.len());
    for (index, name) in manifest.frames.iter().enumerate() {
        println!("  [{}] {}", index, name);
    }
    Ok(())
}

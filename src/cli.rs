// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the scan pipeline
//!
//! This module provides command-line functionality for:
//! - Running the full acquisition pipeline against a file-backed device
//! - One-shot decoding of a single image

use chrono::Local;
use podscan::Config;
use podscan::capture::{Frame, PixelFormat, StillImageDevice};
use podscan::decode::{Decoder, QrDecoder};
use podscan::onboarding::{GroupService, OnboardingEvent, OnboardingFlow};
use podscan::permission::PermissionGate;
use podscan::scan::{JoinToken, ScanSession, extract_token};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Group collaborator that just announces the calls it receives
///
/// The real backend lives in the surrounding application; from the
/// pipeline's perspective both calls are fire-and-forget.
struct AnnouncingGroupService;

impl GroupService for AnnouncingGroupService {
    fn create_group(&self, name: &str) {
        println!("Creating group \"{}\"", name);
    }

    fn join_group(&self, token: &str) {
        println!("Joining group with code {}", token);
    }
}

/// Run the acquisition pipeline against an image file until a join code
/// is delivered, the timeout elapses, or the user aborts
pub fn scan(input: PathBuf, timeout: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();

    let rt = tokio::runtime::Runtime::new()?;
    let found = rt.block_on(run_scan(&config, &input, timeout))?;

    if found {
        config.last_input = Some(input);
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "Failed to save config");
        }
    }

    Ok(())
}

async fn run_scan(
    config: &Config,
    input: &Path,
    timeout: u64,
) -> Result<bool, Box<dyn std::error::Error>> {
    let device = StillImageDevice::new(input).with_interval(config.frame_interval());
    let decoder = Arc::new(QrDecoder::with_max_dimension(config.decode_max_dimension));

    let (token_tx, mut token_rx) = tokio::sync::mpsc::unbounded_channel();
    let session = ScanSession::new(
        tokio::runtime::Handle::current(),
        Box::new(device),
        decoder,
        PermissionGate::pre_granted(),
        move |token: JoinToken| {
            let _ = token_tx.send(token);
        },
    );

    let mut flow = OnboardingFlow::new(Box::new(session), Box::new(AnnouncingGroupService));

    let (abort_tx, mut abort_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = abort_tx.send(());
    })?;

    flow.handle(OnboardingEvent::ChooseJoin);
    println!("Scanning {} (press Ctrl+C to cancel)", input.display());

    tokio::select! {
        Some(token) = token_rx.recv() => {
            flow.handle(OnboardingEvent::TokenDetected(token.clone()));
            println!(
                "[{}] Join code accepted: {}",
                Local::now().format("%H:%M:%S"),
                token
            );
            flow.handle(OnboardingEvent::Acknowledge);
            Ok(true)
        }
        _ = abort_rx.recv() => {
            flow.handle(OnboardingEvent::Dismiss);
            println!("Cancelled.");
            Ok(false)
        }
        _ = tokio::time::sleep(Duration::from_secs(timeout)) => {
            flow.handle(OnboardingEvent::Dismiss);
            println!("No join code found after {} seconds.", timeout);
            Ok(false)
        }
    }
}

/// Decode a single image and print any join code it contains
pub fn decode_image(input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    let img = image::open(&input)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let frame = Frame::detached(
        width,
        height,
        width * 4,
        PixelFormat::Rgba8,
        Arc::from(rgba.into_raw().into_boxed_slice()),
    );

    let decoder = QrDecoder::with_max_dimension(config.decode_max_dimension);
    let rt = tokio::runtime::Runtime::new()?;
    let candidates = rt.block_on(decoder.decode(&frame))?;

    if candidates.is_empty() {
        println!("No codes found in {}", input.display());
        return Ok(());
    }

    for candidate in &candidates {
        println!("  {:?}: {}", candidate.kind, candidate.value);
    }

    match extract_token(&candidates) {
        Some(token) => println!("Join code: {}", token),
        None => println!("No join code among the decoded candidates."),
    }

    Ok(())
}

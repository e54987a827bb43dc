// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the acquisition pipeline
//!
//! Exercise the wired pipeline (source → analyzer → decoder → gate) with
//! a scripted capture device and a stub decoder, end to end through the
//! onboarding flow.

use futures::future::BoxFuture;
use podscan::analyze::FrameAnalyzer;
use podscan::capture::{
    CaptureDevice, DeviceInfo, Frame, FrameSource, PixelFormat, RawFrame,
};
use podscan::decode::{Decoder, RawCandidate};
use podscan::errors::{CaptureError, DecodeError, ScanError};
use podscan::onboarding::{GroupService, OnboardingEvent, OnboardingFlow, OnboardingState};
use podscan::permission::{PermissionGate, PermissionPrompt, PermissionResponder};
use podscan::scan::{GateState, ScanSession};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;

/// Capture device emitting tiny gray frames forever
struct ScriptedDevice {
    interval: Duration,
}

impl ScriptedDevice {
    fn new() -> Self {
        Self {
            interval: Duration::from_millis(2),
        }
    }
}

impl CaptureDevice for ScriptedDevice {
    fn open(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        std::thread::sleep(self.interval);
        Ok(RawFrame {
            width: 4,
            height: 4,
            stride: 4,
            format: PixelFormat::Gray8,
            data: Arc::from(vec![200u8; 16].as_slice()),
        })
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "scripted".into(),
            path: "test://scripted".into(),
        }
    }

    fn close(&mut self) {}
}

/// Decoder reporting the same join URI for every frame
struct StubDecoder {
    uri: String,
    delay: Duration,
    decodes: AtomicUsize,
}

impl StubDecoder {
    fn new(code: &str) -> Self {
        Self {
            uri: format!("flowpods://join?code={}", code),
            delay: Duration::from_millis(5),
            decodes: AtomicUsize::new(0),
        }
    }

    fn with_delay(code: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(code)
        }
    }
}

impl Decoder for StubDecoder {
    fn decode<'a>(
        &'a self,
        _frame: &'a Frame,
    ) -> BoxFuture<'a, Result<Vec<RawCandidate>, DecodeError>> {
        Box::pin(async move {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![RawCandidate::classify(self.uri.clone())])
        })
    }
}

#[derive(Clone, Default)]
struct RecordingGroups {
    joined: Arc<Mutex<Vec<String>>>,
}

impl GroupService for RecordingGroups {
    fn create_group(&self, _name: &str) {}

    fn join_group(&self, token: &str) {
        self.joined.lock().unwrap().push(token.to_string());
    }
}

fn counting_session(
    decoder: Arc<StubDecoder>,
    deliveries: Arc<AtomicUsize>,
) -> ScanSession {
    ScanSession::new(
        Handle::current(),
        Box::new(ScriptedDevice::new()),
        decoder,
        PermissionGate::pre_granted(),
        move |_| {
            deliveries.fetch_add(1, Ordering::SeqCst);
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_delivers_exactly_once() {
    let decoder = Arc::new(StubDecoder::new("SAME"));
    let deliveries = Arc::new(AtomicUsize::new(0));
    let mut session = counting_session(Arc::clone(&decoder), Arc::clone(&deliveries));

    session.try_start().unwrap();

    // Many frames carrying the same code flow through; the gate lets
    // exactly one delivery out.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(session.gate_state(), GateState::Fired);

    // Once fired, arriving frames are discarded before the decoder: the
    // invocation count settles even though capture keeps running.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = decoder.decodes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(decoder.decodes.load(Ordering::SeqCst), settled);
    assert!(session.is_scanning());

    session.stop();
    assert!(!session.is_scanning());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restarted_session_delivers_again() {
    let decoder = Arc::new(StubDecoder::new("AGAIN"));
    let deliveries = Arc::new(AtomicUsize::new(0));
    let mut session = counting_session(Arc::clone(&decoder), Arc::clone(&deliveries));

    session.try_start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop();
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);

    // Restarting re-arms the gate for one more delivery
    session.try_start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop();
    assert_eq!(deliveries.load(Ordering::SeqCst), 2);
}

/// Prompt that never answers
struct SilentPrompt;

impl PermissionPrompt for SilentPrompt {
    fn request(&self, _respond: PermissionResponder) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_requires_permission() {
    let decoder = Arc::new(StubDecoder::new("NOPE"));
    let deliveries = Arc::new(AtomicUsize::new(0));
    let deliveries_clone = Arc::clone(&deliveries);

    let mut session = ScanSession::new(
        Handle::current(),
        Box::new(ScriptedDevice::new()),
        decoder,
        PermissionGate::new(Arc::new(SilentPrompt)),
        move |_| {
            deliveries_clone.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert!(matches!(
        session.try_start(),
        Err(ScanError::PermissionDenied)
    ));
    assert!(!session.is_scanning());
    assert_eq!(deliveries.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_detach_mid_decode_releases_frames() {
    // Slow decoder guarantees a decode is in flight when we detach
    let decoder = Arc::new(StubDecoder::with_delay(
        "SLOW",
        Duration::from_millis(150),
    ));
    let analyzer = FrameAnalyzer::new(Handle::current(), decoder, Arc::new(|_| {}));

    let mut source = FrameSource::new(Box::new(ScriptedDevice::new()));
    let pool_size = source.pool_size();

    let analyzer_clone = analyzer.clone();
    source
        .attach(move |frame| analyzer_clone.offer(frame))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    source.detach();

    // The in-flight decode is allowed to complete; once it does, every
    // emitted frame has returned its permit.
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while source.available_permits() < pool_size && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(source.available_permits(), pool_size);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_flow_end_to_end() {
    let decoder = Arc::new(StubDecoder::new("XYZ"));
    let groups = RecordingGroups::default();

    let (token_tx, mut token_rx) = tokio::sync::mpsc::unbounded_channel();
    let session = ScanSession::new(
        Handle::current(),
        Box::new(ScriptedDevice::new()),
        decoder,
        PermissionGate::pre_granted(),
        move |token| {
            let _ = token_tx.send(token);
        },
    );

    let mut flow = OnboardingFlow::new(Box::new(session), Box::new(groups.clone()));

    flow.handle(OnboardingEvent::ChooseJoin);
    assert_eq!(flow.state(), OnboardingState::JoiningGroup);
    assert!(flow.is_scanning());

    let token = tokio::time::timeout(Duration::from_secs(2), token_rx.recv())
        .await
        .expect("token within deadline")
        .expect("channel open");
    assert_eq!(token.as_str(), "XYZ");

    flow.handle(OnboardingEvent::TokenDetected(token));
    assert_eq!(flow.state(), OnboardingState::JoinSuccess);
    assert!(!flow.is_scanning());
    assert_eq!(flow.pending_token(), "XYZ");
    assert_eq!(groups.joined.lock().unwrap().as_slice(), ["XYZ"]);

    flow.handle(OnboardingEvent::Acknowledge);
    assert_eq!(flow.state(), OnboardingState::Initial);
    assert_eq!(flow.pending_token(), "");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dismiss_while_scanning_stops_capture() {
    let decoder = Arc::new(StubDecoder::with_delay(
        "UNSEEN",
        Duration::from_secs(10),
    ));
    let session = ScanSession::new(
        Handle::current(),
        Box::new(ScriptedDevice::new()),
        decoder,
        PermissionGate::pre_granted(),
        |_| {},
    );

    let mut flow = OnboardingFlow::new(Box::new(session), Box::new(RecordingGroups::default()));

    flow.handle(OnboardingEvent::ChooseJoin);
    assert!(flow.is_scanning());

    flow.handle(OnboardingEvent::Dismiss);
    assert_eq!(flow.state(), OnboardingState::Initial);
    assert!(!flow.is_scanning());
}

// SPDX-License-Identifier: GPL-3.0-only

//! Backpressured frame analyzer
//!
//! Sits between the frame source and the decoder. Holds one pending frame
//! at most: a frame arriving while a decode is in flight replaces the
//! pending frame, and the frame it replaces is released on the spot. The
//! producer is never blocked, nothing is queued, and at most one decode
//! runs at any time. Decode latency therefore costs coverage (skipped
//! frames), never memory or lag.
//!
//! This is a deliberate drop-latest policy, not a bounded queue, and the
//! difference is contractual: a queue would accumulate stale frames and
//! trade latency for completeness, which is the wrong trade for live
//! scanning.

use crate::capture::Frame;
use crate::decode::{Decoder, RawCandidate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{trace, warn};

/// Receiver for each successfully decoded frame's candidates
pub type CandidateSink = Arc<dyn Fn(Vec<RawCandidate>) + Send + Sync>;

/// Single-slot state shared between frame arrival and decode completion
#[derive(Default)]
struct Slot {
    /// A decode is currently in flight
    busy: bool,
    /// Latest frame that arrived while busy; replaced, never queued
    pending: Option<Frame>,
}

struct Inner {
    slot: Mutex<Slot>,
    decoder: Arc<dyn Decoder>,
    sink: CandidateSink,
    runtime: Handle,
    /// Frames discarded by drop-latest replacement (diagnostics)
    dropped: AtomicU64,
}

/// Backpressured dispatcher feeding frames to a decoder one at a time
#[derive(Clone)]
pub struct FrameAnalyzer {
    inner: Arc<Inner>,
}

impl FrameAnalyzer {
    /// Create an analyzer dispatching decodes onto `runtime`
    ///
    /// `sink` is invoked once per successfully decoded frame with that
    /// frame's candidates (possibly empty).
    pub fn new(runtime: Handle, decoder: Arc<dyn Decoder>, sink: CandidateSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::default()),
                decoder,
                sink,
                runtime,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Offer a frame for analysis; never blocks
    ///
    /// Dispatches immediately when idle. While a decode is in flight the
    /// frame becomes the pending frame, releasing whichever frame it
    /// replaces.
    pub fn offer(&self, frame: Frame) {
        let replaced = {
            let mut slot = self.inner.slot.lock().unwrap();
            if slot.busy {
                slot.pending.replace(frame)
            } else {
                slot.busy = true;
                drop(slot);
                self.dispatch(frame);
                return;
            }
        };

        if let Some(old) = replaced {
            // Released here, outside the lock
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(seq = old.seq, "Replaced pending frame");
        }
    }

    /// Run the in-flight decode and drain the pending slot afterwards
    fn dispatch(&self, frame: Frame) {
        let inner = Arc::clone(&self.inner);
        inner.runtime.clone().spawn(async move {
            let mut frame = frame;
            loop {
                match inner.decoder.decode(&frame).await {
                    Ok(candidates) => (inner.sink)(candidates),
                    Err(e) => {
                        // Local to this frame; the pipeline continues
                        warn!(seq = frame.seq, error = %e, "Frame decode failed");
                    }
                }
                // Release the decoded frame before taking the next one
                drop(frame);

                let next = {
                    let mut slot = inner.slot.lock().unwrap();
                    match slot.pending.take() {
                        Some(next) => next,
                        None => {
                            slot.busy = false;
                            break;
                        }
                    }
                };
                frame = next;
            }
        });
    }

    /// Frames discarded so far by drop-latest replacement
    pub fn dropped_frames(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Whether no decode is in flight and nothing is pending
    pub fn is_idle(&self) -> bool {
        let slot = self.inner.slot.lock().unwrap();
        !slot.busy && slot.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;
    use crate::errors::DecodeError;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicU32, AtomicUsize};
    use std::time::Duration;

    fn test_frame(seq: u64) -> Frame {
        let data: Arc<[u8]> = Arc::from(vec![0u8; 16].as_slice());
        let mut frame = Frame::detached(4, 4, 4, PixelFormat::Gray8, data);
        frame.seq = seq;
        frame
    }

    /// Decoder that tracks concurrent invocations and sleeps
    struct ProbingDecoder {
        current: AtomicU32,
        peak: AtomicU32,
        delay: Duration,
    }

    impl ProbingDecoder {
        fn new(delay: Duration) -> Self {
            Self {
                current: AtomicU32::new(0),
                peak: AtomicU32::new(0),
                delay,
            }
        }
    }

    impl Decoder for ProbingDecoder {
        fn decode<'a>(
            &'a self,
            _frame: &'a Frame,
        ) -> BoxFuture<'a, Result<Vec<RawCandidate>, DecodeError>> {
            Box::pin(async move {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
        }
    }

    async fn wait_until(analyzer: &FrameAnalyzer) {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !analyzer.is_idle() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(analyzer.is_idle(), "analyzer did not drain in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_at_most_one_decode_in_flight() {
        let decoder = Arc::new(ProbingDecoder::new(Duration::from_millis(10)));
        let decoded = Arc::new(AtomicUsize::new(0));
        let decoded_clone = Arc::clone(&decoded);

        let analyzer = FrameAnalyzer::new(
            Handle::current(),
            decoder.clone(),
            Arc::new(move |_| {
                decoded_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // Hammer the analyzer from several producer threads
        let mut producers = Vec::new();
        for p in 0..4 {
            let analyzer = analyzer.clone();
            producers.push(std::thread::spawn(move || {
                for i in 0..25u64 {
                    analyzer.offer(test_frame(p * 100 + i));
                    std::thread::sleep(Duration::from_millis(1));
                }
            }));
        }
        for producer in producers {
            producer.join().unwrap();
        }

        wait_until(&analyzer).await;
        assert_eq!(decoder.peak.load(Ordering::SeqCst), 1);
        assert!(decoded.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pending_frame_decoded_after_completion() {
        let decoder = Arc::new(ProbingDecoder::new(Duration::from_millis(20)));
        let decoded = Arc::new(AtomicUsize::new(0));
        let decoded_clone = Arc::clone(&decoded);

        let analyzer = FrameAnalyzer::new(
            Handle::current(),
            decoder,
            Arc::new(move |_| {
                decoded_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        analyzer.offer(test_frame(0));
        // Arrives mid-decode: becomes pending, decoded afterwards
        analyzer.offer(test_frame(1));

        wait_until(&analyzer).await;
        assert_eq!(decoded.load(Ordering::SeqCst), 2);
        assert_eq!(analyzer.dropped_frames(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_newest_arrival_replaces_pending() {
        let decoder = Arc::new(ProbingDecoder::new(Duration::from_millis(30)));
        let analyzer = FrameAnalyzer::new(Handle::current(), decoder, Arc::new(|_| {}));

        analyzer.offer(test_frame(0));
        analyzer.offer(test_frame(1));
        analyzer.offer(test_frame(2));
        analyzer.offer(test_frame(3));

        wait_until(&analyzer).await;
        // Frames 1 and 2 were each replaced by a newer arrival
        assert_eq!(analyzer.dropped_frames(), 2);
    }

    /// Decoder failing every frame
    struct FailingDecoder;

    impl Decoder for FailingDecoder {
        fn decode<'a>(
            &'a self,
            _frame: &'a Frame,
        ) -> BoxFuture<'a, Result<Vec<RawCandidate>, DecodeError>> {
            Box::pin(async { Err(DecodeError::Failed("broken lens".into())) })
        }
    }

    #[tokio::test]
    async fn test_decode_failure_frees_the_slot() {
        let sunk = Arc::new(AtomicUsize::new(0));
        let sunk_clone = Arc::clone(&sunk);
        let analyzer = FrameAnalyzer::new(
            Handle::current(),
            Arc::new(FailingDecoder),
            Arc::new(move |_| {
                sunk_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        analyzer.offer(test_frame(0));
        wait_until(&analyzer).await;

        // The failure freed the slot; the next frame dispatches normally
        analyzer.offer(test_frame(1));
        wait_until(&analyzer).await;
        assert_eq!(sunk.load(Ordering::SeqCst), 0);
    }
}

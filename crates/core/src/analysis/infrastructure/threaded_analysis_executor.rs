use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::analysis::analysis_executor::{AnalysisExecutor, ConcurrencyPolicy, SubmitOutcome};
use crate::analysis::analysis_logger::{with_logger, SharedLogger};
use crate::analysis::detection_orchestrator::DetectionOrchestrator;
use crate::analysis::report::{AnalysisOutcome, ReportSink};
use crate::error::AnalysisError;
use crate::shared::frame::Frame;

/// State shared by the submitting thread and every worker.
struct Shared {
    orchestrator: Arc<DetectionOrchestrator>,
    sink: Arc<dyn ReportSink>,
    logger: SharedLogger,
    in_flight: AtomicUsize,
    cancelled: Arc<AtomicBool>,
}

/// Executes frame analyses on background threads.
///
/// `DropIfBusy` layout: `submit → bounded channel → N workers → sink`, where
/// the in-flight counter covers both queued and running frames so a full
/// pool rejects new work instead of queueing it.
///
/// `Unbounded` spawns one detached thread per frame; handles are kept so
/// `shutdown` can wait for them.
pub struct ThreadedAnalysisExecutor {
    policy: ConcurrencyPolicy,
    shared: Arc<Shared>,
    sender: Option<Sender<Frame>>,
    workers: Vec<JoinHandle<()>>,
    detached: Mutex<Vec<JoinHandle<()>>>,
    closed: bool,
}

impl ThreadedAnalysisExecutor {
    pub fn new(
        policy: ConcurrencyPolicy,
        orchestrator: Arc<DetectionOrchestrator>,
        sink: Arc<dyn ReportSink>,
        logger: SharedLogger,
    ) -> Self {
        let shared = Arc::new(Shared {
            orchestrator,
            sink,
            logger,
            in_flight: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicBool::new(false)),
        });

        let (sender, workers) = match policy {
            ConcurrencyPolicy::DropIfBusy { max_in_flight } => {
                let (tx, rx) = crossbeam_channel::bounded::<Frame>(max_in_flight.max(1));
                let workers = (0..max_in_flight.max(1))
                    .map(|_| spawn_worker(shared.clone(), rx.clone()))
                    .collect();
                (Some(tx), workers)
            }
            ConcurrencyPolicy::Unbounded => (None, Vec::new()),
        };

        Self {
            policy,
            shared,
            sender,
            workers,
            detached: Mutex::new(Vec::new()),
            closed: false,
        }
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// The flag checked before each queued frame starts.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.shared.cancelled.clone()
    }

    fn submit_pooled(&self, frame: Frame, max_in_flight: usize) -> SubmitOutcome {
        let Some(sender) = &self.sender else {
            return SubmitOutcome::Cancelled;
        };
        let reserved = self
            .shared
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max_in_flight).then_some(n + 1)
            });
        if reserved.is_err() {
            return SubmitOutcome::DroppedBusy;
        }
        match sender.try_send(frame) {
            Ok(()) => SubmitOutcome::Queued,
            Err(e) => {
                self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                if e.is_full() {
                    SubmitOutcome::DroppedBusy
                } else {
                    SubmitOutcome::Cancelled
                }
            }
        }
    }

    fn submit_detached(&self, frame: Frame) -> SubmitOutcome {
        let Ok(mut handles) = self.detached.lock() else {
            return SubmitOutcome::Cancelled;
        };
        handles.retain(|h| !h.is_finished());

        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        let shared = self.shared.clone();
        handles.push(std::thread::spawn(move || process(&shared, frame)));
        SubmitOutcome::Queued
    }
}

impl AnalysisExecutor for ThreadedAnalysisExecutor {
    fn submit(&self, frame: Frame) -> SubmitOutcome {
        if self.closed || self.is_cancelled() {
            return SubmitOutcome::Cancelled;
        }
        match self.policy {
            ConcurrencyPolicy::DropIfBusy { max_in_flight } => {
                self.submit_pooled(frame, max_in_flight)
            }
            ConcurrencyPolicy::Unbounded => self.submit_detached(frame),
        }
    }

    fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Relaxed)
    }

    fn shutdown(&mut self) {
        self.closed = true;
        drop(self.sender.take());

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("Analysis worker panicked");
            }
        }

        let detached = match self.detached.get_mut() {
            Ok(handles) => std::mem::take(handles),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        };
        for handle in detached {
            if handle.join().is_err() {
                log::warn!("Analysis task panicked");
            }
        }
    }
}

impl Drop for ThreadedAnalysisExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(shared: Arc<Shared>, frame_rx: Receiver<Frame>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame in frame_rx {
            process(&shared, frame);
        }
    })
}

/// Releases one in-flight slot when dropped, including during unwinding.
struct InFlightSlot<'a>(&'a AtomicUsize);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Analyzes one frame, frees its in-flight slot, then delivers the outcome.
///
/// A panic anywhere in the task is contained here so the worker survives.
fn process(shared: &Shared, frame: Frame) {
    let slot = InFlightSlot(&shared.in_flight);
    let outcome = analyze(shared, frame);
    drop(slot);

    if let Some(outcome) = outcome {
        if catch_unwind(AssertUnwindSafe(|| shared.sink.deliver(outcome))).is_err() {
            log::warn!("Report sink panicked while delivering an outcome");
        }
    }
}

fn analyze(shared: &Shared, frame: Frame) -> Option<AnalysisOutcome> {
    if shared.cancelled.load(Ordering::Relaxed) {
        with_logger(&shared.logger, |l| l.count("analysis_skipped"));
        return None;
    }

    let started = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| shared.orchestrator.analyze(&frame)))
        .unwrap_or(Err(AnalysisError::AnalysisPanicked));
    let outcome = match result {
        Ok(report) => {
            with_logger(&shared.logger, |l| {
                l.count("analysis_completed");
                l.metric("unreadable_candidates", report.unreadable_qr.len() as f64);
                l.metric("rectangle_candidates", report.rectangles.len() as f64);
            });
            AnalysisOutcome::Completed(report)
        }
        Err(e) => {
            log::warn!("Failed to detect potential QR codes: {e}");
            with_logger(&shared.logger, |l| l.count("analysis_failed"));
            AnalysisOutcome::failed(frame.timestamp(), &e)
        }
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    with_logger(&shared.logger, |l| l.timing("analyze", elapsed_ms));
    Some(outcome)
}

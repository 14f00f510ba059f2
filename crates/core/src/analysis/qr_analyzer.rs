use std::sync::Arc;
use std::time::Duration;

use crate::analysis::analysis_executor::{AnalysisExecutor, SubmitOutcome};
use crate::analysis::analysis_logger::{with_logger, SharedLogger};
use crate::analysis::detection_orchestrator::{DetectionOrchestrator, QualityCheck};
use crate::analysis::infrastructure::threaded_analysis_executor::ThreadedAnalysisExecutor;
use crate::analysis::report::ReportSink;
use crate::capture::domain::sample_buffer::SampleBuffer;
use crate::capture::frame_gatekeeper::{Admission, FrameGatekeeper, GatekeeperStats};
use crate::detection::domain::barcode_detector::BarcodeDetector;
use crate::detection::domain::contour_detector::ContourDetector;
use crate::detection::domain::rectangle_detector::RectangleDetector;
use crate::detection::infrastructure::contour_rectangle_detector::ContourRectangleDetector;
use crate::detection::infrastructure::imageproc_contour_detector::ImageprocContourDetector;
use crate::detection::infrastructure::rqrr_barcode_detector::RqrrBarcodeDetector;
use crate::error::AnalysisError;
use crate::shared::settings::AnalyzerSettings;

/// What happened to one sample handed to [`QrAnalyzer::on_sample`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDisposition {
    Submitted,
    /// Arrived inside the cooldown window.
    Throttled,
    /// No usable pixels.
    Unconvertible,
    /// Accepted by the gatekeeper but the executor was at capacity.
    Busy,
    Cancelled,
}

/// Vision backends used by the detector passes and the quality check.
#[derive(Clone)]
pub struct DetectorBackends {
    pub barcode: Arc<dyn BarcodeDetector>,
    pub rectangle: Arc<dyn RectangleDetector>,
    pub contour: Arc<dyn ContourDetector>,
}

impl Default for DetectorBackends {
    fn default() -> Self {
        Self {
            barcode: Arc::new(RqrrBarcodeDetector::new()),
            rectangle: Arc::new(ContourRectangleDetector::new()),
            contour: Arc::new(ImageprocContourDetector::new()),
        }
    }
}

/// Entry point for a capture source.
///
/// Gates incoming samples by cooldown and hands accepted frames to the
/// executor. Outcomes arrive at the report sink the executor was built
/// with; nothing is returned to the capture thread.
pub struct QrAnalyzer {
    gatekeeper: FrameGatekeeper,
    executor: Box<dyn AnalysisExecutor>,
    logger: SharedLogger,
}

impl QrAnalyzer {
    pub fn new(
        gatekeeper: FrameGatekeeper,
        executor: Box<dyn AnalysisExecutor>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            gatekeeper,
            executor,
            logger,
        }
    }

    /// Wires the gatekeeper, orchestrator and threaded executor from settings.
    pub fn from_settings(
        settings: &AnalyzerSettings,
        backends: DetectorBackends,
        sink: Arc<dyn ReportSink>,
        logger: SharedLogger,
    ) -> Result<Self, AnalysisError> {
        settings.validate()?;

        let mut orchestrator = DetectionOrchestrator::new(
            backends.barcode,
            backends.rectangle,
            settings.rectangle.clone(),
        );
        if let Some(check) = &settings.quality_check {
            orchestrator = orchestrator.with_quality_check(QualityCheck::from_settings(
                check,
                backends.contour,
                settings.contour.clone(),
            ));
        }

        let executor = ThreadedAnalysisExecutor::new(
            settings.concurrency,
            Arc::new(orchestrator),
            sink,
            logger.clone(),
        );
        let gatekeeper = FrameGatekeeper::new(settings.cooldown(), settings.cooldown_mode);

        let message = format!(
            "Analyzer ready: cooldown {}ms ({:?}), {:?}, quality check {}",
            settings.cooldown_ms,
            settings.cooldown_mode,
            settings.concurrency,
            if settings.quality_check.is_some() { "on" } else { "off" }
        );
        with_logger(&logger, |l| l.info(&message));

        Ok(Self::new(gatekeeper, Box::new(executor), logger))
    }

    /// Offers one captured sample. Never blocks on analysis.
    pub fn on_sample(&mut self, sample: &SampleBuffer, timestamp: Duration) -> FrameDisposition {
        let disposition = match self.gatekeeper.admit(sample, timestamp) {
            Admission::Throttled => FrameDisposition::Throttled,
            Admission::Unconvertible => FrameDisposition::Unconvertible,
            Admission::Accepted(frame) => match self.executor.submit(frame) {
                SubmitOutcome::Queued => FrameDisposition::Submitted,
                SubmitOutcome::DroppedBusy => FrameDisposition::Busy,
                SubmitOutcome::Cancelled => FrameDisposition::Cancelled,
            },
        };

        let in_flight = self.executor.in_flight() as f64;
        with_logger(&self.logger, |l| {
            l.count(match disposition {
                FrameDisposition::Submitted => "frames_submitted",
                FrameDisposition::Throttled => "frames_throttled",
                FrameDisposition::Unconvertible => "frames_unconvertible",
                FrameDisposition::Busy => "frames_dropped_busy",
                FrameDisposition::Cancelled => "frames_cancelled",
            });
            l.metric("in_flight", in_flight);
        });
        disposition
    }

    pub fn gatekeeper_stats(&self) -> GatekeeperStats {
        self.gatekeeper.stats()
    }

    pub fn in_flight(&self) -> usize {
        self.executor.in_flight()
    }

    pub fn cancel(&self) {
        self.executor.cancel();
    }

    /// Waits for in-flight analyses, then emits the logger summary.
    pub fn shutdown(&mut self) {
        self.executor.shutdown();
        if let Ok(logger) = self.logger.lock() {
            logger.summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analysis_executor::ConcurrencyPolicy;
    use crate::analysis::analysis_logger::{AnalysisLogger, StatsAnalysisLogger};
    use crate::analysis::report::{AnalysisOutcome, ChannelReportSink};
    use crate::capture::domain::sample_buffer::{PixelBuffer, PixelFormat};
    use crate::capture::frame_gatekeeper::CooldownMode;
    use crate::detection::domain::contour_detector::{ContourDetectionConfig, ContoursObservation};
    use crate::detection::domain::rectangle_detector::RectangleDetectionConfig;
    use crate::error::SendError;
    use crate::quality::candidate_policy::Verdict;
    use crate::shared::frame::Frame;
    use crate::shared::region::{CandidateRegion, NormalizedRect, Symbology};
    use crate::shared::settings::QualityCheckSettings;
    use std::sync::Mutex;

    struct UnreadableQr;

    impl BarcodeDetector for UnreadableQr {
        fn detect_barcodes(&self, _frame: &Frame) -> Result<Vec<CandidateRegion>, SendError> {
            Ok(vec![CandidateRegion::barcode(
                NormalizedRect::new(0.0, 0.0, 0.05, 0.05),
                0.8,
                Symbology::Qr,
                None,
            )])
        }
    }

    struct NoRectangles;

    impl RectangleDetector for NoRectangles {
        fn detect_rectangles(
            &self,
            _frame: &Frame,
            _config: &RectangleDetectionConfig,
        ) -> Result<Vec<CandidateRegion>, SendError> {
            Ok(Vec::new())
        }
    }

    struct NoContours;

    impl ContourDetector for NoContours {
        fn detect_contours(
            &self,
            _frame: &Frame,
            _config: &ContourDetectionConfig,
        ) -> Result<Option<ContoursObservation>, SendError> {
            Ok(None)
        }
    }

    fn fake_backends() -> DetectorBackends {
        DetectorBackends {
            barcode: Arc::new(UnreadableQr),
            rectangle: Arc::new(NoRectangles),
            contour: Arc::new(NoContours),
        }
    }

    fn sample() -> SampleBuffer {
        SampleBuffer::new(PixelBuffer::packed(
            PixelFormat::Rgb8,
            4,
            4,
            vec![255; 4 * 4 * 3],
        ))
    }

    fn settings(mode: CooldownMode) -> AnalyzerSettings {
        AnalyzerSettings {
            cooldown_mode: mode,
            concurrency: ConcurrencyPolicy::Unbounded,
            ..Default::default()
        }
    }

    fn run(settings: &AnalyzerSettings, times: &[u64]) -> (Vec<FrameDisposition>, Vec<AnalysisOutcome>) {
        let (sink, rx) = ChannelReportSink::unbounded();
        let mut analyzer = QrAnalyzer::from_settings(
            settings,
            fake_backends(),
            Arc::new(sink),
            StatsAnalysisLogger::shared(),
        )
        .unwrap();
        let dispositions = times
            .iter()
            .map(|&t| analyzer.on_sample(&sample(), Duration::from_millis(t)))
            .collect();
        analyzer.shutdown();
        let mut outcomes: Vec<_> = rx.try_iter().collect();
        outcomes.sort_by_key(|o| o.timestamp());
        (dispositions, outcomes)
    }

    #[test]
    fn test_rearm_analyzes_first_and_third_frame() {
        let (dispositions, outcomes) = run(&settings(CooldownMode::Rearm), &[0, 50, 250]);

        assert_eq!(
            dispositions,
            vec![
                FrameDisposition::Submitted,
                FrameDisposition::Throttled,
                FrameDisposition::Submitted
            ]
        );
        let timestamps: Vec<_> = outcomes.iter().map(|o| o.timestamp()).collect();
        assert_eq!(
            timestamps,
            vec![Duration::ZERO, Duration::from_millis(250)]
        );
    }

    #[test]
    fn test_literal_mode_analyzes_every_frame() {
        let (dispositions, outcomes) = run(&settings(CooldownMode::Literal), &[0, 50, 250]);

        assert!(dispositions
            .iter()
            .all(|d| *d == FrameDisposition::Submitted));
        assert_eq!(outcomes.len(), 3);
    }

    #[test]
    fn test_reports_carry_unreadable_qr() {
        let (_, outcomes) = run(&settings(CooldownMode::Rearm), &[0]);

        match &outcomes[0] {
            AnalysisOutcome::Completed(report) => {
                assert!(report.needs_user_prompt());
                assert!(report.assessments.is_empty());
            }
            other => panic!("expected completed report, got {other:?}"),
        }
    }

    #[test]
    fn test_quality_check_from_settings() {
        let settings = AnalyzerSettings {
            quality_check: Some(QualityCheckSettings::default()),
            ..settings(CooldownMode::Rearm)
        };
        let (_, outcomes) = run(&settings, &[0]);

        let AnalysisOutcome::Completed(report) = &outcomes[0] else {
            panic!("expected completed report");
        };
        assert_eq!(report.assessments.len(), 1);
        assert_eq!(report.assessments[0].verdict, Verdict::TooSmall);
        assert!(report.assessments[0].quality.is_none());
    }

    #[test]
    fn test_empty_sample_is_unconvertible() {
        let (sink, _rx) = ChannelReportSink::unbounded();
        let stats = StatsAnalysisLogger::shared();
        let mut analyzer = QrAnalyzer::from_settings(
            &AnalyzerSettings::default(),
            fake_backends(),
            Arc::new(sink),
            stats.clone(),
        )
        .unwrap();

        let disposition = analyzer.on_sample(&SampleBuffer::empty(), Duration::ZERO);

        assert_eq!(disposition, FrameDisposition::Unconvertible);
        assert_eq!(analyzer.gatekeeper_stats().unconvertible, 1);
        assert_eq!(stats.lock().unwrap().counter("frames_unconvertible"), 1);
        analyzer.shutdown();
    }

    #[test]
    fn test_cancelled_analyzer_rejects_frames() {
        let (sink, rx) = ChannelReportSink::unbounded();
        let mut analyzer = QrAnalyzer::from_settings(
            &AnalyzerSettings::default(),
            fake_backends(),
            Arc::new(sink),
            StatsAnalysisLogger::shared(),
        )
        .unwrap();

        analyzer.cancel();

        assert_eq!(
            analyzer.on_sample(&sample(), Duration::ZERO),
            FrameDisposition::Cancelled
        );
        analyzer.shutdown();
        assert_eq!(rx.try_iter().count(), 0);
    }

    /// Keeps only the status messages.
    #[derive(Default)]
    struct MessageLogger {
        messages: Vec<String>,
    }

    impl AnalysisLogger for MessageLogger {
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn count(&mut self, _name: &str) {}
        fn info(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }
    }

    #[test]
    fn test_construction_reports_configuration() {
        let (sink, _rx) = ChannelReportSink::unbounded();
        let messages = Arc::new(Mutex::new(MessageLogger::default()));
        let mut analyzer = QrAnalyzer::from_settings(
            &AnalyzerSettings::default(),
            fake_backends(),
            Arc::new(sink),
            messages.clone(),
        )
        .unwrap();
        analyzer.shutdown();

        let logger = messages.lock().unwrap();
        let messages = &logger.messages;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Analyzer ready: cooldown 200ms (Rearm)"));
        assert!(messages[0].ends_with("quality check off"));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let (sink, _rx) = ChannelReportSink::unbounded();
        let settings = AnalyzerSettings {
            concurrency: ConcurrencyPolicy::DropIfBusy { max_in_flight: 0 },
            ..Default::default()
        };
        let result = QrAnalyzer::from_settings(
            &settings,
            fake_backends(),
            Arc::new(sink),
            StatsAnalysisLogger::shared(),
        );
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_backends_are_pure_rust() {
        let backends = DetectorBackends::default();
        let blank = Frame::new(vec![255; 16 * 16 * 3], 16, 16, 3, Duration::ZERO);
        assert!(backends.barcode.detect_barcodes(&blank).unwrap().is_empty());
    }
}

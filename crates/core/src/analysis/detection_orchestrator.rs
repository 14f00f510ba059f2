use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::ScopedJoinHandle;
use std::time::Instant;

use crate::analysis::report::{AnalysisReport, RegionAssessment};
use crate::detection::domain::barcode_detector::BarcodeDetector;
use crate::detection::domain::candidate_filter::{
    filter_confident_rectangles, filter_unreadable_qr,
};
use crate::detection::domain::contour_detector::{ContourDetectionConfig, ContourDetector};
use crate::detection::domain::rectangle_detector::{RectangleDetectionConfig, RectangleDetector};
use crate::error::{AnalysisError, DetectionPass};
use crate::quality::candidate_policy::CandidatePolicy;
use crate::quality::region_quality_estimator::RegionQualityEstimator;
use crate::quality::size_classifier::check_potential_qr_code_size;
use crate::shared::frame::Frame;
use crate::shared::region::CandidateRegion;
use crate::shared::settings::QualityCheckSettings;

type PassResult = Result<Vec<CandidateRegion>, AnalysisError>;

/// Per-candidate scoring applied after detection.
pub struct QualityCheck {
    pub estimator: RegionQualityEstimator,
    pub policy: Box<dyn CandidatePolicy>,
    pub min_relative_size: f64,
    pub include_rectangles: bool,
}

impl QualityCheck {
    pub fn from_settings(
        settings: &QualityCheckSettings,
        contour_detector: Arc<dyn ContourDetector>,
        contour_config: ContourDetectionConfig,
    ) -> Self {
        Self {
            estimator: RegionQualityEstimator::new(contour_detector, contour_config),
            policy: settings.build_policy(),
            min_relative_size: settings.min_relative_size,
            include_rectangles: settings.include_rectangles,
        }
    }

    fn assess(&self, frame: &Frame, candidate: &CandidateRegion) -> RegionAssessment {
        let quality = self.estimator.score(frame, &candidate.bounding_box);
        let size = check_potential_qr_code_size(&candidate.bounding_box, self.min_relative_size);
        let verdict = self.policy.assess(candidate, quality.as_ref());
        log::debug!(
            "Assessed candidate at {:?}: {size:?}, {verdict:?}",
            candidate.bounding_box
        );
        RegionAssessment {
            candidate: candidate.clone(),
            size,
            quality,
            verdict,
        }
    }
}

/// Runs the barcode and rectangle passes over one frame.
///
/// Both passes run on their own scoped thread; the frame is abandoned if
/// either fails.
pub struct DetectionOrchestrator {
    barcode_detector: Arc<dyn BarcodeDetector>,
    rectangle_detector: Arc<dyn RectangleDetector>,
    rectangle_config: RectangleDetectionConfig,
    quality_check: Option<QualityCheck>,
}

impl DetectionOrchestrator {
    pub fn new(
        barcode_detector: Arc<dyn BarcodeDetector>,
        rectangle_detector: Arc<dyn RectangleDetector>,
        rectangle_config: RectangleDetectionConfig,
    ) -> Self {
        Self {
            barcode_detector,
            rectangle_detector,
            rectangle_config,
            quality_check: None,
        }
    }

    pub fn with_quality_check(mut self, quality_check: QualityCheck) -> Self {
        self.quality_check = Some(quality_check);
        self
    }

    pub fn analyze(&self, frame: &Frame) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();

        let (barcodes, rectangles) = std::thread::scope(|s| {
            let barcode = s.spawn(|| self.barcode_pass(frame));
            let rectangle = s.spawn(|| self.rectangle_pass(frame));
            (
                join_pass(barcode, DetectionPass::Barcode),
                join_pass(rectangle, DetectionPass::Rectangle),
            )
        });
        let unreadable_qr = barcodes?;
        let rectangles = rectangles?;

        let assessments = match &self.quality_check {
            Some(check) if !unreadable_qr.is_empty() => {
                let rectangle_candidates: &[CandidateRegion] = if check.include_rectangles {
                    &rectangles
                } else {
                    &[]
                };
                catch_unwind(AssertUnwindSafe(|| {
                    unreadable_qr
                        .iter()
                        .chain(rectangle_candidates)
                        .map(|c| check.assess(frame, c))
                        .collect::<Vec<RegionAssessment>>()
                }))
                .map_err(|_| AnalysisError::QualityCheckPanicked)?
            }
            _ => Vec::new(),
        };

        Ok(AnalysisReport {
            timestamp: frame.timestamp(),
            elapsed: started.elapsed(),
            unreadable_qr,
            rectangles,
            assessments,
        })
    }

    fn barcode_pass(&self, frame: &Frame) -> PassResult {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let barcodes = self
            .barcode_detector
            .detect_barcodes(frame)
            .map_err(|e| AnalysisError::detector(DetectionPass::Barcode, e))?;
        Ok(filter_unreadable_qr(&barcodes))
    }

    fn rectangle_pass(&self, frame: &Frame) -> PassResult {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let rectangles = self
            .rectangle_detector
            .detect_rectangles(frame, &self.rectangle_config)
            .map_err(|e| AnalysisError::detector(DetectionPass::Rectangle, e))?;
        Ok(filter_confident_rectangles(&rectangles))
    }
}

fn join_pass(handle: ScopedJoinHandle<'_, PassResult>, pass: DetectionPass) -> PassResult {
    handle
        .join()
        .map_err(|_| AnalysisError::DetectorPanicked { pass })?
}

use std::sync::Arc;

use serde::Serialize;

use crate::detection::domain::contour_detector::{ContourDetectionConfig, ContourDetector};
use crate::quality::contour_length::total_contour_length;
use crate::shared::frame::Frame;
use crate::shared::region::NormalizedRect;

/// Edge density of a cropped region: total contour length per crop pixel.
///
/// Higher values suggest sharper or more structured content; values near
/// zero suggest blur or a featureless crop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QualityScore {
    pub value: f64,
    pub total_length: f64,
    pub crop_width: u32,
    pub crop_height: u32,
}

/// Scores candidate regions by normalized contour perimeter.
pub struct RegionQualityEstimator {
    detector: Arc<dyn ContourDetector>,
    config: ContourDetectionConfig,
}

impl RegionQualityEstimator {
    pub fn new(detector: Arc<dyn ContourDetector>, config: ContourDetectionConfig) -> Self {
        Self { detector, config }
    }

    /// Crops `frame` to `region` and scores the crop.
    ///
    /// Returns `None` when the crop is empty or the contour detector yields no
    /// observation. Detector failures are logged and also yield `None`.
    pub fn score(&self, frame: &Frame, region: &NormalizedRect) -> Option<QualityScore> {
        let crop = frame.crop(region);
        if crop.is_empty() {
            return None;
        }

        let observation = match self.detector.detect_contours(&crop, &self.config) {
            Ok(Some(observation)) => observation,
            Ok(None) => {
                log::debug!("Could not detect contours for region {region:?}");
                return None;
            }
            Err(e) => {
                log::debug!("Contour detection failed for region {region:?}: {e}");
                return None;
            }
        };

        let total_length = total_contour_length(&observation);
        let area = crop.width() as f64 * crop.height() as f64;
        let score = QualityScore {
            value: total_length / area,
            total_length,
            crop_width: crop.width(),
            crop_height: crop.height(),
        };
        log::debug!(
            "Contour length {:.4} over {}x{} crop, score {:.6}",
            total_length,
            score.crop_width,
            score.crop_height,
            score.value
        );
        Some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::contour_detector::{Contour, ContoursObservation};
    use crate::error::SendError;
    use crate::shared::region::NormalizedPoint;
    use approx::assert_relative_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a fixed observation and records the crop sizes and config it saw.
    struct FakeContourDetector {
        result: Option<ContoursObservation>,
        fail: bool,
        seen: Mutex<Vec<(u32, u32, ContourDetectionConfig)>>,
    }

    impl FakeContourDetector {
        fn returning(result: Option<ContoursObservation>) -> Self {
            Self {
                result,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: None,
                fail: true,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ContourDetector for FakeContourDetector {
        fn detect_contours(
            &self,
            frame: &Frame,
            config: &ContourDetectionConfig,
        ) -> Result<Option<ContoursObservation>, SendError> {
            self.seen
                .lock()
                .unwrap()
                .push((frame.width(), frame.height(), config.clone()));
            if self.fail {
                return Err("vision backend unavailable".into());
            }
            Ok(self.result.clone())
        }
    }

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![128u8; (w * h * 3) as usize], w, h, 3, Duration::ZERO)
    }

    fn square_observation() -> ContoursObservation {
        ContoursObservation {
            contours: vec![Contour::new(vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(1.0, 0.0),
                NormalizedPoint::new(1.0, 1.0),
                NormalizedPoint::new(0.0, 1.0),
            ])],
        }
    }

    #[test]
    fn test_score_is_length_over_crop_area() {
        let detector = Arc::new(FakeContourDetector::returning(Some(square_observation())));
        let estimator = RegionQualityEstimator::new(detector.clone(), ContourDetectionConfig::default());

        // 0.5 x 0.25 of a 100x80 frame → 50x20 crop.
        let score = estimator
            .score(&frame(100, 80), &NormalizedRect::new(0.25, 0.5, 0.5, 0.25))
            .unwrap();

        assert_eq!((score.crop_width, score.crop_height), (50, 20));
        assert_relative_eq!(score.total_length, 4.0);
        assert_relative_eq!(score.value, 4.0 / 1000.0);
    }

    #[test]
    fn test_detector_receives_crop_and_configured_adjustments() {
        let detector = Arc::new(FakeContourDetector::returning(Some(square_observation())));
        let estimator = RegionQualityEstimator::new(detector.clone(), ContourDetectionConfig::default());

        estimator.score(&frame(100, 100), &NormalizedRect::new(0.0, 0.0, 0.5, 0.5));

        let seen = detector.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!((seen[0].0, seen[0].1), (50, 50));
        assert_eq!(seen[0].2.contrast_adjustment, 2.0);
        assert_eq!(seen[0].2.max_image_dimension, 500);
    }

    #[test]
    fn test_no_observation_means_no_score() {
        let detector = Arc::new(FakeContourDetector::returning(None));
        let estimator = RegionQualityEstimator::new(detector, ContourDetectionConfig::default());
        assert!(estimator
            .score(&frame(100, 100), &NormalizedRect::new(0.0, 0.0, 0.5, 0.5))
            .is_none());
    }

    #[test]
    fn test_detector_failure_means_no_score() {
        let detector = Arc::new(FakeContourDetector::failing());
        let estimator = RegionQualityEstimator::new(detector, ContourDetectionConfig::default());
        assert!(estimator
            .score(&frame(100, 100), &NormalizedRect::new(0.0, 0.0, 0.5, 0.5))
            .is_none());
    }

    #[test]
    fn test_empty_observation_scores_zero() {
        let detector = Arc::new(FakeContourDetector::returning(Some(ContoursObservation::default())));
        let estimator = RegionQualityEstimator::new(detector, ContourDetectionConfig::default());
        let score = estimator
            .score(&frame(100, 100), &NormalizedRect::new(0.0, 0.0, 0.5, 0.5))
            .unwrap();
        assert_eq!(score.value, 0.0);
    }

    #[test]
    fn test_region_outside_frame_is_not_scored() {
        let detector = Arc::new(FakeContourDetector::returning(Some(square_observation())));
        let estimator = RegionQualityEstimator::new(detector.clone(), ContourDetectionConfig::default());
        assert!(estimator
            .score(&frame(100, 100), &NormalizedRect::new(1.5, 1.5, 0.5, 0.5))
            .is_none());
        assert!(detector.seen.lock().unwrap().is_empty());
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, SendError};
use crate::shared::constants::{DEFAULT_CONTRAST_ADJUSTMENT, DEFAULT_MAX_IMAGE_DIMENSION};
use crate::shared::frame::Frame;
use crate::shared::region::NormalizedPoint;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourDetectionConfig {
    /// Contrast multiplier applied around mid-gray before tracing.
    pub contrast_adjustment: f64,
    /// Longer image side is downscaled to this before tracing.
    pub max_image_dimension: u32,
}

impl Default for ContourDetectionConfig {
    fn default() -> Self {
        Self {
            contrast_adjustment: DEFAULT_CONTRAST_ADJUSTMENT,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

impl ContourDetectionConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..=3.0).contains(&self.contrast_adjustment) {
            return Err(AnalysisError::InvalidConfig(format!(
                "contrast adjustment must be within 0.0-3.0, got {}",
                self.contrast_adjustment
            )));
        }
        if self.max_image_dimension == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max image dimension must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Ordered boundary points in normalized coordinates, implicitly closed.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<NormalizedPoint>,
}

impl Contour {
    pub fn new(points: Vec<NormalizedPoint>) -> Self {
        Self { points }
    }
}

/// All contours found in one image, irrespective of nesting.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ContoursObservation {
    pub contours: Vec<Contour>,
}

/// Domain interface for contour tracing.
///
/// `Ok(None)` means the detector produced no observation for the image;
/// that is an absence, not a failure.
pub trait ContourDetector: Send + Sync {
    fn detect_contours(
        &self,
        frame: &Frame,
        config: &ContourDetectionConfig,
    ) -> Result<Option<ContoursObservation>, SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContourDetectionConfig::default();
        assert_eq!(config.contrast_adjustment, 2.0);
        assert_eq!(config.max_image_dimension, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        let config = ContourDetectionConfig {
            max_image_dimension: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_contrast_is_rejected() {
        let config = ContourDetectionConfig {
            contrast_adjustment: 4.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

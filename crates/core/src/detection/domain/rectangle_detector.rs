use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, SendError};
use crate::shared::constants::{
    DEFAULT_MAX_ASPECT_RATIO, DEFAULT_MAX_OBSERVATIONS, DEFAULT_MIN_ASPECT_RATIO,
    DEFAULT_MIN_RECTANGLE_SIZE, DEFAULT_QUADRATURE_TOLERANCE,
};
use crate::shared::frame::Frame;
use crate::shared::region::CandidateRegion;

/// Shape constraints for rectangle detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleDetectionConfig {
    /// Width / height lower bound.
    pub min_aspect_ratio: f64,
    /// Width / height upper bound.
    pub max_aspect_ratio: f64,
    /// Max corner deviation from a right angle, in degrees.
    pub quadrature_tolerance: f64,
    /// Minimum side length as a fraction of the shorter image side.
    pub minimum_size: f64,
    /// Cap on returned observations; 0 means unlimited.
    pub maximum_observations: usize,
}

impl Default for RectangleDetectionConfig {
    fn default() -> Self {
        Self {
            min_aspect_ratio: DEFAULT_MIN_ASPECT_RATIO,
            max_aspect_ratio: DEFAULT_MAX_ASPECT_RATIO,
            quadrature_tolerance: DEFAULT_QUADRATURE_TOLERANCE,
            minimum_size: DEFAULT_MIN_RECTANGLE_SIZE,
            maximum_observations: DEFAULT_MAX_OBSERVATIONS,
        }
    }
}

impl RectangleDetectionConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.min_aspect_ratio <= 0.0 || self.min_aspect_ratio > self.max_aspect_ratio {
            return Err(AnalysisError::InvalidConfig(format!(
                "aspect ratio window [{}, {}] is empty or non-positive",
                self.min_aspect_ratio, self.max_aspect_ratio
            )));
        }
        if !(0.0..=45.0).contains(&self.quadrature_tolerance) {
            return Err(AnalysisError::InvalidConfig(format!(
                "quadrature tolerance must be within 0-45 degrees, got {}",
                self.quadrature_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.minimum_size) {
            return Err(AnalysisError::InvalidConfig(format!(
                "minimum size must be within 0.0-1.0, got {}",
                self.minimum_size
            )));
        }
        Ok(())
    }
}

/// Domain interface for detecting roughly rectangular shapes.
pub trait RectangleDetector: Send + Sync {
    fn detect_rectangles(
        &self,
        frame: &Frame,
        config: &RectangleDetectionConfig,
    ) -> Result<Vec<CandidateRegion>, SendError>;
}

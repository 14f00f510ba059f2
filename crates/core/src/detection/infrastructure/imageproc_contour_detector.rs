use imageproc::contours::find_contours;

use crate::detection::domain::contour_detector::{
    Contour, ContourDetectionConfig, ContourDetector, ContoursObservation,
};
use crate::detection::infrastructure::preprocess::{
    adjust_contrast, binarize_dark_foreground, limit_dimension, to_gray_image,
};
use crate::error::SendError;
use crate::shared::frame::Frame;
use crate::shared::region::NormalizedPoint;

/// Traces dark-on-light contours with `imageproc`.
///
/// Steps: luma, contrast adjustment about mid-gray, downscale to the
/// configured max dimension, Otsu binarization, border following. Every
/// traced border (outer and hole) is reported, with points normalized by
/// the working image size.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageprocContourDetector;

impl ImageprocContourDetector {
    pub fn new() -> Self {
        Self
    }
}

impl ContourDetector for ImageprocContourDetector {
    fn detect_contours(
        &self,
        frame: &Frame,
        config: &ContourDetectionConfig,
    ) -> Result<Option<ContoursObservation>, SendError> {
        if frame.is_empty() {
            return Ok(None);
        }

        let mut gray = to_gray_image(frame)?;
        adjust_contrast(&mut gray, config.contrast_adjustment);
        let gray = limit_dimension(gray, config.max_image_dimension);
        let binary = binarize_dark_foreground(&gray);

        let (w, h) = binary.dimensions();
        let (w, h) = (w as f64, h as f64);
        let contours = find_contours::<u32>(&binary)
            .into_iter()
            .map(|c| {
                Contour::new(
                    c.points
                        .iter()
                        .map(|p| NormalizedPoint::new(p.x as f64 / w, p.y as f64 / h))
                        .collect(),
                )
            })
            .collect();

        Ok(Some(ContoursObservation { contours }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// White RGB frame with a black filled square.
    fn frame_with_square(size: u32, x0: u32, y0: u32, side: u32) -> Frame {
        let mut data = vec![255u8; (size * size * 3) as usize];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                let i = ((y * size + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&[0, 0, 0]);
            }
        }
        Frame::new(data, size, size, 3, Duration::ZERO)
    }

    #[test]
    fn test_empty_frame_has_no_observation() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, Duration::ZERO);
        let result = ImageprocContourDetector::new()
            .detect_contours(&frame, &ContourDetectionConfig::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_blank_frame_has_no_contours() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3, Duration::ZERO);
        let result = ImageprocContourDetector::new()
            .detect_contours(&frame, &ContourDetectionConfig::default())
            .unwrap()
            .unwrap();
        assert!(result.contours.is_empty());
    }

    #[test]
    fn test_square_produces_one_contour_in_unit_space() {
        let frame = frame_with_square(100, 20, 20, 40);
        let result = ImageprocContourDetector::new()
            .detect_contours(&frame, &ContourDetectionConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.contours.len(), 1);
        let points = &result.contours[0].points;
        assert!(!points.is_empty());
        assert!(points
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
    }

    #[test]
    fn test_large_frames_are_downscaled_before_tracing() {
        let frame = frame_with_square(200, 40, 40, 80);
        let config = ContourDetectionConfig {
            max_image_dimension: 50,
            ..Default::default()
        };
        let result = ImageprocContourDetector::new()
            .detect_contours(&frame, &config)
            .unwrap()
            .unwrap();
        assert_eq!(result.contours.len(), 1);
        // Border of a ~20px square in a 50px image.
        assert!(result.contours[0].points.len() < 100);
    }
}

use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

use crate::detection::domain::rectangle_detector::{RectangleDetectionConfig, RectangleDetector};
use crate::detection::infrastructure::preprocess::{
    binarize_dark_foreground, limit_dimension, to_gray_image,
};
use crate::error::SendError;
use crate::shared::frame::Frame;
use crate::shared::region::{CandidateRegion, NormalizedPoint, NormalizedRect, DEFAULT_IOU_THRESHOLD};

/// Polygon simplification tolerance as a fraction of the contour perimeter.
pub const DEFAULT_APPROXIMATION_EPSILON: f64 = 0.02;
pub const DEFAULT_WORKING_DIMENSION: u32 = 1024;

/// Sine of the turning angle below which a vertex is treated as collinear.
const COLLINEAR_SIN: f64 = 0.02;

/// Finds dark quadrilaterals by fitting polygons to outer contours.
///
/// Each outer contour is simplified with Douglas–Peucker; four-vertex convex
/// results are checked against the aspect-ratio window, the corner-angle
/// tolerance and the minimum size. Confidence falls linearly with the worst
/// corner deviation from 90°.
pub struct ContourRectangleDetector {
    approximation_epsilon: f64,
    working_dimension: u32,
}

impl ContourRectangleDetector {
    pub fn new() -> Self {
        Self {
            approximation_epsilon: DEFAULT_APPROXIMATION_EPSILON,
            working_dimension: DEFAULT_WORKING_DIMENSION,
        }
    }

    fn fit_quad(&self, points: &[Point<i32>]) -> Option<[(f64, f64); 4]> {
        let points = match points.split_last() {
            Some((last, rest)) if *last == points[0] => rest,
            _ => points,
        };
        if points.len() < 4 {
            return None;
        }
        let pixel: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
        let epsilon = (closed_perimeter(&pixel) * self.approximation_epsilon).max(1.0);
        let approx = approximate_polygon_dp(points, epsilon, true);
        let simplified =
            simplify_polygon(approx.iter().map(|p| (p.x as f64, p.y as f64)).collect());
        match simplified.as_slice() {
            [a, b, c, d] => Some([*a, *b, *c, *d]),
            _ => None,
        }
    }
}

impl Default for ContourRectangleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RectangleDetector for ContourRectangleDetector {
    fn detect_rectangles(
        &self,
        frame: &Frame,
        config: &RectangleDetectionConfig,
    ) -> Result<Vec<CandidateRegion>, SendError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let gray = limit_dimension(to_gray_image(frame)?, self.working_dimension);
        let binary = binarize_dark_foreground(&gray);
        let (w, h) = binary.dimensions();
        let shorter_side = w.min(h) as f64;

        let mut found = Vec::new();
        for contour in find_contours::<i32>(&binary) {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let Some(quad) = self.fit_quad(&contour.points) else {
                continue;
            };
            if !is_convex(&quad) {
                continue;
            }

            let deviation = max_corner_deviation(&quad);
            if deviation > config.quadrature_tolerance {
                continue;
            }

            let (width, height) = side_extents(&quad);
            if height <= 0.0 || width <= 0.0 {
                continue;
            }
            let aspect = width / height;
            if aspect < config.min_aspect_ratio || aspect > config.max_aspect_ratio {
                continue;
            }
            if width.min(height) / shorter_side < config.minimum_size {
                continue;
            }

            let corners: Vec<NormalizedPoint> = quad
                .iter()
                .map(|&(x, y)| NormalizedPoint::new(x / w as f64, y / h as f64))
                .collect();
            let confidence = (1.0 - deviation / 90.0).clamp(0.0, 1.0) as f32;
            found.push(CandidateRegion::rectangle(
                NormalizedRect::enclosing(&corners),
                confidence,
            ));
        }

        found.sort_by(|a, b| b.bounding_box.area().total_cmp(&a.bounding_box.area()));
        let mut rectangles = CandidateRegion::deduplicate(&found, DEFAULT_IOU_THRESHOLD);
        if config.maximum_observations > 0 {
            rectangles.truncate(config.maximum_observations);
        }
        Ok(rectangles)
    }
}

fn closed_perimeter(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            (x1 - x0).hypot(y1 - y0)
        })
        .sum()
}

/// Drops repeated vertices (including a closing copy of the first) and
/// vertices lying on a straight run.
fn simplify_polygon(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let mut changed = true;
    while changed && points.len() > 3 {
        changed = false;
        let n = points.len();
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            if turning_sin(prev, cur, next).abs() < COLLINEAR_SIN {
                points.remove(i);
                changed = true;
                break;
            }
        }
    }
    points
}

fn turning_sin(prev: (f64, f64), cur: (f64, f64), next: (f64, f64)) -> f64 {
    let a = (cur.0 - prev.0, cur.1 - prev.1);
    let b = (next.0 - cur.0, next.1 - cur.1);
    let norm = a.0.hypot(a.1) * b.0.hypot(b.1);
    if norm == 0.0 {
        return 0.0;
    }
    (a.0 * b.1 - a.1 * b.0) / norm
}

fn is_convex(quad: &[(f64, f64); 4]) -> bool {
    let signs: Vec<f64> = (0..4)
        .map(|i| turning_sin(quad[(i + 3) % 4], quad[i], quad[(i + 1) % 4]))
        .collect();
    signs.iter().all(|&s| s > 0.0) || signs.iter().all(|&s| s < 0.0)
}

/// Largest absolute deviation of an interior angle from 90°, in degrees.
fn max_corner_deviation(quad: &[(f64, f64); 4]) -> f64 {
    (0..4)
        .map(|i| {
            let prev = quad[(i + 3) % 4];
            let cur = quad[i];
            let next = quad[(i + 1) % 4];
            let a = (prev.0 - cur.0, prev.1 - cur.1);
            let b = (next.0 - cur.0, next.1 - cur.1);
            let cos = (a.0 * b.0 + a.1 * b.1) / (a.0.hypot(a.1) * b.0.hypot(b.1));
            (cos.clamp(-1.0, 1.0).acos().to_degrees() - 90.0).abs()
        })
        .fold(0.0, f64::max)
}

/// Average lengths of the more horizontal and the more vertical side pairs.
fn side_extents(quad: &[(f64, f64); 4]) -> (f64, f64) {
    let side = |i: usize| {
        let (x0, y0) = quad[i];
        let (x1, y1) = quad[(i + 1) % 4];
        (x1 - x0, y1 - y0)
    };
    let len = |(dx, dy): (f64, f64)| dx.hypot(dy);
    let first_pair = (len(side(0)) + len(side(2))) / 2.0;
    let second_pair = (len(side(1)) + len(side(3))) / 2.0;
    let (dx, dy) = side(0);
    if dx.abs() >= dy.abs() {
        (first_pair, second_pair)
    } else {
        (second_pair, first_pair)
    }
}

use crate::detection::domain::contour_detector::{Contour, ContoursObservation};
use crate::shared::region::NormalizedPoint;

/// Perimeter of a closed point sequence.
///
/// Sums consecutive Euclidean distances, then adds the closing edge from the
/// last point back to the first unless the two are exactly equal. Empty and
/// single-point sequences have zero length.
pub fn contour_length(points: &[NormalizedPoint]) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };

    let open: f64 = points.windows(2).map(|w| w[0].distance(&w[1])).sum();
    if first != last {
        open + last.distance(first)
    } else {
        open
    }
}

/// Sum of [`contour_length`] over every contour in the observation.
pub fn total_contour_length(observation: &ContoursObservation) -> f64 {
    observation
        .contours
        .iter()
        .map(|c: &Contour| contour_length(&c.points))
        .sum()
}

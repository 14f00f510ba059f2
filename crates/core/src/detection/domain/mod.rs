pub mod barcode_detector;
pub mod candidate_filter;
pub mod contour_detector;
pub mod rectangle_detector;

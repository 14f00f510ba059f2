pub mod contour_rectangle_detector;
pub mod imageproc_contour_detector;
pub mod preprocess;
pub mod rqrr_barcode_detector;

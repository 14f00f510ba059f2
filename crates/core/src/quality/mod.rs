pub mod candidate_policy;
pub mod contour_length;
pub mod region_quality_estimator;
pub mod size_classifier;

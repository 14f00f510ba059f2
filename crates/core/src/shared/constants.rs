use std::time::Duration;

/// Minimum spacing between analyzed frames.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(200);

pub const DEFAULT_MIN_ASPECT_RATIO: f64 = 0.85;
pub const DEFAULT_MAX_ASPECT_RATIO: f64 = 1.15;
/// Allowed corner deviation from 90°, in degrees.
pub const DEFAULT_QUADRATURE_TOLERANCE: f64 = 0.1;
/// Fraction of the shorter image side.
pub const DEFAULT_MIN_RECTANGLE_SIZE: f64 = 0.1;
/// 0 means unlimited.
pub const DEFAULT_MAX_OBSERVATIONS: usize = 0;

pub const DEFAULT_CONTRAST_ADJUSTMENT: f64 = 2.0;
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 500;

/// Candidates narrower or shorter than this (normalized) are too small to read.
pub const DEFAULT_MIN_QR_RELATIVE_SIZE: f64 = 0.1;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 1;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const SETTINGS_DIR_NAME: &str = "qrhint";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

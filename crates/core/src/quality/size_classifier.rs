use serde::Serialize;

use crate::shared::region::NormalizedRect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    TooSmall,
    Detected,
}

/// Classifies a normalized bounding box against a minimum relative size.
///
/// Too small when either side is below `min_relative_size`.
pub fn classify_size(bounding_box: &NormalizedRect, min_relative_size: f64) -> SizeClass {
    if bounding_box.width < min_relative_size || bounding_box.height < min_relative_size {
        SizeClass::TooSmall
    } else {
        SizeClass::Detected
    }
}

/// [`classify_size`] with debug logging of the size and the outcome.
pub fn check_potential_qr_code_size(
    bounding_box: &NormalizedRect,
    min_relative_size: f64,
) -> SizeClass {
    log::debug!(
        "Potential QR code size: {:.3}x{:.3}",
        bounding_box.width,
        bounding_box.height
    );
    let class = classify_size(bounding_box, min_relative_size);
    match class {
        SizeClass::TooSmall => log::debug!("Potential QR code is too small"),
        SizeClass::Detected => log::debug!("Potential QR code detected at {bounding_box:?}"),
    }
    class
}

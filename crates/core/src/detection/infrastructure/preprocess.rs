//! Grayscale preprocessing shared by the contour-based detection backends.

use image::imageops::FilterType;
use image::GrayImage;

use crate::error::SendError;
use crate::shared::frame::Frame;

pub fn to_gray_image(frame: &Frame) -> Result<GrayImage, SendError> {
    GrayImage::from_raw(frame.width(), frame.height(), frame.luma())
        .ok_or_else(|| "luma buffer does not match frame dimensions".into())
}

/// Scales pixel distance from mid-gray by `factor`, saturating at 0/255.
pub fn adjust_contrast(image: &mut GrayImage, factor: f64) {
    for px in image.pixels_mut() {
        let v = (px.0[0] as f64 - 128.0) * factor + 128.0;
        px.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
}

/// Downscales so the longer side is at most `max_dimension`, keeping aspect.
pub fn limit_dimension(image: GrayImage, max_dimension: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_dimension || max_dimension == 0 {
        return image;
    }
    let scale = max_dimension as f64 / longest as f64;
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    image::imageops::resize(&image, new_w, new_h, FilterType::Triangle)
}

/// Otsu binarization with dark pixels as foreground (255).
///
/// A uniform image has no edges and binarizes to all background.
pub fn binarize_dark_foreground(image: &GrayImage) -> GrayImage {
    let (lo, hi) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    let (w, h) = image.dimensions();
    if lo >= hi {
        return GrayImage::new(w, h);
    }
    let level = imageproc::contrast::otsu_level(image);
    let mut out = GrayImage::new(w, h);
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        dst.0[0] = if src.0[0] <= level { 255 } else { 0 };
    }
    out
}

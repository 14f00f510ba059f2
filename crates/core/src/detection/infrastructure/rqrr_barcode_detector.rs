use crate::detection::domain::barcode_detector::BarcodeDetector;
use crate::error::SendError;
use crate::shared::frame::Frame;
use crate::shared::region::{CandidateRegion, NormalizedPoint, NormalizedRect, Symbology};

/// QR-only barcode detector backed by `rqrr`.
///
/// Every located grid becomes a QR candidate with confidence 1.0. The payload
/// is set only when the grid decodes, so a grid that was found but could not
/// be read surfaces with `payload: None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrBarcodeDetector;

impl RqrrBarcodeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl BarcodeDetector for RqrrBarcodeDetector {
    fn detect_barcodes(&self, frame: &Frame) -> Result<Vec<CandidateRegion>, SendError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let w = frame.width() as usize;
        let h = frame.height() as usize;
        let luma = frame.luma();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| luma[y * w + x]);
        let grids = prepared.detect_grids();
        log::trace!("Found {} potential QR grids", grids.len());

        let candidates = grids
            .iter()
            .map(|grid| {
                let payload = match grid.decode() {
                    Ok((_, content)) => Some(content),
                    Err(e) => {
                        log::debug!("Grid decode failed: {e:?}");
                        None
                    }
                };
                let corners: Vec<NormalizedPoint> = grid
                    .bounds
                    .iter()
                    .map(|p| NormalizedPoint::new(p.x as f64 / w as f64, p.y as f64 / h as f64))
                    .collect();
                CandidateRegion::barcode(
                    NormalizedRect::enclosing(&corners),
                    1.0,
                    Symbology::Qr,
                    payload,
                )
            })
            .collect();
        Ok(candidates)
    }
}

use crate::error::SendError;
use crate::shared::frame::Frame;
use crate::shared::region::CandidateRegion;

/// Domain interface for barcode detection.
///
/// Returns every located barcode with its symbology, confidence, bounding
/// box and, when the code could be read, its payload. Implementations are
/// shared across worker threads, hence `&self` and `Sync`.
pub trait BarcodeDetector: Send + Sync {
    fn detect_barcodes(&self, frame: &Frame) -> Result<Vec<CandidateRegion>, SendError>;
}

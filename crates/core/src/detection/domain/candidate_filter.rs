use crate::shared::region::{CandidateKind, CandidateRegion, Symbology};

/// Keeps QR codes that were located but could not be read.
///
/// A candidate passes only when all hold: symbology is QR, confidence is
/// positive, and no payload was decoded.
pub fn filter_unreadable_qr(barcodes: &[CandidateRegion]) -> Vec<CandidateRegion> {
    barcodes
        .iter()
        .filter(|c| {
            log::debug!(
                "Symbology: {}, Confidence: {}, Payload: {}",
                c.symbology()
                    .map_or_else(|| "none".to_string(), |s| s.to_string()),
                c.confidence,
                c.payload().unwrap_or("nil")
            );
            is_unreadable_qr(c)
        })
        .cloned()
        .collect()
}

fn is_unreadable_qr(candidate: &CandidateRegion) -> bool {
    match &candidate.kind {
        CandidateKind::Barcode { symbology, payload } => {
            *symbology == Symbology::Qr && candidate.confidence > 0.0 && payload.is_none()
        }
        CandidateKind::Rectangle => false,
    }
}

/// Keeps rectangles with positive confidence.
pub fn filter_confident_rectangles(rectangles: &[CandidateRegion]) -> Vec<CandidateRegion> {
    rectangles
        .iter()
        .filter(|c| {
            log::debug!("Detected shape confidence: {}", c.confidence);
            c.confidence > 0.0
        })
        .cloned()
        .collect()
}

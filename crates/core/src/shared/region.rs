use serde::Serialize;

/// Overlap above which two rectangle candidates are treated as the same shape.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.8;

/// A point in normalized image coordinates (0–1, origin top-left).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &NormalizedPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Axis-aligned bounding box in normalized image coordinates (origin top-left).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rect enclosing all points. Empty input yields a zero rect.
    pub fn enclosing(points: &[NormalizedPoint]) -> Self {
        if points.is_empty() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let (mut x0, mut y0) = (f64::MAX, f64::MAX);
        let (mut x1, mut y1) = (f64::MIN, f64::MIN);
        for p in points {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn iou(&self, other: &NormalizedRect) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }

        inter / (self.area() + other.area() - inter)
    }
}

/// Barcode format reported by a barcode detector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    Qr,
    MicroQr,
    Aztec,
    DataMatrix,
    Pdf417,
    Ean13,
    Code128,
    Other(String),
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbology::Qr => write!(f, "QR"),
            Symbology::MicroQr => write!(f, "MicroQR"),
            Symbology::Aztec => write!(f, "Aztec"),
            Symbology::DataMatrix => write!(f, "DataMatrix"),
            Symbology::Pdf417 => write!(f, "PDF417"),
            Symbology::Ean13 => write!(f, "EAN-13"),
            Symbology::Code128 => write!(f, "Code128"),
            Symbology::Other(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CandidateKind {
    Barcode {
        symbology: Symbology,
        payload: Option<String>,
    },
    Rectangle,
}

/// A located shape suspected of being a QR code.
///
/// Produced by a detector and never modified afterwards; downstream stages
/// only select subsets.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateRegion {
    pub bounding_box: NormalizedRect,
    pub confidence: f32,
    pub kind: CandidateKind,
}

impl CandidateRegion {
    pub fn barcode(
        bounding_box: NormalizedRect,
        confidence: f32,
        symbology: Symbology,
        payload: Option<String>,
    ) -> Self {
        Self {
            bounding_box,
            confidence,
            kind: CandidateKind::Barcode { symbology, payload },
        }
    }

    pub fn rectangle(bounding_box: NormalizedRect, confidence: f32) -> Self {
        Self {
            bounding_box,
            confidence,
            kind: CandidateKind::Rectangle,
        }
    }

    pub fn symbology(&self) -> Option<&Symbology> {
        match &self.kind {
            CandidateKind::Barcode { symbology, .. } => Some(symbology),
            CandidateKind::Rectangle => None,
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match &self.kind {
            CandidateKind::Barcode { payload, .. } => payload.as_deref(),
            CandidateKind::Rectangle => None,
        }
    }

    /// Greedy deduplication: keeps a candidate only if its IoU with every
    /// previously-kept candidate is at or below the threshold.
    pub fn deduplicate(candidates: &[CandidateRegion], iou_threshold: f64) -> Vec<CandidateRegion> {
        let mut kept: Vec<CandidateRegion> = Vec::with_capacity(candidates.len());
        for c in candidates {
            let dominated = kept
                .iter()
                .any(|k| c.bounding_box.iou(&k.bounding_box) > iou_threshold);
            if !dominated {
                kept.push(c.clone());
            }
        }
        kept
    }
}

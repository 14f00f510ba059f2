use serde::Serialize;

use crate::quality::region_quality_estimator::QualityScore;
use crate::quality::size_classifier::{classify_size, SizeClass};
use crate::shared::constants::DEFAULT_MIN_QR_RELATIVE_SIZE;
use crate::shared::region::CandidateRegion;

/// What the host should tell the user about a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Detected,
    TooSmall,
    TooBlurry,
}

/// Decision policy applied to each assessed candidate.
///
/// The caller supplies the thresholds; nothing here is hard-wired into the
/// orchestrator.
pub trait CandidatePolicy: Send + Sync {
    fn assess(&self, candidate: &CandidateRegion, quality: Option<&QualityScore>) -> Verdict;
}

/// Accepts every candidate.
pub struct AcceptAllPolicy;

impl CandidatePolicy for AcceptAllPolicy {
    fn assess(&self, _candidate: &CandidateRegion, _quality: Option<&QualityScore>) -> Verdict {
        Verdict::Detected
    }
}

/// Flags candidates whose bounding box is too small to read.
pub struct SizePolicy {
    min_relative_size: f64,
}

impl SizePolicy {
    pub fn new(min_relative_size: f64) -> Self {
        Self { min_relative_size }
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_QR_RELATIVE_SIZE)
    }
}

impl CandidatePolicy for SizePolicy {
    fn assess(&self, candidate: &CandidateRegion, _quality: Option<&QualityScore>) -> Verdict {
        match classify_size(&candidate.bounding_box, self.min_relative_size) {
            SizeClass::TooSmall => Verdict::TooSmall,
            SizeClass::Detected => Verdict::Detected,
        }
    }
}

/// Flags candidates whose quality score falls below `min_score`.
///
/// An unscored candidate is not judged blurry.
pub struct BlurThresholdPolicy {
    min_score: f64,
}

impl BlurThresholdPolicy {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }
}

impl CandidatePolicy for BlurThresholdPolicy {
    fn assess(&self, _candidate: &CandidateRegion, quality: Option<&QualityScore>) -> Verdict {
        match quality {
            Some(q) if q.value < self.min_score => Verdict::TooBlurry,
            _ => Verdict::Detected,
        }
    }
}

/// Runs policies in order; the first verdict other than `Detected` wins.
pub struct ChainedPolicy {
    policies: Vec<Box<dyn CandidatePolicy>>,
}

impl ChainedPolicy {
    pub fn new(policies: Vec<Box<dyn CandidatePolicy>>) -> Self {
        Self { policies }
    }
}

impl CandidatePolicy for ChainedPolicy {
    fn assess(&self, candidate: &CandidateRegion, quality: Option<&QualityScore>) -> Verdict {
        self.policies
            .iter()
            .map(|p| p.assess(candidate, quality))
            .find(|v| *v != Verdict::Detected)
            .unwrap_or(Verdict::Detected)
    }
}

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use serde::{Serialize, Serializer};

use crate::error::{AnalysisError, DetectionPass};
use crate::quality::candidate_policy::Verdict;
use crate::quality::region_quality_estimator::QualityScore;
use crate::quality::size_classifier::SizeClass;
use crate::shared::region::CandidateRegion;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Quality check result for one candidate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionAssessment {
    pub candidate: CandidateRegion,
    pub size: SizeClass,
    pub quality: Option<QualityScore>,
    pub verdict: Verdict,
}

/// Everything the detector passes found in one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    #[serde(rename = "timestamp_ms", serialize_with = "as_millis")]
    pub timestamp: Duration,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// QR codes located but not decoded.
    pub unreadable_qr: Vec<CandidateRegion>,
    pub rectangles: Vec<CandidateRegion>,
    /// Empty unless a quality check is configured.
    pub assessments: Vec<RegionAssessment>,
}

impl AnalysisReport {
    /// True when the frame holds a QR code the host should help the user read.
    pub fn needs_user_prompt(&self) -> bool {
        !self.unreadable_qr.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed(AnalysisReport),
    Failed {
        #[serde(rename = "timestamp_ms", serialize_with = "as_millis")]
        timestamp: Duration,
        pass: Option<DetectionPass>,
        message: String,
    },
}

impl AnalysisOutcome {
    pub fn failed(timestamp: Duration, error: &AnalysisError) -> Self {
        let pass = match error {
            AnalysisError::Detector { pass, .. } | AnalysisError::DetectorPanicked { pass } => {
                Some(*pass)
            }
            _ => None,
        };
        AnalysisOutcome::Failed {
            timestamp,
            pass,
            message: error.to_string(),
        }
    }

    pub fn timestamp(&self) -> Duration {
        match self {
            AnalysisOutcome::Completed(report) => report.timestamp,
            AnalysisOutcome::Failed { timestamp, .. } => *timestamp,
        }
    }
}

/// Receives one outcome per analyzed frame, from worker threads.
pub trait ReportSink: Send + Sync {
    fn deliver(&self, outcome: AnalysisOutcome);
}

/// Forwards outcomes over a crossbeam channel.
pub struct ChannelReportSink {
    tx: Sender<AnalysisOutcome>,
}

impl ChannelReportSink {
    pub fn new(tx: Sender<AnalysisOutcome>) -> Self {
        Self { tx }
    }

    pub fn unbounded() -> (Self, Receiver<AnalysisOutcome>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl ReportSink for ChannelReportSink {
    fn deliver(&self, outcome: AnalysisOutcome) {
        if self.tx.send(outcome).is_err() {
            log::debug!("Report receiver dropped, discarding outcome");
        }
    }
}

/// Writes each outcome to the `log` facade.
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn deliver(&self, outcome: AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Completed(report) => log::info!(
                "Frame at {:.3}s: {} unreadable QR, {} rectangles ({:.1}ms)",
                report.timestamp.as_secs_f64(),
                report.unreadable_qr.len(),
                report.rectangles.len(),
                report.elapsed.as_secs_f64() * 1000.0
            ),
            AnalysisOutcome::Failed {
                timestamp, message, ..
            } => log::warn!(
                "Frame at {:.3}s failed: {message}",
                timestamp.as_secs_f64()
            ),
        }
    }
}

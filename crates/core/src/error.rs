use std::path::PathBuf;

use thiserror::Error;

/// Error type crossing thread boundaries (detector backends, worker tasks).
pub type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Which detector pass produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionPass {
    Barcode,
    Rectangle,
}

impl std::fmt::Display for DetectionPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionPass::Barcode => write!(f, "barcode"),
            DetectionPass::Rectangle => write!(f, "rectangle"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{pass} detection failed: {message}")]
    Detector { pass: DetectionPass, message: String },
    #[error("{pass} detection thread panicked")]
    DetectorPanicked { pass: DetectionPass },
    #[error("quality check panicked")]
    QualityCheckPanicked,
    #[error("frame analysis panicked")]
    AnalysisPanicked,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn detector(pass: DetectionPass, err: SendError) -> Self {
        AnalysisError::Detector {
            pass,
            message: err.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_error_message_names_pass() {
        let err = AnalysisError::detector(DetectionPass::Rectangle, "boom".into());
        assert_eq!(err.to_string(), "rectangle detection failed: boom");
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = AnalysisError::io(
            "/tmp/settings.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/tmp/settings.json"));
    }
}

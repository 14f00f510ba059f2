use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::analysis_executor::ConcurrencyPolicy;
use crate::capture::frame_gatekeeper::CooldownMode;
use crate::detection::domain::contour_detector::ContourDetectionConfig;
use crate::detection::domain::rectangle_detector::RectangleDetectionConfig;
use crate::error::AnalysisError;
use crate::quality::candidate_policy::{
    BlurThresholdPolicy, CandidatePolicy, ChainedPolicy, SizePolicy,
};
use crate::shared::constants::{
    DEFAULT_COOLDOWN, DEFAULT_MIN_QR_RELATIVE_SIZE, SETTINGS_DIR_NAME, SETTINGS_FILE_NAME,
};

/// Thresholds for the optional per-candidate quality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCheckSettings {
    pub min_relative_size: f64,
    /// Scores below this are judged blurry; `None` disables the blur verdict.
    pub min_quality_score: Option<f64>,
    /// Also assess rectangle-pass candidates, not just unreadable QR codes.
    pub include_rectangles: bool,
}

impl Default for QualityCheckSettings {
    fn default() -> Self {
        Self {
            min_relative_size: DEFAULT_MIN_QR_RELATIVE_SIZE,
            min_quality_score: None,
            include_rectangles: false,
        }
    }
}

impl QualityCheckSettings {
    /// Size check first, then blur threshold when configured.
    pub fn build_policy(&self) -> Box<dyn CandidatePolicy> {
        let mut policies: Vec<Box<dyn CandidatePolicy>> =
            vec![Box::new(SizePolicy::new(self.min_relative_size))];
        if let Some(min_score) = self.min_quality_score {
            policies.push(Box::new(BlurThresholdPolicy::new(min_score)));
        }
        Box::new(ChainedPolicy::new(policies))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub cooldown_ms: u64,
    pub cooldown_mode: CooldownMode,
    pub concurrency: ConcurrencyPolicy,
    pub rectangle: RectangleDetectionConfig,
    pub contour: ContourDetectionConfig,
    /// Disabled when absent.
    pub quality_check: Option<QualityCheckSettings>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN.as_millis() as u64,
            cooldown_mode: CooldownMode::default(),
            concurrency: ConcurrencyPolicy::default(),
            rectangle: RectangleDetectionConfig::default(),
            contour: ContourDetectionConfig::default(),
            quality_check: None,
        }
    }
}

impl AnalyzerSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Reads and validates settings from a JSON file. Missing fields take
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        let settings: AnalyzerSettings = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), AnalysisError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| AnalysisError::io(path, e))
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.rectangle.validate()?;
        self.contour.validate()?;
        self.concurrency.validate()?;
        if let Some(check) = &self.quality_check {
            if !(0.0..=1.0).contains(&check.min_relative_size) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "min relative size must be within 0.0-1.0, got {}",
                    check.min_relative_size
                )));
            }
            if check.min_quality_score.is_some_and(|s| s < 0.0) {
                return Err(AnalysisError::InvalidConfig(
                    "min quality score must not be negative".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::{CandidateRegion, NormalizedRect, Symbology};
    use crate::quality::candidate_policy::Verdict;

    #[test]
    fn test_defaults() {
        let settings = AnalyzerSettings::default();
        assert_eq!(settings.cooldown(), Duration::from_millis(200));
        assert_eq!(settings.cooldown_mode, CooldownMode::Rearm);
        assert_eq!(
            settings.concurrency,
            ConcurrencyPolicy::DropIfBusy { max_in_flight: 1 }
        );
        assert!(settings.quality_check.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AnalyzerSettings {
            cooldown_ms: 400,
            cooldown_mode: CooldownMode::Literal,
            concurrency: ConcurrencyPolicy::Unbounded,
            quality_check: Some(QualityCheckSettings {
                min_quality_score: Some(0.02),
                ..Default::default()
            }),
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(AnalyzerSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "cooldown_ms": 400, "rectangle": { "minimum_size": 0.2 } }"#)
            .unwrap();
        let settings = AnalyzerSettings::load(&path).unwrap();
        assert_eq!(settings.cooldown_ms, 400);
        assert_eq!(settings.rectangle.minimum_size, 0.2);
        assert_eq!(settings.rectangle.min_aspect_ratio, 0.85);
        assert_eq!(settings.cooldown_mode, CooldownMode::Rearm);
    }

    #[test]
    fn test_concurrency_policy_json_shape() {
        let json = r#"{ "concurrency": { "policy": "drop_if_busy", "max_in_flight": 3 } }"#;
        let settings: AnalyzerSettings = serde_json::from_str(json).unwrap();
        assert_eq!(
            settings.concurrency,
            ConcurrencyPolicy::DropIfBusy { max_in_flight: 3 }
        );
    }

    #[test]
    fn test_malformed_json_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AnalyzerSettings::load(&path),
            Err(AnalysisError::Settings(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        assert!(matches!(
            AnalyzerSettings::load(Path::new("/nonexistent/settings.json")),
            Err(AnalysisError::Io { .. })
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "concurrency": { "policy": "drop_if_busy", "max_in_flight": 0 } }"#,
        )
        .unwrap();
        assert!(matches!(
            AnalyzerSettings::load(&path),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_negative_quality_threshold_is_rejected() {
        let settings = AnalyzerSettings {
            quality_check: Some(QualityCheckSettings {
                min_quality_score: Some(-1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_built_policy_checks_size_then_blur() {
        let check = QualityCheckSettings {
            min_quality_score: Some(0.5),
            ..Default::default()
        };
        let policy = check.build_policy();
        let small = CandidateRegion::barcode(
            NormalizedRect::new(0.0, 0.0, 0.05, 0.05),
            1.0,
            Symbology::Qr,
            None,
        );
        assert_eq!(policy.assess(&small, None), Verdict::TooSmall);
    }

    #[test]
    fn test_default_path_ends_with_settings_file() {
        if let Some(path) = AnalyzerSettings::default_path() {
            assert!(path.ends_with("qrhint/settings.json"));
        }
    }
}

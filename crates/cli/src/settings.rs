use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use facegate_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use facegate_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_DATABASE_NAME, DEFAULT_DEVICE, DEFAULT_POLL_INTERVAL_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VerifierKind {
    /// ArcFace embeddings (downloads a model on first use).
    Embedding,
    /// Color histograms (no model needed).
    Histogram,
}

/// Session defaults read from `settings.json`. Any field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: String,
    pub database: Option<PathBuf>,
    pub confidence: f64,
    pub verifier: VerifierKind,
    /// Overrides the verifier's own default threshold.
    pub threshold: Option<f64>,
    pub detect_every: usize,
    pub poll_ms: u64,
    pub show_comparison: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            database: None,
            confidence: DEFAULT_CONFIDENCE,
            verifier: VerifierKind::Embedding,
            threshold: None,
            detect_every: 1,
            poll_ms: DEFAULT_POLL_INTERVAL_MS,
            show_comparison: true,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Settings from the platform config directory, or defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Settings from `path`; a missing or malformed file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed {}: {e}", path.display());
            Self::default()
        })
    }

    /// The configured database, or `identities.db` in the platform data
    /// directory (the working directory when there is none).
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_DIR_NAME).join(DEFAULT_DATABASE_NAME))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_NAME))
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("Threshold must be between 0.0 and 1.0, got {t}"));
            }
        }
        if self.detect_every == 0 {
            return Err("Detect-every must be at least 1".to_string());
        }
        if self.poll_ms == 0 {
            return Err("Poll interval must be at least 1 ms".to_string());
        }
        if self.device.trim().is_empty() {
            return Err("Device must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_settings(json: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, json).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let (_dir, path) = write_settings("{ not json");
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let (_dir, path) = write_settings(r#"{ "verifier": "histogram", "poll_ms": 50 }"#);
        let settings = Settings::load_from(&path);
        assert_eq!(settings.verifier, VerifierKind::Histogram);
        assert_eq!(settings.poll_ms, 50);
        assert_eq!(settings.device, DEFAULT_DEVICE);
        assert!(settings.show_comparison);
    }

    #[test]
    fn test_saved_settings_load_back() {
        let settings = Settings {
            device: "2".into(),
            database: Some(PathBuf::from("/tmp/faces.db")),
            threshold: Some(0.6),
            ..Settings::default()
        };
        let (_dir, path) = write_settings(&serde_json::to_string_pretty(&settings).unwrap());
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let settings = Settings {
            database: Some(PathBuf::from("faces.db")),
            ..Settings::default()
        };
        assert_eq!(settings.database_path(), PathBuf::from("faces.db"));
    }

    #[test]
    fn test_default_database_is_named_identities() {
        let path = Settings::default().database_path();
        assert_eq!(path.file_name().unwrap(), DEFAULT_DATABASE_NAME);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let bad = [
            Settings {
                confidence: 1.5,
                ..Settings::default()
            },
            Settings {
                threshold: Some(-0.1),
                ..Settings::default()
            },
            Settings {
                detect_every: 0,
                ..Settings::default()
            },
            Settings {
                poll_ms: 0,
                ..Settings::default()
            },
            Settings {
                device: "  ".into(),
                ..Settings::default()
            },
        ];
        for settings in bad {
            assert!(settings.validate().is_err(), "{settings:?}");
        }
    }
}

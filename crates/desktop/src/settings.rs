use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use detectview_core::detection::infrastructure::annotator_factory::DetectorConfig;
use detectview_core::session::session_config::SessionConfig;
use detectview_core::shared::constants::DEFAULT_OUTPUT_DIR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Detection confidence threshold in percent.
    pub confidence: u32,
    /// NMS IoU threshold in percent.
    pub iou: u32,
    pub model_path: Option<PathBuf>,
    /// TrueType font for box labels.
    pub label_font: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: 25,
            iou: 45,
            model_path: None,
            label_font: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("DetectView").join("settings.json"))
    }

    /// Loads the user's settings, writing defaults on first launch.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => {
                let defaults = Self::default();
                defaults.save_to(path);
                defaults
            }
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            if let Err(e) = fs::write(path, json) {
                log::warn!("Could not save settings to {}: {e}", path.display());
            }
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            confidence: self.confidence.min(100) as f64 / 100.0,
            iou_threshold: self.iou.min(100) as f64 / 100.0,
            model_path: self.model_path.clone(),
            label_font: self.label_font.clone(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            output_dir: self.output_dir.clone(),
            ..SessionConfig::default()
        }
    }
}

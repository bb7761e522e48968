use std::path::PathBuf;

use thiserror::Error;

use crate::detection::domain::box_renderer::BoxRenderer;
use crate::detection::domain::frame_annotator::{DetectingAnnotator, FrameAnnotator};

use super::label_font::resolve_label_font;
use super::model_resolver::{resolve_detector_model, ProgressFn};
use super::onnx_yolo_detector::{OnnxYoloDetector, DEFAULT_CONFIDENCE, DEFAULT_IOU};

#[derive(Debug, Error, PartialEq)]
pub enum DetectorConfigError {
    #[error("confidence must be in [0, 1], got {0}")]
    Confidence(f64),
    #[error("IoU threshold must be in [0, 1], got {0}")]
    Iou(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    pub confidence: f64,
    pub iou_threshold: f64,
    /// Overrides the default downloaded model.
    pub model_path: Option<PathBuf>,
    /// Font for box labels; a system font is used when unset.
    pub label_font: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU,
            model_path: None,
            label_font: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectorConfigError::Confidence(self.confidence));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(DetectorConfigError::Iou(self.iou_threshold));
        }
        Ok(())
    }
}

/// Resolves the label font and the model (downloading it if needed) and
/// wires the YOLO detector to the box renderer.
pub fn build_annotator(
    config: &DetectorConfig,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn FrameAnnotator>, Box<dyn std::error::Error>> {
    config.validate()?;
    let font = resolve_label_font(config.label_font.as_deref())?;
    let model_path = resolve_detector_model(config.model_path.as_deref(), progress)?;
    let detector = OnnxYoloDetector::new(&model_path, config.confidence, config.iou_threshold)?;
    Ok(Box::new(DetectingAnnotator::new(
        Box::new(detector),
        BoxRenderer::new().with_font(font),
    )))
}

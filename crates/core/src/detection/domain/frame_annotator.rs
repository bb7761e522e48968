use crate::detection::domain::box_renderer::BoxRenderer;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;

/// Turns a frame into the same frame with detections drawn on it.
///
/// The pipelines only know this seam; what runs behind it (a real model,
/// a pass-through for tests) is up to whoever builds the session.
pub trait FrameAnnotator: Send {
    fn infer(&mut self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Number of objects found in the most recent frame, if known.
    fn last_detection_count(&self) -> Option<usize> {
        None
    }
}

/// Runs an [`ObjectDetector`] and draws its boxes with a [`BoxRenderer`].
pub struct DetectingAnnotator {
    detector: Box<dyn ObjectDetector>,
    renderer: BoxRenderer,
    last_count: Option<usize>,
}

impl DetectingAnnotator {
    pub fn new(detector: Box<dyn ObjectDetector>, renderer: BoxRenderer) -> Self {
        Self {
            detector,
            renderer,
            last_count: None,
        }
    }
}

impl FrameAnnotator for DetectingAnnotator {
    fn infer(&mut self, mut frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let detections = self.detector.detect(&frame)?;
        log::debug!(
            "Frame {}: {} detection(s)",
            frame.index(),
            detections.len()
        );
        self.renderer.draw(&mut frame, &detections);
        self.last_count = Some(detections.len());
        Ok(frame)
    }

    fn last_detection_count(&self) -> Option<usize> {
        self.last_count
    }
}

use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Finds objects in a single RGB frame.
///
/// `&mut self` because inference sessions keep internal buffers between
/// calls.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}

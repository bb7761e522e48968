use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads frames from a video or image source.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipelines work with the abstract `Frame` and `VideoMetadata`
/// types. Frames are pulled one at a time so a caller can hold the reader
/// across event-loop turns.
pub trait VideoReader: Send {
    /// Opens a video or image file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Decodes the next frame, or returns `None` once the source is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Iterates over the remaining frames in decode order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(std::iter::from_fn(move || self.read_frame().transpose()))
    }

    /// Releases any resources held by the reader. Safe to call repeatedly.
    fn close(&mut self);
}

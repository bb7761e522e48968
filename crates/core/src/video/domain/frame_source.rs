use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::frame::Frame;
use crate::shared::media_handle::MediaHandle;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// An opened reader paired with its metadata.
///
/// Owns the reader exclusively and closes it exactly once: on an explicit
/// [`FrameSource::close`], or when dropped on any other exit path.
pub struct FrameSource {
    reader: Box<dyn VideoReader>,
    metadata: VideoMetadata,
    closed: bool,
}

impl FrameSource {
    /// Opens `handle` with `reader`.
    ///
    /// A reader that fails to open is still closed before the error is
    /// returned, so partially initialized decoders are released.
    pub fn open(
        mut reader: Box<dyn VideoReader>,
        handle: &MediaHandle,
    ) -> Result<Self, PipelineError> {
        match reader.open(handle.path()) {
            Ok(metadata) => Ok(Self {
                reader,
                metadata,
                closed: false,
            }),
            Err(e) => {
                reader.close();
                Err(PipelineError::SourceOpen {
                    path: handle.path().to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Pulls the next frame. Returns `None` after exhaustion or once closed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.closed {
            return Ok(None);
        }
        self.reader.read_frame()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.reader.close();
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

use crate::shared::media_handle::MediaKind;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Factory for the readers and writers a session needs.
///
/// Each call returns a fresh, unopened instance, so every pipeline run and
/// every playback owns its own decoder.
pub trait MediaIo: Send {
    fn reader(&self, kind: MediaKind) -> Box<dyn VideoReader>;

    fn writer(&self) -> Box<dyn VideoWriter>;
}

use crate::shared::media_handle::MediaKind;
use crate::video::domain::media_io::MediaIo;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use crate::video::infrastructure::image_file_reader::ImageFileReader;

/// Production media backend: ffmpeg for video, the `image` crate for stills.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMediaIo;

impl MediaIo for FfmpegMediaIo {
    fn reader(&self, kind: MediaKind) -> Box<dyn VideoReader> {
        match kind {
            MediaKind::Image => Box::new(ImageFileReader::new()),
            MediaKind::Video => Box::new(FfmpegReader::new()),
        }
    }

    fn writer(&self) -> Box<dyn VideoWriter> {
        Box::new(FfmpegWriter::new())
    }
}

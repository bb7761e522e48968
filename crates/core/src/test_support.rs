//! Stubs shared by the unit tests: in-memory readers/writers that record
//! what happened to them, simple annotators, and a recording surface.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::detection::domain::frame_annotator::FrameAnnotator;
use crate::pipeline::display_surface::DisplaySurface;
use crate::shared::display_image::DisplayImage;
use crate::shared::frame::Frame;
use crate::shared::media_handle::MediaKind;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::media_io::MediaIo;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

pub type SharedLog = Arc<Mutex<MediaLog>>;

/// Everything the stub readers and writers were asked to do.
#[derive(Default)]
pub struct MediaLog {
    pub reader_opens: usize,
    pub reader_closes: usize,
    pub opened_paths: Vec<PathBuf>,
    pub frames_read: Vec<usize>,
    pub writer_opens: Vec<(PathBuf, VideoMetadata)>,
    pub writer_closes: usize,
    pub written: Vec<Frame>,
    /// Finalized outputs, readable again by a `StubReader`.
    pub artifacts: HashMap<PathBuf, Vec<Frame>>,
}

impl MediaLog {
    pub fn shared() -> SharedLog {
        Arc::new(Mutex::new(MediaLog::default()))
    }
}

/// Frame `i` is filled with gray level `i * 10` so order is visible in pixels.
pub fn solid_frames(count: usize, width: u32, height: u32) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            let v = ((i * 10) % 256) as u8;
            Frame::filled(width, height, [v, v, v], i)
        })
        .collect()
}

pub fn gray_level(frame: &Frame) -> u8 {
    frame.data()[0]
}

pub struct StubReader {
    log: SharedLog,
    kind: MediaKind,
    frames: Vec<Frame>,
    pending: VecDeque<Frame>,
    declared_total: Option<usize>,
    fail_read_at: Option<usize>,
    next_index: usize,
}

impl StubReader {
    pub fn new(log: SharedLog, kind: MediaKind, frames: Vec<Frame>) -> Self {
        Self {
            log,
            kind,
            frames,
            pending: VecDeque::new(),
            declared_total: None,
            fail_read_at: None,
            next_index: 0,
        }
    }

    pub fn with_declared_total(mut self, total: usize) -> Self {
        self.declared_total = Some(total);
        self
    }

    pub fn failing_read_at(mut self, index: usize) -> Self {
        self.fail_read_at = Some(index);
        self
    }
}

impl VideoReader for StubReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let mut log = self.log.lock().unwrap();
        log.reader_opens += 1;
        log.opened_paths.push(path.to_path_buf());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.starts_with("missing") {
            return Err("No such file or directory".into());
        }

        self.pending = match log.artifacts.get(path) {
            Some(frames) => frames.iter().cloned().collect(),
            None => self.frames.iter().cloned().collect(),
        };
        self.next_index = 0;

        let (width, height) = self
            .pending
            .front()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        match self.kind {
            MediaKind::Image if self.pending.is_empty() => Err("Failed to decode image".into()),
            MediaKind::Image => Ok(VideoMetadata::for_image(
                width,
                height,
                Some(path.to_path_buf()),
            )),
            MediaKind::Video => Ok(VideoMetadata {
                width,
                height,
                fps: 30.0,
                total_frames: self.declared_total.unwrap_or(self.pending.len()),
                codec: "stub".to_string(),
                source_path: Some(path.to_path_buf()),
            }),
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.fail_read_at == Some(self.next_index) {
            return Err(format!("corrupt packet at frame {}", self.next_index).into());
        }
        let frame = self.pending.pop_front();
        if let Some(ref f) = frame {
            self.log.lock().unwrap().frames_read.push(f.index());
            self.next_index += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) {
        self.pending.clear();
        self.log.lock().unwrap().reader_closes += 1;
    }
}

pub struct StubWriter {
    log: SharedLog,
    path: Option<PathBuf>,
    frames: Vec<Frame>,
    fail_write_at: Option<usize>,
}

impl StubWriter {
    pub fn new(log: SharedLog) -> Self {
        Self {
            log,
            path: None,
            frames: Vec::new(),
            fail_write_at: None,
        }
    }

    pub fn failing_write_at(mut self, index: usize) -> Self {
        self.fail_write_at = Some(index);
        self
    }
}

impl VideoWriter for StubWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.log
            .lock()
            .unwrap()
            .writer_opens
            .push((path.to_path_buf(), metadata.clone()));
        // Leave a file behind like a real encoder would, when the dir exists.
        let _ = std::fs::write(path, b"partial");
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.path.is_none() {
            return Err("StubWriter: not opened".into());
        }
        if self.fail_write_at == Some(self.frames.len()) {
            return Err("disk full".into());
        }
        self.frames.push(frame.clone());
        self.log.lock().unwrap().written.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut log = self.log.lock().unwrap();
        log.writer_closes += 1;
        if let Some(path) = self.path.take() {
            log.artifacts.insert(path, std::mem::take(&mut self.frames));
        }
        Ok(())
    }
}

/// Hands out stub readers and writers that share one log.
pub struct StubMediaIo {
    pub log: SharedLog,
    pub image: Option<Frame>,
    pub video: Vec<Frame>,
    pub declared_total: Option<usize>,
    pub fail_read_at: Option<usize>,
    pub fail_write_at: Option<usize>,
}

impl StubMediaIo {
    pub fn new(log: SharedLog) -> Self {
        Self {
            log,
            image: None,
            video: Vec::new(),
            declared_total: None,
            fail_read_at: None,
            fail_write_at: None,
        }
    }
}

impl MediaIo for StubMediaIo {
    fn reader(&self, kind: MediaKind) -> Box<dyn VideoReader> {
        let frames = match kind {
            MediaKind::Image => self.image.iter().cloned().collect(),
            MediaKind::Video => self.video.clone(),
        };
        let mut reader = StubReader::new(self.log.clone(), kind, frames);
        if let Some(total) = self.declared_total {
            reader = reader.with_declared_total(total);
        }
        if let Some(index) = self.fail_read_at {
            reader = reader.failing_read_at(index);
        }
        Box::new(reader)
    }

    fn writer(&self) -> Box<dyn VideoWriter> {
        let mut writer = StubWriter::new(self.log.clone());
        if let Some(index) = self.fail_write_at {
            writer = writer.failing_write_at(index);
        }
        Box::new(writer)
    }
}

/// Returns frames untouched and records which indices it saw.
#[derive(Default)]
pub struct PassthroughAnnotator {
    pub seen: Arc<Mutex<Vec<usize>>>,
}

impl FrameAnnotator for PassthroughAnnotator {
    fn infer(&mut self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        self.seen.lock().unwrap().push(frame.index());
        Ok(frame)
    }
}

/// Fails on the frame with the given index.
pub struct FailingAnnotator {
    pub fail_at: usize,
}

impl FrameAnnotator for FailingAnnotator {
    fn infer(&mut self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        if frame.index() == self.fail_at {
            Err("model crashed".into())
        } else {
            Ok(frame)
        }
    }
}

/// Returns frames at a different size than it received.
pub struct ResizingAnnotator {
    pub width: u32,
    pub height: u32,
}

impl FrameAnnotator for ResizingAnnotator {
    fn infer(&mut self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let v = gray_level(&frame);
        Ok(Frame::filled(self.width, self.height, [v, v, v], frame.index()))
    }
}

/// Display surface that remembers every call.
#[derive(Default)]
pub struct RecordingSurface {
    pub shown: Vec<DisplayImage>,
    pub clears: usize,
    pub statuses: Vec<String>,
    pub status: Option<String>,
    pub controls_visible: bool,
    pub errors: Vec<(String, String)>,
}

impl RecordingSurface {
    /// Percentages parsed from the "Processing video: N%" lines, in order.
    pub fn reported_percents(&self) -> Vec<f64> {
        self.statuses
            .iter()
            .filter_map(|s| s.strip_prefix("Processing video: "))
            .filter_map(|s| s.strip_suffix('%'))
            .filter_map(|s| s.parse::<f64>().ok())
            .collect()
    }
}

impl DisplaySurface for RecordingSurface {
    fn show(&mut self, image: &DisplayImage) {
        self.shown.push(image.clone());
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn show_status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
        self.status = Some(text.to_string());
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn set_playback_controls(&mut self, visible: bool) {
        self.controls_visible = visible;
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.errors.push((title.to_string(), message.to_string()));
    }
}

/// Encodes `num_frames` solid gray frames (level `i * 40`) to an MPEG-4 file.
pub fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: f64) {
    ffmpeg_next::init().unwrap();
    let fps_i = fps as i32;
    let time_base = ffmpeg_next::Rational(1, fps_i);

    let mut octx = ffmpeg_next::format::output(path).unwrap();
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
    let mut ost = octx.add_stream(Some(codec)).unwrap();
    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();
    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
    encoder_ctx.set_time_base(time_base);
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps_i, 1)));
    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }
    let mut encoder = encoder_ctx
        .open_with(ffmpeg_next::Dictionary::new())
        .unwrap();
    ost.set_parameters(&encoder);
    octx.write_header().unwrap();
    let ost_time_base = octx.stream(0).unwrap().time_base();

    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::format::Pixel::YUV420P,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )
    .unwrap();

    let drain = |encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
                 octx: &mut ffmpeg_next::format::context::Output| {
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(time_base, ost_time_base);
            encoded.write_interleaved(octx).unwrap();
        }
    };

    for i in 0..num_frames {
        let mut rgb = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
        );
        let stride = rgb.stride(0);
        let value = ((i * 40) % 256) as u8;
        let data = rgb.data_mut(0);
        for row in 0..height as usize {
            data[row * stride..row * stride + width as usize * 3].fill(value);
        }

        let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb, &mut yuv).unwrap();
        yuv.set_pts(Some(i as i64));
        encoder.send_frame(&yuv).unwrap();
        drain(&mut encoder, &mut octx);
    }

    encoder.send_eof().unwrap();
    drain(&mut encoder, &mut octx);
    octx.write_trailer().unwrap();
}

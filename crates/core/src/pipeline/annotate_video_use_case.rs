use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::frame_annotator::FrameAnnotator;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::media_handle::MediaHandle;
use crate::shared::processing_progress::ProcessingProgress;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// A finished, playable output file.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub frames_written: usize,
    /// Dimensions and rate the file was encoded with.
    pub metadata: VideoMetadata,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VideoStep {
    /// A stride boundary was reached; more frames remain.
    Progress(ProcessingProgress),
    /// The last frame was written and the file finalized.
    Complete {
        artifact: VideoArtifact,
        progress: ProcessingProgress,
    },
}

/// Video pipeline: decode → annotate → encode, one frame at a time.
///
/// Work is split into steps so the owner can interleave it with other
/// events. Each [`step`](Self::step) processes frames up to the next
/// progress report. Dropping an unfinished run aborts it: the source and
/// encoder are released and the partial output is deleted.
pub struct AnnotateVideoUseCase {
    source: FrameSource,
    writer: Box<dyn VideoWriter>,
    input_path: PathBuf,
    output_path: PathBuf,
    /// Set once the encoder has been opened (it may have created the file).
    output_metadata: Option<VideoMetadata>,
    progress: ProcessingProgress,
    stride: usize,
    logger: Box<dyn PipelineLogger>,
    finished: bool,
}

impl AnnotateVideoUseCase {
    /// Opens the source and prepares `<output_dir>/processed_<basename>`.
    pub fn start(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        handle: &MediaHandle,
        output_dir: &Path,
        stride: usize,
        mut logger: Box<dyn PipelineLogger>,
    ) -> Result<Self, PipelineError> {
        let output_path = handle.output_path(output_dir);
        if same_file(handle.path(), &output_path) {
            return Err(PipelineError::SinkWrite {
                path: output_path,
                reason: "output would overwrite the input".to_string(),
            });
        }
        fs::create_dir_all(output_dir).map_err(|e| PipelineError::SinkWrite {
            path: output_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let source = FrameSource::open(reader, handle)?;
        let metadata = source.metadata();
        logger.info(&format!(
            "Processing {} ({}x{}, {:.2} fps, {} frames) -> {}",
            handle.path().display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            output_path.display()
        ));

        Ok(Self {
            progress: ProcessingProgress::new(metadata.total_frames),
            source,
            writer,
            input_path: handle.path().to_path_buf(),
            output_path,
            output_metadata: None,
            stride: stride.max(1),
            logger,
            finished: false,
        })
    }

    pub fn progress(&self) -> ProcessingProgress {
        self.progress
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Processes frames until the next progress report or the end.
    ///
    /// Any error aborts the run; further calls fail.
    pub fn step(&mut self, annotator: &mut dyn FrameAnnotator) -> Result<VideoStep, PipelineError> {
        if self.finished {
            return Err(PipelineError::SinkWrite {
                path: self.output_path.clone(),
                reason: "run already finished".to_string(),
            });
        }

        loop {
            if self.progress.is_complete() {
                return self.finish();
            }

            let started = Instant::now();
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return self.finish(),
                Err(e) => {
                    let reason = format!(
                        "decoding failed after {} frames: {e}",
                        self.progress.frames_done()
                    );
                    return Err(self.fail(PipelineError::SourceOpen {
                        path: self.input_path.clone(),
                        reason,
                    }));
                }
            };
            self.logger.timing("decode", elapsed_ms(started));

            let started = Instant::now();
            let frame_no = self.progress.frames_done();
            let annotated = match annotator.infer(frame) {
                Ok(f) if f.channels() == 3 && f.is_well_formed() => f,
                Ok(f) => {
                    let reason = format!(
                        "annotator returned a malformed {}x{}x{} frame",
                        f.width(),
                        f.height(),
                        f.channels()
                    );
                    return Err(self.fail(PipelineError::Inference {
                        frame: frame_no,
                        reason,
                    }));
                }
                Err(e) => {
                    return Err(self.fail(PipelineError::Inference {
                        frame: frame_no,
                        reason: e.to_string(),
                    }))
                }
            };
            self.logger.timing("detect", elapsed_ms(started));
            if let Some(count) = annotator.last_detection_count() {
                self.logger.metric("detections", count as f64);
            }

            let started = Instant::now();
            if let Err(e) = self.write(&annotated) {
                return Err(self.fail(e));
            }
            self.logger.timing("write", elapsed_ms(started));

            self.progress.advance();
            if self.progress.is_complete() {
                return self.finish();
            }
            if self.progress.frames_done() % self.stride == 0 {
                self.logger.progress(&self.progress);
                return Ok(VideoStep::Progress(self.progress));
            }
        }
    }

    /// Steps until done, reporting every progress value including the last.
    pub fn run_to_completion(
        &mut self,
        annotator: &mut dyn FrameAnnotator,
        mut on_progress: impl FnMut(&ProcessingProgress),
    ) -> Result<VideoArtifact, PipelineError> {
        loop {
            match self.step(annotator)? {
                VideoStep::Progress(p) => on_progress(&p),
                VideoStep::Complete { artifact, progress } => {
                    on_progress(&progress);
                    return Ok(artifact);
                }
            }
        }
    }

    /// Aborts the run. Same as dropping it, with a log line.
    pub fn cancel(mut self) {
        if !self.finished {
            self.logger.info(&format!(
                "Cancelled after {} frames",
                self.progress.frames_done()
            ));
        }
    }

    /// Opens the encoder on the first frame, then checks later frames match.
    fn write(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        let sink_err = |reason: String| PipelineError::SinkWrite {
            path: self.output_path.clone(),
            reason,
        };

        let size = (frame.width(), frame.height());
        match self.output_metadata.as_ref().map(|m| (m.width, m.height)) {
            None => {
                let metadata = self.source.metadata().with_dimensions(size.0, size.1);
                self.output_metadata = Some(metadata.clone());
                self.writer
                    .open(&self.output_path, &metadata)
                    .map_err(|e| sink_err(e.to_string()))?;
            }
            Some(expected) if expected != size => {
                return Err(sink_err(format!(
                    "frame {} is {}x{} but the output is {}x{}",
                    frame.index(),
                    size.0,
                    size.1,
                    expected.0,
                    expected.1
                )));
            }
            Some(_) => {}
        }

        self.writer
            .write(frame)
            .map_err(|e| sink_err(e.to_string()))
    }

    fn finish(&mut self) -> Result<VideoStep, PipelineError> {
        self.source.close();

        let Some(metadata) = self.output_metadata.clone() else {
            return Err(self.fail(PipelineError::SourceOpen {
                path: self.input_path.clone(),
                reason: "no decodable frames".to_string(),
            }));
        };

        if let Err(e) = self.writer.close() {
            let err = PipelineError::SinkWrite {
                path: self.output_path.clone(),
                reason: e.to_string(),
            };
            return Err(self.fail(err));
        }
        self.finished = true;

        if !self.progress.is_complete() {
            self.progress.finish();
        }
        self.logger.progress(&self.progress);
        self.logger.info(&format!(
            "Saved {} frames to {}",
            self.progress.frames_done(),
            self.output_path.display()
        ));
        self.logger.summary();

        Ok(VideoStep::Complete {
            artifact: VideoArtifact {
                path: self.output_path.clone(),
                frames_written: self.progress.frames_done(),
                metadata,
            },
            progress: self.progress,
        })
    }

    /// Releases everything, deletes the partial output and hands back `err`.
    fn fail(&mut self, err: PipelineError) -> PipelineError {
        log::warn!("Video run aborted: {err}");
        self.abort();
        err
    }

    fn abort(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.source.close();
        if self.output_metadata.is_some() {
            if let Err(e) = self.writer.close() {
                log::debug!("Closing aborted output failed: {e}");
            }
            if self.output_path.exists() {
                if let Err(e) = fs::remove_file(&self.output_path) {
                    log::warn!(
                        "Could not remove partial output {}: {e}",
                        self.output_path.display()
                    );
                }
            }
        }
    }
}

impl Drop for AnnotateVideoUseCase {
    fn drop(&mut self) {
        self.abort();
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

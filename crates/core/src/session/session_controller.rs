use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::frame_annotator::FrameAnnotator;
use crate::pipeline::annotate_image_use_case::AnnotateImageUseCase;
use crate::pipeline::annotate_video_use_case::{AnnotateVideoUseCase, VideoStep};
use crate::pipeline::display_surface::DisplaySurface;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use crate::playback::playback_engine::{PlaybackEngine, TickOutcome};
use crate::session::session_config::{ConfigError, SessionConfig};
use crate::session::session_state::{SessionEvent, SessionMode, SessionState, TransitionError};
use crate::shared::media_handle::{MediaHandle, MediaKind};
use crate::video::domain::media_io::MediaIo;

/// Builds a fresh logger for each processing run.
pub type LoggerFactory = Box<dyn Fn() -> Box<dyn PipelineLogger> + Send>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Owns everything a front-end session needs and routes user actions.
///
/// All state changes go through [`SessionState`]. At most one component is
/// active: starting an upload cancels the previous run and releases any
/// playback source first.
pub struct SessionController<S: DisplaySurface> {
    state: SessionState,
    surface: S,
    annotator: Box<dyn FrameAnnotator>,
    media: Box<dyn MediaIo>,
    config: SessionConfig,
    processing: Option<AnnotateVideoUseCase>,
    playback: PlaybackEngine,
    new_logger: LoggerFactory,
}

impl<S: DisplaySurface> SessionController<S> {
    pub fn new(
        surface: S,
        annotator: Box<dyn FrameAnnotator>,
        media: Box<dyn MediaIo>,
        config: SessionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: SessionState::new(),
            surface,
            annotator,
            media,
            playback: PlaybackEngine::new(config.display_size),
            config,
            processing: None,
            new_logger: Box::new(|| -> Box<dyn PipelineLogger> {
                Box::new(LogPipelineLogger::new())
            }),
        })
    }

    /// Replaces the default [`LogPipelineLogger`] used for video runs.
    pub fn with_pipeline_logger(
        mut self,
        factory: impl Fn() -> Box<dyn PipelineLogger> + Send + 'static,
    ) -> Self {
        self.new_logger = Box::new(factory);
        self
    }

    pub fn mode(&self) -> SessionMode {
        self.state.mode()
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.state.artifact()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_processing(&self) -> bool {
        self.processing.is_some()
    }

    /// True while playback ticks should keep coming.
    pub fn needs_tick(&self) -> bool {
        self.playback.needs_tick()
    }

    /// Routes `path` to the image or video pipeline.
    ///
    /// An unsupported file only produces an error message; the current
    /// session is left exactly as it was.
    pub fn upload(&mut self, path: &Path) -> Result<(), SessionError> {
        let handle = match MediaHandle::from_path(path) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Rejected upload: {e}");
                self.surface.show_error(e.title(), &e.user_message());
                return Err(e.into());
            }
        };

        self.teardown();
        log::info!("Uploaded {} {}", handle.kind(), handle.path().display());
        match handle.kind() {
            MediaKind::Image => self.upload_image(&handle),
            MediaKind::Video => self.upload_video(&handle),
        }
    }

    /// Runs one processing step. Returns `true` while more work remains.
    pub fn pump(&mut self) -> Result<bool, SessionError> {
        let Some(run) = self.processing.as_mut() else {
            return Ok(false);
        };

        match run.step(self.annotator.as_mut()) {
            Ok(VideoStep::Progress(progress)) => {
                self.state.apply(SessionEvent::Progress(progress))?;
                self.surface.show_status(&progress.status_text());
                Ok(true)
            }
            Ok(VideoStep::Complete { artifact, progress }) => {
                self.processing = None;
                self.surface.show_status(&progress.status_text());
                self.state
                    .apply(SessionEvent::ProcessingComplete(artifact.path.clone()))?;
                self.surface.show_status(&format!(
                    "Processing complete!\nSaved to: {}",
                    artifact.path.display()
                ));
                self.surface.set_playback_controls(true);
                Ok(false)
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn process_to_completion(&mut self) -> Result<(), SessionError> {
        while self.pump()? {}
        Ok(())
    }

    /// Aborts the current run, deleting its partial output.
    pub fn cancel_processing(&mut self) -> Result<bool, SessionError> {
        let Some(run) = self.processing.take() else {
            return Ok(false);
        };
        run.cancel();
        self.state.apply(SessionEvent::Reset)?;
        self.surface.clear();
        self.surface.show_status("Processing cancelled");
        self.surface.set_playback_controls(false);
        Ok(true)
    }

    /// Plays the artifact from its first frame.
    ///
    /// Returns `Ok(false)` if already playing; no second source is opened.
    pub fn play(&mut self) -> Result<bool, SessionError> {
        if self.state.mode() == SessionMode::PlayingVideo {
            return Ok(false);
        }
        let next = self.state.transition(&SessionEvent::PlayPressed)?;
        let artifact: PathBuf = match next.artifact() {
            Some(path) => path.to_path_buf(),
            None => return Ok(false),
        };

        match self.playback.play(&artifact, self.media.as_ref()) {
            Ok(_) => {
                self.state = next;
                Ok(true)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Stops playback. The source is released on the next tick.
    pub fn stop(&mut self) -> Result<bool, SessionError> {
        if self.state.mode() == SessionMode::Stopped {
            return Ok(false);
        }
        self.state.apply(SessionEvent::StopPressed)?;
        self.playback.stop();
        Ok(true)
    }

    /// Advances playback by one frame.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        match self.playback.tick() {
            TickOutcome::Frame(image) => self.surface.show(&image),
            TickOutcome::EndOfStream => {
                if self.state.mode() == SessionMode::PlayingVideo {
                    self.state.apply(SessionEvent::EndOfStream)?;
                }
            }
            TickOutcome::Released | TickOutcome::Idle => {}
        }
        Ok(())
    }

    fn upload_image(&mut self, handle: &MediaHandle) -> Result<(), SessionError> {
        self.state.apply(SessionEvent::UploadImage)?;
        let mut use_case = AnnotateImageUseCase::new(
            self.media.reader(MediaKind::Image),
            self.config.display_size,
        );
        match use_case.execute(handle, self.annotator.as_mut()) {
            Ok(image) => {
                self.surface.show(&image);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn upload_video(&mut self, handle: &MediaHandle) -> Result<(), SessionError> {
        let started = AnnotateVideoUseCase::start(
            self.media.reader(MediaKind::Video),
            self.media.writer(),
            handle,
            &self.config.output_dir,
            self.config.progress_stride,
            (self.new_logger)(),
        );
        let run = match started {
            Ok(run) => run,
            Err(e) => return self.fail(e),
        };

        let progress = run.progress();
        self.state.apply(SessionEvent::UploadVideo(progress))?;
        self.surface.clear();
        self.surface.show_status(&progress.status_text());
        self.processing = Some(run);
        Ok(())
    }

    /// Cancels any run, releases playback and resets the surface.
    fn teardown(&mut self) {
        if let Some(run) = self.processing.take() {
            run.cancel();
        }
        self.playback.reset();
        self.surface.clear_status();
        self.surface.set_playback_controls(false);
    }

    fn fail<T>(&mut self, err: PipelineError) -> Result<T, SessionError> {
        log::error!("{err}");
        self.processing = None;
        self.playback.reset();
        self.state.apply(SessionEvent::Reset)?;
        self.surface.clear();
        self.surface.clear_status();
        self.surface.set_playback_controls(false);
        self.surface.show_error(err.title(), &err.user_message());
        Err(err.into())
    }
}

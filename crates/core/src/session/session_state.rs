use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::processing_progress::ProcessingProgress;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    ShowingImage,
    ProcessingVideo(ProcessingProgress),
    VideoReady,
    PlayingVideo,
    Stopped,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Idle => write!(f, "idle"),
            SessionMode::ShowingImage => write!(f, "showing an image"),
            SessionMode::ProcessingVideo(_) => write!(f, "processing a video"),
            SessionMode::VideoReady => write!(f, "video ready"),
            SessionMode::PlayingVideo => write!(f, "playing"),
            SessionMode::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    UploadImage,
    UploadVideo(ProcessingProgress),
    Progress(ProcessingProgress),
    ProcessingComplete(PathBuf),
    /// Processing failed or was cancelled, or a source could not be opened.
    Reset,
    PlayPressed,
    StopPressed,
    EndOfStream,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::UploadImage => "upload an image",
            SessionEvent::UploadVideo(_) => "upload a video",
            SessionEvent::Progress(_) => "report progress",
            SessionEvent::ProcessingComplete(_) => "complete processing",
            SessionEvent::Reset => "reset",
            SessionEvent::PlayPressed => "play",
            SessionEvent::StopPressed => "stop",
            SessionEvent::EndOfStream => "end playback",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {event} while {mode}")]
pub struct TransitionError {
    pub event: &'static str,
    pub mode: SessionMode,
}

/// Current mode plus the artifact available for playback.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    mode: SessionMode,
    artifact: Option<PathBuf>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            mode: SessionMode::Idle,
            artifact: None,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// The state `event` would lead to, without changing `self`.
    pub fn transition(&self, event: &SessionEvent) -> Result<SessionState, TransitionError> {
        use SessionEvent as E;
        use SessionMode as M;

        let next = |mode: SessionMode,
                    artifact: Option<PathBuf>|
         -> Result<SessionState, TransitionError> { Ok(SessionState { mode, artifact }) };
        match (self.mode, event) {
            (_, E::UploadImage) => next(M::ShowingImage, None),
            (_, E::UploadVideo(progress)) => next(M::ProcessingVideo(*progress), None),
            (_, E::Reset) => next(M::Idle, None),
            (M::ProcessingVideo(_), E::Progress(progress)) => {
                next(M::ProcessingVideo(*progress), None)
            }
            (M::ProcessingVideo(_), E::ProcessingComplete(path)) => {
                next(M::VideoReady, Some(path.clone()))
            }
            (M::VideoReady | M::Stopped, E::PlayPressed) if self.artifact.is_some() => {
                next(M::PlayingVideo, self.artifact.clone())
            }
            (M::PlayingVideo, E::StopPressed | E::EndOfStream) => {
                next(M::Stopped, self.artifact.clone())
            }
            (mode, event) => Err(TransitionError {
                event: event.name(),
                mode,
            }),
        }
    }

    pub fn apply(&mut self, event: SessionEvent) -> Result<(), TransitionError> {
        *self = self.transition(&event)?;
        Ok(())
    }
}

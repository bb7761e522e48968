use std::path::PathBuf;

use thiserror::Error;

/// Failures a pipeline run can end with.
///
/// `UnsupportedInput` and `SourceOpen` are recovered by the session with a
/// message. `Inference` and `SinkWrite` abort the run that raised them.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{} is not a supported image or video file", path.display())]
    UnsupportedInput { path: PathBuf },

    #[error("cannot open {}: {reason}", path.display())]
    SourceOpen { path: PathBuf, reason: String },

    #[error("detection failed on frame {frame}: {reason}")]
    Inference { frame: usize, reason: String },

    #[error("cannot write {}: {reason}", path.display())]
    SinkWrite { path: PathBuf, reason: String },
}

impl PipelineError {
    /// Short heading for a user-facing dialog.
    pub fn title(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedInput { .. } => "Unsupported File",
            PipelineError::SourceOpen { .. } => "Cannot Open File",
            PipelineError::Inference { .. } => "Detection Failed",
            PipelineError::SinkWrite { .. } => "Cannot Save Output",
        }
    }

    /// Body text for a user-facing dialog.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::UnsupportedInput { .. } => {
                "The selected file type is not supported. Please upload an image or video file."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

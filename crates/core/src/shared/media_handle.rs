use std::fmt;
use std::path::{Path, PathBuf};

use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::constants::{IMAGE_EXTENSIONS, OUTPUT_PREFIX, VIDEO_EXTENSIONS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a path by extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A user-selected input file together with its media kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaHandle {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        match MediaKind::from_path(&path) {
            Some(kind) => Ok(Self { path, kind }),
            None => Err(PipelineError::UnsupportedInput { path }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// `<output_dir>/processed_<basename>`.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        let basename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        output_dir.join(format!("{OUTPUT_PREFIX}{basename}"))
    }
}

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_OUTPUT_DIR, DISPLAY_HEIGHT, DISPLAY_WIDTH, PLAYBACK_TICK, PROGRESS_STRIDE,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("display size must be non-zero, got {width}x{height}")]
    DisplaySize { width: u32, height: u32 },
    #[error("progress stride must be at least 1")]
    ProgressStride,
    #[error("playback tick must be longer than zero")]
    PlaybackTick,
    #[error("output directory must not be empty")]
    OutputDir,
}

/// Knobs shared by every run a session starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub output_dir: PathBuf,
    pub display_size: (u32, u32),
    pub progress_stride: usize,
    pub playback_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            display_size: (DISPLAY_WIDTH, DISPLAY_HEIGHT),
            progress_stride: PROGRESS_STRIDE,
            playback_tick: PLAYBACK_TICK,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.display_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::DisplaySize { width, height });
        }
        if self.progress_stride == 0 {
            return Err(ConfigError::ProgressStride);
        }
        if self.playback_tick.is_zero() {
            return Err(ConfigError::PlaybackTick);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::OutputDir);
        }
        Ok(())
    }
}

use std::path::Path;

use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::display_image::DisplayImage;
use crate::shared::media_handle::MediaHandle;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::media_io::MediaIo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    NotStarted,
    Playing,
    Stopped,
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The next frame, ready for display.
    Frame(DisplayImage),
    /// The source ran out (or failed to decode); playback is now stopped.
    EndOfStream,
    /// A stop from an earlier call was applied and the source released.
    Released,
    /// Nothing to do.
    Idle,
}

/// Pull-one-frame-per-tick player for a processed video.
///
/// `stop` only flips the state; the source is released by the next tick
/// (or by the next `play`), so a tick already in flight never sees a
/// closed decoder.
pub struct PlaybackEngine {
    state: PlaybackState,
    source: Option<FrameSource>,
    display_size: (u32, u32),
    frames_shown: usize,
}

impl PlaybackEngine {
    pub fn new(display_size: (u32, u32)) -> Self {
        Self {
            state: PlaybackState::NotStarted,
            source: None,
            display_size,
            frames_shown: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// True while ticks still have work: playing, or a stop awaiting release.
    pub fn needs_tick(&self) -> bool {
        self.is_playing() || self.source.is_some()
    }

    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }

    /// Starts playing `artifact` from its first frame.
    ///
    /// Returns `Ok(false)` without touching anything when already playing.
    pub fn play(&mut self, artifact: &Path, media: &dyn MediaIo) -> Result<bool, PipelineError> {
        if self.is_playing() {
            return Ok(false);
        }
        self.release_source();

        let handle = MediaHandle::from_path(artifact)?;
        let source = FrameSource::open(media.reader(handle.kind()), &handle)?;
        log::debug!(
            "Playing {} ({} frames)",
            artifact.display(),
            source.metadata().total_frames
        );

        self.source = Some(source);
        self.state = PlaybackState::Playing;
        self.frames_shown = 0;
        Ok(true)
    }

    /// Requests a stop. Returns `false` if nothing was playing.
    pub fn stop(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = PlaybackState::Stopped;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            PlaybackState::Playing => self.advance(),
            _ if self.source.is_some() => {
                self.release_source();
                TickOutcome::Released
            }
            _ => TickOutcome::Idle,
        }
    }

    /// Drops any source immediately and forgets the playback.
    pub fn reset(&mut self) {
        self.release_source();
        self.state = PlaybackState::NotStarted;
        self.frames_shown = 0;
    }

    fn advance(&mut self) -> TickOutcome {
        let Some(source) = self.source.as_mut() else {
            self.state = PlaybackState::Stopped;
            return TickOutcome::EndOfStream;
        };

        let next = match source.next_frame() {
            Ok(Some(frame)) => {
                let (w, h) = self.display_size;
                DisplayImage::from_frame(&frame, w, h).map(Some)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match next {
            Ok(Some(image)) => {
                self.frames_shown += 1;
                TickOutcome::Frame(image)
            }
            Ok(None) => {
                log::debug!("Playback finished after {} frames", self.frames_shown);
                self.end_of_stream()
            }
            Err(e) => {
                log::warn!("Playback stopped on a bad frame: {e}");
                self.end_of_stream()
            }
        }
    }

    fn end_of_stream(&mut self) -> TickOutcome {
        self.release_source();
        self.state = PlaybackState::Stopped;
        TickOutcome::EndOfStream
    }

    fn release_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{solid_frames, MediaLog, SharedLog, StubMediaIo};

    const ARTIFACT: &str = "outputs/processed_clip.mp4";

    fn media(log: &SharedLog, frames: usize) -> StubMediaIo {
        let mut media = StubMediaIo::new(log.clone());
        media.video = solid_frames(frames, 16, 12);
        media
    }

    fn shown_level(outcome: TickOutcome) -> u8 {
        match outcome {
            TickOutcome::Frame(image) => image.pixel(0, 0)[0],
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_ticks_show_frames_in_order_at_display_size() {
        let log = MediaLog::shared();
        let media = media(&log, 3);
        let mut engine = PlaybackEngine::new((32, 24));

        assert!(engine.play(Path::new(ARTIFACT), &media).unwrap());
        match engine.tick() {
            TickOutcome::Frame(image) => {
                assert_eq!((image.width(), image.height()), (32, 24));
                assert_eq!(image.pixel(0, 0), [0, 0, 0, 255]);
            }
            other => panic!("expected a frame, got {other:?}"),
        }
        assert_eq!(shown_level(engine.tick()), 10);
        assert_eq!(shown_level(engine.tick()), 20);
        assert_eq!(engine.frames_shown(), 3);
    }

    #[test]
    fn test_play_while_playing_opens_one_source() {
        let log = MediaLog::shared();
        let media = media(&log, 5);
        let mut engine = PlaybackEngine::new((16, 12));

        assert!(engine.play(Path::new(ARTIFACT), &media).unwrap());
        engine.tick();
        assert!(!engine.play(Path::new(ARTIFACT), &media).unwrap());

        assert_eq!(log.lock().unwrap().reader_opens, 1);
        assert_eq!(shown_level(engine.tick()), 10);
    }

    #[test]
    fn test_stop_is_applied_on_next_tick() {
        let log = MediaLog::shared();
        let media = media(&log, 5);
        let mut engine = PlaybackEngine::new((16, 12));

        engine.play(Path::new(ARTIFACT), &media).unwrap();
        engine.tick();
        assert!(engine.stop());
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert!(engine.needs_tick());
        assert_eq!(log.lock().unwrap().reader_closes, 0);

        assert_eq!(engine.tick(), TickOutcome::Released);
        assert!(!engine.needs_tick());
        assert_eq!(log.lock().unwrap().reader_closes, 1);
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_stop_when_not_playing_is_noop() {
        let mut engine = PlaybackEngine::new((16, 12));
        assert!(!engine.stop());
        assert_eq!(engine.state(), PlaybackState::NotStarted);
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_stop_then_play_restarts_from_first_frame() {
        let log = MediaLog::shared();
        let media = media(&log, 5);
        let mut engine = PlaybackEngine::new((16, 12));

        engine.play(Path::new(ARTIFACT), &media).unwrap();
        engine.tick();
        engine.tick();
        engine.tick();
        engine.stop();
        assert!(engine.play(Path::new(ARTIFACT), &media).unwrap());

        {
            let log = log.lock().unwrap();
            assert_eq!(log.reader_opens, 2);
            assert_eq!(log.reader_closes, 1);
        }
        assert_eq!(shown_level(engine.tick()), 0);
    }

    #[test]
    fn test_end_of_stream_stops_and_releases() {
        let log = MediaLog::shared();
        let media = media(&log, 2);
        let mut engine = PlaybackEngine::new((16, 12));

        engine.play(Path::new(ARTIFACT), &media).unwrap();
        shown_level(engine.tick());
        shown_level(engine.tick());
        assert_eq!(engine.tick(), TickOutcome::EndOfStream);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert!(!engine.needs_tick());
        assert_eq!(log.lock().unwrap().reader_closes, 1);

        assert!(engine.play(Path::new(ARTIFACT), &media).unwrap());
        assert_eq!(shown_level(engine.tick()), 0);
    }

    #[test]
    fn test_decode_failure_ends_playback() {
        let log = MediaLog::shared();
        let mut media = media(&log, 5);
        media.fail_read_at = Some(1);
        let mut engine = PlaybackEngine::new((16, 12));

        engine.play(Path::new(ARTIFACT), &media).unwrap();
        shown_level(engine.tick());
        assert_eq!(engine.tick(), TickOutcome::EndOfStream);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(log.lock().unwrap().reader_closes, 1);
    }

    #[test]
    fn test_missing_artifact_fails_without_state_change() {
        let log = MediaLog::shared();
        let media = media(&log, 2);
        let mut engine = PlaybackEngine::new((16, 12));

        let err = engine
            .play(Path::new("outputs/missing.mp4"), &media)
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceOpen { .. }));
        assert_eq!(engine.state(), PlaybackState::NotStarted);
        assert!(!engine.needs_tick());
    }

    #[test]
    fn test_reset_releases_immediately() {
        let log = MediaLog::shared();
        let media = media(&log, 5);
        let mut engine = PlaybackEngine::new((16, 12));

        engine.play(Path::new(ARTIFACT), &media).unwrap();
        engine.reset();
        assert_eq!(engine.state(), PlaybackState::NotStarted);
        assert_eq!(log.lock().unwrap().reader_closes, 1);
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }
}

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use detectview_core::detection::infrastructure::annotator_factory::{
    build_annotator, DetectorConfig,
};
use detectview_core::detection::infrastructure::onnx_yolo_detector::{
    DEFAULT_CONFIDENCE, DEFAULT_IOU,
};
use detectview_core::pipeline::display_surface::DisplaySurface;
use detectview_core::playback::tick_scheduler::TickScheduler;
use detectview_core::session::session_config::SessionConfig;
use detectview_core::session::session_controller::SessionController;
use detectview_core::shared::constants::{
    DEFAULT_OUTPUT_DIR, DISPLAY_HEIGHT, DISPLAY_WIDTH, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use detectview_core::shared::display_image::DisplayImage;
use detectview_core::shared::media_handle::MediaKind;
use detectview_core::video::domain::image_writer::ImageWriter;
use detectview_core::video::infrastructure::ffmpeg_media_io::FfmpegMediaIo;
use detectview_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Object detection for images and videos.
#[derive(Parser, Debug)]
#[command(name = "detectview")]
struct Cli {
    /// Input image (jpg, jpeg, png) or video (mp4, avi, mov, mkv).
    input: PathBuf,

    /// Directory processed videos are written to.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// ONNX model to use instead of the downloaded default.
    #[arg(long)]
    model: Option<PathBuf>,

    /// TrueType font for box labels (defaults to a system font).
    #[arg(long)]
    label_font: Option<PathBuf>,

    /// Minimum detection confidence (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// IoU threshold for non-maximum suppression (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_IOU)]
    iou: f64,

    /// Display size as WIDTHxHEIGHT.
    #[arg(long, default_value_t = format!("{DISPLAY_WIDTH}x{DISPLAY_HEIGHT}"))]
    display_size: String,

    /// Save the last displayed image to this file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Play the processed video after processing (videos only).
    #[arg(long)]
    play: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let display_size = parse_display_size(&cli.display_size)?;

    let detector_config = DetectorConfig {
        confidence: cli.confidence,
        iou_threshold: cli.iou,
        model_path: cli.model.clone(),
        label_font: cli.label_font.clone(),
    };
    let annotator = build_annotator(&detector_config, Some(Box::new(download_progress)))?;

    let config = SessionConfig {
        output_dir: cli.output_dir.clone(),
        display_size,
        ..SessionConfig::default()
    };
    let mut session = SessionController::new(
        LogSurface::default(),
        annotator,
        Box::new(FfmpegMediaIo),
        config,
    )?;

    session.upload(&cli.input)?;
    session.process_to_completion()?;
    if let Some(artifact) = session.artifact() {
        log::info!("Output written to {}", artifact.display());
    }

    if cli.play {
        play_to_end(&mut session)?;
    }
    if let Some(path) = &cli.snapshot {
        write_snapshot(session.surface(), path)?;
    }
    Ok(())
}

/// Plays the artifact on the tick scheduler until the stream ends.
fn play_to_end(
    session: &mut SessionController<LogSurface>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scheduler = TickScheduler::new(session.config().playback_tick);
    session.play()?;
    scheduler.start();
    while session.needs_tick() && scheduler.wait() {
        session.tick()?;
    }
    scheduler.stop();
    log::info!("Played {} frames", session.surface().frames_shown);
    Ok(())
}

fn write_snapshot(surface: &LogSurface, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = surface
        .last_image
        .as_ref()
        .ok_or("Nothing was displayed; no snapshot written")?;
    ImageFileWriter::new().write(path, image)?;
    log::info!("Snapshot written to {}", path.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.iou) {
        return Err(format!("IoU must be between 0.0 and 1.0, got {}", cli.iou).into());
    }
    let kind = MediaKind::from_path(&cli.input).ok_or_else(|| {
        format!(
            "Unsupported input type: {} (expected {} or {})",
            cli.input.display(),
            IMAGE_EXTENSIONS.join(", "),
            VIDEO_EXTENSIONS.join(", ")
        )
    })?;
    if cli.play && kind != MediaKind::Video {
        return Err("--play requires a video input".into());
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(font) = &cli.label_font {
        if !font.is_file() {
            return Err(format!("Label font not found: {}", font.display()).into());
        }
    }
    Ok(())
}

fn parse_display_size(value: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("Display size must look like 640x480, got '{value}'");
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}

/// Terminal stand-in for a display: prints status lines and keeps the
/// last image around for `--snapshot`.
#[derive(Default)]
struct LogSurface {
    last_image: Option<DisplayImage>,
    frames_shown: usize,
    progress_line: bool,
}

impl LogSurface {
    fn end_progress_line(&mut self) {
        if self.progress_line {
            eprintln!();
            self.progress_line = false;
        }
    }
}

impl DisplaySurface for LogSurface {
    fn show(&mut self, image: &DisplayImage) {
        self.last_image = Some(image.clone());
        self.frames_shown += 1;
    }

    fn clear(&mut self) {
        self.last_image = None;
    }

    fn show_status(&mut self, text: &str) {
        if text.starts_with("Processing video:") {
            eprint!("\r{text}");
            self.progress_line = true;
        } else {
            self.end_progress_line();
            eprintln!("{text}");
        }
    }

    fn clear_status(&mut self) {
        self.end_progress_line();
    }

    fn set_playback_controls(&mut self, visible: bool) {
        log::debug!("Playback available: {visible}");
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.end_progress_line();
        log::error!("{title}: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("detectview").chain(args.iter().copied())).unwrap()
    }

    fn touch(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[rstest]
    #[case("640x480", (640, 480))]
    #[case("1280X720", (1280, 720))]
    #[case(" 32 x 24 ", (32, 24))]
    fn test_parse_display_size(#[case] input: &str, #[case] expected: (u32, u32)) {
        assert_eq!(parse_display_size(input).unwrap(), expected);
    }

    #[rstest]
    #[case("640")]
    #[case("0x480")]
    #[case("640x")]
    #[case("axb")]
    #[case("-1x480")]
    fn test_parse_display_size_rejects(#[case] input: &str) {
        assert!(parse_display_size(input).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["clip.mp4"]);
        assert_eq!(cli.output_dir, PathBuf::from("outputs"));
        assert_eq!(cli.confidence, 0.25);
        assert_eq!(cli.iou, 0.45);
        assert_eq!(cli.display_size, "640x480");
        assert!(!cli.play);
        assert!(cli.snapshot.is_none());
        assert!(cli.label_font.is_none());
    }

    #[test]
    fn test_validate_accepts_existing_video_with_play() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "clip.mp4");
        assert!(validate(&parse(&[input.as_str(), "--play"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let err = validate(&parse(&["/nonexistent/clip.mp4"])).unwrap_err();
        assert!(err.to_string().starts_with("Input file not found"));
    }

    #[rstest]
    #[case("--confidence", "1.5")]
    #[case("--confidence", "1.01")]
    #[case("--iou", "2")]
    fn test_validate_rejects_out_of_range(#[case] flag: &str, #[case] value: &str) {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "photo.jpg");
        assert!(validate(&parse(&[input.as_str(), flag, value])).is_err());
    }

    #[rstest]
    #[case("notes.txt")]
    #[case("archive.tar.gz")]
    #[case("README")]
    fn test_validate_rejects_unsupported_input(#[case] name: &str) {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, name);
        let err = validate(&parse(&[input.as_str()])).unwrap_err();
        assert!(err.to_string().starts_with("Unsupported input type"));
    }

    #[test]
    fn test_validate_rejects_missing_label_font() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "photo.jpg");
        let err =
            validate(&parse(&[input.as_str(), "--label-font", "/nonexistent/f.ttf"])).unwrap_err();
        assert!(err.to_string().starts_with("Label font not found"));
    }

    #[test]
    fn test_validate_rejects_play_for_images() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "photo.png");
        let err = validate(&parse(&[input.as_str(), "--play"])).unwrap_err();
        assert_eq!(err.to_string(), "--play requires a video input");
    }

    #[test]
    fn test_validate_rejects_missing_model() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "photo.png");
        let err = validate(&parse(&[input.as_str(), "--model", "/nonexistent/m.onnx"])).unwrap_err();
        assert!(err.to_string().starts_with("Model file not found"));
    }

    #[test]
    fn test_log_surface_keeps_last_image() {
        let mut surface = LogSurface::default();
        let image = DisplayImage::from_frame(
            &detectview_core::shared::frame::Frame::filled(4, 4, [1, 2, 3], 0),
            4,
            4,
        )
        .unwrap();
        surface.show(&image);
        surface.show(&image);
        assert_eq!(surface.frames_shown, 2);
        assert!(surface.last_image.is_some());
        surface.clear();
        assert!(surface.last_image.is_none());
    }

    #[test]
    fn test_snapshot_without_image_fails() {
        let dir = TempDir::new().unwrap();
        let err = write_snapshot(&LogSurface::default(), &dir.path().join("s.png")).unwrap_err();
        assert!(err.to_string().contains("no snapshot"));
    }

    #[test]
    fn test_snapshot_writes_png() {
        let dir = TempDir::new().unwrap();
        let mut surface = LogSurface::default();
        let image = DisplayImage::from_frame(
            &detectview_core::shared::frame::Frame::filled(8, 6, [9, 9, 9], 0),
            8,
            6,
        )
        .unwrap();
        surface.show(&image);
        let path = dir.path().join("snap.png");
        write_snapshot(&surface, &path).unwrap();
        assert!(path.is_file());
    }
}

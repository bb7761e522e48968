use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use iced::widget::{button, column, container, image, row, text};
use iced::{Element, Length, Subscription, Task};

use detectview_core::pipeline::pipeline_logger::NullPipelineLogger;
use detectview_core::session::session_controller::SessionController;
use detectview_core::shared::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use detectview_core::video::infrastructure::ffmpeg_media_io::FfmpegMediaIo;

use crate::settings::Settings;
use crate::surface::IcedSurface;
use crate::workers::model_loader::{self, LoaderMessage};

const LOADER_POLL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    SelectFile,
    FileSelected(Option<PathBuf>),
    Play,
    Stop,
    CancelProcessing,
    PumpProcessing,
    PlaybackTick,
    PollLoader,
    ErrorDismissed,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    settings: Settings,
    /// Created once the model is loaded.
    session: Option<SessionController<IcedSurface>>,
    loader: Option<Receiver<LoaderMessage>>,
    loading_status: String,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let loader = model_loader::spawn(settings.detector_config());
        (
            Self {
                settings,
                session: None,
                loader: Some(loader),
                loading_status: "Loading detection model...".to_string(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        let task = match message {
            Message::PollLoader => {
                self.poll_loader();
                Task::none()
            }
            Message::SelectFile => Task::perform(
                async {
                    let dialog = upload_filters().into_iter().fold(
                        rfd::AsyncFileDialog::new().set_title("Upload Image or Video"),
                        |dialog, (name, extensions)| {
                            dialog.add_filter(name, extensions.as_slice())
                        },
                    );
                    dialog.pick_file().await.map(|h| h.path().to_path_buf())
                },
                Message::FileSelected,
            ),
            Message::FileSelected(Some(path)) => match self.session.as_mut() {
                Some(session) => match session.upload(&path) {
                    Ok(()) if session.is_processing() => Task::done(Message::PumpProcessing),
                    Ok(()) => Task::none(),
                    Err(e) => {
                        log::warn!("Upload of {} failed: {e}", path.display());
                        Task::none()
                    }
                },
                None => Task::none(),
            },
            Message::FileSelected(None) => Task::none(),
            Message::PumpProcessing => match self.session.as_mut().map(|s| s.pump()) {
                Some(Ok(true)) => Task::done(Message::PumpProcessing),
                Some(Err(e)) => {
                    log::warn!("Processing failed: {e}");
                    Task::none()
                }
                _ => Task::none(),
            },
            Message::CancelProcessing => {
                if let Some(session) = self.session.as_mut() {
                    if let Err(e) = session.cancel_processing() {
                        log::warn!("Cancel failed: {e}");
                    }
                }
                Task::none()
            }
            Message::Play => {
                if let Some(Err(e)) = self.session.as_mut().map(|s| s.play()) {
                    log::warn!("Play failed: {e}");
                }
                Task::none()
            }
            Message::Stop => {
                if let Some(Err(e)) = self.session.as_mut().map(|s| s.stop()) {
                    log::warn!("Stop failed: {e}");
                }
                Task::none()
            }
            Message::PlaybackTick => {
                if let Some(Err(e)) = self.session.as_mut().map(|s| s.tick()) {
                    log::warn!("Playback tick failed: {e}");
                }
                Task::none()
            }
            Message::ErrorDismissed => Task::none(),
        };

        match self.session.as_mut().and_then(|s| s.surface_mut().take_error()) {
            Some((title, message)) => Task::batch([task, error_dialog(title, message)]),
            None => task,
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let Some(session) = self.session.as_ref() else {
            return container(text(self.loading_status.as_str()).size(16))
                .center(Length::Fill)
                .into();
        };
        let surface = session.surface();

        let upload = button(text("Upload Image or Video"))
            .on_press(Message::SelectFile)
            .padding([8, 16])
            .style(button::primary);

        let display: Element<'_, Message> = match surface.image() {
            Some(handle) => image(handle.clone())
                .width(DISPLAY_WIDTH as f32)
                .height(DISPLAY_HEIGHT as f32)
                .into(),
            None => text("No media loaded").into(),
        };
        let display = container(display)
            .width(DISPLAY_WIDTH as f32)
            .height(DISPLAY_HEIGHT as f32)
            .center_x(DISPLAY_WIDTH as f32)
            .center_y(DISPLAY_HEIGHT as f32)
            .style(container::bordered_box);

        let mut controls = row![].spacing(8);
        if surface.controls_visible() {
            controls = controls
                .push(button(text("Play")).on_press(Message::Play))
                .push(
                    button(text("Stop"))
                        .on_press(Message::Stop)
                        .style(button::secondary),
                );
        }
        if session.is_processing() {
            controls = controls.push(
                button(text("Cancel"))
                    .on_press(Message::CancelProcessing)
                    .style(button::danger),
            );
        }

        column![
            upload,
            display,
            text(surface.status().unwrap_or_default()).size(14),
            controls,
        ]
        .spacing(12)
        .padding(16)
        .align_x(iced::Alignment::Center)
        .width(Length::Fill)
        .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = Vec::new();
        if self.loader.is_some() {
            subscriptions.push(iced::time::every(LOADER_POLL).map(|_| Message::PollLoader));
        }
        if let Some(session) = self.session.as_ref().filter(|s| s.needs_tick()) {
            subscriptions.push(
                iced::time::every(session.config().playback_tick).map(|_| Message::PlaybackTick),
            );
        }
        Subscription::batch(subscriptions)
    }

    fn poll_loader(&mut self) {
        let Some(rx) = self.loader.clone() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(LoaderMessage::DownloadProgress(downloaded, total)) => {
                    self.loading_status = if total > 0 {
                        let pct = downloaded as f64 / total as f64 * 100.0;
                        format!("Downloading detection model... {pct:.0}%")
                    } else {
                        format!("Downloading detection model... {downloaded} bytes")
                    };
                }
                Ok(LoaderMessage::Ready(annotator)) => {
                    self.loader = None;
                    match SessionController::new(
                        IcedSurface::default(),
                        annotator,
                        Box::new(FfmpegMediaIo),
                        self.settings.session_config(),
                    ) {
                        Ok(session) => {
                            log::info!("Detection model ready");
                            self.session = Some(
                                session.with_pipeline_logger(|| Box::new(NullPipelineLogger)),
                            );
                        }
                        Err(e) => self.loading_status = format!("Invalid settings: {e}"),
                    }
                    return;
                }
                Ok(LoaderMessage::Failed(reason)) => {
                    log::error!("Model failed to load: {reason}");
                    self.loading_status = format!("Model failed to load: {reason}");
                    self.loader = None;
                    return;
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.loading_status = "Model loader stopped unexpectedly".to_string();
                    self.loader = None;
                    return;
                }
            }
        }
    }
}

/// File dialog filters. "All files" keeps other types selectable so the
/// session can reject them with a message.
fn upload_filters() -> Vec<(&'static str, Vec<&'static str>)> {
    let media = IMAGE_EXTENSIONS
        .iter()
        .chain(VIDEO_EXTENSIONS)
        .copied()
        .collect();
    vec![("Images and Videos", media), ("All files", vec!["*"])]
}

fn error_dialog(title: String, message: String) -> Task<Message> {
    Task::perform(
        async move {
            rfd::AsyncMessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title(title)
                .set_description(message)
                .set_buttons(rfd::MessageButtons::Ok)
                .show()
                .await
        },
        |_| Message::ErrorDismissed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_filters_list_media_first_then_everything() {
        let filters = upload_filters();
        assert_eq!(filters.len(), 2);

        let (name, media) = &filters[0];
        assert_eq!(*name, "Images and Videos");
        for ext in IMAGE_EXTENSIONS.iter().chain(VIDEO_EXTENSIONS) {
            assert!(media.contains(ext), "missing {ext}");
        }
        assert_eq!(filters[1], ("All files", vec!["*"]));
    }
}

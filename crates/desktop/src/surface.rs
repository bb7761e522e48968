use iced::widget::image;

use detectview_core::pipeline::display_surface::DisplaySurface;
use detectview_core::shared::display_image::DisplayImage;

/// Display state the view renders from. Errors are queued until the app
/// turns them into a dialog.
#[derive(Default)]
pub struct IcedSurface {
    image: Option<image::Handle>,
    status: Option<String>,
    controls_visible: bool,
    pending_error: Option<(String, String)>,
}

impl IcedSurface {
    pub fn image(&self) -> Option<&image::Handle> {
        self.image.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn take_error(&mut self) -> Option<(String, String)> {
        self.pending_error.take()
    }
}

impl DisplaySurface for IcedSurface {
    fn show(&mut self, frame: &DisplayImage) {
        self.image = Some(image::Handle::from_rgba(
            frame.width(),
            frame.height(),
            frame.pixels().to_vec(),
        ));
    }

    fn clear(&mut self) {
        self.image = None;
    }

    fn show_status(&mut self, text: &str) {
        self.status = Some(text.to_string());
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn set_playback_controls(&mut self, visible: bool) {
        self.controls_visible = visible;
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.pending_error = Some((title.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detectview_core::shared::frame::Frame;

    #[test]
    fn test_show_and_clear() {
        let mut surface = IcedSurface::default();
        let frame = Frame::filled(4, 4, [1, 2, 3], 0);
        surface.show(&DisplayImage::from_frame(&frame, 4, 4).unwrap());
        assert!(surface.image().is_some());

        surface.clear();
        surface.clear();
        assert!(surface.image().is_none());
    }

    #[test]
    fn test_status_last_writer_wins() {
        let mut surface = IcedSurface::default();
        surface.show_status("Processing video: 10.00%");
        surface.show_status("Processing video: 20.00%");
        assert_eq!(surface.status(), Some("Processing video: 20.00%"));
        surface.clear_status();
        surface.clear_status();
        assert!(surface.status().is_none());
    }

    #[test]
    fn test_error_is_taken_once() {
        let mut surface = IcedSurface::default();
        surface.show_error("Unsupported File", "nope");
        assert_eq!(
            surface.take_error(),
            Some(("Unsupported File".to_string(), "nope".to_string()))
        );
        assert!(surface.take_error().is_none());
    }

    #[test]
    fn test_controls_toggle() {
        let mut surface = IcedSurface::default();
        assert!(!surface.controls_visible());
        surface.set_playback_controls(true);
        assert!(surface.controls_visible());
    }
}

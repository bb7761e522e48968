use crate::shared::display_image::DisplayImage;

/// Where the session sends everything the user should see.
///
/// Front-ends implement this: the desktop app keeps the latest image and
/// status for its next render, the CLI logs them. All calls come from the
/// thread that owns the session.
pub trait DisplaySurface {
    /// Replace the displayed image.
    fn show(&mut self, image: &DisplayImage);

    /// Remove the displayed image.
    fn clear(&mut self);

    fn show_status(&mut self, text: &str);

    fn clear_status(&mut self);

    /// Show or hide the Play/Stop controls.
    fn set_playback_controls(&mut self, visible: bool);

    /// Present a blocking-style error message to the user.
    fn show_error(&mut self, title: &str, message: &str);
}

use std::path::Path;

use crate::shared::display_image::DisplayImage;

/// Saves a displayed image to disk.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, image: &DisplayImage) -> Result<(), Box<dyn std::error::Error>>;
}

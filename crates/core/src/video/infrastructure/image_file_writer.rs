use std::path::Path;

use crate::shared::display_image::DisplayImage;
use crate::video::domain::image_writer::ImageWriter;

/// Saves display images with the `image` crate; the format follows the
/// file extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, image: &DisplayImage) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let rgba = image::RgbaImage::from_raw(image.width(), image.height(), image.pixels().to_vec())
            .ok_or("Failed to create image from display buffer")?;
        // JPEG has no alpha channel; display images are opaque anyway.
        image::DynamicImage::ImageRgba8(rgba).to_rgb8().save(path)?;
        Ok(())
    }
}

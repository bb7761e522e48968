use crate::shared::frame::Frame;

/// An RGBA8 image at the fixed display resolution, ready for a display sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl DisplayImage {
    /// Resizes an RGB frame to `width` x `height` and converts it to RGBA.
    pub fn from_frame(
        frame: &Frame,
        width: u32,
        height: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if frame.channels() != 3 || !frame.is_well_formed() {
            return Err(format!(
                "frame {} is not a {}x{} RGB buffer",
                frame.index(),
                frame.width(),
                frame.height()
            )
            .into());
        }
        if width == 0 || height == 0 {
            return Err("display size must be positive".into());
        }

        let rgb = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        let rgb = if (rgb.width(), rgb.height()) == (width, height) {
            rgb
        } else {
            image::imageops::resize(&rgb, width, height, image::imageops::FilterType::Triangle)
        };
        let rgba = image::DynamicImage::ImageRgb8(rgb).into_rgba8();

        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ]
    }
}

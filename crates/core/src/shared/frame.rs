use image::RgbImage;
use ndarray::ArrayView3;

/// A single decoded image: contiguous RGB bytes in row-major order.
///
/// Decoders convert to RGB24 on the way in and encoders convert back on the
/// way out; everything between treats the buffer as plain pixels. `index`
/// is the frame's position in its source (0 for a still image).
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A frame filled with one RGB color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True when the buffer length agrees with the declared dimensions.
    ///
    /// Frames built by this crate always satisfy this; frames coming back
    /// from an external annotator are checked before they reach a sink.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.channels as usize
    }

    /// Lends the pixels to `draw` as an [`RgbImage`] and takes them back.
    /// Returns false, leaving the frame untouched, unless it is well-formed RGB.
    pub fn draw_rgb(&mut self, draw: impl FnOnce(&mut RgbImage)) -> bool {
        if self.channels != 3 || !self.is_well_formed() {
            return false;
        }
        let data = std::mem::take(&mut self.data);
        let Some(mut img) = RgbImage::from_raw(self.width, self.height, data) else {
            return false;
        };
        draw(&mut img);
        self.data = img.into_raw();
        true
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }
}

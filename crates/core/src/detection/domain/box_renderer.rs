use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Per-class outline colors, cycled by class id.
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

const MIN_LINE_WIDTH: u32 = 2;
/// Label glyph height per pixel of outline width, and its floor.
const LABEL_SCALE_PER_LINE: f32 = 6.0;
const MIN_LABEL_SCALE: f32 = 12.0;
const LABEL_PAD: u32 = 2;
/// Rough advance of one glyph relative to its height, used to size tags
/// when no font is loaded.
const FALLBACK_GLYPH_ASPECT: f32 = 0.55;

/// Draws detection boxes into RGB frames in place: a colored outline per
/// box and a filled tag holding `"<class> <confidence>"` on its top edge.
#[derive(Clone, Debug, Default)]
pub struct BoxRenderer {
    line_width: Option<u32>,
    font: Option<FontArc>,
}

impl BoxRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed outline width instead of one scaled to the frame.
    pub fn with_line_width(line_width: u32) -> Self {
        Self {
            line_width: Some(line_width.max(1)),
            font: None,
        }
    }

    /// Font for the label text. Without one, tags are drawn without text.
    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn color_for(class_id: usize) -> [u8; 3] {
        PALETTE[class_id % PALETTE.len()]
    }

    /// Outline width for a frame: 0.3% of the mean side, at least 2 px.
    pub fn line_width_for(&self, width: u32, height: u32) -> u32 {
        if let Some(lw) = self.line_width {
            return lw;
        }
        let scaled = ((width + height) as f64 / 2.0 * 0.003).round() as u32;
        scaled.max(MIN_LINE_WIDTH)
    }

    /// Height of the label tag drawn for outline width `lw`.
    pub fn label_height_for(lw: u32) -> u32 {
        label_scale(lw).ceil() as u32 + 2 * LABEL_PAD
    }

    pub fn draw(&self, frame: &mut Frame, detections: &[Detection]) {
        if frame.width() == 0 || frame.height() == 0 || detections.is_empty() {
            return;
        }
        let lw = self.line_width_for(frame.width(), frame.height());
        let drawn = frame.draw_rgb(|img| {
            for det in detections {
                if let Some(rect) = clamp_box(det, img.width(), img.height()) {
                    let color = Self::color_for(det.class_id);
                    draw_outline(img, rect, lw, color);
                    self.draw_label(img, rect, lw, color, &det.tag_text());
                }
            }
        });
        debug_assert!(drawn, "box renderer expects well-formed RGB frames");
    }

    fn draw_label(
        &self,
        img: &mut RgbImage,
        rect: PixelRect,
        lw: u32,
        color: [u8; 3],
        text: &str,
    ) {
        let scale = PxScale::from(label_scale(lw));
        let text_width = match &self.font {
            Some(font) => text_size(scale, font, text).0,
            None => (text.chars().count() as f32 * scale.x * FALLBACK_GLYPH_ASPECT).ceil() as u32,
        };
        let tag_w = text_width + 2 * LABEL_PAD;
        let tag_h = Self::label_height_for(lw);

        // Above the box when it fits, otherwise inside its top edge.
        let left = rect.0;
        let top = if rect.1 >= tag_h { rect.1 - tag_h } else { rect.1 };
        draw_filled_rect_mut(
            img,
            Rect::at(left as i32, top as i32).of_size(tag_w, tag_h),
            Rgb(color),
        );
        if let Some(font) = &self.font {
            draw_text_mut(
                img,
                Rgb(text_color_for(color)),
                (left + LABEL_PAD) as i32,
                (top + LABEL_PAD) as i32,
                scale,
                font,
                text,
            );
        }
    }
}

fn label_scale(lw: u32) -> f32 {
    (lw as f32 * LABEL_SCALE_PER_LINE).max(MIN_LABEL_SCALE)
}

/// Black text on light tags, white on dark ones.
fn text_color_for([r, g, b]: [u8; 3]) -> [u8; 3] {
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > 150.0 {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}

/// Inclusive pixel rectangle `(x0, y0, x1, y1)`.
type PixelRect = (u32, u32, u32, u32);

fn clamp_box(det: &Detection, width: u32, height: u32) -> Option<PixelRect> {
    if ![det.x1, det.y1, det.x2, det.y2].iter().all(|v| v.is_finite()) {
        return None;
    }
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    let x0 = det.x1.round().clamp(0.0, max_x) as u32;
    let y0 = det.y1.round().clamp(0.0, max_y) as u32;
    let x1 = det.x2.round().clamp(0.0, max_x) as u32;
    let y1 = det.y2.round().clamp(0.0, max_y) as u32;
    if x1 < x0 || y1 < y0 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// Nested one-pixel outlines, `lw` deep, growing inwards.
fn draw_outline(img: &mut RgbImage, (x0, y0, x1, y1): PixelRect, lw: u32, color: [u8; 3]) {
    for inset in 0..lw {
        let w = (x1 - x0 + 1).saturating_sub(2 * inset);
        let h = (y1 - y0 + 1).saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((x0 + inset) as i32, (y0 + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(img, rect, Rgb(color));
    }
}

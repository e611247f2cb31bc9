use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::video::frame::SelectedFrame;

const MIN_TEXT_SCALE: f32 = 16.0;
/// Text is 1/24 of the frame height.
const TEXT_SCALE_DIVISOR: f32 = 24.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BACKDROP_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const MARGIN: i32 = 10;
const PADDING: u32 = 6;

/// Stamps the selection label onto a copy of each selected frame.
pub struct FrameAnnotator {
    font: FontVec,
}

impl FrameAnnotator {
    /// Load a TrueType/OpenType font. Returns `None` (with a warning) if it can't be used.
    pub fn load(path: &Path) -> Option<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(?path, error = %e, "failed to read font file, frames will not be annotated");
                return None;
            }
        };
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                info!(?path, "loaded annotation font");
                Some(Self { font })
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to parse font file, frames will not be annotated");
                None
            }
        }
    }

    /// Copy of the frame with its label drawn in the top-left corner.
    pub fn annotate(&self, frame: &SelectedFrame) -> RgbImage {
        let mut img = frame.image.clone();
        let text = overlay_text(frame);
        let scale = PxScale::from(text_scale(img.height()));

        let (w, h) = text_size(scale, &self.font, &text);
        let backdrop = Rect::at(MARGIN - PADDING as i32, MARGIN - PADDING as i32)
            .of_size(w + 2 * PADDING, h + 2 * PADDING);
        draw_filled_rect_mut(&mut img, backdrop, BACKDROP_COLOR);
        draw_text_mut(&mut img, TEXT_COLOR, MARGIN, MARGIN, scale, &self.font, &text);

        img
    }
}

fn overlay_text(frame: &SelectedFrame) -> String {
    format!("#{:04}  t={:.2}s", frame.sequence, frame.timestamp_seconds)
}

fn text_scale(frame_height: u32) -> f32 {
    (frame_height as f32 / TEXT_SCALE_DIVISOR).max(MIN_TEXT_SCALE)
}

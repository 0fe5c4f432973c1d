//! Frame annotation.
//!
//! Draws the tracker's box and the suspicion label for each tracked
//! person directly into the frame buffer. Annotation is a per-frame side
//! effect for the current display cycle only; annotated frames are never
//! persisted by this crate.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detect::TrackedBox;
use crate::dwell::TrackId;
use crate::frame::Frame;

/// Default label height in pixels.
pub const DEFAULT_SCALE: f32 = 24.0;
/// Vertical label offset above the anchor point.
const LABEL_OFFSET_Y: i32 = 10;

/// Text-and-box annotator with a fixed font and scale.
#[derive(Debug)]
pub struct Annotator {
    font: FontVec,
    scale: PxScale,
}

impl Annotator {
    /// Load the annotation font from a TTF/OTF file.
    pub fn from_font_path<P: AsRef<Path>>(path: P, scale: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font file {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow!("{} is not a usable font file", path.display()))?;
        Ok(Self {
            font,
            scale: PxScale::from(scale.max(1.0)),
        })
    }

    /// Draw the tracked box outline (the detector overlay) in `color`.
    pub fn draw_box(&self, frame: &mut Frame, tracked: &TrackedBox, color: Rgb<u8>) {
        let left = (tracked.cx - tracked.w / 2.0).round() as i32;
        let top = (tracked.cy - tracked.h / 2.0).round() as i32;
        let width = tracked.w.round().max(1.0) as u32;
        let height = tracked.h.round().max(1.0) as u32;
        draw_hollow_rect_mut(frame, Rect::at(left, top).of_size(width, height), color);
    }

    /// Draw `"{label} (ID: {id})"` anchored 10px above `(x, y)`.
    pub fn draw_label(
        &self,
        frame: &mut Frame,
        x: i32,
        y: i32,
        label: &str,
        track_id: TrackId,
        color: Rgb<u8>,
    ) {
        let text = format!("{} (ID: {})", label, track_id);
        let text_y = y - LABEL_OFFSET_Y - self.scale.y.round() as i32;
        // Canvas drawing clips out-of-bounds pixels; clamp only the
        // anchor so labels near the top edge stay visible.
        draw_text_mut(
            frame,
            color,
            x.max(0),
            text_y.max(0),
            self.scale,
            &self.font,
            &text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ObjectClass;
    use std::time::UNIX_EPOCH;

    // A font most Linux hosts have; tests that need one skip when absent.
    const TEST_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    fn test_annotator() -> Option<Annotator> {
        if !Path::new(TEST_FONT).exists() {
            eprintln!("skipping: {} not present", TEST_FONT);
            return None;
        }
        Some(Annotator::from_font_path(TEST_FONT, DEFAULT_SCALE).unwrap())
    }

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::from_rgb8(
            vec![0u8; (width * height * 3) as usize],
            width,
            height,
            UNIX_EPOCH,
            0,
        )
        .unwrap()
    }

    #[test]
    fn missing_font_is_an_error() {
        let err = Annotator::from_font_path("/nonexistent/font.ttf", DEFAULT_SCALE).unwrap_err();
        assert!(err.to_string().contains("font"));
    }

    #[test]
    fn draw_box_touches_the_outline() {
        let Some(annotator) = test_annotator() else {
            return;
        };
        let mut frame = black_frame(100, 100);
        let tracked = TrackedBox {
            track_id: 1,
            cx: 50.0,
            cy: 50.0,
            w: 20.0,
            h: 40.0,
            confidence: 0.9,
            class: ObjectClass::Person,
        };
        annotator.draw_box(&mut frame, &tracked, Rgb([0, 255, 0]));
        assert!(frame.pixels().iter().any(|&b| b != 0));
    }

    #[test]
    fn draw_label_writes_pixels() {
        let Some(annotator) = test_annotator() else {
            return;
        };
        let mut frame = black_frame(320, 240);
        annotator.draw_label(&mut frame, 40, 120, "Suspicious", 7, Rgb([255, 0, 0]));
        assert!(frame.pixels().iter().any(|&b| b != 0));
    }

    #[test]
    fn draw_label_near_top_edge_does_not_panic() {
        let Some(annotator) = test_annotator() else {
            return;
        };
        let mut frame = black_frame(320, 240);
        annotator.draw_label(&mut frame, -5, 2, "Normal", 3, Rgb([0, 255, 0]));
    }
}

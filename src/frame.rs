//! Decoded video frames.
//!
//! A `Frame` is an owned, packed RGB8 buffer produced by an ingest source.
//! Frames are mutable on purpose: the annotator draws boxes and labels
//! directly into the buffer for the current display cycle. Nothing in this
//! crate persists a frame to disk or network; annotated frames flow out of
//! the pipeline in `FrameReport` and are dropped by the daemon.

use std::time::SystemTime;

use image::Rgb;
use imageproc::drawing::Canvas;

/// Bytes per pixel for packed RGB8.
const RGB_BYTES: usize = 3;

/// An owned RGB8 frame with capture metadata.
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    /// Wall-clock capture time, used for dwell computation.
    pub captured_at: SystemTime,
    /// Monotonically increasing index assigned by the source.
    pub index: u64,
}

impl Frame {
    /// Wrap a packed RGB8 buffer. Returns `None` when the buffer length
    /// does not match `width * height * 3`.
    pub fn from_rgb8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        captured_at: SystemTime,
        index: u64,
    ) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(RGB_BYTES)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            captured_at,
            index,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read-only pixel access for detector backends.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn pixel_offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * RGB_BYTES
    }
}

/// Annotation draws through `imageproc`'s canvas abstraction, so box and
/// text primitives work on `Frame` without copying into an `RgbImage`.
impl Canvas for Frame {
    type Pixel = Rgb<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        let i = self.pixel_offset(x, y);
        Rgb([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.pixel_offset(x, y);
        self.data[i] = color.0[0];
        self.data[i + 1] = color.0[1];
        self.data[i + 2] = color.0[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn black_frame(width: u32, height: u32) -> Frame {
        let data = vec![0u8; (width * height * 3) as usize];
        Frame::from_rgb8(data, width, height, UNIX_EPOCH, 0).unwrap()
    }

    #[test]
    fn from_rgb8_rejects_wrong_length() {
        assert!(Frame::from_rgb8(vec![0u8; 10], 4, 4, UNIX_EPOCH, 0).is_none());
        assert!(Frame::from_rgb8(vec![0u8; 48], 4, 4, UNIX_EPOCH, 0).is_some());
    }

    #[test]
    fn canvas_round_trips_pixels() {
        let mut frame = black_frame(8, 8);
        frame.draw_pixel(3, 5, Rgb([10, 20, 30]));
        assert_eq!(frame.get_pixel(3, 5), Rgb([10, 20, 30]));
        assert_eq!(frame.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn draw_pixel_ignores_out_of_bounds() {
        let mut frame = black_frame(8, 8);
        frame.draw_pixel(8, 0, Rgb([255, 255, 255]));
        frame.draw_pixel(0, 8, Rgb([255, 255, 255]));
        assert!(frame.pixels().iter().all(|&b| b == 0));
    }
}

use anyhow::Result;

use crate::detect::backend::{ObjectClass, TrackedBox, TrackerBackend};
use crate::dwell::TrackId;

/// Number of synthetic walkers the stub keeps in frame.
const WALKER_COUNT: u32 = 3;
/// Horizontal pixels a walker moves per frame.
const WALKER_STEP: f32 = 2.0;

/// Stub backend for testing and `stub://` streams.
///
/// Synthesizes a handful of "people" pacing horizontally, each with a
/// stable track ID from the first frame on. Deterministic: the same call
/// count always produces the same boxes. Ignores pixel content.
pub struct StubBackend {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl StubBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }

    fn walker_box(&self, walker: u32) -> TrackedBox {
        let w = (self.width as f32 / 10.0).max(8.0);
        let h = (self.height as f32 / 4.0).max(16.0);
        let lane_h = self.height as f32 / (WALKER_COUNT as f32 + 1.0);
        let cy = lane_h * (walker as f32 + 1.0);

        // Walkers pace back and forth across their lane.
        let span = (self.width as f32 - w).max(1.0);
        let phase = (walker as f32) * span / (WALKER_COUNT as f32);
        let travel = (self.frame_count as f32) * WALKER_STEP + phase;
        let lap = travel % (2.0 * span);
        let offset = if lap < span { lap } else { 2.0 * span - lap };
        let cx = w / 2.0 + offset;

        TrackedBox {
            track_id: walker as TrackId + 1,
            cx,
            cy,
            w,
            h,
            confidence: 0.9,
            class: ObjectClass::Person,
        }
    }
}

impl TrackerBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn track(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<TrackedBox>> {
        self.frame_count += 1;
        Ok((0..WALKER_COUNT).map(|i| self.walker_box(i)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_backend_ids_are_persistent() {
        let mut backend = StubBackend::new(640, 480);
        let first = backend.track(&[], 640, 480).unwrap();
        let second = backend.track(&[], 640, 480).unwrap();

        let first_ids: Vec<TrackId> = first.iter().map(|b| b.track_id).collect();
        let second_ids: Vec<TrackId> = second.iter().map(|b| b.track_id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.len(), WALKER_COUNT as usize);
    }

    #[test]
    fn stub_backend_boxes_stay_in_frame() {
        let mut backend = StubBackend::new(320, 240);
        for _ in 0..500 {
            for tracked in backend.track(&[], 320, 240).unwrap() {
                assert!(tracked.cx >= 0.0 && tracked.cx <= 320.0);
                assert!(tracked.cy >= 0.0 && tracked.cy <= 240.0);
                assert_eq!(tracked.class, ObjectClass::Person);
            }
        }
    }

    #[test]
    fn stub_backend_walkers_move() {
        let mut backend = StubBackend::new(640, 480);
        let first = backend.track(&[], 640, 480).unwrap();
        let second = backend.track(&[], 640, 480).unwrap();
        assert_ne!(first[0].cx, second[0].cx);
    }
}

use anyhow::Result;

use crate::dwell::TrackId;

/// Object class of a tracked detection.
///
/// The monitor only classifies dwell for `Person`; other classes pass
/// through for callers that want them.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectClass {
    Person,
    Vehicle,
    Animal,
    Unknown,
}

/// One tracked detection in a frame.
///
/// Coordinates are pixels in the frame the backend was given: `(cx, cy)`
/// is the box center, `w`/`h` its size.
#[derive(Clone, Debug)]
pub struct TrackedBox {
    /// Persistent identifier assigned by the backend. Stable across
    /// frames for the same object while the backend keeps the track.
    pub track_id: TrackId,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class: ObjectClass,
}

impl TrackedBox {
    pub fn center(&self) -> (f32, f32) {
        (self.cx, self.cy)
    }
}

/// Detector/tracker backend trait.
///
/// Implementations consume a read-only RGB8 pixel slice and return the
/// tracked boxes for that frame. They own all tracking state (ID
/// assignment, association, track death). `track` takes `&mut self`
/// because persistent tracking is inherently stateful.
pub trait TrackerBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection and tracking on one frame.
    fn track(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<TrackedBox>>;

    /// Optional warm-up hook (model load checks, first-inference cost).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

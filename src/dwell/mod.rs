//! Dwell-time bookkeeping and classification.
//!
//! This is the bespoke core of the monitor:
//! - `TrackHistory`: per-track center-point history and first-seen time,
//!   keyed by the tracker-assigned ID. An explicit store object, passed
//!   where it is needed, never ambient global state.
//! - `Suspicion`: pure classification of elapsed dwell time into three
//!   ordered labels.

mod history;
mod suspicion;

pub use history::{TrackEntry, TrackHistory, TrackId, MAX_TRACK_POSITIONS};
pub use suspicion::{Suspicion, ANXIOUS_AFTER, SUSPICIOUS_AFTER};

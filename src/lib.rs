//! linger-watch
//!
//! Dwell-time suspicion monitor for live video streams. The monitor pulls
//! frames from a cloud video stream (an AWS Kinesis Video stream resolved
//! to an HLS playback URL, or a synthetic `stub://` source), runs a
//! pluggable person detector/tracker over them, and labels each tracked
//! person by how long they have lingered in frame:
//!
//! - `Normal` below 8 seconds of dwell
//! - `Anxious` from 8 to just under 11 seconds
//! - `Suspicious` from 11 seconds on
//!
//! # Module structure
//!
//! - `ingest`: playback-URL resolution and frame decode (`HlsSource`)
//! - `detect`: tracker backends behind the `TrackerBackend` seam
//! - `dwell`: per-track history and the suspicion classifier (the core)
//! - `annotate`: in-place box/label drawing on frames
//! - `pipeline`: the per-frame orchestration driven by `lingerd`
//!
//! The whole crate is single-threaded and pull-based: one blocking loop,
//! no reconnection, no persistence. A failed source or backend ends the
//! run with an error.

pub mod annotate;
pub mod config;
pub mod detect;
pub mod dwell;
pub mod frame;
pub mod ingest;
pub mod pipeline;

pub use annotate::Annotator;
pub use config::LingerdConfig;
pub use detect::{BackendRegistry, ObjectClass, StubBackend, TrackedBox, TrackerBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use dwell::{Suspicion, TrackHistory, TrackId, MAX_TRACK_POSITIONS};
pub use frame::Frame;
pub use ingest::{HlsConfig, HlsSource, KinesisVideoClient, PlaybackMode};
pub use pipeline::{FrameReport, Pipeline, TrackObservation};

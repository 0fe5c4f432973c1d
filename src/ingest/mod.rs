//! Frame ingestion.
//!
//! - `kinesis`: resolves a named Kinesis Video stream to a live HLS
//!   playback URL (GetDataEndpoint, then GetHLSStreamingSessionURL).
//! - `hls`: decodes frames from the playback URL. `stub://` stream names
//!   skip resolution and produce synthetic frames; real URLs require the
//!   `hls-gstreamer` feature.
//!
//! Ingestion is strictly pull-based and blocking. There is no reconnect
//! or retry: a stalled or failed source ends the run.

pub mod hls;
pub mod kinesis;

pub use hls::{HlsConfig, HlsSource, HlsStats};
pub use kinesis::{KinesisVideoClient, PlaybackMode};

//! HLS frame source.
//!
//! `HlsSource` turns a stream identifier into a sequential frame source:
//! - `stub://` identifiers produce synthetic frames in-process (tests,
//!   default config, no network).
//! - Anything else is treated as a Kinesis Video stream name: the
//!   playback URL is resolved via `ingest::kinesis` and decoded with a
//!   GStreamer `uridecodebin` pipeline (feature `hls-gstreamer`).
//!
//! `next_frame` blocks for the next decoded frame. End of stream is
//! `Ok(None)`; a stall or decode error is an `Err` that ends the run.

#[cfg(feature = "hls-gstreamer")]
use anyhow::Context;
use anyhow::Result;
use std::time::SystemTime;
#[cfg(feature = "hls-gstreamer")]
use std::time::{Duration, Instant};

use crate::frame::Frame;
#[cfg(feature = "hls-gstreamer")]
use crate::ingest::kinesis::KinesisVideoClient;
use crate::ingest::kinesis::PlaybackMode;

/// Configuration for an HLS source.
#[derive(Clone, Debug)]
pub struct HlsConfig {
    /// Kinesis Video stream name, or `stub://<name>` for the synthetic
    /// source.
    pub stream: String,
    /// AWS region for playback-URL resolution.
    pub region: String,
    pub playback_mode: PlaybackMode,
    /// Target frame rate. Real decode paces/timeouts from this; the
    /// synthetic source produces frames on demand.
    pub target_fps: u32,
    /// Frame width (synthetic frames; real decode reports its own).
    pub width: u32,
    /// Frame height (synthetic frames; real decode reports its own).
    pub height: u32,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            stream: "stub://parking_lot".to_string(),
            region: "us-east-1".to_string(),
            playback_mode: PlaybackMode::Live,
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Live HLS frame source.
pub struct HlsSource {
    backend: HlsBackend,
}

enum HlsBackend {
    Synthetic(SyntheticHlsSource),
    #[cfg(feature = "hls-gstreamer")]
    Gstreamer(GstreamerHlsSource),
}

impl HlsSource {
    /// Build a source for the configured stream. For real streams this
    /// resolves the playback URL immediately; resolution failures are
    /// fatal (there is no retry path).
    pub fn open(config: HlsConfig) -> Result<Self> {
        if config.stream.starts_with("stub://") {
            return Ok(Self {
                backend: HlsBackend::Synthetic(SyntheticHlsSource::new(config)),
            });
        }

        #[cfg(feature = "hls-gstreamer")]
        {
            let client = KinesisVideoClient::from_env(&config.region)?;
            let url = client.resolve_hls_url(&config.stream, config.playback_mode)?;
            Ok(Self {
                backend: HlsBackend::Gstreamer(GstreamerHlsSource::new(config, url)?),
            })
        }
        #[cfg(not(feature = "hls-gstreamer"))]
        anyhow::bail!(
            "stream '{}' requires the hls-gstreamer feature",
            config.stream
        )
    }

    /// Start frame delivery.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            HlsBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "hls-gstreamer")]
            HlsBackend::Gstreamer(source) => source.connect(),
        }
    }

    /// Block for the next frame. `Ok(None)` means the stream ended.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            HlsBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "hls-gstreamer")]
            HlsBackend::Gstreamer(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            HlsBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "hls-gstreamer")]
            HlsBackend::Gstreamer(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> HlsStats {
        match &self.backend {
            HlsBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "hls-gstreamer")]
            HlsBackend::Gstreamer(source) => source.stats(),
        }
    }
}

/// Statistics for an HLS source.
#[derive(Clone, Debug)]
pub struct HlsStats {
    pub frames_decoded: u64,
    pub stream: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and the default config
// ----------------------------------------------------------------------------

struct SyntheticHlsSource {
    config: HlsConfig,
    frame_count: u64,
}

impl SyntheticHlsSource {
    fn new(config: HlsConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("HlsSource: connected to {} (synthetic)", self.config.stream);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let pixels = self.generate_synthetic_pixels();
        let frame = Frame::from_rgb8(
            pixels,
            self.config.width,
            self.config.height,
            SystemTime::now(),
            self.frame_count,
        )
        .ok_or_else(|| anyhow::anyhow!("synthetic frame size mismatch"))?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    /// Flat background with a slow per-frame drift, so consecutive frames
    /// differ without any randomness.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> HlsStats {
        HlsStats {
            frames_decoded: self.frame_count,
            stream: self.config.stream.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production HLS decode using GStreamer
// ----------------------------------------------------------------------------

#[cfg(feature = "hls-gstreamer")]
struct GstreamerHlsSource {
    config: HlsConfig,
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    last_error: Option<String>,
    reached_eos: bool,
}

#[cfg(feature = "hls-gstreamer")]
impl GstreamerHlsSource {
    /// Build the decode pipeline:
    /// `uridecodebin ! videoconvert ! video/x-raw,format=RGB ! appsink`.
    ///
    /// The playback URL carries session-token query parameters, so it is
    /// quoted inside the launch description.
    fn new(config: HlsConfig, playback_url: String) -> Result<Self> {
        gstreamer::init().context("initialize gstreamer")?;

        let pipeline_description = format!(
            "uridecodebin uri=\"{}\" ! videoconvert ! video/x-raw,format=RGB ! \
             appsink name=appsink sync=false max-buffers=1 drop=true",
            playback_url
        );
        let pipeline = gstreamer::parse_launch(&pipeline_description)
            .context("build HLS pipeline")?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow::anyhow!("HLS pipeline is not a Pipeline"))?;

        let appsink = pipeline
            .by_name("appsink")
            .context("appsink element missing from pipeline")?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| anyhow::anyhow!("appsink element has unexpected type"))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .build();
        appsink.set_caps(Some(&caps));
        appsink.set_max_buffers(1);
        appsink.set_drop(true);
        appsink.set_sync(false);

        Ok(Self {
            config,
            pipeline,
            appsink,
            frame_count: 0,
            last_frame_at: None,
            connected_at: None,
            last_error: None,
            reached_eos: false,
        })
    }

    fn connect(&mut self) -> Result<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .context("set HLS pipeline to Playing")?;
        self.connected_at = Some(Instant::now());
        log::info!("HlsSource: connected to {}", self.config.stream);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.poll_bus();
        if self.reached_eos {
            return Ok(None);
        }
        if let Some(error) = &self.last_error {
            return Err(anyhow::anyhow!("HLS stream failed: {}", error));
        }

        let timeout = self.frame_timeout();
        let Some(sample) = self
            .appsink
            .try_pull_sample(timeout)
            .context("pull HLS sample")?
        else {
            // Distinguish a quiet end-of-stream from a stall.
            self.poll_bus();
            if self.reached_eos {
                return Ok(None);
            }
            return Err(anyhow::anyhow!("HLS stream stalled"));
        };

        let (pixels, width, height) = sample_to_pixels(&sample)?;

        let frame = Frame::from_rgb8(pixels, width, height, SystemTime::now(), self.frame_count)
            .ok_or_else(|| anyhow::anyhow!("decoded frame size mismatch"))?;
        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() || self.reached_eos {
            return false;
        }
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> HlsStats {
        HlsStats {
            frames_decoded: self.frame_count,
            stream: self.config.stream.clone(),
        }
    }

    fn frame_timeout(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            500
        } else {
            (1000 / self.config.target_fps).saturating_mul(4)
        };
        Duration::from_millis(base_ms.max(500) as u64)
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }

    fn poll_bus(&mut self) {
        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        while let Some(message) = bus.timed_pop(Duration::from_millis(0)) {
            use gstreamer::MessageView;
            match message.view() {
                MessageView::Error(err) => {
                    self.last_error = Some(format!(
                        "gstreamer error from {:?}: {}",
                        err.src().map(|s| s.path_string()),
                        err.error()
                    ));
                }
                MessageView::Eos(..) => {
                    self.reached_eos = true;
                }
                _ => {}
            }
        }
    }
}

#[cfg(feature = "hls-gstreamer")]
fn sample_to_pixels(sample: &gstreamer::Sample) -> Result<(Vec<u8>, u32, u32)> {
    let buffer = sample.buffer().context("HLS sample missing buffer")?;
    let caps = sample.caps().context("HLS sample missing caps")?;
    let info =
        gstreamer_video::VideoInfo::from_caps(caps).context("parse HLS caps as video info")?;

    let width = info.width();
    let height = info.height();
    let row_bytes = (width as usize) * 3;
    let stride = info.stride(0) as usize;

    let map = buffer.map_readable().context("map HLS buffer")?;
    let data = map.as_slice();

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("HLS buffer row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

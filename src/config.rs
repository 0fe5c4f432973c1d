use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::PlaybackMode;

const DEFAULT_STREAM: &str = "stub://parking_lot";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "yolov8m.onnx";
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
const DEFAULT_LABEL_SCALE: f32 = 24.0;

#[derive(Debug, Deserialize, Default)]
struct LingerdConfigFile {
    stream: Option<StreamConfigFile>,
    detector: Option<DetectorConfigFile>,
    annotate: Option<AnnotateConfigFile>,
    history: Option<HistoryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    name: Option<String>,
    region: Option<String>,
    playback_mode: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotateConfigFile {
    enabled: Option<bool>,
    font_path: Option<PathBuf>,
    scale: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct HistoryConfigFile {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LingerdConfig {
    pub stream: StreamSettings,
    pub detector: DetectorSettings,
    pub annotate: AnnotateSettings,
    /// Optional idle TTL for track entries. `None` preserves the
    /// process-lifetime mapping of the original feed.
    pub track_ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Kinesis Video stream name, or `stub://<name>`.
    pub name: String,
    pub region: String,
    pub playback_mode: PlaybackMode,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct AnnotateSettings {
    pub enabled: bool,
    pub font_path: PathBuf,
    pub scale: f32,
}

impl Default for LingerdConfig {
    fn default() -> Self {
        // Infallible: the default file config carries no parseable
        // playback mode or TTL.
        Self::from_file(LingerdConfigFile::default()).expect("default config")
    }
}

impl LingerdConfig {
    /// Load the config: JSON file named by `LINGER_CONFIG` (optional),
    /// then `LINGER_*` environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LINGER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LingerdConfigFile) -> Result<Self> {
        let stream = StreamSettings {
            name: file
                .stream
                .as_ref()
                .and_then(|stream| stream.name.clone())
                .unwrap_or_else(|| DEFAULT_STREAM.to_string()),
            region: file
                .stream
                .as_ref()
                .and_then(|stream| stream.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            playback_mode: file
                .stream
                .as_ref()
                .and_then(|stream| stream.playback_mode.as_deref())
                .map(|mode| mode.parse::<PlaybackMode>())
                .transpose()?
                .unwrap_or_default(),
            target_fps: file
                .stream
                .as_ref()
                .and_then(|stream| stream.target_fps)
                .unwrap_or(DEFAULT_TARGET_FPS),
            width: file
                .stream
                .as_ref()
                .and_then(|stream| stream.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .stream
                .as_ref()
                .and_then(|stream| stream.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: file
                .detector
                .as_ref()
                .and_then(|detector| detector.model_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            confidence: file
                .detector
                .as_ref()
                .and_then(|detector| detector.confidence)
                .unwrap_or(DEFAULT_CONFIDENCE),
        };
        let annotate = AnnotateSettings {
            enabled: file
                .annotate
                .as_ref()
                .and_then(|annotate| annotate.enabled)
                .unwrap_or(true),
            font_path: file
                .annotate
                .as_ref()
                .and_then(|annotate| annotate.font_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_PATH)),
            scale: file
                .annotate
                .as_ref()
                .and_then(|annotate| annotate.scale)
                .unwrap_or(DEFAULT_LABEL_SCALE),
        };
        let track_ttl = file
            .history
            .and_then(|history| history.ttl_secs)
            .map(Duration::from_secs);
        Ok(Self {
            stream,
            detector,
            annotate,
            track_ttl,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(name) = std::env::var("LINGER_STREAM") {
            if !name.trim().is_empty() {
                self.stream.name = name;
            }
        }
        if let Ok(region) = std::env::var("LINGER_REGION") {
            if !region.trim().is_empty() {
                self.stream.region = region;
            }
        }
        if let Ok(mode) = std::env::var("LINGER_PLAYBACK_MODE") {
            if !mode.trim().is_empty() {
                self.stream.playback_mode = mode.parse()?;
            }
        }
        if let Ok(backend) = std::env::var("LINGER_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("LINGER_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("LINGER_FONT_PATH") {
            if !path.trim().is_empty() {
                self.annotate.font_path = PathBuf::from(path);
            }
        }
        if let Ok(ttl) = std::env::var("LINGER_TRACK_TTL_SECS") {
            let seconds: u64 = ttl
                .parse()
                .map_err(|_| anyhow!("LINGER_TRACK_TTL_SECS must be an integer number of seconds"))?;
            self.track_ttl = Some(Duration::from_secs(seconds));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.stream.name.trim().is_empty() {
            return Err(anyhow!("stream name must not be empty"));
        }
        if self.stream.target_fps == 0 {
            return Err(anyhow!("target_fps must be greater than zero"));
        }
        if self.stream.width == 0 || self.stream.height == 0 {
            return Err(anyhow!("frame dimensions must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(anyhow!("detector confidence must be within 0.0..=1.0"));
        }
        if self.annotate.scale <= 0.0 {
            return Err(anyhow!("annotate scale must be positive"));
        }
        if let Some(ttl) = self.track_ttl {
            if ttl.is_zero() {
                return Err(anyhow!("history ttl_secs must be greater than zero"));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LingerdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

//! lingerd - dwell-time suspicion monitor daemon
//!
//! This daemon:
//! 1. Resolves the configured stream to a playback URL (or uses the
//!    synthetic `stub://` source)
//! 2. Pulls frames in a blocking single-threaded loop
//! 3. Runs the configured tracker backend on each frame
//! 4. Records per-track dwell and classifies it (Normal/Anxious/Suspicious)
//! 5. Annotates frames in place and logs level transitions
//!
//! The loop ends on Ctrl-C or when the stream is exhausted. Any source or
//! backend failure propagates out of main and terminates the process;
//! there is no retry or reconnection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use linger_watch::{
    Annotator, BackendRegistry, HlsConfig, HlsSource, LingerdConfig, Pipeline, StubBackend,
    Suspicion, TrackId,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = LingerdConfig::load()?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let registry = build_registry(&cfg)?;
    let backend = registry.select(&cfg.detector.backend)?;
    backend
        .lock()
        .map_err(|_| anyhow!("tracker backend lock poisoned"))?
        .warm_up()?;

    let annotator = if cfg.annotate.enabled {
        Some(Annotator::from_font_path(
            &cfg.annotate.font_path,
            cfg.annotate.scale,
        )?)
    } else {
        None
    };

    let source = HlsSource::open(HlsConfig {
        stream: cfg.stream.name.clone(),
        region: cfg.stream.region.clone(),
        playback_mode: cfg.stream.playback_mode,
        target_fps: cfg.stream.target_fps,
        width: cfg.stream.width,
        height: cfg.stream.height,
    })?;

    let mut pipeline = Pipeline::new(source, backend, annotator, cfg.track_ttl);
    pipeline.connect()?;

    log::info!(
        "lingerd running. stream={} backend={} annotate={}",
        cfg.stream.name,
        cfg.detector.backend,
        cfg.annotate.enabled
    );
    if let Some(ttl) = cfg.track_ttl {
        log::info!("track entries idle longer than {:?} will be pruned", ttl);
    }

    let frame_interval = Duration::from_millis((1000 / cfg.stream.target_fps.max(1)) as u64);
    let mut last_health_log = Instant::now();
    let mut last_levels: HashMap<TrackId, Suspicion> = HashMap::new();

    while running.load(Ordering::SeqCst) {
        let Some(report) = pipeline.step()? else {
            log::info!("stream ended");
            break;
        };

        for obs in &report.observations {
            let previous = last_levels.insert(obs.track_id, obs.level);
            if previous != Some(obs.level) {
                log::info!(
                    "track {} is now {} (dwell {:.1}s, center {:.0},{:.0})",
                    obs.track_id,
                    obs.level,
                    obs.dwell.as_secs_f64(),
                    obs.center.0,
                    obs.center.1
                );
            } else {
                log::debug!(
                    "track {} {} (dwell {:.1}s)",
                    obs.track_id,
                    obs.level,
                    obs.dwell.as_secs_f64()
                );
            }
        }
        // Annotated frame is available to downstream consumers here; the
        // daemon has no display sink, so it is dropped.
        drop(report);

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = pipeline.source_stats();
            log::info!(
                "stream health={} frames={} tracks={}",
                pipeline.source_healthy(),
                stats.frames_decoded,
                pipeline.history().len()
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(frame_interval);
    }

    log::info!("lingerd stopped");
    Ok(())
}

fn build_registry(cfg: &LingerdConfig) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new(cfg.stream.width, cfg.stream.height));

    #[cfg(feature = "backend-tract")]
    if cfg.detector.backend == "tract" {
        let backend = linger_watch::TractBackend::new(
            &cfg.detector.model_path,
            cfg.stream.width,
            cfg.stream.height,
        )?
        .with_threshold(cfg.detector.confidence);
        registry.register(backend);
    }

    Ok(registry)
}

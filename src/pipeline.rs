//! Frame-by-frame orchestration.
//!
//! `Pipeline` owns the frame source, the tracker backend, and the dwell
//! bookkeeping, and exposes the monitor's loop body as a single `step`:
//! pull a frame, run the tracker, record each person's center, classify
//! dwell, annotate, and hand the result back. The daemon drives it in a
//! blocking single-threaded loop; tests drive it directly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::annotate::Annotator;
use crate::detect::{ObjectClass, TrackerBackend};
use crate::dwell::{Suspicion, TrackHistory, TrackId};
use crate::frame::Frame;
use crate::ingest::{HlsSource, HlsStats};

/// One classified track in a processed frame.
#[derive(Clone, Debug)]
pub struct TrackObservation {
    pub track_id: TrackId,
    /// Box center in pixels.
    pub center: (f32, f32),
    /// Elapsed time since the track was first seen.
    pub dwell: Duration,
    pub level: Suspicion,
}

/// A processed frame: the (possibly annotated) buffer plus the per-track
/// classifications. Downstream consumers take the frame from here; the
/// daemon logs the observations and drops it.
pub struct FrameReport {
    pub frame: Frame,
    pub observations: Vec<TrackObservation>,
}

/// The monitor pipeline.
pub struct Pipeline {
    source: HlsSource,
    backend: Arc<Mutex<dyn TrackerBackend>>,
    history: TrackHistory,
    annotator: Option<Annotator>,
    track_ttl: Option<Duration>,
}

impl Pipeline {
    pub fn new(
        source: HlsSource,
        backend: Arc<Mutex<dyn TrackerBackend>>,
        annotator: Option<Annotator>,
        track_ttl: Option<Duration>,
    ) -> Self {
        Self {
            source,
            backend,
            history: TrackHistory::new(),
            annotator,
            track_ttl,
        }
    }

    /// Start frame delivery on the underlying source.
    pub fn connect(&mut self) -> Result<()> {
        self.source.connect()
    }

    /// Process one frame. `Ok(None)` means the source is exhausted and
    /// the loop should end. Errors from the source or the backend
    /// propagate unchanged; there is no retry here.
    pub fn step(&mut self) -> Result<Option<FrameReport>> {
        let Some(mut frame) = self.source.next_frame()? else {
            return Ok(None);
        };
        let now = frame.captured_at;

        let tracked = {
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow!("tracker backend lock poisoned"))?;
            backend.track(frame.pixels(), frame.width(), frame.height())?
        };

        let mut observations = Vec::new();
        for boxed in tracked.iter().filter(|b| b.class == ObjectClass::Person) {
            let (cx, cy) = boxed.center();
            self.history.record(boxed.track_id, cx, cy, now);
            let dwell = self
                .history
                .get(boxed.track_id)
                .map(|entry| entry.dwell(now))
                .unwrap_or_default();
            let level = Suspicion::classify(dwell);

            if let Some(annotator) = &self.annotator {
                let color = level.color();
                annotator.draw_box(&mut frame, boxed, color);
                annotator.draw_label(
                    &mut frame,
                    cx.round() as i32,
                    cy.round() as i32,
                    &level.to_string(),
                    boxed.track_id,
                    color,
                );
            }

            observations.push(TrackObservation {
                track_id: boxed.track_id,
                center: (cx, cy),
                dwell,
                level,
            });
        }

        if let Some(ttl) = self.track_ttl {
            let removed = self.history.prune_stale(now, ttl);
            if removed > 0 {
                log::debug!("pruned {} stale track entries", removed);
            }
        }

        Ok(Some(FrameReport {
            frame,
            observations,
        }))
    }

    /// Dwell bookkeeping, for inspection and tests.
    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn source_healthy(&self) -> bool {
        self.source.is_healthy()
    }

    pub fn source_stats(&self) -> HlsStats {
        self.source.stats()
    }
}

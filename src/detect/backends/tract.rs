#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{ObjectClass, TrackedBox, TrackerBackend};
use crate::dwell::TrackId;

/// COCO class index for "person".
const PERSON_CLASS: u32 = 0;

/// Tract-based person detector with built-in track ID assignment.
///
/// Loads a local ONNX model whose output rows are
/// `[cx, cy, w, h, confidence, class]` in input-pixel coordinates, keeps
/// only person detections above the confidence threshold, and maintains
/// persistent track IDs by nearest-centroid association against the
/// previous frame. IDs are owned here; the dwell core only reads them.
pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    /// Max association distance as a fraction of frame width.
    max_match_distance_ratio: f32,
    previous: Vec<TrackedBox>,
    next_id: TrackId,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.5,
            max_match_distance_ratio: 0.2,
            previous: Vec::new(),
            next_id: 1,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    /// Parse detection rows from the model output. The leading batch axis
    /// is tolerated; rows shorter than 6 columns are an error.
    fn extract_detections(&self, outputs: TVec<TValue>) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = view.shape().to_vec();
        let (rows, cols) = match shape.as_slice() {
            [1, rows, cols] => (*rows, *cols),
            [rows, cols] => (*rows, *cols),
            other => return Err(anyhow!("unexpected model output shape {:?}", other)),
        };
        if cols < 6 {
            return Err(anyhow!(
                "model output rows have {} columns, need [cx, cy, w, h, conf, class]",
                cols
            ));
        }

        let flat = view
            .as_slice()
            .ok_or_else(|| anyhow!("model output is not contiguous"))?;

        let mut detections = Vec::new();
        for row in 0..rows {
            let base = row * cols;
            let confidence = flat[base + 4];
            let class = flat[base + 5] as u32;
            if confidence < self.confidence_threshold || class != PERSON_CLASS {
                continue;
            }
            detections.push(RawDetection {
                cx: flat[base],
                cy: flat[base + 1],
                w: flat[base + 2],
                h: flat[base + 3],
                confidence,
            });
        }
        Ok(detections)
    }

    /// Assign IDs by greedy nearest-centroid matching against the
    /// previous frame. Unmatched detections get fresh IDs.
    fn associate(&mut self, detections: Vec<RawDetection>) -> Vec<TrackedBox> {
        let max_distance = self.max_match_distance_ratio * self.width as f32;
        let mut claimed = vec![false; self.previous.len()];
        let mut tracked = Vec::with_capacity(detections.len());

        for det in detections {
            let mut best: Option<(usize, f32)> = None;
            for (i, prev) in self.previous.iter().enumerate() {
                if claimed[i] {
                    continue;
                }
                let dx = det.cx - prev.cx;
                let dy = det.cy - prev.cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist <= max_distance && best.is_none_or(|(_, d)| dist < d) {
                    best = Some((i, dist));
                }
            }

            let track_id = match best {
                Some((i, _)) => {
                    claimed[i] = true;
                    self.previous[i].track_id
                }
                None => {
                    let id = self.next_id;
                    self.next_id = self.next_id.wrapping_add(1).max(1);
                    id
                }
            };

            tracked.push(TrackedBox {
                track_id,
                cx: det.cx,
                cy: det.cy,
                w: det.w,
                h: det.h,
                confidence: det.confidence,
                class: ObjectClass::Person,
            });
        }

        self.previous = tracked.clone();
        tracked
    }
}

struct RawDetection {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
    confidence: f32,
}

impl TrackerBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn track(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<TrackedBox>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let detections = self.extract_detections(outputs)?;
        Ok(self.associate(detections))
    }
}

//! Scripted camera and pose model for running the pipeline without hardware.

use crate::camera::{CameraDevice, PoseEstimator, PoseModel, VideoFrame, VideoStream};
use crate::config::{CameraConstraints, PoseOptions};
use crate::error::{PipelineError, PipelineResult};
use crate::geometry::CanvasSize;
use crate::landmark::{Landmark, LandmarkIndex, PoseFrame};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Roughly 30 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct SyntheticCamera {
    native: Option<CanvasSize>,
    frame_interval: Duration,
    frame_limit: Option<u64>,
    failure: Option<PipelineError>,
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    /// A camera producing frames every `frame_interval`. `native` of `None` simulates a stream
    /// whose metadata never arrives.
    pub fn new(native: Option<CanvasSize>, frame_interval: Duration) -> Self {
        Self {
            native,
            frame_interval,
            frame_limit: None,
            failure: None,
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A camera whose every open fails with `err`.
    pub fn failing(err: PipelineError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new(None, DEFAULT_FRAME_INTERVAL)
        }
    }

    /// End each stream after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for SyntheticCamera {
    async fn open(&self, constraints: &CameraConstraints) -> PipelineResult<Box<dyn VideoStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if constraints.audio {
            return Err(PipelineError::DeviceUnavailable(
                "synthetic camera has no microphone".into(),
            ));
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            native: self.native,
            interval: self.frame_interval,
            limit: self.frame_limit,
            produced: 0,
            started: Instant::now(),
            live: self.live.clone(),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    native: Option<CanvasSize>,
    interval: Duration,
    limit: Option<u64>,
    produced: u64,
    started: Instant,
    live: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait]
impl VideoStream for SyntheticStream {
    fn native_size(&self) -> Option<CanvasSize> {
        self.native
    }

    async fn next_frame(&mut self) -> Option<VideoFrame> {
        if self.stopped || self.limit.is_some_and(|limit| self.produced >= limit) {
            return None;
        }
        tokio::time::sleep(self.interval).await;
        self.produced += 1;
        Some(VideoFrame {
            sequence: self.produced,
            timestamp: self.started.elapsed(),
        })
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pose model that replays a fixed script of results, cycling when it runs out.
pub struct ScriptedModel {
    script: Arc<[Option<PoseFrame>]>,
    latency: Duration,
    load_error: Option<String>,
    estimates: Arc<AtomicU64>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Option<PoseFrame>>, latency: Duration) -> Self {
        Self {
            script: script.into(),
            latency,
            load_error: None,
            estimates: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A model whose assets fail to load.
    pub fn failing_to_load(reason: impl Into<String>) -> Self {
        Self {
            load_error: Some(reason.into()),
            ..Self::new(Vec::new(), Duration::ZERO)
        }
    }

    /// A lying-down torso swaying slightly, with a body-lost frame every tenth result.
    pub fn demo(latency: Duration) -> Self {
        let script = (0..10)
            .map(|i| {
                if i == 9 {
                    None
                } else {
                    Some(torso_frame(f64::from(i) * 0.004))
                }
            })
            .collect();
        Self::new(script, latency)
    }

    /// Completed inferences across all estimators loaded from this model.
    pub fn estimate_count(&self) -> u64 {
        self.estimates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoseModel for ScriptedModel {
    async fn load(&self, options: &PoseOptions) -> PipelineResult<Box<dyn PoseEstimator>> {
        if let Some(reason) = &self.load_error {
            return Err(PipelineError::InferenceUnavailable(reason.clone()));
        }
        tracing::debug!(
            "scripted pose model loaded (complexity {}, detection >= {})",
            options.model_complexity,
            options.min_detection_confidence
        );
        Ok(Box::new(ScriptedEstimator {
            script: self.script.clone(),
            cursor: 0,
            latency: self.latency,
            estimates: self.estimates.clone(),
        }))
    }
}

struct ScriptedEstimator {
    script: Arc<[Option<PoseFrame>]>,
    cursor: usize,
    latency: Duration,
    estimates: Arc<AtomicU64>,
}

#[async_trait]
impl PoseEstimator for ScriptedEstimator {
    async fn estimate(&mut self, _frame: &VideoFrame) -> PipelineResult<Option<PoseFrame>> {
        tokio::time::sleep(self.latency).await;
        self.estimates.fetch_add(1, Ordering::SeqCst);
        if self.script.is_empty() {
            return Ok(None);
        }
        let result = self.script[self.cursor % self.script.len()].clone();
        self.cursor += 1;
        Ok(result)
    }
}

/// Shoulders at (0.4, 0.3) and (0.6, 0.3), hips below, shifted right by `sway`.
pub fn torso_frame(sway: f64) -> PoseFrame {
    PoseFrame::empty()
        .with(LandmarkIndex::Nose, Landmark::new(0.5 + sway, 0.15))
        .with(LandmarkIndex::LeftShoulder, Landmark::new(0.4 + sway, 0.3))
        .with(LandmarkIndex::RightShoulder, Landmark::new(0.6 + sway, 0.3))
        .with(LandmarkIndex::LeftHip, Landmark::new(0.42 + sway, 0.7))
        .with(LandmarkIndex::RightHip, Landmark::new(0.58 + sway, 0.7))
}

//! Device and model seams consumed by the pipeline.
//!
//! A [`CameraDevice`] hands out a [`VideoStream`] for the lifetime of one camera session. A
//! [`PoseModel`] is loaded once per session into a [`PoseEstimator`], which is driven one frame at
//! a time.

use crate::config::{CameraConstraints, PoseOptions};
use crate::error::PipelineResult;
use crate::geometry::CanvasSize;
use crate::landmark::PoseFrame;
use async_trait::async_trait;
use std::time::Duration;

/// Handle to a frame that is ready for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFrame {
    pub sequence: u64,
    /// Stream time at capture.
    pub timestamp: Duration,
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Ask for access and open a stream. Permission refusal must map to
    /// [`PipelineError::PermissionDenied`](crate::PipelineError::PermissionDenied).
    async fn open(&self, constraints: &CameraConstraints) -> PipelineResult<Box<dyn VideoStream>>;
}

#[async_trait]
pub trait VideoStream: Send {
    /// Native resolution, once the stream metadata is known.
    fn native_size(&self) -> Option<CanvasSize>;

    /// Wait for the next ready frame. `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<VideoFrame>;

    /// Stop all tracks and release the device. Must be idempotent.
    fn stop(&mut self);
}

#[async_trait]
pub trait PoseModel: Send + Sync {
    async fn load(&self, options: &PoseOptions) -> PipelineResult<Box<dyn PoseEstimator>>;
}

#[async_trait]
pub trait PoseEstimator: Send {
    /// Run inference on one frame. `Ok(None)` means no body was found.
    ///
    /// Takes `&mut self`, so at most one inference is ever outstanding per estimator.
    async fn estimate(&mut self, frame: &VideoFrame) -> PipelineResult<Option<PoseFrame>>;
}

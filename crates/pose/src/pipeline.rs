//! Camera session and per-frame detection loop.
//!
//! `Off -> Requesting -> On -> Off`. While on, a single task pulls ready frames from the stream,
//! awaits one inference at a time and redraws the overlay. Every camera session carries a
//! generation number; a result from an older session is dropped without drawing.

use crate::camera::{CameraDevice, PoseEstimator, PoseModel, VideoStream};
use crate::config::PoseConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::geometry::{CanvasSize, CompressionTarget};
use crate::landmark::PoseFrame;
use crate::overlay::{Canvas, OverlayRenderer};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayStatus {
    #[default]
    Active,
    /// The pose model failed to load; video runs without guidance.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    Off { error: Option<PipelineError> },
    Requesting,
    On { overlay: OverlayStatus },
}

impl Default for CameraState {
    fn default() -> Self {
        CameraState::Off { error: None }
    }
}

impl CameraState {
    pub fn is_on(&self) -> bool {
        matches!(self, CameraState::On { .. })
    }

    pub fn is_off(&self) -> bool {
        matches!(self, CameraState::Off { .. })
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            CameraState::Off { error } => error.as_ref(),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Control {
    generation: u64,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

struct Shared<C> {
    control: Mutex<Control>,
    canvas: Mutex<C>,
    state: watch::Sender<CameraState>,
    target: watch::Sender<Option<CompressionTarget>>,
}

impl<C: Canvas> Shared<C> {
    /// Blank the overlay and forget the target. Caller holds the control lock.
    fn clear_overlay(&self) {
        self.canvas.lock().clear();
        self.target.send_replace(None);
    }
}

struct DetectionLoop<C> {
    shared: Arc<Shared<C>>,
    generation: u64,
    cancel: CancellationToken,
    renderer: OverlayRenderer,
    fallback: CanvasSize,
    clock: Instant,
}

pub struct PosePipeline<C: Canvas + Send + 'static> {
    cfg: PoseConfig,
    camera: Arc<dyn CameraDevice>,
    model: Arc<dyn PoseModel>,
    renderer: OverlayRenderer,
    clock: Instant,
    shared: Arc<Shared<C>>,
}

impl<C: Canvas + Send + 'static> PosePipeline<C> {
    pub fn new(
        cfg: PoseConfig,
        camera: Arc<dyn CameraDevice>,
        model: Arc<dyn PoseModel>,
        canvas: C,
    ) -> Self {
        let (state, _) = watch::channel(CameraState::default());
        let (target, _) = watch::channel(None);
        Self {
            renderer: OverlayRenderer::new(cfg.target_offset_px()),
            cfg,
            camera,
            model,
            clock: Instant::now(),
            shared: Arc::new(Shared {
                control: Mutex::new(Control::default()),
                canvas: Mutex::new(canvas),
                state,
                target,
            }),
        }
    }

    pub fn state(&self) -> CameraState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CameraState> {
        self.shared.state.subscribe()
    }

    /// Target from the most recent frame, if both shoulders were visible.
    pub fn target(&self) -> Option<CompressionTarget> {
        *self.shared.target.borrow()
    }

    pub fn subscribe_target(&self) -> watch::Receiver<Option<CompressionTarget>> {
        self.shared.target.subscribe()
    }

    /// Read the overlay surface. Drawing stays with the detection loop.
    pub fn with_canvas<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.shared.canvas.lock())
    }

    /// Token cancelled when the current camera session ends for any reason.
    pub fn session_token(&self) -> Option<CancellationToken> {
        self.shared.control.lock().cancel.clone()
    }

    /// Open the camera, load the pose model and start the detection loop.
    ///
    /// Camera failures leave the pipeline `Off` with the error recorded; they are not retried. A
    /// model that fails to load leaves the camera on with the overlay marked unavailable. Calling
    /// this while the camera is starting or on is a no-op.
    pub async fn start_camera(&self) -> PipelineResult<()> {
        let generation = {
            let mut control = self.shared.control.lock();
            if !self.shared.state.borrow().is_off() {
                tracing::debug!("camera already starting or running");
                return Ok(());
            }
            control.generation += 1;
            self.shared.state.send_replace(CameraState::Requesting);
            control.generation
        };
        let constraints = self.cfg.camera();
        tracing::info!(
            "requesting camera ({}x{}, {:?})",
            constraints.width,
            constraints.height,
            constraints.facing
        );

        let mut stream = match self.camera.open(constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("camera start failed: {}", e);
                let control = self.shared.control.lock();
                if control.generation == generation {
                    self.shared
                        .state
                        .send_replace(CameraState::Off { error: Some(e.clone()) });
                }
                return Err(e);
            }
        };

        let (estimator, overlay) = match self.model.load(self.cfg.options()).await {
            Ok(estimator) => (Some(estimator), OverlayStatus::Active),
            Err(e) => {
                tracing::warn!("pose model unavailable, continuing without overlay: {}", e);
                (None, OverlayStatus::Unavailable(e.to_string()))
            }
        };

        let mut control = self.shared.control.lock();
        if control.generation != generation {
            tracing::debug!("camera stopped while starting; releasing stream");
            stream.stop();
            return Ok(());
        }

        let size = native_or(stream.as_ref(), self.cfg.fallback_canvas());
        self.shared.canvas.lock().resize(size);

        let cancel = CancellationToken::new();
        let detection = DetectionLoop {
            shared: self.shared.clone(),
            generation,
            cancel: cancel.clone(),
            renderer: self.renderer,
            fallback: self.cfg.fallback_canvas(),
            clock: self.clock,
        };
        control.handle = Some(tokio::spawn(detection.run(stream, estimator)));
        control.cancel = Some(cancel);
        self.shared
            .state
            .send_replace(CameraState::On { overlay });
        tracing::info!("camera on, canvas {}", size);

        Ok(())
    }

    /// Stop detection, release the stream, clear the overlay and the target.
    ///
    /// Safe to call at any time, including when the camera is already off.
    pub async fn stop_camera(&self) {
        let handle = {
            let mut control = self.shared.control.lock();
            control.generation += 1;
            if let Some(cancel) = control.cancel.take() {
                cancel.cancel();
            }
            self.shared.clear_overlay();
            self.shared.state.send_if_modified(|state| {
                if state.is_off() {
                    return false;
                }
                tracing::info!("camera stopped");
                *state = CameraState::Off { error: None };
                true
            });
            control.handle.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("detection loop ended abnormally: {}", e);
            }
        }
    }
}

impl<C: Canvas + Send + 'static> Drop for PosePipeline<C> {
    fn drop(&mut self) {
        let mut control = self.shared.control.lock();
        control.generation += 1;
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
    }
}

fn native_or(stream: &dyn VideoStream, fallback: CanvasSize) -> CanvasSize {
    stream
        .native_size()
        .map(|size| CanvasSize::from_video(size.width, size.height, fallback))
        .unwrap_or(fallback)
}

impl<C: Canvas + Send + 'static> DetectionLoop<C> {
    async fn run(
        self,
        mut stream: Box<dyn VideoStream>,
        mut estimator: Option<Box<dyn PoseEstimator>>,
    ) {
        let mut rendered = 0u64;
        let ended = loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => break false,
                frame = stream.next_frame() => frame,
            };
            let Some(frame) = frame else {
                break true;
            };
            let Some(estimator) = estimator.as_mut() else {
                continue;
            };

            let result = tokio::select! {
                _ = self.cancel.cancelled() => break false,
                result = estimator.estimate(&frame) => result,
            };
            if let Err(e) = &result {
                tracing::debug!("pose inference failed on frame {}: {}", frame.sequence, e);
            }
            let size = native_or(stream.as_ref(), self.fallback);
            if !self.apply(size, result.ok().flatten()) {
                break false;
            }
            rendered += 1;
        };

        stream.stop();
        if ended {
            self.stream_ended();
        }
        tracing::debug!("detection loop exited after {} frames", rendered);
    }

    /// Draw one result. Returns `false` if this session has been superseded.
    fn apply(&self, size: CanvasSize, pose: Option<PoseFrame>) -> bool {
        let control = self.shared.control.lock();
        if control.generation != self.generation {
            return false;
        }
        let mut canvas = self.shared.canvas.lock();
        if canvas.size() != size {
            canvas.resize(size);
        }
        let target = self
            .renderer
            .render(pose.as_ref(), &mut *canvas, self.clock.elapsed());
        self.shared.target.send_replace(target);
        true
    }

    fn stream_ended(&self) {
        let mut control = self.shared.control.lock();
        if control.generation != self.generation {
            return;
        }
        tracing::warn!("video stream ended; camera off");
        self.cancel.cancel();
        control.cancel = None;
        self.shared.clear_overlay();
        self.shared.state.send_replace(CameraState::Off {
            error: Some(PipelineError::DeviceUnavailable(
                "video stream ended".into(),
            )),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Landmark, LandmarkIndex};
    use crate::overlay::{DrawCommand, RecordingCanvas};
    use crate::synthetic::{torso_frame, ScriptedModel, SyntheticCamera};
    use std::time::Duration;

    const FRAME: Duration = Duration::from_millis(33);

    fn pipeline(
        camera: Arc<SyntheticCamera>,
        model: Arc<ScriptedModel>,
    ) -> PosePipeline<RecordingCanvas> {
        PosePipeline::new(
            PoseConfig::default(),
            camera,
            model,
            RecordingCanvas::new(CanvasSize::new(1, 1)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn camera_session_publishes_target_and_draws_overlay() {
        let camera = Arc::new(SyntheticCamera::new(Some(CanvasSize::new(640, 480)), FRAME));
        let model = Arc::new(ScriptedModel::new(
            vec![Some(torso_frame(0.0))],
            Duration::from_millis(5),
        ));
        let pipeline = pipeline(camera.clone(), model.clone());

        pipeline.start_camera().await.expect("camera starts");
        assert_eq!(
            pipeline.state(),
            CameraState::On {
                overlay: OverlayStatus::Active
            }
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let target = pipeline.target().expect("target published");
        assert!((target.x - 320.0).abs() < 1e-9);
        assert!((target.y - 174.0).abs() < 1e-9);
        assert!(pipeline.with_canvas(|c| c.texts().any(|t| t == "COMPRESS HERE")));
        assert!(model.estimate_count() >= 3);

        pipeline.stop_camera().await;
        assert_eq!(camera.live_streams(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn canvas_tracks_native_video_resolution() {
        let camera = Arc::new(SyntheticCamera::new(Some(CanvasSize::new(1280, 720)), FRAME));
        let model = Arc::new(ScriptedModel::new(vec![Some(torso_frame(0.0))], Duration::ZERO));
        let pipeline = pipeline(camera, model);

        pipeline.start_camera().await.expect("camera starts");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(pipeline.with_canvas(|c| c.size()), CanvasSize::new(1280, 720));
        let target = pipeline.target().expect("target");
        assert!((target.x - 640.0).abs() < 1e-9);
        assert!((target.y - 246.0).abs() < 1e-9);
        pipeline.stop_camera().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_resolution_falls_back_to_vga() {
        let camera = Arc::new(SyntheticCamera::new(None, FRAME));
        let model = Arc::new(ScriptedModel::new(Vec::new(), Duration::ZERO));
        let pipeline = pipeline(camera, model);

        pipeline.start_camera().await.expect("camera starts");
        assert_eq!(pipeline.with_canvas(|c| c.size()), CanvasSize::new(640, 480));
        pipeline.stop_camera().await;
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_leaves_camera_off_with_error() {
        let camera = Arc::new(SyntheticCamera::failing(PipelineError::PermissionDenied(
            "Camera access denied. Please allow camera access and try again.".into(),
        )));
        let model = Arc::new(ScriptedModel::demo(Duration::ZERO));
        let pipeline = pipeline(camera.clone(), model.clone());

        let err = pipeline.start_camera().await.expect_err("denied");
        assert!(matches!(err, PipelineError::PermissionDenied(_)));
        assert_eq!(pipeline.state().error(), Some(&err));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(camera.open_count(), 1);
        assert_eq!(model.estimate_count(), 0);
        assert!(pipeline.state().is_off());
    }

    #[tokio::test(start_paused = true)]
    async fn model_failure_keeps_camera_on_without_guidance() {
        let camera = Arc::new(SyntheticCamera::new(Some(CanvasSize::new(640, 480)), FRAME));
        let model = Arc::new(ScriptedModel::failing_to_load("model assets unreachable"));
        let pipeline = pipeline(camera.clone(), model);

        pipeline.start_camera().await.expect("camera still starts");
        let CameraState::On {
            overlay: OverlayStatus::Unavailable(reason),
        } = pipeline.state()
        else {
            panic!("expected camera on without overlay");
        };
        assert!(reason.contains("model assets unreachable"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(pipeline.target(), None);
        assert!(pipeline.with_canvas(|c| c.is_blank()));
        assert_eq!(camera.live_streams(), 1);

        pipeline.stop_camera().await;
        assert_eq!(camera.live_streams(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_shoulder_frames_clear_guidance_without_failing() {
        let one_shoulder = PoseFrame::empty()
            .with(LandmarkIndex::LeftShoulder, Landmark::new(0.4, 0.3));
        let camera = Arc::new(SyntheticCamera::new(Some(CanvasSize::new(640, 480)), FRAME));
        let model = Arc::new(ScriptedModel::new(
            vec![Some(torso_frame(0.0)), Some(one_shoulder)],
            Duration::ZERO,
        ));
        let pipeline = pipeline(camera, model);
        let mut targets = pipeline.subscribe_target();

        pipeline.start_camera().await.expect("camera starts");

        targets.changed().await.expect("first frame");
        assert!(targets.borrow_and_update().is_some());
        targets.changed().await.expect("second frame");
        assert!(targets.borrow_and_update().is_none());
        assert_eq!(
            pipeline.with_canvas(|c| c.commands().to_vec()),
            vec![DrawCommand::Clear]
        );
        assert!(pipeline.state().is_on());

        pipeline.stop_camera().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_ignores_late_results() {
        let camera = Arc::new(SyntheticCamera::new(Some(CanvasSize::new(640, 480)), FRAME));
        let model = Arc::new(ScriptedModel::new(
            vec![Some(torso_frame(0.0))],
            Duration::from_millis(200),
        ));
        let pipeline = pipeline(camera.clone(), model.clone());

        pipeline.stop_camera().await;
        assert!(pipeline.state().is_off());

        pipeline.start_camera().await.expect("camera starts");
        // First frame arrives at 33 ms; its inference would finish at 233 ms.
        tokio::time::sleep(Duration::from_millis(60)).await;
        pipeline.stop_camera().await;
        pipeline.stop_camera().await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(pipeline.target(), None);
        assert!(pipeline.with_canvas(|c| c.is_blank()));
        assert_eq!(model.estimate_count(), 0);
        assert_eq!(camera.live_streams(), 0);
        assert_eq!(pipeline.state(), CameraState::Off { error: None });
    }

    #[tokio::test(start_paused = true)]
    async fn ended_stream_turns_camera_off() {
        let camera = Arc::new(
            SyntheticCamera::new(Some(CanvasSize::new(640, 480)), FRAME).with_frame_limit(3),
        );
        let model = Arc::new(ScriptedModel::new(vec![Some(torso_frame(0.0))], Duration::ZERO));
        let pipeline = pipeline(camera.clone(), model);

        pipeline.start_camera().await.expect("camera starts");
        let mut state = pipeline.subscribe_state();
        let session = pipeline.session_token().expect("session running");
        state
            .wait_for(|s| s.is_off())
            .await
            .expect("state published");

        assert!(matches!(
            pipeline.state().error(),
            Some(PipelineError::DeviceUnavailable(_))
        ));
        assert!(session.is_cancelled());
        assert_eq!(pipeline.target(), None);
        assert_eq!(camera.live_streams(), 0);

        // A fresh start is allowed after the stream ended.
        pipeline.start_camera().await.expect("restart");
        assert!(pipeline.state().is_on());
        pipeline.stop_camera().await;
    }
}

//! Bystander CPR protocol: step navigation, breathing timer, compression counter and the camera
//! and metronome lifecycle tied to the compression step.

use crate::error::{PipelineError, PipelineResult};
use crate::geometry::CompressionTarget;
use crate::metronome::Metronome;
use crate::overlay::Canvas;
use crate::pipeline::PosePipeline;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CprStep {
    pub number: u8,
    pub title: &'static str,
    pub instruction: &'static str,
    /// Countdown offered on this step, if any.
    pub timer: Option<Duration>,
    pub uses_camera: bool,
}

pub const CPR_STEPS: [CprStep; 5] = [
    CprStep {
        number: 1,
        title: "Call Emergency Services",
        instruction: "Call 112 (India) / 911 (US) / 999 (UK) immediately. Put on speakerphone so \
                      both hands are free.",
        timer: None,
        uses_camera: false,
    },
    CprStep {
        number: 2,
        title: "Check Consciousness",
        instruction: "Tap their shoulders firmly and shout \"Are you okay?\" If no response, they \
                      need help now.",
        timer: None,
        uses_camera: false,
    },
    CprStep {
        number: 3,
        title: "Check Breathing",
        instruction: "Tilt their head back, lift their chin. Look, listen and feel for normal \
                      breathing for 10 seconds.",
        timer: Some(Duration::from_secs(10)),
        uses_camera: false,
    },
    CprStep {
        number: 4,
        title: "Start Chest Compressions",
        instruction: "Point the camera at the person lying down to find the compression spot. \
                      Push hard and fast: at least 5-6 cm deep, 100-120 times per minute.",
        timer: None,
        uses_camera: true,
    },
    CprStep {
        number: 5,
        title: "Rescue Breaths (if trained)",
        instruction: "After 30 compressions: tilt head, lift chin, pinch nose, give 2 breaths \
                      (1 second each). If untrained, skip and continue compressions only.",
        timer: None,
        uses_camera: false,
    },
];

/// Index of the only step that runs the camera and metronome.
pub const COMPRESSION_STEP: usize = 3;
/// Rescue breaths are due after this many compressions.
pub const COMPRESSIONS_PER_CYCLE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionCount {
    pub total: u32,
    pub breaths_due: bool,
}

impl CompressionCount {
    fn of(total: u32) -> Self {
        Self {
            total,
            breaths_due: total > 0 && total % COMPRESSIONS_PER_CYCLE == 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyStatus {
    CameraOff,
    /// Camera on, no target in the latest frame.
    Scanning,
    Detected(CompressionTarget),
}

impl std::fmt::Display for BodyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyStatus::CameraOff => write!(f, "Camera off"),
            BodyStatus::Scanning => write!(f, "Scanning for patient body"),
            BodyStatus::Detected(_) => write!(f, "Body detected, guidance active"),
        }
    }
}

pub struct CprCoach<C: Canvas + Send + 'static> {
    pipeline: PosePipeline<C>,
    metronome: Metronome,
    step: usize,
    compressions: u32,
    timer_started: Option<Instant>,
}

impl<C: Canvas + Send + 'static> CprCoach<C> {
    pub fn new(pipeline: PosePipeline<C>, metronome: Metronome) -> Self {
        Self {
            pipeline,
            metronome,
            step: 0,
            compressions: 0,
            timer_started: None,
        }
    }

    pub fn pipeline(&self) -> &PosePipeline<C> {
        &self.pipeline
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn step_index(&self) -> usize {
        self.step
    }

    pub fn step(&self) -> &'static CprStep {
        &CPR_STEPS[self.step]
    }

    /// Move to a step. Leaving the compression step stops the camera and the metronome.
    pub async fn go_to(&mut self, index: usize) -> PipelineResult<()> {
        if index >= CPR_STEPS.len() {
            return Err(PipelineError::InvalidStep(index));
        }
        if index != COMPRESSION_STEP {
            self.stop_camera().await;
        }
        self.step = index;
        self.timer_started = None;
        tracing::debug!("CPR step {}: {}", CPR_STEPS[index].number, CPR_STEPS[index].title);
        Ok(())
    }

    /// Next step; stays put on the last one.
    pub async fn next(&mut self) -> PipelineResult<()> {
        if self.step + 1 < CPR_STEPS.len() {
            self.go_to(self.step + 1).await?;
        }
        Ok(())
    }

    /// Previous step; stays put on the first one.
    pub async fn previous(&mut self) -> PipelineResult<()> {
        if let Some(prev) = self.step.checked_sub(1) {
            self.go_to(prev).await?;
        }
        Ok(())
    }

    /// Start the camera on the compression step, then the metronome for the camera session.
    pub async fn start_camera(&mut self) -> PipelineResult<()> {
        if self.step != COMPRESSION_STEP {
            return Err(PipelineError::NotOnCompressionStep);
        }
        self.pipeline.start_camera().await?;
        if let Some(session) = self.pipeline.session_token() {
            self.metronome.start(&session);
        }
        Ok(())
    }

    pub async fn stop_camera(&mut self) {
        self.metronome.stop();
        self.pipeline.stop_camera().await;
    }

    pub fn record_compression(&mut self) -> CompressionCount {
        self.compressions = self.compressions.saturating_add(1);
        CompressionCount::of(self.compressions)
    }

    pub fn compressions(&self) -> CompressionCount {
        CompressionCount::of(self.compressions)
    }

    pub fn reset_compressions(&mut self) {
        self.compressions = 0;
    }

    /// Start the current step's countdown. Returns `false` if the step has none or it is
    /// already running or finished.
    pub fn start_timer(&mut self) -> bool {
        if self.step().timer.is_none() || self.timer_started.is_some() {
            return false;
        }
        self.timer_started = Some(Instant::now());
        true
    }

    /// Time left on the countdown, `None` if it has not been started.
    pub fn timer_remaining(&self) -> Option<Duration> {
        let total = self.step().timer?;
        let started = self.timer_started?;
        Some(total.saturating_sub(started.elapsed()))
    }

    pub fn body_status(&self) -> BodyStatus {
        if !self.pipeline.state().is_on() {
            return BodyStatus::CameraOff;
        }
        match self.pipeline.target() {
            Some(target) => BodyStatus::Detected(target),
            None => BodyStatus::Scanning,
        }
    }

    /// Release the camera before dropping the coach.
    pub async fn shutdown(mut self) {
        self.stop_camera().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoseConfig;
    use crate::geometry::CanvasSize;
    use crate::overlay::RecordingCanvas;
    use crate::pipeline::CameraState;
    use crate::synthetic::{torso_frame, ScriptedModel, SyntheticCamera};
    use std::sync::Arc;

    fn coach(camera: Arc<SyntheticCamera>) -> CprCoach<RecordingCanvas> {
        let model = Arc::new(ScriptedModel::new(
            vec![Some(torso_frame(0.0)), None],
            Duration::from_millis(5),
        ));
        let pipeline = PosePipeline::new(
            PoseConfig::default(),
            camera,
            model,
            RecordingCanvas::new(CanvasSize::new(640, 480)),
        );
        CprCoach::new(pipeline, Metronome::new(110))
    }

    fn camera() -> Arc<SyntheticCamera> {
        Arc::new(SyntheticCamera::new(
            Some(CanvasSize::new(640, 480)),
            Duration::from_millis(33),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn camera_only_on_compression_step() {
        let mut coach = coach(camera());
        assert_eq!(
            coach.start_camera().await,
            Err(PipelineError::NotOnCompressionStep)
        );
        assert!(matches!(
            coach.go_to(5).await,
            Err(PipelineError::InvalidStep(5))
        ));

        coach.go_to(COMPRESSION_STEP).await.expect("valid step");
        assert!(coach.step().uses_camera);
        coach.start_camera().await.expect("camera starts");
        assert!(coach.pipeline().state().is_on());
        assert!(coach.metronome().is_running());
        coach.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_compression_step_stops_camera_and_metronome() {
        let camera = camera();
        let mut coach = coach(camera.clone());
        coach.go_to(COMPRESSION_STEP).await.expect("valid step");
        coach.start_camera().await.expect("camera starts");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(coach.metronome().toggles() >= 3);

        coach.next().await.expect("next step");
        assert_eq!(coach.step_index(), 4);
        assert_eq!(coach.pipeline().state(), CameraState::Off { error: None });
        assert!(!coach.metronome().is_running());
        assert_eq!(camera.live_streams(), 0);
        assert_eq!(coach.body_status(), BodyStatus::CameraOff);

        let toggles = coach.metronome().toggles();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(coach.metronome().toggles(), toggles);
    }

    #[tokio::test(start_paused = true)]
    async fn metronome_stops_when_stream_ends() {
        let camera = Arc::new(
            SyntheticCamera::new(Some(CanvasSize::new(640, 480)), Duration::from_millis(33))
                .with_frame_limit(10),
        );
        let mut coach = coach(camera);
        coach.go_to(COMPRESSION_STEP).await.expect("valid step");
        coach.start_camera().await.expect("camera starts");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(coach.pipeline().state().is_off());
        assert!(!coach.metronome().is_running());
        assert!(!coach.metronome().beat());
    }

    #[tokio::test(start_paused = true)]
    async fn body_status_follows_latest_frame() {
        let mut coach = coach(camera());
        coach.go_to(COMPRESSION_STEP).await.expect("valid step");
        assert_eq!(coach.body_status(), BodyStatus::CameraOff);

        coach.start_camera().await.expect("camera starts");
        assert_eq!(coach.body_status(), BodyStatus::Scanning);

        let mut targets = coach.pipeline().subscribe_target();
        targets.changed().await.expect("frame");
        assert!(matches!(coach.body_status(), BodyStatus::Detected(_)));
        targets.changed().await.expect("frame");
        assert_eq!(coach.body_status(), BodyStatus::Scanning);

        coach.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rescue_breaths_every_thirty_compressions() {
        let mut coach = coach(camera());
        for _ in 0..29 {
            assert!(!coach.record_compression().breaths_due);
        }
        assert_eq!(
            coach.record_compression(),
            CompressionCount {
                total: 30,
                breaths_due: true
            }
        );
        assert!(!coach.record_compression().breaths_due);
        coach.reset_compressions();
        assert_eq!(coach.compressions().total, 0);
        assert!(!coach.compressions().breaths_due);
    }

    #[tokio::test(start_paused = true)]
    async fn breathing_timer_counts_down_and_resets_on_navigation() {
        let mut coach = coach(camera());
        assert!(!coach.start_timer());

        coach.go_to(2).await.expect("valid step");
        assert_eq!(coach.timer_remaining(), None);
        assert!(coach.start_timer());
        assert!(!coach.start_timer());

        tokio::time::sleep(Duration::from_secs(4)).await;
        let remaining = coach.timer_remaining().expect("timer running");
        assert!(remaining <= Duration::from_secs(6));
        assert!(remaining > Duration::from_millis(5900));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(coach.timer_remaining(), Some(Duration::ZERO));

        coach.previous().await.expect("previous step");
        assert_eq!(coach.timer_remaining(), None);
    }
}

//! Camera, pose model and metronome settings.

use crate::error::{PipelineError, PipelineResult};
use crate::geometry::CanvasSize;
use cardiosim_types::UnitInterval;

pub const DEFAULT_METRONOME_BPM: u32 = 110;
/// Compressions above this rate are not achievable and indicate a typo.
pub const MAX_METRONOME_BPM: u32 = 200;
/// Distance below the shoulder midpoint where the target is drawn.
pub const DEFAULT_TARGET_OFFSET_PX: f64 = 30.0;
pub const FALLBACK_CANVAS: CanvasSize = CanvasSize::new(640, 480);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    User,
    /// Rear camera on phones.
    #[default]
    Environment,
}

/// What to ask the camera for. Video only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
    pub audio: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            width: FALLBACK_CANVAS.width,
            height: FALLBACK_CANVAS.height,
            audio: false,
        }
    }
}

/// Settings applied once when the pose model is loaded for a camera session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseOptions {
    pub model_complexity: u8,
    pub smooth_landmarks: bool,
    pub enable_segmentation: bool,
    pub min_detection_confidence: UnitInterval,
    pub min_tracking_confidence: UnitInterval,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            model_complexity: 1,
            smooth_landmarks: true,
            enable_segmentation: false,
            min_detection_confidence: UnitInterval::saturating(0.5),
            min_tracking_confidence: UnitInterval::saturating(0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseConfig {
    camera: CameraConstraints,
    options: PoseOptions,
    target_offset_px: f64,
    metronome_bpm: u32,
    fallback_canvas: CanvasSize,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            camera: CameraConstraints::default(),
            options: PoseOptions::default(),
            target_offset_px: DEFAULT_TARGET_OFFSET_PX,
            metronome_bpm: DEFAULT_METRONOME_BPM,
            fallback_canvas: FALLBACK_CANVAS,
        }
    }
}

impl PoseConfig {
    pub fn with_metronome_bpm(mut self, bpm: u32) -> PipelineResult<Self> {
        if bpm == 0 || bpm > MAX_METRONOME_BPM {
            return Err(PipelineError::InvalidConfig(format!(
                "metronome BPM must be between 1 and {MAX_METRONOME_BPM}, got {bpm}"
            )));
        }
        self.metronome_bpm = bpm;
        Ok(self)
    }

    pub fn with_target_offset(mut self, offset_px: f64) -> PipelineResult<Self> {
        if !offset_px.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "target offset must be finite".into(),
            ));
        }
        self.target_offset_px = offset_px;
        Ok(self)
    }

    pub fn camera(&self) -> &CameraConstraints {
        &self.camera
    }

    pub fn options(&self) -> &PoseOptions {
        &self.options
    }

    pub fn target_offset_px(&self) -> f64 {
        self.target_offset_px
    }

    pub fn metronome_bpm(&self) -> u32 {
        self.metronome_bpm
    }

    pub fn fallback_canvas(&self) -> CanvasSize {
        self.fallback_canvas
    }
}

/// Parse `CARDIOSIM_METRONOME_BPM`; unset or blank means the default rate.
pub fn metronome_bpm_from_env_value(value: Option<String>) -> PipelineResult<u32> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_METRONOME_BPM),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|e| PipelineError::InvalidConfig(format!("metronome BPM '{raw}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_camera_session() {
        let cfg = PoseConfig::default();
        assert_eq!(cfg.camera().facing, FacingMode::Environment);
        assert_eq!((cfg.camera().width, cfg.camera().height), (640, 480));
        assert!(!cfg.camera().audio);
        assert_eq!(cfg.options().model_complexity, 1);
        assert_eq!(cfg.options().min_detection_confidence.get(), 0.5);
        assert_eq!(cfg.options().min_tracking_confidence.get(), 0.5);
        assert_eq!(cfg.metronome_bpm(), 110);
    }

    #[test]
    fn bpm_validation() {
        assert!(PoseConfig::default().with_metronome_bpm(0).is_err());
        assert!(PoseConfig::default().with_metronome_bpm(500).is_err());
        assert_eq!(metronome_bpm_from_env_value(None).unwrap(), 110);
        assert_eq!(metronome_bpm_from_env_value(Some(" 100 ".into())).unwrap(), 100);
        assert!(metronome_bpm_from_env_value(Some("fast".into())).is_err());
    }
}

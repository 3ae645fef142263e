//! # CardioSim Pose
//!
//! Camera-based CPR guidance: pose landmarks in, a compression-target overlay out.
//!
//! - [`PosePipeline`] owns one camera session and its detection loop
//! - [`OverlayRenderer`] maps landmarks to canvas pixels and draws the guidance
//! - [`Metronome`] paces compressions
//! - [`CprCoach`] walks the bystander protocol and ties the camera to the compression step
//!
//! The camera and the pose model are reached through the traits in [`camera`]; the
//! [`synthetic`] module provides scripted implementations.

pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod landmark;
pub mod metronome;
pub mod overlay;
pub mod pipeline;
pub mod protocol;
pub mod synthetic;

pub use config::{metronome_bpm_from_env_value, CameraConstraints, PoseConfig, PoseOptions};
pub use error::{PipelineError, PipelineResult};
pub use geometry::{compression_target, CanvasSize, CompressionTarget, Point};
pub use landmark::{Landmark, LandmarkIndex, PoseFrame};
pub use metronome::{beat_period, Metronome};
pub use overlay::{Canvas, DrawCommand, OverlayRenderer, RecordingCanvas};
pub use pipeline::{CameraState, OverlayStatus, PosePipeline};
pub use protocol::{BodyStatus, CompressionCount, CprCoach, CprStep, COMPRESSION_STEP, CPR_STEPS};

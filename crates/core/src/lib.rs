//! # CardioSim Core
//!
//! Core logic for the cardiac diagnosis simulator.
//!
//! This crate contains the clinical domain and the session state machine:
//! - Scenario catalogue loaded from YAML (built in or from disk)
//! - Clinical input validation and diagnosis decoding
//! - The analysis / explanation / emergency / mentor session with last-write-wins sequencing
//! - Backend health polling and the stent procedure timeline
//!
//! **No transport concerns**: HTTP lives in `api-client`, wire DTOs in `api-shared`. The session
//! reaches the backend only through the [`DiagnosisBackend`] trait.

pub mod backend;
pub mod clinical;
pub mod config;
pub mod constants;
pub mod diagnosis;
pub mod emergency;
pub mod error;
pub mod explanation;
pub mod health;
pub mod mentor;
pub mod scenario;
pub mod sequence;
pub mod session;
pub mod simulation;
pub mod validation;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::DiagnosisBackend;
pub use clinical::ClinicalInput;
pub use config::{AnalysisMode, CoreConfig};
pub use diagnosis::{
    requires_emergency_guidance, ArteryId, DiagnosisResult, InferenceMetadata, Urgency,
};
pub use emergency::{EmergencyGuidance, ImageGuidance};
pub use error::{BackendError, BackendResult, CoreError, CoreResult};
pub use explanation::{Audience, Explanation};
pub use health::{check_backend, HealthMonitor};
pub use mentor::{MentorExchange, MentorGuidance, MentorOutcome};
pub use scenario::{RealWorldContext, Scenario, ScenarioCatalogue};
pub use session::{
    AnalysisOutcome, EmergencyOutcome, ExplanationOutcome, ModeBadge, Phase, Session,
    SessionSnapshot,
};
pub use simulation::ProcedureStage;
pub use video::{ProcedureVideo, VideoProcedure};

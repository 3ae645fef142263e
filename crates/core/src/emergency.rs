//! Emergency guidance shown for `Immediate` diagnoses.

use crate::constants::{
    EMERGENCY_FALLBACK_PROTOCOL, EMERGENCY_FALLBACK_PROVIDER, IMAGE_ANALYSIS_FALLBACK_GUIDANCE,
    IMAGE_ANALYSIS_FALLBACK_NEXT_STEP,
};
use api_shared::{EmergencyRes, ImageAnalysisRes};
use cardiosim_types::UnitInterval;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyGuidance {
    pub protocol: String,
    pub visual_steps: Vec<String>,
    pub ai_provider: String,
    /// `true` when the static offline message is shown instead of a backend protocol.
    pub fallback: bool,
    /// Indices into `visual_steps` the user has ticked off.
    pub completed: BTreeSet<usize>,
}

impl EmergencyGuidance {
    /// Static guidance used whenever the backend cannot supply a protocol.
    pub fn fallback() -> Self {
        Self {
            protocol: EMERGENCY_FALLBACK_PROTOCOL.to_string(),
            visual_steps: vec![
                "Call emergency services (911 / 999 / 112)".to_string(),
                "Begin CPR if the patient becomes unresponsive".to_string(),
            ],
            ai_provider: EMERGENCY_FALLBACK_PROVIDER.to_string(),
            fallback: true,
            completed: BTreeSet::new(),
        }
    }

    /// Use a backend response, falling back if it carries no protocol text.
    pub fn from_response(res: EmergencyRes) -> Self {
        if res.protocol.trim().is_empty() {
            tracing::warn!("emergency response had an empty protocol; using fallback");
            return Self::fallback();
        }
        Self {
            protocol: res.protocol,
            visual_steps: res.visual_steps,
            ai_provider: res.ai_provider,
            fallback: false,
            completed: BTreeSet::new(),
        }
    }

    /// Flip the completion mark of a visual step. Returns the new state, or `None` when the
    /// index is past the last step.
    pub fn toggle_step(&mut self, index: usize) -> Option<bool> {
        if index >= self.visual_steps.len() {
            return None;
        }
        if self.completed.remove(&index) {
            Some(false)
        } else {
            self.completed.insert(index);
            Some(true)
        }
    }

    pub fn is_step_completed(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

/// Guidance derived from a camera frame of the patient.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGuidance {
    pub guidance: String,
    pub next_step: String,
    pub confidence: UnitInterval,
    pub ai_provider: Option<String>,
    pub fallback: bool,
}

impl ImageGuidance {
    pub fn fallback() -> Self {
        Self {
            guidance: IMAGE_ANALYSIS_FALLBACK_GUIDANCE.to_string(),
            next_step: IMAGE_ANALYSIS_FALLBACK_NEXT_STEP.to_string(),
            confidence: UnitInterval::ZERO,
            ai_provider: None,
            fallback: true,
        }
    }

    pub fn from_response(res: ImageAnalysisRes) -> Self {
        if res.guidance.trim().is_empty() {
            return Self::fallback();
        }
        Self {
            guidance: res.guidance,
            next_step: res.next_step,
            confidence: UnitInterval::saturating(res.confidence),
            ai_provider: res.ai_provider,
            fallback: false,
        }
    }
}

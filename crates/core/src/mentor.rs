//! Procedure mentor guidance for the stent simulation.
//!
//! Each simulation stage can be walked through by the mentor, and the student may ask follow-up
//! questions about the current stage. Questions are kept as a chat that is discarded whenever a
//! new stage walkthrough is requested.

use crate::constants::MENTOR_FALLBACK_GUIDANCE;
use crate::simulation::ProcedureStage;
use api_shared::MentorRes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorGuidance {
    pub stage: ProcedureStage,
    pub guidance: String,
    pub safety_checks: Vec<String>,
    /// The backend wrote this with a generative model rather than its protocol engine.
    pub ai_used: bool,
    pub fallback: bool,
}

impl MentorGuidance {
    pub fn fallback(stage: ProcedureStage) -> Self {
        Self {
            stage,
            guidance: MENTOR_FALLBACK_GUIDANCE.to_string(),
            safety_checks: Vec::new(),
            ai_used: false,
            fallback: true,
        }
    }

    pub fn from_response(stage: ProcedureStage, res: MentorRes) -> Self {
        if res.guidance.trim().is_empty() {
            tracing::warn!("mentor response for '{}' was blank; using fallback", stage.id());
            return Self::fallback(stage);
        }
        Self {
            stage,
            guidance: res.guidance,
            safety_checks: res.safety_checks,
            ai_used: res.ask_ai,
            fallback: false,
        }
    }
}

/// One follow-up question and the mentor's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorExchange {
    pub stage: ProcedureStage,
    pub question: String,
    pub answer: String,
    pub fallback: bool,
}

impl MentorExchange {
    pub(crate) fn answered(stage: ProcedureStage, question: &str, guidance: MentorGuidance) -> Self {
        Self {
            stage,
            question: question.to_string(),
            answer: guidance.guidance,
            fallback: guidance.fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentorOutcome {
    /// A stage walkthrough, now the session's current mentor guidance.
    Guidance(MentorGuidance),
    /// A follow-up answer, appended to the mentor chat.
    Answer(MentorExchange),
    /// A newer walkthrough, analysis or reset replaced the context of this request.
    Superseded,
}

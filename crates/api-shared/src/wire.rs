//! Request and response bodies exchanged with the CardioSim backend (schema v1).
//!
//! These types mirror the JSON the backend speaks and nothing more: field types are plain
//! strings and numbers, and domain validation (artery codes, urgency levels, confidence range)
//! happens in `cardiosim-core` when a response is converted into domain types.
//!
//! Unknown fields in responses are ignored. Required fields are required; optional ones are
//! listed with their defaults.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Version tag of the wire schema described by this module.
pub const SCHEMA_VERSION: &str = "v1";

/// Confidence assumed by the backend when a diagnosis omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.92;

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClinicalInputReq {
    /// Minutes of chest pain.
    pub chest_pain_duration: u32,
    pub ecg_findings: String,
    /// Troponin in ng/mL.
    pub troponin_level: f64,
    pub age: u32,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub symptoms: String,
}

/// Response of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisRes {
    pub diagnosis: String,
    pub affected_region: String,
    /// One of `LAD`, `RCA`, `LCX`.
    pub artery_id: String,
    /// One of `Immediate`, `Urgent`, `Elective`, in any case. `Routine` is read as `Elective`.
    pub urgency: String,
    pub recommended_intervention: String,
    pub reasoning: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Inference side channel, separated out before the diagnosis is used.
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<InferenceMetaRes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InferenceMetaRes {
    pub mock: bool,
    #[serde(default)]
    pub model_id: Option<String>,
    pub inference_time_s: f64,
    #[serde(default)]
    pub quantization: Option<String>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Body of `POST /api/explain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExplainReq {
    pub diagnosis: String,
    pub affected_region: String,
    pub recommended_intervention: String,
    pub reasoning: String,
    /// `patient` or `clinician`.
    pub audience: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExplainRes {
    pub explanation: String,
}

/// Body of `POST /api/emergency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyReq {
    pub diagnosis: String,
    pub affected_region: String,
    pub artery_id: String,
    pub urgency: String,
    pub recommended_intervention: String,
    /// `assessment`, `preparation`, `procedure` or `monitoring`.
    pub current_step: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyRes {
    pub protocol: String,
    #[serde(default)]
    pub visual_steps: Vec<String>,
    pub ai_provider: String,
    #[serde(default = "default_true")]
    pub emergency_activated: bool,
}

/// Body of `POST /api/mentor`: procedure guidance for one simulation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MentorReq {
    pub diagnosis: String,
    pub affected_region: String,
    pub artery_id: String,
    pub urgency: String,
    pub recommended_intervention: String,
    /// `blocked`, `guide`, `balloon`, `stent` or `flow`.
    pub current_step: String,
    /// Follow-up question; empty asks for the stage walkthrough.
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MentorRes {
    pub guidance: String,
    #[serde(default)]
    pub safety_checks: Vec<String>,
    /// Whether a generative model wrote the guidance (otherwise the protocol engine did).
    #[serde(default = "default_true")]
    pub ask_ai: bool,
}

/// Query of `POST /api/emergency/analyze-image`. The image travels as the multipart field
/// `image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageAnalysisQuery {
    pub diagnosis: String,
    pub urgency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageAnalysisRes {
    pub guidance: String,
    #[serde(default)]
    pub next_step: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

/// Body of `POST /api/video-generation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoGenerationReq {
    /// `STEMI`, `CPR` or `PCI_BALLOON`.
    pub procedure: String,
    pub urgency: String,
    pub steps: Vec<String>,
    /// Seconds.
    pub duration: u32,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoGenerationRes {
    /// `pending`, `generating` or `ready`.
    pub status: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub preview_image: Option<String>,
    pub description: String,
    #[serde(default)]
    pub frames: Vec<String>,
    /// Seconds.
    pub estimated_duration: u32,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub mock_mode: bool,
    #[serde(default)]
    pub model_id: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnosis_res_separates_meta_and_ignores_unknown_fields() {
        let body = r#"{
            "diagnosis": "STEMI",
            "affected_region": "LAD proximal",
            "artery_id": "LAD",
            "urgency": "Immediate",
            "recommended_intervention": "Primary PCI",
            "reasoning": "ST elevation",
            "extra_field": {"ignored": true},
            "_meta": {
                "mock": false,
                "model_id": "google/medgemma-4b-it",
                "inference_time_s": 2.4,
                "quantization": "4-bit NF4",
                "timestamp": "2025-01-01T00:00:00Z"
            }
        }"#;

        let res: DiagnosisRes = serde_json::from_str(body).expect("parse diagnosis");
        assert_eq!(res.confidence, None);
        let meta = res.meta.expect("meta present");
        assert!(!meta.mock);
        assert_eq!(meta.model_id.as_deref(), Some("google/medgemma-4b-it"));
    }

    #[test]
    fn diagnosis_res_requires_core_fields() {
        let body = r#"{"diagnosis": "STEMI", "artery_id": "LAD"}"#;
        let err = serde_json::from_str::<DiagnosisRes>(body).expect_err("missing fields");
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn emergency_res_defaults() {
        let res: EmergencyRes =
            serde_json::from_str(r#"{"protocol": "Call 112", "ai_provider": "Protocol Engine"}"#)
                .expect("parse emergency");
        assert!(res.visual_steps.is_empty());
        assert!(res.emergency_activated);
    }

    #[test]
    fn mentor_res_defaults_to_ai_when_flag_missing() {
        let res: MentorRes =
            serde_json::from_str(r#"{"guidance": "Advance the wire"}"#).expect("parse mentor");
        assert!(res.ask_ai);
        assert!(res.safety_checks.is_empty());

        let req: MentorReq = serde_json::from_str(
            r#"{"diagnosis": "STEMI", "affected_region": "LAD", "artery_id": "LAD",
                "urgency": "Immediate", "recommended_intervention": "PCI",
                "current_step": "guide"}"#,
        )
        .expect("parse mentor request");
        assert_eq!(req.question, "");
    }

    #[test]
    fn video_res_without_url_is_a_template_storyboard() {
        let res: VideoGenerationRes = serde_json::from_str(
            r#"{"status": "ready", "video_url": null, "preview_image": null,
                "description": "CPR technique", "frames": ["Frame 1: Position"],
                "estimated_duration": 60}"#,
        )
        .expect("parse video");
        assert_eq!(res.video_url, None);
        assert_eq!(res.frames.len(), 1);
    }

    #[test]
    fn image_analysis_offline_body_has_no_provider() {
        let res: ImageAnalysisRes = serde_json::from_str(
            r#"{"guidance": "Image analysis offline.", "next_step": "Contact cardiology on-call",
                "confidence": 0.0}"#,
        )
        .expect("parse image analysis");
        assert_eq!(res.ai_provider, None);
        assert_eq!(res.confidence, 0.0);
    }

    #[test]
    fn health_res_tolerates_extra_status_fields() {
        let res: HealthRes = serde_json::from_str(
            r#"{"status": "ok", "service": "CardioSim AI", "mock_mode": true, "model_id": null}"#,
        )
        .expect("parse health");
        assert!(res.mock_mode);
        assert_eq!(res.model_id, None);
    }
}

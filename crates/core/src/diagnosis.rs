//! Diagnosis results and the inference metadata that accompanies them.

use crate::{CoreError, CoreResult};
use api_shared::{
    DiagnosisRes, EmergencyReq, ExplainReq, InferenceMetaRes, MentorReq, DEFAULT_CONFIDENCE,
};
use cardiosim_types::{NonEmptyText, UnitInterval};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coronary arteries the model can localise a lesion to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArteryId {
    #[serde(rename = "LAD")]
    Lad,
    #[serde(rename = "RCA")]
    Rca,
    #[serde(rename = "LCX")]
    Lcx,
}

impl ArteryId {
    pub const ALL: [ArteryId; 3] = [ArteryId::Lad, ArteryId::Rca, ArteryId::Lcx];

    pub fn code(self) -> &'static str {
        match self {
            ArteryId::Lad => "LAD",
            ArteryId::Rca => "RCA",
            ArteryId::Lcx => "LCX",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArteryId::Lad => "Left Anterior Descending Artery",
            ArteryId::Rca => "Right Coronary Artery",
            ArteryId::Lcx => "Left Circumflex Artery",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ArteryId::Lad => {
                "Supplies the front and left side of the heart. Known as the 'widow maker' artery."
            }
            ArteryId::Rca => {
                "Supplies the right ventricle and inferior wall of the left ventricle."
            }
            ArteryId::Lcx => {
                "Wraps around the left side of the heart, supplying the lateral and posterior walls."
            }
        }
    }
}

impl std::fmt::Display for ArteryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ArteryId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArteryId::ALL
            .into_iter()
            .find(|a| a.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidResponse(format!("unknown artery id '{s}'")))
    }
}

/// Severity classification of a diagnosis.
///
/// Ordered by severity: `Elective < Urgent < Immediate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Elective,
    Urgent,
    Immediate,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Elective => "Elective",
            Urgency::Urgent => "Urgent",
            Urgency::Immediate => "Immediate",
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Urgency::Elective => "STABLE",
            Urgency::Urgent => "URGENT",
            Urgency::Immediate => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Urgency {
    type Err = CoreError;

    /// Case-insensitive. Model output may say `Routine` for the elective level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Urgency::Immediate),
            "urgent" => Ok(Urgency::Urgent),
            "elective" | "routine" => Ok(Urgency::Elective),
            _ => Err(CoreError::InvalidResponse(format!(
                "unknown urgency '{}'",
                s.trim()
            ))),
        }
    }
}

/// Output of one analysis. Replaced wholesale by the next analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub diagnosis: NonEmptyText,
    pub affected_region: String,
    #[serde(rename = "artery_id")]
    pub artery: ArteryId,
    pub urgency: Urgency,
    pub recommended_intervention: String,
    pub reasoning: String,
    pub confidence: UnitInterval,
}

impl DiagnosisResult {
    /// Body for `POST /api/explain`.
    pub fn to_explain_request(&self, audience: &str) -> ExplainReq {
        ExplainReq {
            diagnosis: self.diagnosis.to_string(),
            affected_region: self.affected_region.clone(),
            recommended_intervention: self.recommended_intervention.clone(),
            reasoning: self.reasoning.clone(),
            audience: audience.to_string(),
        }
    }

    /// Body for `POST /api/emergency`.
    pub fn to_emergency_request(&self, current_step: &str) -> EmergencyReq {
        EmergencyReq {
            diagnosis: self.diagnosis.to_string(),
            affected_region: self.affected_region.clone(),
            artery_id: self.artery.code().to_string(),
            urgency: self.urgency.as_str().to_string(),
            recommended_intervention: self.recommended_intervention.clone(),
            current_step: current_step.to_string(),
        }
    }

    /// Body for `POST /api/mentor`.
    pub fn to_mentor_request(&self, current_step: &str, question: &str) -> MentorReq {
        MentorReq {
            diagnosis: self.diagnosis.to_string(),
            affected_region: self.affected_region.clone(),
            artery_id: self.artery.code().to_string(),
            urgency: self.urgency.as_str().to_string(),
            recommended_intervention: self.recommended_intervention.clone(),
            current_step: current_step.to_string(),
            question: question.to_string(),
        }
    }
}

/// Whether emergency guidance must be surfaced for a diagnosis.
///
/// `Immediate` urgency is the only trigger. Callers evaluate this against the current diagnosis
/// every time rather than caching the answer.
pub fn requires_emergency_guidance(diagnosis: &DiagnosisResult) -> bool {
    diagnosis.urgency == Urgency::Immediate
}

/// How a [`DiagnosisResult`] was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceMetadata {
    /// `true` when the result came from a canned or mock path.
    pub mock: bool,
    pub model_id: Option<String>,
    pub inference_time_s: f64,
    pub quantization: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InferenceMetadata {
    /// Metadata for a locally produced canned diagnosis.
    pub fn local_mock(elapsed: std::time::Duration) -> Self {
        Self {
            mock: true,
            model_id: None,
            inference_time_s: round_to_millis(elapsed.as_secs_f64()),
            quantization: None,
            timestamp: Utc::now(),
        }
    }
}

fn round_to_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

impl TryFrom<InferenceMetaRes> for InferenceMetadata {
    type Error = CoreError;

    fn try_from(meta: InferenceMetaRes) -> Result<Self, Self::Error> {
        if !meta.inference_time_s.is_finite() || meta.inference_time_s < 0.0 {
            return Err(CoreError::InvalidResponse(format!(
                "invalid inference_time_s {}",
                meta.inference_time_s
            )));
        }
        let timestamp = DateTime::parse_from_rfc3339(&meta.timestamp)
            .map_err(|e| CoreError::InvalidResponse(format!("invalid timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            mock: meta.mock,
            model_id: meta.model_id.filter(|id| !id.trim().is_empty()),
            inference_time_s: meta.inference_time_s,
            quantization: meta.quantization,
            timestamp,
        })
    }
}

/// Split an analysis response into the diagnosis and its metadata.
///
/// Fails as a whole if any field is invalid, so callers never see a half-populated diagnosis.
pub fn decode_diagnosis(
    res: DiagnosisRes,
) -> CoreResult<(DiagnosisResult, Option<InferenceMetadata>)> {
    let diagnosis = NonEmptyText::new(&res.diagnosis)
        .map_err(|_| CoreError::InvalidResponse("diagnosis label is empty".into()))?;
    let artery = res.artery_id.parse::<ArteryId>()?;
    let urgency = res.urgency.parse::<Urgency>()?;
    let confidence = UnitInterval::new(res.confidence.unwrap_or(DEFAULT_CONFIDENCE))
        .map_err(|e| CoreError::InvalidResponse(format!("confidence: {e}")))?;
    let metadata = res.meta.map(InferenceMetadata::try_from).transpose()?;

    Ok((
        DiagnosisResult {
            diagnosis,
            affected_region: res.affected_region,
            artery,
            urgency,
            recommended_intervention: res.recommended_intervention,
            reasoning: res.reasoning,
            confidence,
        },
        metadata,
    ))
}

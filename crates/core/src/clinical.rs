//! Clinical input captured on the analysis form.

use crate::validation::{normalise_risk_factor, validate_clinical_ranges};
use crate::CoreResult;
use api_shared::ClinicalInputReq;
use cardiosim_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Patient parameters submitted for analysis.
///
/// Validated on construction and never mutated afterwards; the session stores a copy when the
/// form is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClinicalInputReq", into = "ClinicalInputReq")]
pub struct ClinicalInput {
    age: u32,
    /// Minutes.
    chest_pain_duration: u32,
    /// ng/mL.
    troponin_level: f64,
    ecg_findings: NonEmptyText,
    symptoms: String,
    risk_factors: BTreeSet<String>,
}

impl ClinicalInput {
    pub fn new(
        age: u32,
        chest_pain_duration: u32,
        troponin_level: f64,
        ecg_findings: impl AsRef<str>,
        symptoms: impl Into<String>,
        risk_factors: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> CoreResult<Self> {
        validate_clinical_ranges(age, chest_pain_duration, troponin_level)?;
        let ecg_findings = NonEmptyText::new(ecg_findings).map_err(|_| {
            crate::CoreError::InvalidInput("ECG findings cannot be empty".into())
        })?;

        Ok(Self {
            age,
            chest_pain_duration,
            troponin_level,
            ecg_findings,
            symptoms: symptoms.into().trim().to_string(),
            risk_factors: risk_factors
                .into_iter()
                .filter_map(|tag| normalise_risk_factor(tag.as_ref()))
                .collect(),
        })
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn chest_pain_duration(&self) -> u32 {
        self.chest_pain_duration
    }

    pub fn troponin_level(&self) -> f64 {
        self.troponin_level
    }

    pub fn ecg_findings(&self) -> &str {
        self.ecg_findings.as_str()
    }

    pub fn symptoms(&self) -> &str {
        &self.symptoms
    }

    pub fn risk_factors(&self) -> &BTreeSet<String> {
        &self.risk_factors
    }

    /// Body for `POST /api/analyze`.
    pub fn to_request(&self) -> ClinicalInputReq {
        ClinicalInputReq {
            chest_pain_duration: self.chest_pain_duration,
            ecg_findings: self.ecg_findings.to_string(),
            troponin_level: self.troponin_level,
            age: self.age,
            risk_factors: self.risk_factors.iter().cloned().collect(),
            symptoms: self.symptoms.clone(),
        }
    }
}

impl TryFrom<ClinicalInputReq> for ClinicalInput {
    type Error = crate::CoreError;

    fn try_from(req: ClinicalInputReq) -> Result<Self, Self::Error> {
        ClinicalInput::new(
            req.age,
            req.chest_pain_duration,
            req.troponin_level,
            req.ecg_findings,
            req.symptoms,
            req.risk_factors,
        )
    }
}

impl From<ClinicalInput> for ClinicalInputReq {
    fn from(input: ClinicalInput) -> Self {
        input.to_request()
    }
}

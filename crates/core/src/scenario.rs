//! Preset clinical scenarios.
//!
//! A scenario bundles a clinical input, a precomputed diagnosis, two canned explanations and the
//! real-world framing shown alongside the case. Scenarios are read-only reference data: the
//! catalogue is parsed once (from the embedded YAML or an override file) and shared behind `Arc`.

use crate::clinical::ClinicalInput;
use crate::config::CoreConfig;
use crate::constants::BUILTIN_SCENARIOS_YAML;
use crate::diagnosis::DiagnosisResult;
use crate::explanation::Audience;
use crate::{CoreError, CoreResult};
use cardiosim_types::NonEmptyText;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RealWorldContext {
    pub patient_name: String,
    pub setting: String,
    pub stakes: String,
    pub with_tool: String,
    #[serde(default)]
    pub source_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    pub id: NonEmptyText,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub real_world: RealWorldContext,
    pub input: ClinicalInput,
    pub mock_diagnosis: DiagnosisResult,
    pub explanation_patient: NonEmptyText,
    pub explanation_clinician: NonEmptyText,
}

impl Scenario {
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Canned explanation text for an audience.
    pub fn explanation(&self, audience: Audience) -> &str {
        match audience {
            Audience::Patient => self.explanation_patient.as_str(),
            Audience::Clinician => self.explanation_clinician.as_str(),
        }
    }
}

#[derive(Deserialize)]
struct CatalogueFile {
    scenarios: Vec<Scenario>,
}

/// The set of scenarios available to a session.
#[derive(Debug, Clone)]
pub struct ScenarioCatalogue {
    scenarios: Vec<Arc<Scenario>>,
}

impl ScenarioCatalogue {
    /// The catalogue compiled into the binary.
    pub fn builtin() -> CoreResult<Self> {
        Self::from_yaml_str(BUILTIN_SCENARIOS_YAML)
    }

    /// The override file named in the configuration, or the builtin catalogue.
    pub fn from_config(cfg: &CoreConfig) -> CoreResult<Self> {
        match cfg.scenarios_path() {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(CoreError::CatalogueRead)?;
        let catalogue = Self::from_yaml_str(&contents)?;
        tracing::info!(
            "loaded {} scenarios from {}",
            catalogue.len(),
            path.display()
        );
        Ok(catalogue)
    }

    /// Parse a YAML catalogue. Errors name the offending path, e.g.
    /// `scenarios[1].mock_diagnosis.urgency`.
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        let de = serde_yaml::Deserializer::from_str(yaml);
        let file: CatalogueFile = serde_path_to_error::deserialize(de)
            .map_err(|e| CoreError::CatalogueParse(format!("{}: {}", e.path(), e.inner())))?;

        if file.scenarios.is_empty() {
            return Err(CoreError::CatalogueParse(
                "catalogue contains no scenarios".into(),
            ));
        }

        let mut seen = HashSet::new();
        for scenario in &file.scenarios {
            if !seen.insert(scenario.id().to_string()) {
                return Err(CoreError::DuplicateScenario(scenario.id().to_string()));
            }
        }

        Ok(Self {
            scenarios: file.scenarios.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<Arc<Scenario>> {
        self.scenarios.iter().find(|s| s.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Scenario>> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::{ArteryId, Urgency};
    use std::io::Write;

    #[test]
    fn builtin_catalogue_has_reference_scenarios() {
        let catalogue = ScenarioCatalogue::builtin().expect("builtin parses");
        assert_eq!(catalogue.len(), 3);

        let stemi = catalogue.get("stemi_lad").expect("stemi present");
        assert_eq!(stemi.mock_diagnosis.artery, ArteryId::Lad);
        assert_eq!(stemi.mock_diagnosis.urgency, Urgency::Immediate);
        assert_eq!(stemi.input.age(), 52);
        assert_eq!(stemi.input.chest_pain_duration(), 120);
        assert_eq!(stemi.input.troponin_level(), 4.8);
        assert!(stemi.input.risk_factors().contains("smoking"));

        let rca = catalogue.get("nstemi_rca").expect("nstemi present");
        assert_eq!(rca.mock_diagnosis.urgency, Urgency::Urgent);

        let lcx = catalogue.get("angina_lcx").expect("angina present");
        assert_eq!(lcx.mock_diagnosis.artery, ArteryId::Lcx);
        assert!(lcx
            .explanation(Audience::Clinician)
            .starts_with("Unstable angina"));
    }

    #[test]
    fn builtin_text_keeps_em_dashes_and_badges() {
        let catalogue = ScenarioCatalogue::builtin().expect("builtin parses");
        let stemi = catalogue.get("stemi_lad").expect("stemi present");
        assert_eq!(stemi.label, "\u{1f6a8} STEMI \u{2014} Anterior (LAD)");
        assert_eq!(
            stemi.real_world.setting,
            "Rural PHC, Rajasthan \u{2014} 80 km from nearest cardiologist"
        );
        assert!(stemi
            .explanation(Audience::Patient)
            .contains("called the LAD \u{2014} one of the most important"));

        for scenario in catalogue.iter() {
            assert!(!scenario.label.contains(" - "), "{}", scenario.label);
        }
    }

    #[test]
    fn unknown_id_is_none() {
        let catalogue = ScenarioCatalogue::builtin().expect("builtin parses");
        assert!(catalogue.get("tamponade").is_none());
    }

    #[test]
    fn parse_errors_name_the_field() {
        let yaml = BUILTIN_SCENARIOS_YAML.replacen("urgency: Immediate", "urgency: Whenever", 1);
        let err = ScenarioCatalogue::from_yaml_str(&yaml).expect_err("bad urgency");
        let msg = err.to_string();
        assert!(msg.contains("scenarios[0].mock_diagnosis.urgency"), "{msg}");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = BUILTIN_SCENARIOS_YAML.replace("id: nstemi_rca", "id: stemi_lad");
        assert!(matches!(
            ScenarioCatalogue::from_yaml_str(&yaml),
            Err(CoreError::DuplicateScenario(id)) if id == "stemi_lad"
        ));
    }

    #[test]
    fn load_reads_override_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        let single: String = BUILTIN_SCENARIOS_YAML
            .split("\n  - id: nstemi_rca")
            .next()
            .unwrap_or_default()
            .to_string();
        file.write_all(single.as_bytes()).expect("write");

        let catalogue = ScenarioCatalogue::load(file.path()).expect("load override");
        assert_eq!(catalogue.len(), 1);
        assert!(catalogue.get("stemi_lad").is_some());
    }
}

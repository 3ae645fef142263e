//! Stent-placement procedure stages for the intervention simulation.
//!
//! The stage shown is a pure function of the time since the simulation started; the procedure
//! stops advancing at [`ProcedureStage::Flow`].

use crate::constants::SIMULATION_STAGE_DURATION;
use crate::CoreError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcedureStage {
    Blocked,
    Guidewire,
    Balloon,
    Stent,
    Flow,
}

impl ProcedureStage {
    pub const ALL: [ProcedureStage; 5] = [
        ProcedureStage::Blocked,
        ProcedureStage::Guidewire,
        ProcedureStage::Balloon,
        ProcedureStage::Stent,
        ProcedureStage::Flow,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ProcedureStage::Blocked => "blocked",
            ProcedureStage::Guidewire => "guide",
            ProcedureStage::Balloon => "balloon",
            ProcedureStage::Stent => "stent",
            ProcedureStage::Flow => "flow",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProcedureStage::Blocked => "Occlusion Detected",
            ProcedureStage::Guidewire => "Guidewire Navigation",
            ProcedureStage::Balloon => "Balloon Pre-dilation",
            ProcedureStage::Stent => "Stent Deployment",
            ProcedureStage::Flow => "TIMI-3 Flow Restored",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ProcedureStage::Blocked => {
                "Atherosclerotic plaque causing >90% stenosis. Blood flow severely restricted."
            }
            ProcedureStage::Guidewire => {
                "0.014\" guidewire advanced through femoral artery to the coronary ostium."
            }
            ProcedureStage::Balloon => {
                "Angioplasty balloon inflated at 12 atm to compress plaque against vessel wall."
            }
            ProcedureStage::Stent => {
                "Drug-eluting stent expanded to scaffold the lumen; the drug coating limits restenosis."
            }
            ProcedureStage::Flow => {
                "Full anterograde flow - oxygenated blood reaches ischaemic myocardium."
            }
        }
    }

    pub fn is_final(self) -> bool {
        self == ProcedureStage::Flow
    }

    /// Stage on screen `elapsed` after the simulation started.
    pub fn at(elapsed: Duration) -> Self {
        let index = (elapsed.as_millis() / SIMULATION_STAGE_DURATION.as_millis()) as usize;
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }
}

impl std::fmt::Display for ProcedureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses a stage id (`blocked`, `guide`, `balloon`, `stent`, `flow`).
impl std::str::FromStr for ProcedureStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = match s.trim().to_ascii_lowercase().as_str() {
            "guidewire" => "guide".to_string(),
            other => other.to_string(),
        };
        ProcedureStage::ALL
            .into_iter()
            .find(|stage| stage.id() == id)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown procedure stage '{id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_every_stage_duration_and_stop_at_flow() {
        assert_eq!(ProcedureStage::at(Duration::ZERO), ProcedureStage::Blocked);
        assert_eq!(
            ProcedureStage::at(Duration::from_millis(2799)),
            ProcedureStage::Blocked
        );
        assert_eq!(
            ProcedureStage::at(Duration::from_millis(2800)),
            ProcedureStage::Guidewire
        );
        assert_eq!(
            ProcedureStage::at(Duration::from_millis(3 * 2800)),
            ProcedureStage::Stent
        );
        assert_eq!(
            ProcedureStage::at(Duration::from_secs(3600)),
            ProcedureStage::Flow
        );
        assert!(ProcedureStage::Flow.is_final());
    }

    #[test]
    fn stages_parse_from_ids() {
        assert_eq!("guide".parse::<ProcedureStage>().ok(), Some(ProcedureStage::Guidewire));
        assert_eq!(" Stent ".parse::<ProcedureStage>().ok(), Some(ProcedureStage::Stent));
        assert!("closure".parse::<ProcedureStage>().is_err());
    }
}

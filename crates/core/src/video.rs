//! Procedure training videos from `/api/video-generation`.
//!
//! The backend answers with either a rendered video URL or a template storyboard of text frames.

use crate::constants::{VIDEO_DURATION, VIDEO_LANGUAGE, VIDEO_STEPS};
use crate::diagnosis::Urgency;
use crate::CoreError;
use api_shared::{VideoGenerationReq, VideoGenerationRes};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoProcedure {
    Stemi,
    Cpr,
    PciBalloon,
}

impl VideoProcedure {
    pub const ALL: [VideoProcedure; 3] = [
        VideoProcedure::Stemi,
        VideoProcedure::Cpr,
        VideoProcedure::PciBalloon,
    ];

    pub fn code(self) -> &'static str {
        match self {
            VideoProcedure::Stemi => "STEMI",
            VideoProcedure::Cpr => "CPR",
            VideoProcedure::PciBalloon => "PCI_BALLOON",
        }
    }
}

impl std::fmt::Display for VideoProcedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for VideoProcedure {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "STEMI" => Ok(VideoProcedure::Stemi),
            "CPR" => Ok(VideoProcedure::Cpr),
            "PCI_BALLOON" | "PCI" => Ok(VideoProcedure::PciBalloon),
            other => Err(CoreError::InvalidInput(format!(
                "unknown procedure '{other}' (expected STEMI, CPR or PCI_BALLOON)"
            ))),
        }
    }
}

/// Request body for a procedure. Without a diagnosis the urgency defaults to `Urgent`.
pub fn video_request(procedure: VideoProcedure, urgency: Option<Urgency>) -> VideoGenerationReq {
    VideoGenerationReq {
        procedure: procedure.code().to_string(),
        urgency: urgency.unwrap_or(Urgency::Urgent).as_str().to_string(),
        steps: VIDEO_STEPS.iter().map(|s| s.to_string()).collect(),
        duration: VIDEO_DURATION.as_secs() as u32,
        language: VIDEO_LANGUAGE.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureVideo {
    pub procedure: VideoProcedure,
    pub status: String,
    pub video_url: Option<String>,
    pub preview_image: Option<String>,
    pub description: String,
    /// Storyboard frames, present when no video was rendered.
    pub frames: Vec<String>,
    pub duration: Duration,
}

impl ProcedureVideo {
    pub fn from_response(procedure: VideoProcedure, res: VideoGenerationRes) -> Self {
        Self {
            procedure,
            status: res.status,
            video_url: res.video_url.filter(|url| !url.trim().is_empty()),
            preview_image: res.preview_image,
            description: res.description,
            frames: res.frames,
            duration: Duration::from_secs(u64::from(res.estimated_duration)),
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.video_url.is_some()
    }
}

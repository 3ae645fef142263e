//! Constants used throughout the CardioSim core crate.
//!
//! Timings and fallback texts are kept here so the session, health monitor and
//! configuration defaults agree.

use std::time::Duration;

/// Default backend base URL when no explicit URL is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Simulated inference latency for canned scenario diagnoses.
pub const MOCK_ANALYSIS_DELAY: Duration = Duration::from_millis(1800);

/// Delay before each word of a canned explanation is revealed.
pub const EXPLANATION_WORD_DELAY: Duration = Duration::from_millis(35);

/// Upper bound for analysis, explanation and emergency requests.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between `GET /health` polls.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Timeout for a single health check.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Step sent with emergency guidance requests.
pub const EMERGENCY_ASSESSMENT_STEP: &str = "assessment";

/// Guidance shown when the emergency endpoint cannot be reached.
pub const EMERGENCY_FALLBACK_PROTOCOL: &str = "CRITICAL: Specialist cannot be reached. \
Call emergency services: 911/999/112. \
Begin CPR immediately if patient becomes unresponsive.";

/// Provider label attached to the offline emergency fallback.
pub const EMERGENCY_FALLBACK_PROVIDER: &str = "Offline Fallback";

/// Mentor text shown when `/api/mentor` cannot be reached.
pub const MENTOR_FALLBACK_GUIDANCE: &str =
    "\u{26a0}\u{fe0f} AI guide offline. Follow hospital STEMI protocol. Call cardiology immediately.";

/// Guidance shown when emergency image analysis is unavailable.
pub const IMAGE_ANALYSIS_FALLBACK_GUIDANCE: &str =
    "\u{26a0}\u{fe0f} Image analysis offline. Follow emergency protocol and call specialist immediately.";

/// Next step attached to the image analysis fallback.
pub const IMAGE_ANALYSIS_FALLBACK_NEXT_STEP: &str = "Contact cardiology on-call";

/// Storyboard length requested from `/api/video-generation`.
pub const VIDEO_DURATION: std::time::Duration = std::time::Duration::from_secs(60);

pub const VIDEO_LANGUAGE: &str = "english";

/// Steps sent with every video generation request.
pub const VIDEO_STEPS: [&str; 5] = [
    "Patient assessment",
    "Monitoring setup",
    "Intervention preparation",
    "Procedure execution",
    "Post-procedure care",
];

/// Time each stent-procedure stage stays on screen before advancing.
pub const SIMULATION_STAGE_DURATION: Duration = Duration::from_millis(2800);

/// Embedded scenario catalogue.
pub const BUILTIN_SCENARIOS_YAML: &str = include_str!("../scenarios/cardiac.yaml");

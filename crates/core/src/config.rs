//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the session, the backend client and the health monitor. Nothing in the core reads
//! environment variables; binaries parse them and hand the result to [`CoreConfig::new`].

use crate::constants::{
    DEFAULT_BACKEND_URL, EXPLANATION_WORD_DELAY, HEALTH_POLL_INTERVAL, HEALTH_TIMEOUT,
    MOCK_ANALYSIS_DELAY, REQUEST_TIMEOUT,
};
use crate::validation::validate_backend_url;
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which path `Session::analyze` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// A loaded scenario answers with its canned diagnosis and explanations. Manual input with
    /// no active scenario still goes to the backend.
    #[default]
    Demo,
    /// Every analysis and explanation goes to the backend.
    Live,
}

impl std::str::FromStr for AnalysisMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" | "mock" => Ok(AnalysisMode::Demo),
            "live" | "backend" => Ok(AnalysisMode::Live),
            other => Err(CoreError::InvalidInput(format!(
                "unknown analysis mode '{other}' (expected 'demo' or 'live')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    backend_url: String,
    analysis_mode: AnalysisMode,
    mock_analysis_delay: Duration,
    explanation_word_delay: Duration,
    request_timeout: Duration,
    health_poll_interval: Duration,
    health_timeout: Duration,
    scenarios_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default timings.
    ///
    /// A trailing `/` on `backend_url` is removed so route paths can be appended directly.
    pub fn new(backend_url: impl Into<String>, analysis_mode: AnalysisMode) -> CoreResult<Self> {
        let backend_url = backend_url.into().trim().trim_end_matches('/').to_string();
        validate_backend_url(&backend_url)?;

        Ok(Self {
            backend_url,
            analysis_mode,
            mock_analysis_delay: MOCK_ANALYSIS_DELAY,
            explanation_word_delay: EXPLANATION_WORD_DELAY,
            request_timeout: REQUEST_TIMEOUT,
            health_poll_interval: HEALTH_POLL_INTERVAL,
            health_timeout: HEALTH_TIMEOUT,
            scenarios_path: None,
        })
    }

    pub fn with_mock_analysis_delay(mut self, delay: Duration) -> Self {
        self.mock_analysis_delay = delay;
        self
    }

    pub fn with_explanation_word_delay(mut self, delay: Duration) -> Self {
        self.explanation_word_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> CoreResult<Self> {
        if timeout.is_zero() {
            return Err(CoreError::InvalidInput(
                "request timeout must be non-zero".into(),
            ));
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn with_health_polling(mut self, interval: Duration, timeout: Duration) -> CoreResult<Self> {
        if interval.is_zero() || timeout.is_zero() {
            return Err(CoreError::InvalidInput(
                "health poll interval and timeout must be non-zero".into(),
            ));
        }
        self.health_poll_interval = interval;
        self.health_timeout = timeout;
        Ok(self)
    }

    pub fn with_scenarios_path(mut self, path: Option<PathBuf>) -> Self {
        self.scenarios_path = path;
        self
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn analysis_mode(&self) -> AnalysisMode {
        self.analysis_mode
    }

    pub fn mock_analysis_delay(&self) -> Duration {
        self.mock_analysis_delay
    }

    pub fn explanation_word_delay(&self) -> Duration {
        self.explanation_word_delay
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn health_poll_interval(&self) -> Duration {
        self.health_poll_interval
    }

    pub fn health_timeout(&self) -> Duration {
        self.health_timeout
    }

    pub fn scenarios_path(&self) -> Option<&Path> {
        self.scenarios_path.as_deref()
    }
}

/// Parse the analysis mode from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`AnalysisMode::Demo`].
pub fn analysis_mode_from_env_value(value: Option<String>) -> CoreResult<AnalysisMode> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<AnalysisMode>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Backend base URL from an optional string value, defaulting to [`DEFAULT_BACKEND_URL`].
///
/// Validation happens in [`CoreConfig::new`].
pub fn backend_url_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

/// Resolve an optional scenario catalogue override path.
///
/// Empty values mean "use the embedded catalogue". A non-empty value must name an existing file.
pub fn scenarios_path_from_env_value(value: Option<String>) -> CoreResult<Option<PathBuf>> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let path = PathBuf::from(value);
    if !path.is_file() {
        return Err(CoreError::InvalidInput(format!(
            "scenario catalogue override is not a file: {}",
            path.display()
        )));
    }
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash() {
        let cfg = CoreConfig::new("http://localhost:8000/", AnalysisMode::Live).expect("valid");
        assert_eq!(cfg.backend_url(), "http://localhost:8000");
        assert_eq!(cfg.mock_analysis_delay(), MOCK_ANALYSIS_DELAY);
    }

    #[test]
    fn new_rejects_bad_urls() {
        assert!(CoreConfig::new("", AnalysisMode::Demo).is_err());
        assert!(CoreConfig::new("ftp://host", AnalysisMode::Demo).is_err());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let cfg = CoreConfig::new("http://localhost:8000", AnalysisMode::Demo).expect("valid");
        assert!(cfg
            .clone()
            .with_health_polling(Duration::ZERO, Duration::from_secs(1))
            .is_err());
        assert!(cfg.with_request_timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn analysis_mode_env_parsing() {
        assert_eq!(analysis_mode_from_env_value(None).unwrap(), AnalysisMode::Demo);
        assert_eq!(
            analysis_mode_from_env_value(Some("  ".into())).unwrap(),
            AnalysisMode::Demo
        );
        assert_eq!(
            analysis_mode_from_env_value(Some("LIVE".into())).unwrap(),
            AnalysisMode::Live
        );
        assert!(analysis_mode_from_env_value(Some("sometimes".into())).is_err());
    }

    #[test]
    fn backend_url_defaults_when_unset() {
        assert_eq!(backend_url_from_env_value(None), DEFAULT_BACKEND_URL);
        assert_eq!(backend_url_from_env_value(Some(" ".into())), DEFAULT_BACKEND_URL);
        assert_eq!(
            backend_url_from_env_value(Some("https://cardio.example ".into())),
            "https://cardio.example"
        );
    }

    #[test]
    fn scenarios_path_must_exist() {
        assert_eq!(scenarios_path_from_env_value(None).unwrap(), None);
        assert!(scenarios_path_from_env_value(Some("/definitely/not/here.yaml".into())).is_err());

        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(
            scenarios_path_from_env_value(Some(path)).unwrap().as_deref(),
            Some(file.path())
        );
    }
}

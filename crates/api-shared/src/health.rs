use crate::wire::HealthRes;

/// Availability of the backend and its AI model, as seen from the client.
///
/// Derived from the latest `GET /health` check; `None` (check failed or timed out) means the
/// backend is offline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendMode {
    #[default]
    Offline,
    /// Backend reachable but answering from its mock engine.
    Demo,
    /// Backend reachable with a real model loaded.
    RealAi { model_id: Option<String> },
}

impl BackendMode {
    /// Classify a health check result.
    pub fn from_health(check: Option<&HealthRes>) -> Self {
        match check {
            None => BackendMode::Offline,
            Some(res) if res.mock_mode => BackendMode::Demo,
            Some(res) => BackendMode::RealAi {
                model_id: res.model_id.clone(),
            },
        }
    }

    pub fn is_online(&self) -> bool {
        !matches!(self, BackendMode::Offline)
    }

    pub fn is_real_ai(&self) -> bool {
        matches!(self, BackendMode::RealAi { .. })
    }
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendMode::Offline => write!(f, "Backend Offline"),
            BackendMode::Demo => write!(f, "Demo Mode"),
            BackendMode::RealAi {
                model_id: Some(id),
            } => write!(f, "Real AI ({id})"),
            BackendMode::RealAi { model_id: None } => write!(f, "Real AI"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_check_results() {
        assert_eq!(BackendMode::from_health(None), BackendMode::Offline);

        let mock = HealthRes {
            mock_mode: true,
            model_id: None,
        };
        assert_eq!(BackendMode::from_health(Some(&mock)), BackendMode::Demo);

        let real = HealthRes {
            mock_mode: false,
            model_id: Some("google/medgemma-4b-it".into()),
        };
        let mode = BackendMode::from_health(Some(&real));
        assert!(mode.is_real_ai());
        assert_eq!(mode.to_string(), "Real AI (google/medgemma-4b-it)");
    }
}

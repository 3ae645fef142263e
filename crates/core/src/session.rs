//! The scenario/diagnosis state machine.
//!
//! A [`Session`] owns the lifecycle of one clinical case:
//!
//! `Idle` -> `Analyzing` -> `Diagnosed`, with an explanation that may be streaming or complete
//! while diagnosed and an orthogonal `simulating` flag for the stent procedure.
//!
//! All state lives behind one lock and every read goes through [`Session::snapshot`], so no
//! partially applied transition is ever observable. Asynchronous operations (analysis,
//! explanation, emergency guidance, mentor guidance) are tagged with a [`RequestToken`] when issued; a completion
//! whose token has been superseded is dropped without touching the state.
//!
//! `Session` is cheap to clone; clones share the same state.

use crate::backend::DiagnosisBackend;
use crate::clinical::ClinicalInput;
use crate::config::{AnalysisMode, CoreConfig};
use crate::constants::EMERGENCY_ASSESSMENT_STEP;
use crate::diagnosis::{
    decode_diagnosis, requires_emergency_guidance, DiagnosisResult, InferenceMetadata,
};
use crate::emergency::{EmergencyGuidance, ImageGuidance};
use crate::error::{BackendError, BackendResult};
use crate::explanation::{reveal_words, Audience, Explanation};
use crate::mentor::{MentorExchange, MentorGuidance, MentorOutcome};
use crate::scenario::{Scenario, ScenarioCatalogue};
use crate::sequence::{RequestSequencer, RequestToken};
use crate::simulation::ProcedureStage;
use crate::video::{video_request, ProcedureVideo, VideoProcedure};
use crate::{CoreError, CoreResult};
use api_shared::{BackendMode, ImageAnalysisQuery};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Analyzing,
    Diagnosed,
}

/// Settled result of [`Session::analyze`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Diagnosed(DiagnosisResult),
    Failed(String),
    /// A newer analysis or a reset arrived first; nothing was written.
    Superseded,
}

/// Settled result of [`Session::explain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplanationOutcome {
    Complete(String),
    Failed(String),
    Superseded,
}

/// Settled result of [`Session::emergency_guidance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmergencyOutcome {
    /// The current diagnosis is not `Immediate` (or there is none).
    NotRequired,
    Guidance(EmergencyGuidance),
    Superseded,
}

/// Which analysis path the next `analyze` call takes, for the header badge.
///
/// Derived from the configured [`AnalysisMode`], the active scenario and the latest health check,
/// so the badge always names the path actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeBadge {
    /// Demo mode with a scenario loaded: canned results, no backend call.
    CannedScenario,
    BackendOffline,
    /// Backend reachable but running its mock engine.
    BackendMock,
    RealAi { model_id: Option<String> },
}

impl std::fmt::Display for ModeBadge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeBadge::CannedScenario => write!(f, "Demo Mode (canned scenario)"),
            ModeBadge::BackendOffline => write!(f, "Backend Offline"),
            ModeBadge::BackendMock => write!(f, "Demo Mode (backend mock engine)"),
            ModeBadge::RealAi { model_id: Some(id) } => write!(f, "Real AI ({id})"),
            ModeBadge::RealAi { model_id: None } => write!(f, "Real AI"),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    phase: Phase,
    active_scenario: Option<Arc<Scenario>>,
    form: Option<ClinicalInput>,
    diagnosis: Option<DiagnosisResult>,
    metadata: Option<InferenceMetadata>,
    explanation: Option<Explanation>,
    emergency: Option<EmergencyGuidance>,
    emergency_loading: bool,
    mentor: Option<MentorGuidance>,
    mentor_loading: bool,
    mentor_chat: Vec<MentorExchange>,
    error: Option<String>,
    simulation_started: Option<Instant>,
}

impl SessionState {
    fn clear_case(&mut self) {
        self.diagnosis = None;
        self.metadata = None;
        self.explanation = None;
        self.emergency = None;
        self.emergency_loading = false;
        self.mentor = None;
        self.mentor_loading = false;
        self.mentor_chat.clear();
        self.error = None;
        self.simulation_started = None;
    }
}

/// Consistent copy of the session state at one instant.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub active_scenario: Option<Arc<Scenario>>,
    pub form: Option<ClinicalInput>,
    pub diagnosis: Option<DiagnosisResult>,
    pub metadata: Option<InferenceMetadata>,
    pub explanation: Option<Explanation>,
    pub emergency: Option<EmergencyGuidance>,
    pub emergency_loading: bool,
    pub mentor: Option<MentorGuidance>,
    pub mentor_loading: bool,
    /// Follow-up questions about the current mentor stage, oldest first.
    pub mentor_chat: Vec<MentorExchange>,
    pub error: Option<String>,
    pub simulation_stage: Option<ProcedureStage>,
}

impl SessionSnapshot {
    pub fn is_analyzing(&self) -> bool {
        self.phase == Phase::Analyzing
    }

    pub fn is_explaining(&self) -> bool {
        self.explanation.as_ref().is_some_and(|e| !e.complete)
    }

    pub fn is_simulating(&self) -> bool {
        self.simulation_stage.is_some()
    }

    /// Emergency guidance is visible exactly when the current diagnosis is `Immediate`.
    pub fn emergency_guidance_visible(&self) -> bool {
        self.diagnosis
            .as_ref()
            .is_some_and(requires_emergency_guidance)
    }
}

struct Inner {
    cfg: CoreConfig,
    catalogue: Arc<ScenarioCatalogue>,
    backend: Arc<dyn DiagnosisBackend>,
    state: Mutex<SessionState>,
    analysis_seq: RequestSequencer,
    explanation_seq: RequestSequencer,
    emergency_seq: RequestSequencer,
    mentor_seq: RequestSequencer,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(
        cfg: CoreConfig,
        catalogue: Arc<ScenarioCatalogue>,
        backend: Arc<dyn DiagnosisBackend>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                catalogue,
                backend,
                state: Mutex::new(SessionState::default()),
                analysis_seq: RequestSequencer::new(),
                explanation_seq: RequestSequencer::new(),
                emergency_seq: RequestSequencer::new(),
                mentor_seq: RequestSequencer::new(),
            }),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.cfg
    }

    pub fn catalogue(&self) -> &ScenarioCatalogue {
        &self.inner.catalogue
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        SessionSnapshot {
            phase: state.phase,
            active_scenario: state.active_scenario.clone(),
            form: state.form.clone(),
            diagnosis: state.diagnosis.clone(),
            metadata: state.metadata.clone(),
            explanation: state.explanation.clone(),
            emergency: state.emergency.clone(),
            emergency_loading: state.emergency_loading,
            mentor: state.mentor.clone(),
            mentor_loading: state.mentor_loading,
            mentor_chat: state.mentor_chat.clone(),
            error: state.error.clone(),
            simulation_stage: state
                .simulation_started
                .map(|started| ProcedureStage::at(started.elapsed())),
        }
    }

    /// Badge describing the analysis path, given the latest backend health.
    pub fn mode_badge(&self, backend: &BackendMode) -> ModeBadge {
        let has_scenario = self.inner.state.lock().active_scenario.is_some();
        if self.inner.cfg.analysis_mode() == AnalysisMode::Demo && has_scenario {
            return ModeBadge::CannedScenario;
        }
        match backend {
            BackendMode::Offline => ModeBadge::BackendOffline,
            BackendMode::Demo => ModeBadge::BackendMock,
            BackendMode::RealAi { model_id } => ModeBadge::RealAi {
                model_id: model_id.clone(),
            },
        }
    }

    /// Load a preset scenario into the form.
    ///
    /// Any case in progress is reset first and in-flight requests are superseded. An unknown id
    /// leaves the session untouched.
    pub fn load_scenario(&self, id: &str) -> CoreResult<Arc<Scenario>> {
        let Some(scenario) = self.inner.catalogue.get(id) else {
            tracing::warn!("scenario not found: {}", id);
            return Err(CoreError::UnknownScenario(id.to_string()));
        };

        let mut state = self.inner.state.lock();
        self.invalidate_all();
        *state = SessionState::default();
        state.active_scenario = Some(scenario.clone());
        state.form = Some(scenario.input.clone());
        tracing::info!("loaded scenario {}", scenario.id());

        Ok(scenario)
    }

    /// Replace the form contents. The active scenario, if any, stays loaded.
    pub fn set_form(&self, input: ClinicalInput) {
        self.inner.state.lock().form = Some(input);
    }

    /// Submit the current form.
    pub async fn analyze_form(&self) -> CoreResult<AnalysisOutcome> {
        let input = self
            .inner
            .state
            .lock()
            .form
            .clone()
            .ok_or_else(|| CoreError::InvalidInput("no clinical input to analyze".into()))?;
        Ok(self.analyze(input).await)
    }

    /// Analyze a clinical input.
    ///
    /// Clears the previous diagnosis, explanation, emergency guidance and error, then settles to
    /// exactly one of a new diagnosis (`Diagnosed`) or an error (`Idle`), unless a newer analysis
    /// or a reset supersedes it first.
    pub async fn analyze(&self, input: ClinicalInput) -> AnalysisOutcome {
        let (token, canned) = {
            let mut state = self.inner.state.lock();
            let token = self.inner.analysis_seq.issue();
            self.inner.explanation_seq.invalidate();
            self.inner.emergency_seq.invalidate();
            self.inner.mentor_seq.invalidate();

            state.clear_case();
            state.phase = Phase::Analyzing;
            state.form = Some(input.clone());

            let canned = match (self.inner.cfg.analysis_mode(), &state.active_scenario) {
                (AnalysisMode::Demo, Some(scenario)) => Some(scenario.mock_diagnosis.clone()),
                _ => None,
            };
            (token, canned)
        };
        tracing::info!(
            "analysis {} issued ({})",
            token,
            if canned.is_some() { "canned" } else { "backend" }
        );

        let started = Instant::now();
        let result = match canned {
            Some(diagnosis) => {
                tokio::time::sleep(self.inner.cfg.mock_analysis_delay()).await;
                Ok((
                    diagnosis,
                    Some(InferenceMetadata::local_mock(started.elapsed())),
                ))
            }
            None => self.request_analysis(&input).await,
        };

        let mut state = self.inner.state.lock();
        if !self.inner.analysis_seq.is_current(token) {
            tracing::debug!("discarding superseded analysis {}", token);
            return AnalysisOutcome::Superseded;
        }

        match result {
            Ok((diagnosis, metadata)) => {
                tracing::info!(
                    "analysis {} settled: {} ({}, {})",
                    token,
                    diagnosis.diagnosis,
                    diagnosis.artery,
                    diagnosis.urgency
                );
                state.phase = Phase::Diagnosed;
                state.diagnosis = Some(diagnosis.clone());
                state.metadata = metadata;
                state.error = None;
                AnalysisOutcome::Diagnosed(diagnosis)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("analysis {} failed: {}", token, message);
                state.phase = Phase::Idle;
                state.clear_case();
                state.error = Some(message.clone());
                AnalysisOutcome::Failed(message)
            }
        }
    }

    async fn request_analysis(
        &self,
        input: &ClinicalInput,
    ) -> CoreResult<(DiagnosisResult, Option<InferenceMetadata>)> {
        let req = input.to_request();
        let res = self.with_timeout(self.inner.backend.analyze(&req)).await?;
        decode_diagnosis(res)
    }

    /// Explain the current diagnosis for an audience.
    ///
    /// In demo mode with a scenario loaded the canned text is revealed word by word; otherwise the
    /// backend generates it. A newer explanation request (or a new analysis, scenario load or
    /// reset) supersedes this one, and its remaining words are never written.
    pub async fn explain(&self, audience: Audience) -> CoreResult<ExplanationOutcome> {
        let (token, diagnosis, canned) = {
            let mut state = self.inner.state.lock();
            let diagnosis = state.diagnosis.clone().ok_or(CoreError::NoDiagnosis)?;
            let token = self.inner.explanation_seq.issue();
            state.explanation = Some(Explanation::pending(audience));

            let canned = match (self.inner.cfg.analysis_mode(), &state.active_scenario) {
                (AnalysisMode::Demo, Some(scenario)) => {
                    Some(scenario.explanation(audience).to_string())
                }
                _ => None,
            };
            (token, diagnosis, canned)
        };
        tracing::debug!("explanation {} issued for {}", token, audience);

        let outcome = match canned {
            Some(text) => self.reveal_explanation(token, &text).await,
            None => {
                let req = diagnosis.to_explain_request(audience.as_str());
                let result = self.with_timeout(self.inner.backend.explain(&req)).await;

                let mut state = self.inner.state.lock();
                if !self.inner.explanation_seq.is_current(token) {
                    ExplanationOutcome::Superseded
                } else {
                    match result {
                        Ok(res) => {
                            state.explanation = Some(Explanation {
                                audience,
                                text: res.explanation.clone(),
                                complete: true,
                            });
                            ExplanationOutcome::Complete(res.explanation)
                        }
                        Err(e) => {
                            let message = e.to_string();
                            tracing::warn!("explanation {} failed: {}", token, message);
                            state.explanation = None;
                            state.error = Some(message.clone());
                            ExplanationOutcome::Failed(message)
                        }
                    }
                }
            }
        };

        if outcome == ExplanationOutcome::Superseded {
            tracing::debug!("discarding superseded explanation {}", token);
        }
        Ok(outcome)
    }

    async fn reveal_explanation(&self, token: RequestToken, text: &str) -> ExplanationOutcome {
        let delay = self.inner.cfg.explanation_word_delay();
        for word in reveal_words(text) {
            tokio::time::sleep(delay).await;
            let mut state = self.inner.state.lock();
            if !self.inner.explanation_seq.is_current(token) {
                return ExplanationOutcome::Superseded;
            }
            if let Some(explanation) = state.explanation.as_mut() {
                explanation.push_word(word);
            }
        }

        let mut state = self.inner.state.lock();
        if !self.inner.explanation_seq.is_current(token) {
            return ExplanationOutcome::Superseded;
        }
        match state.explanation.as_mut() {
            Some(explanation) => {
                explanation.complete = true;
                ExplanationOutcome::Complete(explanation.text.clone())
            }
            None => ExplanationOutcome::Superseded,
        }
    }

    /// Fetch emergency guidance for the current diagnosis.
    ///
    /// Only requested when the current diagnosis is `Immediate`. Any backend failure yields the
    /// static fallback guidance rather than an error.
    pub async fn emergency_guidance(&self) -> EmergencyOutcome {
        let (token, diagnosis) = {
            let mut state = self.inner.state.lock();
            let diagnosis = match state.diagnosis.as_ref() {
                Some(d) if requires_emergency_guidance(d) => d.clone(),
                _ => return EmergencyOutcome::NotRequired,
            };
            let token = self.inner.emergency_seq.issue();
            state.emergency_loading = true;
            (token, diagnosis)
        };

        let req = diagnosis.to_emergency_request(EMERGENCY_ASSESSMENT_STEP);
        let guidance = match self.with_timeout(self.inner.backend.emergency(&req)).await {
            Ok(res) => EmergencyGuidance::from_response(res),
            Err(e) => {
                tracing::warn!("emergency guidance unavailable ({}); using fallback", e);
                EmergencyGuidance::fallback()
            }
        };

        let mut state = self.inner.state.lock();
        if !self.inner.emergency_seq.is_current(token) {
            tracing::debug!("discarding superseded emergency guidance {}", token);
            return EmergencyOutcome::Superseded;
        }
        state.emergency_loading = false;
        state.emergency = Some(guidance.clone());
        EmergencyOutcome::Guidance(guidance)
    }

    /// Tick or untick one visual step of the emergency guidance. Returns whether the step is now
    /// completed.
    pub fn toggle_emergency_step(&self, index: usize) -> CoreResult<bool> {
        let mut state = self.inner.state.lock();
        let guidance = state
            .emergency
            .as_mut()
            .ok_or_else(|| CoreError::InvalidInput("no emergency guidance shown".into()))?;
        let steps = guidance.visual_steps.len();
        guidance.toggle_step(index).ok_or_else(|| {
            CoreError::InvalidInput(format!("step {} out of range (guidance has {steps})", index + 1))
        })
    }

    /// Send a camera frame of the patient for visual assessment.
    ///
    /// Only available for an `Immediate` diagnosis. Backend failures yield the offline guidance.
    /// The result is returned to the caller and not kept in the session.
    pub async fn analyze_emergency_image(
        &self,
        image: &[u8],
        mime: &str,
    ) -> CoreResult<ImageGuidance> {
        let diagnosis = self
            .inner
            .state
            .lock()
            .diagnosis
            .clone()
            .ok_or(CoreError::NoDiagnosis)?;
        if !requires_emergency_guidance(&diagnosis) {
            return Err(CoreError::InvalidInput(format!(
                "image analysis needs an Immediate diagnosis, not {}",
                diagnosis.urgency
            )));
        }
        if image.is_empty() {
            return Err(CoreError::InvalidInput("image is empty".into()));
        }

        let query = ImageAnalysisQuery {
            diagnosis: diagnosis.diagnosis.to_string(),
            urgency: diagnosis.urgency.as_str().to_string(),
        };
        let call = self.inner.backend.analyze_emergency_image(&query, image, mime);
        match self.with_timeout(call).await {
            Ok(res) => Ok(ImageGuidance::from_response(res)),
            Err(BackendError::Request(message)) => Err(CoreError::InvalidInput(message)),
            Err(e) => {
                tracing::warn!("image analysis unavailable ({}); using fallback", e);
                Ok(ImageGuidance::fallback())
            }
        }
    }

    /// Ask the procedure mentor about a simulation stage.
    ///
    /// Without a question (or with a blank one) this requests the stage walkthrough: it replaces
    /// the current mentor guidance, clears the chat and supersedes any walkthrough or question
    /// still in flight. With a question the answer is appended to the chat, as long as the
    /// walkthrough it was asked under is still current. Backend failures yield the offline
    /// guidance text in both cases.
    pub async fn mentor_guidance(
        &self,
        stage: ProcedureStage,
        question: Option<&str>,
    ) -> CoreResult<MentorOutcome> {
        let question = question.map(str::trim).filter(|q| !q.is_empty());
        let (token, diagnosis) = {
            let mut state = self.inner.state.lock();
            let diagnosis = state.diagnosis.clone().ok_or(CoreError::NoDiagnosis)?;
            let token = match question {
                Some(_) => self.inner.mentor_seq.current(),
                None => {
                    let token = self.inner.mentor_seq.issue();
                    state.mentor_chat.clear();
                    state.mentor_loading = true;
                    token
                }
            };
            (token, diagnosis)
        };
        tracing::debug!("mentor {} issued for stage {}", token, stage.id());

        let req = diagnosis.to_mentor_request(stage.id(), question.unwrap_or_default());
        let guidance = match self.with_timeout(self.inner.backend.mentor(&req)).await {
            Ok(res) => MentorGuidance::from_response(stage, res),
            Err(e) => {
                tracing::warn!("mentor unavailable ({}); using fallback", e);
                MentorGuidance::fallback(stage)
            }
        };

        let mut state = self.inner.state.lock();
        if !self.inner.mentor_seq.is_current(token) {
            tracing::debug!("discarding superseded mentor {}", token);
            return Ok(MentorOutcome::Superseded);
        }
        Ok(match question {
            Some(question) => {
                let exchange = MentorExchange::answered(stage, question, guidance);
                state.mentor_chat.push(exchange.clone());
                MentorOutcome::Answer(exchange)
            }
            None => {
                state.mentor_loading = false;
                state.mentor = Some(guidance.clone());
                MentorOutcome::Guidance(guidance)
            }
        })
    }

    /// Request a training video for a procedure, using the current diagnosis urgency if any.
    pub async fn procedure_video(&self, procedure: VideoProcedure) -> CoreResult<ProcedureVideo> {
        let urgency = self.inner.state.lock().diagnosis.as_ref().map(|d| d.urgency);
        let req = video_request(procedure, urgency);
        let res = self.with_timeout(self.inner.backend.generate_video(&req)).await?;
        tracing::info!("video for {} is {}", procedure, res.status);
        Ok(ProcedureVideo::from_response(procedure, res))
    }

    /// Start the stent procedure simulation for the current diagnosis.
    pub fn start_simulation(&self) -> CoreResult<()> {
        let mut state = self.inner.state.lock();
        if state.diagnosis.is_none() {
            return Err(CoreError::NoDiagnosis);
        }
        state.simulation_started = Some(Instant::now());
        Ok(())
    }

    pub fn stop_simulation(&self) {
        self.inner.state.lock().simulation_started = None;
    }

    /// Clear diagnosis, explanation, error, active scenario and inference metadata in one step.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        self.invalidate_all();
        *state = SessionState::default();
        tracing::debug!("session reset");
    }

    fn invalidate_all(&self) {
        self.inner.analysis_seq.invalidate();
        self.inner.explanation_seq.invalidate();
        self.inner.emergency_seq.invalidate();
        self.inner.mentor_seq.invalidate();
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = BackendResult<T>>) -> BackendResult<T> {
        match tokio::time::timeout(self.inner.cfg.request_timeout(), fut).await {
            Ok(res) => res,
            Err(_) => Err(BackendError::Timeout),
        }
    }
}

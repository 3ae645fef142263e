//! In-memory backend used by the core's unit tests.

use crate::backend::DiagnosisBackend;
use crate::error::{BackendError, BackendResult};
use api_shared::{
    ClinicalInputReq, DiagnosisRes, EmergencyReq, EmergencyRes, ExplainReq, ExplainRes, HealthRes,
    ImageAnalysisQuery, ImageAnalysisRes, InferenceMetaRes, MentorReq, MentorRes,
    VideoGenerationReq, VideoGenerationRes,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Script<T> = Mutex<VecDeque<(Duration, BackendResult<T>)>>;

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub analyze: Script<DiagnosisRes>,
    pub explain: Script<ExplainRes>,
    pub emergency: Script<EmergencyRes>,
    pub health: Script<HealthRes>,
    pub image: Script<ImageAnalysisRes>,
    pub mentor: Script<MentorRes>,
    pub video: Script<VideoGenerationRes>,
    pub analyze_calls: AtomicUsize,
    pub explain_calls: AtomicUsize,
    pub emergency_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub mentor_calls: AtomicUsize,
    /// Every mentor request received, in order.
    pub mentor_requests: Mutex<Vec<MentorReq>>,
    pub video_requests: Mutex<Vec<VideoGenerationReq>>,
}

impl FakeBackend {
    pub fn push_analyze(&self, delay: Duration, res: BackendResult<DiagnosisRes>) {
        self.analyze.lock().push_back((delay, res));
    }

    pub fn push_explain(&self, delay: Duration, res: BackendResult<ExplainRes>) {
        self.explain.lock().push_back((delay, res));
    }

    pub fn push_emergency(&self, delay: Duration, res: BackendResult<EmergencyRes>) {
        self.emergency.lock().push_back((delay, res));
    }

    pub fn push_image(&self, delay: Duration, res: BackendResult<ImageAnalysisRes>) {
        self.image.lock().push_back((delay, res));
    }

    pub fn push_mentor(&self, delay: Duration, res: BackendResult<MentorRes>) {
        self.mentor.lock().push_back((delay, res));
    }

    pub fn push_video(&self, delay: Duration, res: BackendResult<VideoGenerationRes>) {
        self.video.lock().push_back((delay, res));
    }

    pub fn push_health(&self, delay: Duration, res: BackendResult<HealthRes>) {
        self.health.lock().push_back((delay, res));
    }
}

async fn play<T>(script: &Script<T>) -> BackendResult<T> {
    let next = script.lock().pop_front();
    match next {
        Some((delay, res)) => {
            tokio::time::sleep(delay).await;
            res
        }
        None => Err(BackendError::Unreachable("connection refused".into())),
    }
}

#[async_trait]
impl DiagnosisBackend for FakeBackend {
    async fn analyze(&self, _req: &ClinicalInputReq) -> BackendResult<DiagnosisRes> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.analyze).await
    }

    async fn explain(&self, _req: &ExplainReq) -> BackendResult<ExplainRes> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.explain).await
    }

    async fn emergency(&self, _req: &EmergencyReq) -> BackendResult<EmergencyRes> {
        self.emergency_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.emergency).await
    }

    async fn analyze_emergency_image(
        &self,
        _query: &ImageAnalysisQuery,
        _image: &[u8],
        _mime: &str,
    ) -> BackendResult<ImageAnalysisRes> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.image).await
    }

    async fn mentor(&self, req: &MentorReq) -> BackendResult<MentorRes> {
        self.mentor_calls.fetch_add(1, Ordering::SeqCst);
        self.mentor_requests.lock().push(req.clone());
        play(&self.mentor).await
    }

    async fn generate_video(&self, req: &VideoGenerationReq) -> BackendResult<VideoGenerationRes> {
        self.video_requests.lock().push(req.clone());
        play(&self.video).await
    }

    async fn health(&self) -> BackendResult<HealthRes> {
        play(&self.health).await
    }
}

pub(crate) fn diagnosis_res(label: &str, artery: &str, urgency: &str) -> DiagnosisRes {
    DiagnosisRes {
        diagnosis: label.into(),
        affected_region: format!("{artery} territory"),
        artery_id: artery.into(),
        urgency: urgency.into(),
        recommended_intervention: "Coronary angiography".into(),
        reasoning: "Backend reasoning".into(),
        confidence: Some(0.8),
        meta: Some(InferenceMetaRes {
            mock: false,
            model_id: Some("google/medgemma-4b-it".into()),
            inference_time_s: 1.25,
            quantization: Some("4-bit NF4".into()),
            timestamp: "2025-03-01T12:00:00Z".into(),
        }),
    }
}

pub(crate) fn mentor_res(guidance: &str) -> MentorRes {
    MentorRes {
        guidance: guidance.into(),
        safety_checks: vec!["Confirm patient identity".into()],
        ask_ai: true,
    }
}

//! The diagnosis backend as consumed by the session.
//!
//! Implementations live outside the core (`api-client` speaks HTTP); tests use in-memory fakes.

use crate::error::BackendResult;
use api_shared::{
    ClinicalInputReq, DiagnosisRes, EmergencyReq, EmergencyRes, ExplainReq, ExplainRes, HealthRes,
    ImageAnalysisQuery, ImageAnalysisRes, MentorReq, MentorRes, VideoGenerationReq,
    VideoGenerationRes,
};
use async_trait::async_trait;

#[async_trait]
pub trait DiagnosisBackend: Send + Sync {
    /// `POST /api/analyze`
    async fn analyze(&self, req: &ClinicalInputReq) -> BackendResult<DiagnosisRes>;

    /// `POST /api/explain`
    async fn explain(&self, req: &ExplainReq) -> BackendResult<ExplainRes>;

    /// `POST /api/emergency`
    async fn emergency(&self, req: &EmergencyReq) -> BackendResult<EmergencyRes>;

    /// `POST /api/emergency/analyze-image`, uploading one camera frame.
    async fn analyze_emergency_image(
        &self,
        query: &ImageAnalysisQuery,
        image: &[u8],
        mime: &str,
    ) -> BackendResult<ImageAnalysisRes>;

    /// `POST /api/mentor`
    async fn mentor(&self, req: &MentorReq) -> BackendResult<MentorRes>;

    /// `POST /api/video-generation`
    async fn generate_video(&self, req: &VideoGenerationReq) -> BackendResult<VideoGenerationRes>;

    /// `GET /health`
    async fn health(&self) -> BackendResult<HealthRes>;
}

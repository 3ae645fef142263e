//! # API Client
//!
//! HTTP transport for the diagnosis backend, implementing
//! [`DiagnosisBackend`](cardiosim_core::DiagnosisBackend) with `reqwest`.
//!
//! Transport failures are mapped onto [`BackendError`] so that the session can surface them as
//! recoverable errors:
//! - timeouts become [`BackendError::Timeout`]
//! - connection failures become [`BackendError::Unreachable`]
//! - non-2xx responses become [`BackendError::Status`]
//! - malformed bodies become [`BackendError::Decode`]
//! - uploads that cannot be built (bad content type) become [`BackendError::Request`]

use api_shared::{
    routes, ClinicalInputReq, DiagnosisRes, EmergencyReq, EmergencyRes, ExplainReq, ExplainRes,
    HealthRes, ImageAnalysisQuery, ImageAnalysisRes, MentorReq, MentorRes, VideoGenerationReq,
    VideoGenerationRes,
};
use async_trait::async_trait;
use cardiosim_core::{BackendError, BackendResult, CoreConfig, CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl HttpBackend {
    /// Build a client for the configured backend URL and request timeout.
    pub fn new(cfg: &CoreConfig) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| CoreError::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: cfg.backend_url().to_string(),
            health_timeout: cfg.health_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn post_json<B, T>(&self, route: &str, body: &B) -> BackendResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(route);
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_decode() {
        BackendError::Decode(e.to_string())
    } else {
        BackendError::Unreachable(e.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> BackendResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("backend returned {}: {}", status, body.trim());
        return Err(BackendError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await.map_err(map_transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl cardiosim_core::DiagnosisBackend for HttpBackend {
    async fn analyze(&self, req: &ClinicalInputReq) -> BackendResult<DiagnosisRes> {
        self.post_json(routes::ANALYZE, req).await
    }

    async fn explain(&self, req: &ExplainReq) -> BackendResult<ExplainRes> {
        self.post_json(routes::EXPLAIN, req).await
    }

    async fn emergency(&self, req: &EmergencyReq) -> BackendResult<EmergencyRes> {
        self.post_json(routes::EMERGENCY, req).await
    }

    async fn analyze_emergency_image(
        &self,
        query: &ImageAnalysisQuery,
        image: &[u8],
        mime: &str,
    ) -> BackendResult<ImageAnalysisRes> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("frame")
            .mime_str(mime)
            .map_err(|e| BackendError::Request(format!("content type '{mime}': {e}")))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let url = self.url(routes::EMERGENCY_IMAGE);
        tracing::debug!("POST {} ({} bytes)", url, image.len());
        let response = self
            .client
            .post(&url)
            .query(query)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode(response).await
    }

    async fn mentor(&self, req: &MentorReq) -> BackendResult<MentorRes> {
        self.post_json(routes::MENTOR, req).await
    }

    async fn generate_video(&self, req: &VideoGenerationReq) -> BackendResult<VideoGenerationRes> {
        self.post_json(routes::VIDEO_GENERATION, req).await
    }

    async fn health(&self) -> BackendResult<HealthRes> {
        let response = self
            .client
            .get(self.url(routes::HEALTH))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode(response).await
    }
}

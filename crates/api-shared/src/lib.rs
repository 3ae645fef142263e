//! # API Shared
//!
//! Shared definitions for the CardioSim backend contract.
//!
//! Contains:
//! - Request/response bodies (`wire` module)
//! - Route paths
//! - Backend availability classification (`BackendMode`)
//! - An OpenAPI document describing the schemas the client depends on
//!
//! Used by `cardiosim-core` (domain conversion) and `api-client` (HTTP transport).

use utoipa::OpenApi;

pub mod health;
pub mod wire;

pub use health::BackendMode;
pub use wire::*;

/// Route paths, relative to the backend base URL.
pub mod routes {
    pub const ANALYZE: &str = "/api/analyze";
    pub const EXPLAIN: &str = "/api/explain";
    pub const EMERGENCY: &str = "/api/emergency";
    pub const EMERGENCY_IMAGE: &str = "/api/emergency/analyze-image";
    pub const MENTOR: &str = "/api/mentor";
    pub const VIDEO_GENERATION: &str = "/api/video-generation";
    pub const HEALTH: &str = "/health";
}

#[derive(OpenApi)]
#[openapi(
    info(title = "CardioSim backend contract", version = "1"),
    components(schemas(
        ClinicalInputReq,
        DiagnosisRes,
        InferenceMetaRes,
        ExplainReq,
        ExplainRes,
        EmergencyReq,
        EmergencyRes,
        ImageAnalysisQuery,
        ImageAnalysisRes,
        MentorReq,
        MentorRes,
        VideoGenerationReq,
        VideoGenerationRes,
        HealthRes,
    ))
)]
pub struct ApiDoc;

/// Render the contract as pretty-printed OpenAPI JSON.
pub fn contract_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_lists_every_schema() {
        let json = contract_json().expect("render openapi");
        for name in [
            "ClinicalInputReq",
            "DiagnosisRes",
            "EmergencyRes",
            "MentorRes",
            "ImageAnalysisRes",
            "VideoGenerationRes",
            "HealthRes",
        ] {
            assert!(json.contains(name), "missing schema {name}");
        }
    }
}

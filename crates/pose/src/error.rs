#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The user refused camera access. Not retried automatically.
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// The pose model could not be loaded; the camera can still run without guidance.
    #[error("pose detection unavailable: {0}")]
    InferenceUnavailable(String),
    #[error("the camera is only used on the chest compression step")]
    NotOnCompressionStep,
    #[error("no protocol step {0}")]
    InvalidStep(usize),
    #[error("invalid pose configuration: {0}")]
    InvalidConfig(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

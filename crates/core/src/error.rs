#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("scenario not found: {0}")]
    UnknownScenario(String),
    #[error("failed to read scenario catalogue: {0}")]
    CatalogueRead(std::io::Error),
    #[error("failed to parse scenario catalogue: {0}")]
    CatalogueParse(String),
    #[error("duplicate scenario id: {0}")]
    DuplicateScenario(String),
    #[error("no diagnosis is available")]
    NoDiagnosis,
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures talking to the diagnosis backend.
///
/// Every variant is recoverable: the session records the message and stays usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend request timed out")]
    Timeout,
    #[error("server error: {0}")]
    Status(u16),
    #[error("failed to decode backend response: {0}")]
    Decode(String),
    /// The request could not be built (for example an invalid upload content type).
    #[error("invalid request: {0}")]
    Request(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;
